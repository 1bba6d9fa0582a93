//! Control channel session to the KTF kernel agent
//!
//! The session owns the channel and runs strictly sequential round trips:
//! one request, its acknowledgement, then its response. There is no
//! pipelining and no timeout; a stalled transport blocks the caller.
//!
//! - [`Transport`]: the channel primitives the session needs
//! - [`ControlSession`]: setup and round trips over a transport
//! - [`NetlinkTransport`]: generic netlink socket (Linux)
//! - [`testing::ScriptedTransport`]: in-memory transport for tests

#![warn(missing_docs)]
#![warn(clippy::all)]

#[cfg(target_os = "linux")]
mod netlink;
mod session;
pub mod testing;
mod transport;

#[cfg(target_os = "linux")]
pub use netlink::NetlinkTransport;
pub use session::ControlSession;
pub use transport::{Ack, Transport};
