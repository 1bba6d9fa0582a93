//! Transport seam between the session and the channel implementation

use std::io;

/// Transport-level acknowledgement of one request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ack {
    /// Request accepted
    Ok,
    /// Request rejected with the agent's status (negative errno)
    Nack(i32),
}

/// Channel primitives used by [`ControlSession`](crate::ControlSession)
///
/// Implementations must deliver the acknowledgement of the current request
/// through [`wait_for_ack`](Transport::wait_for_ack) and its response
/// through [`recv`](Transport::recv), even if the peer emits them in the
/// opposite order.
pub trait Transport: Send {
    /// Establish the channel
    fn connect(&mut self) -> io::Result<()>;

    /// Resolve a protocol family name, `None` if no such family is registered
    fn resolve_family(&mut self, name: &str) -> io::Result<Option<u16>>;

    /// Transmit one request body to `family`
    fn send(&mut self, family: u16, body: &[u8]) -> io::Result<()>;

    /// Block until the acknowledgement of the last request arrives
    fn wait_for_ack(&mut self) -> io::Result<Ack>;

    /// Block until one response body arrives
    fn recv(&mut self) -> io::Result<Vec<u8>>;
}
