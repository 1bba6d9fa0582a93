//! In-memory catalog of KTF test sets, tests and contexts
//!
//! The registry reconciles three sources of test identity:
//! - kernel-declared tests, registered from discovery replies
//! - user-declared wrapper bodies, registered before or after discovery
//! - context-expanded names, one per context of a test's handle
//!
//! and exposes them in one stable order through [`Registry::exposed_tests`].
//!
//! The registry is plain data: it is not synchronized and owns every set,
//! test and context it creates. It is generic over the user-side body type
//! `B` so it stays independent of how bodies are invoked.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod context;
mod registry;
mod set;

pub use context::ConfigurableContext;
pub use registry::{ExposedSet, ExposedTests, Registry, WrapperBinding};
pub use set::TestSet;
pub use test::KernelTest;
