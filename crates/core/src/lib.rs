//! Core types for the KTF user-space control plane
//!
//! This crate defines the foundational types shared by every layer:
//! - Error: Error taxonomy (setup, protocol, transport, configuration)
//! - ProtocolVersion: Packed four-field protocol version and compatibility rule
//! - HandleId / TypeId: Kernel-assigned identifiers for context-bearing handles
//! - ConfigStatus: Last-known configuration state of a configurable context

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod types;
pub mod version;

pub use error::{Error, Result, SetupStage};
pub use types::{ConfigStatus, HandleId, TypeId, ENOENT};
pub use version::ProtocolVersion;
