//! Error types for the KTF control plane
//!
//! All fallible operations in the workspace return [`Error`]. Variants are
//! grouped by how the caller is expected to react:
//!
//! | Category | Variants | Reaction |
//! |----------|----------|----------|
//! | Setup | `Setup` | Fatal, no operation can succeed without a live agent |
//! | Protocol | `Truncated`, `AttributeKind`, `BadHeader`, `Protocol` | Current message dropped, session still usable |
//! | Transport | `Io`, `Nack` | Current round trip aborted |
//! | Configuration | `ContextNotFound` .. `UnconfigurableContext` | Reported to the configuring test |
//! | Config file | `Config` | Startup error |
//!
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.

use std::fmt;
use std::io;
use thiserror::Error;

/// Result type alias for KTF operations
pub type Result<T> = std::result::Result<T, Error>;

/// Step of connection setup that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupStage {
    /// Allocating the channel handle
    Allocate,
    /// Establishing the channel with the kernel
    Connect,
    /// Resolving the agent's protocol family by name
    ResolveFamily,
}

impl fmt::Display for SetupStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SetupStage::Allocate => "allocate channel",
            SetupStage::Connect => "connect channel",
            SetupStage::ResolveFamily => "resolve protocol family",
        };
        f.write_str(s)
    }
}

/// Error types for the KTF control plane
#[derive(Debug, Error)]
pub enum Error {
    // ==================== Setup ====================
    /// Connection setup failed
    #[error("failed to {stage}: {reason}")]
    Setup {
        /// Which setup step failed
        stage: SetupStage,
        /// Underlying cause
        reason: String,
    },

    // ==================== Protocol ====================
    /// Message ended before an attribute or header was complete
    #[error("truncated message: needed {needed} bytes at offset {offset}, {available} available")]
    Truncated {
        /// Byte offset of the incomplete element
        offset: usize,
        /// Bytes the element claims
        needed: usize,
        /// Bytes actually present
        available: usize,
    },

    /// Attribute payload disagrees with the kind declared for its tag
    #[error("attribute {tag}: expected {expected}, payload is {len} bytes")]
    AttributeKind {
        /// Attribute tag
        tag: u16,
        /// Expected kind name
        expected: &'static str,
        /// Actual payload length
        len: usize,
    },

    /// Message header is missing or malformed
    #[error("bad message header: {0}")]
    BadHeader(String),

    /// Well-formed message with unexpected content
    #[error("protocol error: {0}")]
    Protocol(String),

    // ==================== Transport ====================
    /// I/O error on the control channel
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Negative acknowledgement from the kernel agent
    #[error("request rejected by kernel agent: status {status}")]
    Nack {
        /// Agent status code (negative errno convention)
        status: i32,
    },

    // ==================== Configuration ====================
    /// No configurable context with this name
    #[error("no context found named {name}")]
    ContextNotFound {
        /// Context name
        name: String,
    },

    /// Several contexts share the name and no handle narrows the choice
    #[error("more than one context named {name} ({matches} matches), configure it for a specific test")]
    AmbiguousContext {
        /// Context name
        name: String,
        /// Number of matching contexts
        matches: usize,
    },

    /// Configuration type tag does not match the context's declared type
    #[error("context {name} has type {actual}, configuration has type {expected}")]
    ContextTypeMismatch {
        /// Context name
        name: String,
        /// Type tag supplied by the caller
        expected: u32,
        /// Type tag declared by the kernel
        actual: u32,
    },

    /// Kernel agent refused the configuration
    #[error("configuring context {name} failed with status {status}")]
    ConfigureRejected {
        /// Context name
        name: String,
        /// Acknowledgement status
        status: i32,
    },

    /// No test registered under this (set, name)
    #[error("could not find test {set}.{test}")]
    TestNotFound {
        /// Set name
        set: String,
        /// Test name
        test: String,
    },

    /// Test is not associated with any context
    #[error("test {set}.{test} does not have a context")]
    NoContext {
        /// Set name
        set: String,
        /// Test name
        test: String,
    },

    /// Test has a handle but none of its contexts is configurable
    #[error("no configurable context found for test {set}.{test}")]
    UnconfigurableContext {
        /// Set name
        set: String,
        /// Test name
        test: String,
    },

    // ==================== Config file ====================
    /// Invalid configuration file or value
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Create a protocol error
    pub fn protocol(msg: impl Into<String>) -> Self {
        Error::Protocol(msg.into())
    }

    /// Create a setup error
    pub fn setup(stage: SetupStage, reason: impl fmt::Display) -> Self {
        Error::Setup {
            stage,
            reason: reason.to_string(),
        }
    }

    /// True for errors that leave the session unusable
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Setup { .. })
    }

    /// True for errors confined to decoding a single message
    pub fn is_protocol(&self) -> bool {
        matches!(
            self,
            Error::Truncated { .. }
                | Error::AttributeKind { .. }
                | Error::BadHeader(_)
                | Error::Protocol(_)
        )
    }
}
