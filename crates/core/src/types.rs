//! Identifier and status types shared across layers

use serde::{Deserialize, Serialize};
use std::fmt;

/// errno value the kernel agent reports for an unconfigured context
pub const ENOENT: i32 = 2;

/// Kernel-assigned handle identifier
///
/// A handle groups a test with zero or more named contexts. Zero means the
/// test has no context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct HandleId(pub u32);

impl HandleId {
    /// The "no context" handle
    pub const NONE: HandleId = HandleId(0);

    /// True if this handle carries contexts
    pub fn is_some(&self) -> bool {
        self.0 != 0
    }
}

impl fmt::Display for HandleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Type tag agreed between the configurer and the configured context
pub type TypeId = u32;

/// Last-known configuration state of a context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigStatus {
    /// Configured and ready
    Ready,
    /// Not configured yet
    Unconfigured,
    /// Opaque kernel error code
    Error(i32),
}

impl ConfigStatus {
    /// Interpret a raw status as reported by the kernel
    pub fn from_raw(raw: i32) -> Self {
        match raw {
            0 => ConfigStatus::Ready,
            ENOENT => ConfigStatus::Unconfigured,
            other => ConfigStatus::Error(other),
        }
    }

    /// Raw status value
    pub fn raw(&self) -> i32 {
        match self {
            ConfigStatus::Ready => 0,
            ConfigStatus::Unconfigured => ENOENT,
            ConfigStatus::Error(code) => *code,
        }
    }
}

impl fmt::Display for ConfigStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigStatus::Ready => f.write_str("READY"),
            ConfigStatus::Unconfigured => f.write_str("UNCONFIGURED"),
            ConfigStatus::Error(code) => write!(f, "ERROR({})", code),
        }
    }
}
