//! Protocol version negotiation
//!
//! Versions travel on the wire as one `u64` holding four 16-bit fields:
//!
//! ```text
//! ┌──────────────┬──────────────┬──────────────┬──────────────┐
//! │ major (63-48)│ minor (47-32)│ micro (31-16)│ build (15-0) │
//! └──────────────┴──────────────┴──────────────┴──────────────┘
//! ```
//!
//! Two versions are compatible when major and minor agree; micro and build
//! differences are informational only.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const FIELD_MASK: u64 = 0xffff;
const MAJOR_SHIFT: u32 = 48;
const MINOR_SHIFT: u32 = 32;
const MICRO_SHIFT: u32 = 16;
const BUILD_SHIFT: u32 = 0;

/// Packed four-field protocol version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProtocolVersion(u64);

impl ProtocolVersion {
    /// Version spoken by this library
    pub const LATEST: ProtocolVersion = ProtocolVersion::new(0, 2, 1, 0);

    /// Version assumed when a discovery reply carries none
    pub const IMPLICIT: ProtocolVersion = ProtocolVersion::new(0, 1, 0, 0);

    /// Pack four fields into a version
    pub const fn new(major: u16, minor: u16, micro: u16, build: u16) -> Self {
        ProtocolVersion(
            ((major as u64) << MAJOR_SHIFT)
                | ((minor as u64) << MINOR_SHIFT)
                | ((micro as u64) << MICRO_SHIFT)
                | ((build as u64) << BUILD_SHIFT),
        )
    }

    /// Wrap a raw wire value
    pub const fn from_raw(raw: u64) -> Self {
        ProtocolVersion(raw)
    }

    /// Raw wire value
    pub const fn raw(&self) -> u64 {
        self.0
    }

    /// Major field
    pub const fn major(&self) -> u16 {
        ((self.0 >> MAJOR_SHIFT) & FIELD_MASK) as u16
    }

    /// Minor field
    pub const fn minor(&self) -> u16 {
        ((self.0 >> MINOR_SHIFT) & FIELD_MASK) as u16
    }

    /// Micro field
    pub const fn micro(&self) -> u16 {
        ((self.0 >> MICRO_SHIFT) & FIELD_MASK) as u16
    }

    /// Build field
    pub const fn build(&self) -> u16 {
        ((self.0 >> BUILD_SHIFT) & FIELD_MASK) as u16
    }

    /// Major and minor agree
    pub fn is_compatible_with(&self, other: &ProtocolVersion) -> bool {
        self.major() == other.major() && self.minor() == other.minor()
    }
}

impl Default for ProtocolVersion {
    fn default() -> Self {
        ProtocolVersion::LATEST
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}.{}",
            self.major(),
            self.minor(),
            self.micro(),
            self.build()
        )
    }
}

impl FromStr for ProtocolVersion {
    type Err = Error;

    /// Parse `major.minor.micro.build`; missing trailing fields default to 0.
    fn from_str(s: &str) -> Result<Self> {
        let mut fields = [0u16; 4];
        let parts: Vec<&str> = s.trim().split('.').collect();
        if parts.is_empty() || parts.len() > 4 || parts.iter().any(|p| p.is_empty()) {
            return Err(Error::Config(format!(
                "invalid protocol version '{}', expected major.minor.micro.build",
                s
            )));
        }
        for (slot, part) in fields.iter_mut().zip(parts) {
            *slot = part.parse().map_err(|e| {
                Error::Config(format!("invalid protocol version field '{}': {}", part, e))
            })?;
        }
        Ok(ProtocolVersion::new(fields[0], fields[1], fields[2], fields[3]))
    }
}

impl TryFrom<String> for ProtocolVersion {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<ProtocolVersion> for String {
    fn from(v: ProtocolVersion) -> String {
        v.to_string()
    }
}
