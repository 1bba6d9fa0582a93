//! Library configuration via `ktf.toml`
//!
//! Every field has a default, so an empty file (or no file at all) yields a
//! working configuration that talks to the `ktf` family with the newest
//! protocol dialect.

use std::path::Path;

use ktf_core::{Error, ProtocolVersion, Result};
use serde::{Deserialize, Serialize};

/// Conventional config file name
pub const CONFIG_FILE_NAME: &str = "ktf.toml";

/// Configuration loaded from `ktf.toml`
///
/// # Example
///
/// ```toml
/// family = "ktf"
/// # protocol_version = "0.2.1.0"
/// log_level = "info"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KtfConfig {
    /// Generic netlink family of the kernel agent
    #[serde(default = "default_family")]
    pub family: String,
    /// Protocol version to announce instead of the newest one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol_version: Option<ProtocolVersion>,
    /// Log filter: `error`, `warn`, `info`, `debug` or `trace`
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_family() -> String {
    "ktf".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for KtfConfig {
    fn default() -> Self {
        Self {
            family: default_family(),
            protocol_version: None,
            log_level: default_log_level(),
        }
    }
}

impl KtfConfig {
    /// Protocol version announced in requests
    pub fn latest_version(&self) -> ProtocolVersion {
        self.protocol_version.unwrap_or(ProtocolVersion::LATEST)
    }

    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# KTF user-space configuration
#
# Generic netlink family registered by the kernel agent (default: "ktf")
family = "ktf"

# Protocol version to announce, as major.minor.micro.build.
# Defaults to the newest version this library speaks.
# protocol_version = "0.2.1.0"

# Log level: "error", "warn", "info" (default), "debug" or "trace"
log_level = "info"
"#
    }

    /// Parse a config from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the text is not valid TOML or a field
    /// has the wrong shape.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("failed to parse config: {}", e)))
    }

    /// Read and parse config from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!(
                "failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        toml::from_str(&content).map_err(|e| {
            Error::Config(format!(
                "failed to parse config file '{}': {}",
                path.display(),
                e
            ))
        })
    }

    /// Serialize this config to TOML and write it to the given path.
    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("failed to serialize config: {}", e)))?;
        std::fs::write(path, content).map_err(|e| {
            Error::Config(format!(
                "failed to write config file '{}': {}",
                path.display(),
                e
            ))
        })
    }
}
