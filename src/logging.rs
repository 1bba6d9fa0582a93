//! Log output setup
//!
//! Every component logs through `tracing` under `ktf::*` targets. `RUST_LOG`
//! takes precedence over the configured level when set.

use std::str::FromStr;

use ktf_core::{Error, Result};
use ktf_engine::KtfConfig;
use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Filter directive for a configured level
pub fn filter_directive(config: &KtfConfig) -> Result<String> {
    let level = Level::from_str(config.log_level.trim())
        .map_err(|_| Error::Config(format!("invalid log level '{}'", config.log_level)))?;
    Ok(format!("ktf={}", level.as_str().to_ascii_lowercase()))
}

/// Install a stderr subscriber at the configured level
///
/// # Errors
///
/// Fails on an unknown level or when a global subscriber is already set.
pub fn init(config: &KtfConfig) -> Result<()> {
    let directive = filter_directive(config)?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive));

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_file(false)
                .with_line_number(false),
        )
        .with(filter)
        .try_init()
        .map_err(|e| Error::Config(format!("failed to install log subscriber: {}", e)))
}
