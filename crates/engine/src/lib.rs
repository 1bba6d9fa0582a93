//! Protocol orchestration for KTF
//!
//! This crate ties the lower layers together:
//! - Orchestrator: discover, run, configure-context and coverage round trips
//! - Results: check reports, result sinks and run totals
//! - Hybrid tests: user-side bodies paired with kernel tests
//! - Runner: the registration surface a test-runner front end drives
//! - Config: `ktf.toml` loading
//!
//! The orchestrator is the only component that knows the shape of requests
//! and replies; the registry below it is plain data and the session below it
//! moves opaque bytes.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod hybrid;
pub mod orchestrator;
mod protocol;
pub mod results;
pub mod runner;

pub use config::{KtfConfig, CONFIG_FILE_NAME};
pub use hybrid::{HybridContext, UserTest};
pub use orchestrator::{Discovery, Orchestrator};
pub use results::{CheckReport, LogSink, ResultSink, RunSummary, NO_FILE, NO_REPORT};
pub use runner::KtfRunner;
