//! KTF - user-space control plane for the Kernel Test Framework
//!
//! A companion kernel agent exposes test sets, tests and configurable
//! contexts over generic netlink. This crate discovers them, mirrors them
//! into a registry, runs tests in the kernel (or through a user-side body)
//! and reports each check to a result sink.
//!
//! # Quick Start
//!
//! ```ignore
//! use ktf::{KtfConfig, KtfRunner};
//!
//! let config = KtfConfig::default();
//! ktf::logging::init(&config)?;
//! let mut runner = KtfRunner::connect_or_exit(&config);
//! runner.query_testsets()?;
//!
//! let sets: Vec<(String, Vec<String>)> = runner
//!     .exposed_tests()
//!     .map(|s| (s.name.to_string(), s.test_names.to_vec()))
//!     .collect();
//! for (set, tests) in sets {
//!     for test in tests {
//!         let summary = runner.run_test(&set, &test)?;
//!         println!("{}.{}: {} asserts, {} failures", set, test, summary.asserts, summary.failures);
//!     }
//! }
//! ```
//!
//! # Architecture
//!
//! - `ktf-core`: errors, protocol version, shared id and status types
//! - `ktf-wire`: attribute codec
//! - `ktf-session`: control session over a pluggable transport
//! - `ktf-registry`: sets, tests, contexts and wrappers
//! - `ktf-engine`: orchestration, results, hybrid tests, runner facade

pub mod logging;

pub use ktf_core::{ConfigStatus, Error, HandleId, ProtocolVersion, Result, SetupStage, TypeId};
pub use ktf_engine::{
    CheckReport, Discovery, HybridContext, KtfConfig, KtfRunner, LogSink, Orchestrator,
    ResultSink, RunSummary, UserTest, CONFIG_FILE_NAME,
};
pub use ktf_registry::{ConfigurableContext, ExposedSet, KernelTest, Registry, TestSet, WrapperBinding};
pub use ktf_session::{Ack, ControlSession, Transport};

/// Attribute codec
pub mod wire {
    pub use ktf_wire::*;
}

/// Scripted transport for tests
pub mod testing {
    pub use ktf_session::testing::*;
}
