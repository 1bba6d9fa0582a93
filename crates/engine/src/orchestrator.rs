//! Discover, run and configure round trips
//!
//! Each operation is one synchronous round trip over the control session.
//! Replies are decoded completely before the registry or the result sink see
//! any of their content.

use ktf_core::{ConfigStatus, Error, HandleId, ProtocolVersion, Result, TypeId};
use ktf_registry::Registry;
use ktf_session::ControlSession;
use tracing::{debug, error, info};

use crate::protocol::{self, CheckRecord, DecodedDiscovery};
use crate::results::{LogSink, ResultSink, RunAccumulator, RunSummary};

/// Outcome of a discovery round trip
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Discovery {
    /// The reply was decoded and applied to the registry
    Applied {
        /// Version reported by the agent
        remote: ProtocolVersion,
        /// Set count announced by the agent
        declared: u32,
        /// Sets listed in the reply
        sets: usize,
    },
    /// The agent speaks an incompatible dialect; the registry is untouched
    Skipped {
        /// Version this side announced
        local: ProtocolVersion,
        /// Version reported by the agent
        remote: ProtocolVersion,
    },
}

/// Protocol state machine over one control session
pub struct Orchestrator {
    session: ControlSession,
    latest: ProtocolVersion,
    sink: Box<dyn ResultSink + Send>,
}

impl Orchestrator {
    /// Orchestrator speaking the newest protocol version, logging results
    pub fn new(session: ControlSession) -> Self {
        Orchestrator {
            session,
            latest: ProtocolVersion::LATEST,
            sink: Box::new(LogSink),
        }
    }

    /// Announce `version` instead of the newest one
    pub fn with_version(mut self, version: ProtocolVersion) -> Self {
        self.latest = version;
        self
    }

    /// Replace the result sink
    pub fn set_sink(&mut self, sink: impl ResultSink + Send + 'static) {
        self.sink = Box::new(sink);
    }

    /// Version announced in requests
    pub fn latest(&self) -> ProtocolVersion {
        self.latest
    }

    /// Underlying session
    pub fn session(&self) -> &ControlSession {
        &self.session
    }

    /// Ask the agent for its sets, tests and contexts and record them
    ///
    /// # Errors
    ///
    /// Transport failures and malformed replies are returned as errors and
    /// leave the registry unchanged. An incompatible agent version is not an
    /// error: it yields [`Discovery::Skipped`].
    pub fn discover<B>(&mut self, registry: &mut Registry<B>) -> Result<Discovery> {
        let request = protocol::query_request(self.latest)?;
        let reply = self.session.send_and_await(&request)?;
        let reply = match protocol::decode_discovery(&reply, self.latest)? {
            DecodedDiscovery::Reply(reply) => reply,
            DecodedDiscovery::Incompatible { remote } => {
                return Ok(Discovery::Skipped {
                    local: self.latest,
                    remote,
                })
            }
        };

        for group in reply.groups {
            for ctx in &group.contexts {
                registry.add_configurable_context(&ctx.name, ctx.type_id, group.handle, ctx.status);
            }
            registry.add_cset(group.handle, group.names);
        }
        let sets = reply.sets.len();
        for set in reply.sets {
            for (handle, test) in &set.tests {
                registry.register_kernel_test(&set.name, test, *handle);
            }
            registry.find_or_create_set(&set.name);
        }
        info!(target: "ktf::orchestrator", declared = reply.declared, sets, "Discovery complete");

        Ok(Discovery::Applied {
            remote: reply.remote,
            declared: reply.declared,
            sets,
        })
    }

    /// Run a test in the kernel and report its checks to the sink
    ///
    /// `context` is the resolved context name, empty for none.
    pub fn run_kernel_test(
        &mut self,
        set: &str,
        test: &str,
        context: &str,
        priv_data: Option<&[u8]>,
    ) -> Result<RunSummary> {
        debug!(target: "ktf::orchestrator", set, test, context, "START kernel test");
        let request = protocol::run_request(self.latest, set, test, context, priv_data)?;
        let reply = self.session.send_and_await(&request)?;
        let run = protocol::decode_run(&reply)?;

        if run.exec_status != 0 {
            error!(target: "ktf::orchestrator", set, test, status = run.exec_status,
                "Failed to execute test in kernel - status {}", run.exec_status);
        }

        let summary = match run.records {
            Some(records) => {
                let mut acc = RunAccumulator::new(self.sink.as_mut());
                for record in records {
                    match record {
                        CheckRecord::Status(status) => acc.status(status),
                        CheckRecord::File(file) => acc.file(file),
                        CheckRecord::Line(line) => acc.line(line),
                        CheckRecord::Report(report) => acc.report(report),
                    }
                }
                acc.finish(run.exec_status)
            }
            None => RunSummary {
                exec_status: run.exec_status,
                ..RunSummary::default()
            },
        };
        debug!(target: "ktf::orchestrator", set, test, asserts = summary.asserts, failures = summary.failures, "END kernel test");
        Ok(summary)
    }

    /// Configure the only context named `name`
    ///
    /// # Errors
    ///
    /// Fails if no context or more than one context has this name, if the
    /// type tag differs from the context's, or if the agent rejects the
    /// configuration.
    pub fn configure_context<B>(
        &mut self,
        registry: &mut Registry<B>,
        name: &str,
        type_id: TypeId,
        data: &[u8],
    ) -> Result<()> {
        match registry.find_contexts(name).len() {
            0 => Err(Error::ContextNotFound {
                name: name.to_string(),
            }),
            1 => self.configure_entry(registry, name, 0, type_id, data),
            matches => Err(Error::AmbiguousContext {
                name: name.to_string(),
                matches,
            }),
        }
    }

    /// Configure the context a test was resolved to
    ///
    /// `test` is an exposed name; its context suffix selects the context and
    /// the test's handle narrows it to one entry.
    pub fn configure_context_for_test<B>(
        &mut self,
        registry: &mut Registry<B>,
        set: &str,
        test: &str,
        type_id: TypeId,
        data: &[u8],
    ) -> Result<()> {
        let (handle, context) = match registry.find_test(set, test) {
            Some((kt, context)) => (kt.handle(), context),
            None => {
                return Err(Error::TestNotFound {
                    set: set.to_string(),
                    test: test.to_string(),
                })
            }
        };
        if handle == HandleId::NONE {
            return Err(Error::NoContext {
                set: set.to_string(),
                test: test.to_string(),
            });
        }
        let index = registry
            .find_contexts(&context)
            .iter()
            .position(|c| c.handle() == handle)
            .ok_or_else(|| Error::UnconfigurableContext {
                set: set.to_string(),
                test: test.to_string(),
            })?;
        self.configure_entry(registry, &context, index, type_id, data)
    }

    fn configure_entry<B>(
        &mut self,
        registry: &mut Registry<B>,
        name: &str,
        index: usize,
        type_id: TypeId,
        data: &[u8],
    ) -> Result<()> {
        let entry = &mut registry.find_contexts_mut(name)[index];
        if entry.type_id() != type_id {
            return Err(Error::ContextTypeMismatch {
                name: name.to_string(),
                expected: type_id,
                actual: entry.type_id(),
            });
        }

        info!(target: "ktf::orchestrator", context = name, handle = %entry.handle(), data_len = data.len(), "Configuring context");
        let request = protocol::configure_request(self.latest, name, entry.handle(), type_id, data)?;
        match self.session.send_and_ack(&request) {
            Ok(()) => {
                entry.set_status(ConfigStatus::Ready);
                Ok(())
            }
            Err(Error::Nack { status }) => {
                entry.set_status(ConfigStatus::Error(status));
                Err(Error::ConfigureRejected {
                    name: name.to_string(),
                    status,
                })
            }
            Err(e) => Err(e),
        }
    }

    /// Enable or disable coverage collection for a kernel module
    pub fn set_coverage(&mut self, module: &str, options: u32, enabled: bool) -> Result<()> {
        info!(target: "ktf::orchestrator", module, options, enabled, "Setting coverage");
        let request = protocol::coverage_request(self.latest, module, options, enabled)?;
        self.session.send_and_drain(&request)
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("session", &self.session)
            .field("latest", &self.latest)
            .finish_non_exhaustive()
    }
}
