//! Registration surface for a test-runner front end
//!
//! [`KtfRunner`] pairs an [`Orchestrator`] with the registry it fills. A front
//! end discovers tests with [`query_testsets`](KtfRunner::query_testsets),
//! walks [`exposed_tests`](KtfRunner::exposed_tests) to enumerate names, and
//! calls [`run_test`](KtfRunner::run_test) for each one.

use std::sync::Arc;

use ktf_core::{Error, Result, TypeId};
use ktf_registry::{ExposedTests, KernelTest, Registry, WrapperBinding};
use ktf_session::{ControlSession, Transport};
use tracing::debug;

use crate::config::KtfConfig;
use crate::hybrid::{HybridContext, UserTest};
use crate::orchestrator::{Discovery, Orchestrator};
use crate::results::{ResultSink, RunSummary};

/// Owns the control session and the test registry
pub struct KtfRunner {
    orchestrator: Orchestrator,
    registry: Registry<UserTest>,
}

impl KtfRunner {
    /// Open a netlink session to the configured family
    #[cfg(target_os = "linux")]
    pub fn connect(config: &KtfConfig) -> Result<Self> {
        let session = ControlSession::open(&config.family)?;
        Ok(Self::with_session(session, config))
    }

    /// Open a netlink session, terminating the process if that fails
    #[cfg(target_os = "linux")]
    pub fn connect_or_exit(config: &KtfConfig) -> Self {
        let session = ControlSession::open_or_exit(&config.family);
        Self::with_session(session, config)
    }

    /// Connect over a caller-supplied transport
    pub fn with_transport(transport: Box<dyn Transport>, config: &KtfConfig) -> Result<Self> {
        let session = ControlSession::connect(transport, &config.family)?;
        Ok(Self::with_session(session, config))
    }

    /// Use an established session
    pub fn with_session(session: ControlSession, config: &KtfConfig) -> Self {
        KtfRunner {
            orchestrator: Orchestrator::new(session).with_version(config.latest_version()),
            registry: Registry::new(),
        }
    }

    /// Replace the result sink
    pub fn set_sink(&mut self, sink: impl ResultSink + Send + 'static) {
        self.orchestrator.set_sink(sink);
    }

    /// Registry contents
    pub fn registry(&self) -> &Registry<UserTest> {
        &self.registry
    }

    /// Discover the agent's sets, tests and contexts
    pub fn query_testsets(&mut self) -> Result<Discovery> {
        self.orchestrator.discover(&mut self.registry)
    }

    /// Discovered set names in discovery order
    pub fn set_names(&self) -> Vec<&str> {
        self.registry.set_names()
    }

    /// Exposed test names, set by set
    pub fn exposed_tests(&self) -> ExposedTests<'_, UserTest> {
        self.registry.exposed_tests()
    }

    /// Resolve an exposed name to its test and context
    pub fn find_test(&self, set: &str, name: &str) -> Option<(&KernelTest<UserTest>, String)> {
        self.registry.find_test(set, name)
    }

    /// Run a test by exposed name
    ///
    /// A test with a user-side body runs the body; otherwise the kernel half
    /// runs directly.
    pub fn run_test(&mut self, set: &str, name: &str) -> Result<RunSummary> {
        let (body, test_name, context, priv_data) = match self.registry.find_test(set, name) {
            Some((test, context)) => (
                test.user_test().cloned(),
                test.name().to_string(),
                context,
                test.existing_priv_data().map(<[u8]>::to_vec),
            ),
            None => {
                return Err(Error::TestNotFound {
                    set: set.to_string(),
                    test: name.to_string(),
                })
            }
        };

        match body {
            Some(body) => {
                debug!(target: "ktf::runner", set, test = name, "Running user test");
                let mut hybrid = HybridContext::new(
                    &mut self.orchestrator,
                    &mut self.registry,
                    set,
                    name,
                    test_name,
                    context,
                );
                (*body)(&mut hybrid)?;
                Ok(hybrid.into_summary())
            }
            None => self.orchestrator.run_kernel_test(set, &test_name, &context, priv_data.as_deref()),
        }
    }

    /// Register a user-side body for (set, name)
    pub fn add_wrapper<F>(&mut self, set: &str, name: &str, body: F) -> WrapperBinding
    where
        F: Fn(&mut HybridContext<'_>) -> Result<()> + Send + Sync + 'static,
    {
        debug!(target: "ktf::runner", set, test = name, "add_wrapper");
        self.registry.register_wrapper(set, name, Arc::new(body))
    }

    /// Configure the only context named `name`
    pub fn configure_context(&mut self, name: &str, type_id: TypeId, data: &[u8]) -> Result<()> {
        self.orchestrator
            .configure_context(&mut self.registry, name, type_id, data)
    }

    /// Configure the context a test's exposed name resolves to
    pub fn configure_context_for_test(
        &mut self,
        set: &str,
        test: &str,
        type_id: TypeId,
        data: &[u8],
    ) -> Result<()> {
        self.orchestrator
            .configure_context_for_test(&mut self.registry, set, test, type_id, data)
    }

    /// Enable or disable coverage collection for a kernel module
    pub fn set_coverage(&mut self, module: &str, options: u32, enabled: bool) -> Result<()> {
        self.orchestrator.set_coverage(module, options, enabled)
    }

    /// A test's configuration buffer, allocated on first use
    pub fn priv_data(&mut self, set: &str, name: &str, size: usize) -> Result<&mut [u8]> {
        match self.registry.find_test_mut(set, name) {
            Some((test, _)) => Ok(test.priv_data(size)),
            None => Err(Error::TestNotFound {
                set: set.to_string(),
                test: name.to_string(),
            }),
        }
    }
}

impl std::fmt::Debug for KtfRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KtfRunner")
            .field("orchestrator", &self.orchestrator)
            .field("sets", &self.registry.set_names())
            .finish()
    }
}
