//! Tests with a user-space half
//!
//! A hybrid test is declared by the kernel agent like any other test, and a
//! user-side body is registered for the same (set, name). Running the test
//! runs the body, which decides when (and whether) to run the kernel half
//! through [`HybridContext::run_kernel`].

use std::sync::Arc;

use ktf_core::{Error, Result, TypeId};
use ktf_registry::Registry;

use crate::orchestrator::Orchestrator;
use crate::results::RunSummary;

/// User-side body of a hybrid test
pub type UserTest = Arc<dyn Fn(&mut HybridContext<'_>) -> Result<()> + Send + Sync>;

/// What a user-side body can see and do while it runs
pub struct HybridContext<'a> {
    orchestrator: &'a mut Orchestrator,
    registry: &'a mut Registry<UserTest>,
    set: &'a str,
    exposed: &'a str,
    name: String,
    context: String,
    summary: RunSummary,
}

impl<'a> HybridContext<'a> {
    pub(crate) fn new(
        orchestrator: &'a mut Orchestrator,
        registry: &'a mut Registry<UserTest>,
        set: &'a str,
        exposed: &'a str,
        name: String,
        context: String,
    ) -> Self {
        HybridContext {
            orchestrator,
            registry,
            set,
            exposed,
            name,
            context,
            summary: RunSummary::default(),
        }
    }

    /// Set name
    pub fn set(&self) -> &str {
        self.set
    }

    /// Short test name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Context this run was resolved to, empty for none
    pub fn context(&self) -> &str {
        &self.context
    }

    /// The test's configuration buffer, allocated on first use
    pub fn priv_data(&mut self, size: usize) -> Result<&mut [u8]> {
        match self.registry.find_test_mut(self.set, self.exposed) {
            Some((test, _)) => Ok(test.priv_data(size)),
            None => Err(Error::TestNotFound {
                set: self.set.to_string(),
                test: self.exposed.to_string(),
            }),
        }
    }

    /// Configure the context this run was resolved to
    pub fn configure_context(&mut self, type_id: TypeId, data: &[u8]) -> Result<()> {
        self.orchestrator
            .configure_context_for_test(self.registry, self.set, self.exposed, type_id, data)
    }

    /// Run the kernel half of the test with its configuration buffer
    pub fn run_kernel(&mut self) -> Result<RunSummary> {
        let priv_data = self
            .registry
            .find_test(self.set, self.exposed)
            .and_then(|(test, _)| test.existing_priv_data());
        let summary = self
            .orchestrator
            .run_kernel_test(self.set, &self.name, &self.context, priv_data)?;
        self.summary.merge(&summary);
        Ok(summary)
    }

    pub(crate) fn into_summary(self) -> RunSummary {
        self.summary
    }
}

impl std::fmt::Debug for HybridContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HybridContext")
            .field("set", &self.set)
            .field("name", &self.name)
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}
