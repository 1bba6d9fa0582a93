//! The registry proper
//!
//! # Ordering
//!
//! Sets are kept in a vector indexed by ordinal, so iteration follows
//! first-seen order. Within a set, `test_names` follows registration order,
//! with context-expanded names in the order the handle's contexts were
//! declared.
//!
//! # Name resolution
//!
//! A context-expanded name is `{test}_{context}`. Neither part is forbidden
//! from containing `_`, so [`Registry::find_test`] tries split points from
//! the last `_` backwards: longest candidate test name first.

use std::collections::HashMap;

use ktf_core::{ConfigStatus, HandleId, TypeId};
use tracing::{debug, info};

use crate::context::ConfigurableContext;
use crate::set::TestSet;
use crate::test::KernelTest;

/// Outcome of [`Registry::register_wrapper`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WrapperBinding {
    /// The kernel test already existed and now carries the body
    Bound,
    /// Stored until the kernel test is registered
    Pending,
}

/// Catalog of sets, tests, contexts and pending wrappers
#[derive(Debug)]
pub struct Registry<B> {
    sets: Vec<TestSet<B>>,
    index: HashMap<String, usize>,
    /// Context names per handle, in declaration order
    handle_contexts: HashMap<HandleId, Vec<String>>,
    /// Configurable contexts by name; one name may belong to several handles
    contexts: HashMap<String, Vec<ConfigurableContext>>,
}

impl<B> Default for Registry<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B> Registry<B> {
    /// Create an empty registry
    pub fn new() -> Self {
        Registry {
            sets: Vec::new(),
            index: HashMap::new(),
            handle_contexts: HashMap::new(),
            contexts: HashMap::new(),
        }
    }

    // =========================================================================
    // Sets
    // =========================================================================

    /// Return the set named `name`, creating it with the next ordinal if new
    pub fn find_or_create_set(&mut self, name: &str) -> &mut TestSet<B> {
        let idx = self.set_index(name);
        &mut self.sets[idx]
    }

    fn set_index(&mut self, name: &str) -> usize {
        if let Some(&idx) = self.index.get(name) {
            return idx;
        }
        let idx = self.sets.len();
        self.sets.push(TestSet::new(name, idx));
        self.index.insert(name.to_string(), idx);
        info!(target: "ktf::registry", set = name, ordinal = idx, total = self.sets.len(), "Added test set");
        idx
    }

    /// Set named `name`
    pub fn set(&self, name: &str) -> Option<&TestSet<B>> {
        self.index.get(name).map(|&idx| &self.sets[idx])
    }

    /// All sets in first-seen order
    pub fn sets(&self) -> &[TestSet<B>] {
        &self.sets
    }

    /// Set names in first-seen order
    pub fn set_names(&self) -> Vec<&str> {
        self.sets.iter().map(|s| s.name()).collect()
    }

    // =========================================================================
    // Tests and wrappers
    // =========================================================================

    /// Register a kernel-declared test
    ///
    /// The test is exposed under its own name when `handle` is
    /// [`HandleId::NONE`], otherwise under `{name}_{context}` for each context
    /// of the handle registered so far.
    ///
    /// A second declaration of the same (set, name) replaces the first: the
    /// new test takes the old one's place in the exposed order, gets a fresh
    /// ordinal, and keeps any user body bound to the old one. A pending
    /// wrapper for (set, name) is bound and removed.
    pub fn register_kernel_test(&mut self, set: &str, name: &str, handle: HandleId) -> &KernelTest<B> {
        let exposed: Vec<String> = if handle.is_some() {
            self.contexts_for_handle(handle)
                .iter()
                .map(|ctx| format!("{}_{}", name, ctx))
                .collect()
        } else {
            vec![name.to_string()]
        };
        debug!(target: "ktf::registry", set, test = name, handle = %handle, exposed = exposed.len(), "Registering kernel test");

        let idx = self.set_index(set);
        let ts = &mut self.sets[idx];
        let ordinal = ts.next_ordinal();

        let mut carried = None;
        match ts.tests.remove(name) {
            Some(mut old) => {
                debug!(target: "ktf::registry", set, test = name, "Replacing earlier declaration");
                carried = old.take_user_test();
                let mut at = ts.test_names.len();
                for stale in old.exposed_names() {
                    if let Some(pos) = ts.test_names.iter().position(|n| n == stale) {
                        ts.test_names.remove(pos);
                        at = at.min(pos);
                    }
                }
                let at = at.min(ts.test_names.len());
                ts.test_names.splice(at..at, exposed.iter().cloned());
            }
            None => ts.test_names.extend(exposed.iter().cloned()),
        }

        let mut test = KernelTest::new(set, name, ts.ordinal(), ordinal, handle, exposed);
        if let Some(body) = ts.wrappers.remove(name) {
            debug!(target: "ktf::registry", set, test = name, "Binding pending wrapper");
            test.bind(body);
        } else if let Some(body) = carried {
            test.bind(body);
        }
        ts.tests.insert(name.to_string(), test);
        &ts.tests[name]
    }

    /// Register a user-side body for (set, name)
    ///
    /// Binds immediately if the kernel test exists, otherwise keeps the body
    /// until [`register_kernel_test`](Self::register_kernel_test) sees it.
    pub fn register_wrapper(&mut self, set: &str, name: &str, body: B) -> WrapperBinding {
        let idx = self.set_index(set);
        let ts = &mut self.sets[idx];
        match ts.tests.get_mut(name) {
            Some(test) => {
                debug!(target: "ktf::registry", set, test = name, "Assigning user test");
                test.bind(body);
                WrapperBinding::Bound
            }
            None => {
                debug!(target: "ktf::registry", set, test = name, "Storing wrapper until kernel test appears");
                ts.wrappers.insert(name.to_string(), body);
                WrapperBinding::Pending
            }
        }
    }

    /// Resolve a possibly context-expanded name to (test name, context)
    fn resolve(&self, set: &str, name: &str) -> Option<(usize, String, String)> {
        debug!(target: "ktf::registry", set, test = name, "Finding test");
        let idx = *self.index.get(set)?;
        let ts = &self.sets[idx];
        if ts.tests.contains_key(name) {
            return Some((idx, name.to_string(), String::new()));
        }
        if !self.has_context_groups() {
            return None;
        }
        let mut split = name.rfind('_');
        while let Some(pos) = split {
            let base = &name[..pos];
            if ts.tests.contains_key(base) {
                return Some((idx, base.to_string(), name[pos + 1..].to_string()));
            }
            split = base.rfind('_');
        }
        None
    }

    /// Find a test by exposed name
    ///
    /// Returns the test and the context suffix that resolved it, empty when
    /// the name matched directly.
    pub fn find_test(&self, set: &str, name: &str) -> Option<(&KernelTest<B>, String)> {
        let (idx, base, ctx) = self.resolve(set, name)?;
        self.sets[idx].tests.get(&base).map(|t| (t, ctx))
    }

    /// Mutable variant of [`find_test`](Self::find_test)
    pub fn find_test_mut(&mut self, set: &str, name: &str) -> Option<(&mut KernelTest<B>, String)> {
        let (idx, base, ctx) = self.resolve(set, name)?;
        self.sets[idx].tests.get_mut(&base).map(|t| (t, ctx))
    }

    /// Exposed test names set by set, in first-seen order
    ///
    /// Each call starts from the first set.
    pub fn exposed_tests(&self) -> ExposedTests<'_, B> {
        ExposedTests {
            sets: &self.sets,
            position: 0,
        }
    }

    // =========================================================================
    // Contexts
    // =========================================================================

    /// Record the context names of `handle`, replacing earlier ones
    pub fn add_cset(&mut self, handle: HandleId, contexts: Vec<String>) {
        info!(target: "ktf::registry", handle = %handle, contexts = ?contexts, "Added context group");
        self.handle_contexts.insert(handle, contexts);
    }

    /// Record a configurable context
    pub fn add_configurable_context(
        &mut self,
        name: &str,
        type_id: TypeId,
        handle: HandleId,
        status: ConfigStatus,
    ) {
        info!(target: "ktf::registry", context = name, type_id, handle = %handle, state = %status, "Added configurable context");
        self.contexts
            .entry(name.to_string())
            .or_default()
            .push(ConfigurableContext::new(name, type_id, handle, status));
    }

    /// All configurable contexts named `name`
    pub fn find_contexts(&self, name: &str) -> &[ConfigurableContext] {
        self.contexts.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Mutable variant of [`find_contexts`](Self::find_contexts)
    pub fn find_contexts_mut(&mut self, name: &str) -> &mut [ConfigurableContext] {
        match self.contexts.get_mut(name) {
            Some(found) => found.as_mut_slice(),
            None => &mut [],
        }
    }

    /// Context names of `handle`
    pub fn contexts_for_handle(&self, handle: HandleId) -> &[String] {
        self.handle_contexts.get(&handle).map(Vec::as_slice).unwrap_or(&[])
    }

    /// True once any context group has been registered
    pub fn has_context_groups(&self) -> bool {
        !self.handle_contexts.is_empty()
    }
}

/// One set's contribution to the exposed test list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExposedSet<'a> {
    /// Set name
    pub name: &'a str,
    /// Set ordinal
    pub ordinal: usize,
    /// Exposed test names in execution order
    pub test_names: &'a [String],
}

/// Lazy iterator over exposed sets
///
/// Sets that only hold wrappers whose kernel tests never appeared are
/// skipped with a note.
#[derive(Debug)]
pub struct ExposedTests<'a, B> {
    sets: &'a [TestSet<B>],
    position: usize,
}

impl<'a, B> ExposedTests<'a, B> {
    /// Index of the next set to examine
    pub fn position(&self) -> usize {
        self.position
    }
}

impl<'a, B> Iterator for ExposedTests<'a, B> {
    type Item = ExposedSet<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let ts = self.sets.get(self.position)?;
            self.position += 1;
            if ts.is_orphaned() {
                info!(
                    target: "ktf::registry",
                    set = ts.name(),
                    "Note: Skipping test suite which has combined tests with no kernel counterpart"
                );
                continue;
            }
            return Some(ExposedSet {
                name: ts.name(),
                ordinal: ts.ordinal(),
                test_names: ts.test_names(),
            });
        }
    }
}
