//! Test sets

use std::collections::HashMap;

use crate::test::KernelTest;

/// Named group of tests
#[derive(Debug)]
pub struct TestSet<B> {
    name: String,
    ordinal: usize,
    /// Exposed names in discovery order; this is the execution order
    pub(crate) test_names: Vec<String>,
    pub(crate) tests: HashMap<String, KernelTest<B>>,
    /// User bodies waiting for their kernel counterpart
    pub(crate) wrappers: HashMap<String, B>,
    next_test: usize,
}

impl<B> TestSet<B> {
    pub(crate) fn new(name: &str, ordinal: usize) -> Self {
        TestSet {
            name: name.to_string(),
            ordinal,
            test_names: Vec::new(),
            tests: HashMap::new(),
            wrappers: HashMap::new(),
            next_test: 0,
        }
    }

    /// Set name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Ordinal, assigned in first-seen order
    pub fn ordinal(&self) -> usize {
        self.ordinal
    }

    /// Exposed test names in execution order
    pub fn test_names(&self) -> &[String] {
        &self.test_names
    }

    /// Test registered under its short name
    pub fn test(&self, name: &str) -> Option<&KernelTest<B>> {
        self.tests.get(name)
    }

    /// Number of kernel-declared tests
    pub fn test_count(&self) -> usize {
        self.tests.len()
    }

    /// Iterate over kernel-declared tests, in no particular order
    pub fn tests(&self) -> impl Iterator<Item = &KernelTest<B>> {
        self.tests.values()
    }

    /// True if a wrapper for `name` is waiting for its kernel test
    pub fn has_pending_wrapper(&self, name: &str) -> bool {
        self.wrappers.contains_key(name)
    }

    /// Number of wrappers waiting for their kernel test
    pub fn pending_wrappers(&self) -> usize {
        self.wrappers.len()
    }

    /// Only user-declared tests whose kernel side never appeared
    pub fn is_orphaned(&self) -> bool {
        !self.wrappers.is_empty() && self.test_names.is_empty()
    }

    pub(crate) fn next_ordinal(&mut self) -> usize {
        self.next_test += 1;
        self.next_test
    }
}
