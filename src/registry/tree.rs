//! Suite tree
//!
//! Suites, tests and hooks live in flat arenas and refer to each other by id.
//! The tree is built once by the registry and is read-only afterwards.

use std::time::Duration;

use crate::models::{full_name, HookKind, Modifiers};
use crate::task::Task;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SuiteId(pub(crate) usize);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TestId(pub(crate) usize);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HookId(pub(crate) usize);

impl SuiteId {
    pub fn index(&self) -> usize {
        self.0
    }
}

impl TestId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// A child of a suite, in declaration order
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Node {
    Suite(SuiteId),
    Test(TestId),
}

/// A group of tests and sub-suites sharing lifecycle hooks
#[derive(Debug)]
pub struct Suite {
    pub(crate) name: Option<String>,
    pub(crate) parent: Option<SuiteId>,
    pub(crate) children: Vec<Node>,
    pub(crate) before_all: Vec<HookId>,
    pub(crate) after_all: Vec<HookId>,
    pub(crate) before_each: Vec<HookId>,
    pub(crate) after_each: Vec<HookId>,
    pub(crate) modifiers: Modifiers,
}

impl Suite {
    fn new(name: Option<String>, parent: Option<SuiteId>, modifiers: Modifiers) -> Self {
        Self {
            name,
            parent,
            children: Vec::new(),
            before_all: Vec::new(),
            after_all: Vec::new(),
            before_each: Vec::new(),
            after_each: Vec::new(),
            modifiers: modifiers.inheritable(),
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn parent(&self) -> Option<SuiteId> {
        self.parent
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    pub fn modifiers(&self) -> Modifiers {
        self.modifiers
    }

    /// Direct child suites, in declaration order
    pub fn child_suites(&self) -> impl Iterator<Item = SuiteId> + '_ {
        self.children.iter().filter_map(|n| match n {
            Node::Suite(id) => Some(*id),
            Node::Test(_) => None,
        })
    }

    /// Direct tests, in declaration order
    pub fn tests(&self) -> impl Iterator<Item = TestId> + '_ {
        self.children.iter().filter_map(|n| match n {
            Node::Test(id) => Some(*id),
            Node::Suite(_) => None,
        })
    }

    /// Hooks of one kind, in declaration order
    pub fn hooks(&self, kind: HookKind) -> &[HookId] {
        match kind {
            HookKind::BeforeAll => &self.before_all,
            HookKind::AfterAll => &self.after_all,
            HookKind::BeforeEach => &self.before_each,
            HookKind::AfterEach => &self.after_each,
        }
    }
}

/// A single test case
#[derive(Debug)]
pub struct TestCase {
    pub(crate) name: String,
    pub(crate) suite: SuiteId,
    pub(crate) body: Option<Task>,
    pub(crate) modifiers: Modifiers,
    pub(crate) timeout: Option<Duration>,
    pub(crate) repeats: Option<u32>,
    pub(crate) retry: Option<u32>,
}

impl TestCase {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn suite(&self) -> SuiteId {
        self.suite
    }

    pub fn body(&self) -> Option<&Task> {
        self.body.as_ref()
    }

    pub fn modifiers(&self) -> Modifiers {
        self.modifiers
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn repeats(&self) -> Option<u32> {
        self.repeats
    }

    pub fn retry(&self) -> Option<u32> {
        self.retry
    }
}

/// A lifecycle callback scoped to a suite
#[derive(Debug)]
pub struct Hook {
    pub(crate) suite: SuiteId,
    pub(crate) kind: HookKind,
    pub(crate) body: Task,
    pub(crate) timeout: Option<Duration>,
}

impl Hook {
    pub fn suite(&self) -> SuiteId {
        self.suite
    }

    pub fn kind(&self) -> HookKind {
        self.kind
    }

    pub fn body(&self) -> &Task {
        &self.body
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

/// The declared suites, tests and hooks of one run
#[derive(Debug)]
pub struct SuiteTree {
    suites: Vec<Suite>,
    tests: Vec<TestCase>,
    hooks: Vec<Hook>,
}

impl SuiteTree {
    /// A tree holding only the implicit, anonymous root suite
    pub fn new() -> Self {
        Self {
            suites: vec![Suite::new(None, None, Modifiers::none())],
            tests: Vec::new(),
            hooks: Vec::new(),
        }
    }

    pub fn root(&self) -> SuiteId {
        SuiteId(0)
    }

    pub fn suite(&self, id: SuiteId) -> &Suite {
        &self.suites[id.0]
    }

    pub fn test(&self, id: TestId) -> &TestCase {
        &self.tests[id.0]
    }

    pub fn hook(&self, id: HookId) -> &Hook {
        &self.hooks[id.0]
    }

    pub fn suite_count(&self) -> usize {
        self.suites.len()
    }

    pub fn test_count(&self) -> usize {
        self.tests.len()
    }

    pub fn test_ids(&self) -> impl Iterator<Item = TestId> {
        (0..self.tests.len()).map(TestId)
    }

    /// The chain of suites from the root down to `id`, inclusive
    pub fn ancestry(&self, id: SuiteId) -> Vec<SuiteId> {
        let mut chain = vec![id];
        let mut cursor = self.suite(id).parent;
        while let Some(parent) = cursor {
            chain.push(parent);
            cursor = self.suite(parent).parent;
        }
        chain.reverse();
        chain
    }

    /// Whether `ancestor` is `id` or one of its ancestors
    pub fn is_within(&self, id: SuiteId, ancestor: SuiteId) -> bool {
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            if current == ancestor {
                return true;
            }
            cursor = self.suite(current).parent;
        }
        false
    }

    /// Names of the named suites from the root down to `id`
    pub fn suite_path(&self, id: SuiteId) -> Vec<String> {
        self.ancestry(id)
            .into_iter()
            .filter_map(|s| self.suite(s).name.clone())
            .collect()
    }

    /// Suite path of the test followed by the test name
    pub fn test_scope(&self, id: TestId) -> Vec<String> {
        let test = self.test(id);
        let mut scope = self.suite_path(test.suite);
        scope.push(test.name.clone());
        scope
    }

    /// `suitePath + " " + testName`
    pub fn full_name(&self, id: TestId) -> String {
        let test = self.test(id);
        full_name(&self.suite_path(test.suite), &test.name)
    }

    /// Every test under `id`, recursively, in declaration order
    pub fn tests_within(&self, id: SuiteId) -> Vec<TestId> {
        let mut out = Vec::new();
        self.collect_tests(id, &mut out);
        out
    }

    fn collect_tests(&self, id: SuiteId, out: &mut Vec<TestId>) {
        for node in &self.suite(id).children {
            match node {
                Node::Test(t) => out.push(*t),
                Node::Suite(s) => self.collect_tests(*s, out),
            }
        }
    }

    pub(crate) fn add_suite(
        &mut self,
        parent: SuiteId,
        name: Option<String>,
        modifiers: Modifiers,
    ) -> SuiteId {
        let id = SuiteId(self.suites.len());
        self.suites.push(Suite::new(name, Some(parent), modifiers));
        self.suites[parent.0].children.push(Node::Suite(id));
        id
    }

    pub(crate) fn add_test(&mut self, test: TestCase) -> TestId {
        let id = TestId(self.tests.len());
        let suite = test.suite;
        self.tests.push(test);
        self.suites[suite.0].children.push(Node::Test(id));
        id
    }

    pub(crate) fn add_hook(&mut self, hook: Hook) -> HookId {
        let id = HookId(self.hooks.len());
        let suite = &mut self.suites[hook.suite.0];
        match hook.kind {
            HookKind::BeforeAll => suite.before_all.push(id),
            HookKind::AfterAll => suite.after_all.push(id),
            HookKind::BeforeEach => suite.before_each.push(id),
            HookKind::AfterEach => suite.after_each.push(id),
        }
        self.hooks.push(hook);
        id
    }
}

impl Default for SuiteTree {
    fn default() -> Self {
        Self::new()
    }
}
