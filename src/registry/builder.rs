//! Declaration API
//!
//! A [`SuiteBuilder`] is threaded through every nested declaration body.
//! Bodies run synchronously, at declaration time, so everything they declare
//! is attached before `describe` returns.

use serde::Serialize;
use std::time::Duration;
use tracing::trace;

use super::each::Each;
use super::tree::{Hook, SuiteId, SuiteTree, TestCase, TestId};
use crate::models::{HookKind, Modifiers};
use crate::task::Task;

/// Builds a [`SuiteTree`] from declarations
#[derive(Debug, Default)]
pub struct Registry {
    tree: SuiteTree,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run a declaration body against the implicit root suite
    ///
    /// May be called several times, e.g. once per test file; declarations
    /// accumulate in call order.
    pub fn declare(&mut self, body: impl FnOnce(&mut SuiteBuilder<'_>)) -> &mut Self {
        let root = self.tree.root();
        let mut builder = SuiteBuilder {
            tree: &mut self.tree,
            current: root,
        };
        body(&mut builder);
        self
    }

    pub fn tree(&self) -> &SuiteTree {
        &self.tree
    }

    pub fn finish(self) -> SuiteTree {
        self.tree
    }
}

/// Per-test options: modifiers plus timeout, repeat and retry overrides
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TestOptions {
    pub modifiers: Modifiers,
    pub timeout: Option<Duration>,
    pub repeats: Option<u32>,
    pub retry: Option<u32>,
}

impl TestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn skip(self) -> Self {
        self.skip_if(true)
    }

    pub fn only(mut self) -> Self {
        self.modifiers = self.modifiers.with_only(true);
        self
    }

    pub fn todo(self) -> Self {
        self.todo_if(true)
    }

    pub fn failing(self) -> Self {
        self.failing_if(true)
    }

    pub fn concurrent(self) -> Self {
        self.concurrent_if(true)
    }

    pub fn skip_if(mut self, condition: bool) -> Self {
        self.modifiers = self.modifiers.with_skip(condition);
        self
    }

    /// Run only when `condition` holds
    pub fn run_if(self, condition: bool) -> Self {
        self.skip_if(!condition)
    }

    pub fn todo_if(mut self, condition: bool) -> Self {
        self.modifiers = self.modifiers.with_todo(condition);
        self
    }

    pub fn failing_if(mut self, condition: bool) -> Self {
        self.modifiers = self.modifiers.with_failing(condition);
        self
    }

    pub fn concurrent_if(mut self, condition: bool) -> Self {
        self.modifiers = self.modifiers.with_concurrent(condition);
        self
    }

    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = self.modifiers.union(modifiers);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn timeout_ms(self, ms: u64) -> Self {
        self.timeout(Duration::from_millis(ms))
    }

    /// Total number of runs; every run must pass
    pub fn repeats(mut self, repeats: u32) -> Self {
        self.repeats = Some(repeats);
        self
    }

    /// Extra attempts after a failed one
    pub fn retry(mut self, retry: u32) -> Self {
        self.retry = Some(retry);
        self
    }
}

impl From<Modifiers> for TestOptions {
    fn from(modifiers: Modifiers) -> Self {
        Self::new().with_modifiers(modifiers)
    }
}

impl From<Duration> for TestOptions {
    fn from(timeout: Duration) -> Self {
        Self::new().timeout(timeout)
    }
}

/// Declares suites, tests and hooks into the currently open suite
pub struct SuiteBuilder<'a> {
    tree: &'a mut SuiteTree,
    current: SuiteId,
}

impl<'a> SuiteBuilder<'a> {
    /// The suite declarations are currently attached to
    pub fn current(&self) -> SuiteId {
        self.current
    }

    pub fn describe(&mut self, name: impl Into<String>, body: impl FnOnce(&mut SuiteBuilder<'_>)) -> SuiteId {
        self.open(Some(name.into()), Modifiers::none(), body)
    }

    pub fn describe_with(
        &mut self,
        name: impl Into<String>,
        modifiers: Modifiers,
        body: impl FnOnce(&mut SuiteBuilder<'_>),
    ) -> SuiteId {
        self.open(Some(name.into()), modifiers, body)
    }

    /// A suite with no name; it groups hooks without adding to test names
    pub fn describe_anonymous(&mut self, body: impl FnOnce(&mut SuiteBuilder<'_>)) -> SuiteId {
        self.open(None, Modifiers::none(), body)
    }

    fn open(
        &mut self,
        name: Option<String>,
        modifiers: Modifiers,
        body: impl FnOnce(&mut SuiteBuilder<'_>),
    ) -> SuiteId {
        let id = self.tree.add_suite(self.current, name, modifiers);
        trace!("declared suite {:?} under {:?}", id, self.current);

        let mut nested = SuiteBuilder {
            tree: &mut *self.tree,
            current: id,
        };
        body(&mut nested);
        id
    }

    pub fn test(&mut self, name: impl Into<String>, body: Task) -> TestId {
        self.test_with(name, TestOptions::new(), body)
    }

    pub fn test_with(
        &mut self,
        name: impl Into<String>,
        options: impl Into<TestOptions>,
        body: Task,
    ) -> TestId {
        self.add_test(name.into(), options.into(), Some(body))
    }

    /// A todo test with no body
    pub fn todo(&mut self, name: impl Into<String>) -> TestId {
        self.add_test(name.into(), TestOptions::new().todo(), None)
    }

    fn add_test(&mut self, name: String, options: TestOptions, body: Option<Task>) -> TestId {
        self.tree.add_test(TestCase {
            name,
            suite: self.current,
            body,
            modifiers: options.modifiers,
            timeout: options.timeout,
            repeats: options.repeats,
            retry: options.retry,
        })
    }

    pub fn before_all(&mut self, body: Task) {
        self.hook(HookKind::BeforeAll, body, None);
    }

    pub fn after_all(&mut self, body: Task) {
        self.hook(HookKind::AfterAll, body, None);
    }

    pub fn before_each(&mut self, body: Task) {
        self.hook(HookKind::BeforeEach, body, None);
    }

    pub fn after_each(&mut self, body: Task) {
        self.hook(HookKind::AfterEach, body, None);
    }

    pub fn before_all_with_timeout(&mut self, body: Task, timeout: Duration) {
        self.hook(HookKind::BeforeAll, body, Some(timeout));
    }

    pub fn after_all_with_timeout(&mut self, body: Task, timeout: Duration) {
        self.hook(HookKind::AfterAll, body, Some(timeout));
    }

    pub fn before_each_with_timeout(&mut self, body: Task, timeout: Duration) {
        self.hook(HookKind::BeforeEach, body, Some(timeout));
    }

    pub fn after_each_with_timeout(&mut self, body: Task, timeout: Duration) {
        self.hook(HookKind::AfterEach, body, Some(timeout));
    }

    pub fn hook(&mut self, kind: HookKind, body: Task, timeout: Option<Duration>) {
        self.tree.add_hook(Hook {
            suite: self.current,
            kind,
            body,
            timeout,
        });
    }

    /// Parameterized declarations, one per row
    pub fn each<T: Serialize>(&mut self, rows: impl IntoIterator<Item = T>) -> Each<'_, 'a, T> {
        Each::new(self, rows.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Node;

    #[test]
    fn test_nested_bodies_attach_before_return() {
        let mut registry = Registry::new();
        registry.declare(|s| {
            s.test("top", Task::noop());
            let outer = s.describe("outer", |s| {
                s.before_each(Task::noop());
                s.test("first", Task::noop());
                s.describe("inner", |s| {
                    s.test("deep", Task::noop());
                });
            });
            assert_eq!(s.current(), s.tree.root());
            assert_eq!(s.tree.tests_within(outer).len(), 2);
        });

        let tree = registry.finish();
        let names: Vec<String> = tree.test_ids().map(|t| tree.full_name(t)).collect();
        assert_eq!(names, vec!["top", "outer first", "outer inner deep"]);
    }

    #[test]
    fn test_declare_accumulates_into_root() {
        let mut registry = Registry::new();
        registry
            .declare(|s| {
                s.test("a", Task::noop());
            })
            .declare(|s| {
                s.test("b", Task::noop());
            });
        let tree = registry.tree();
        assert_eq!(tree.suite(tree.root()).children().len(), 2);
        assert!(matches!(tree.suite(tree.root()).children()[1], Node::Test(_)));
    }

    #[test]
    fn test_options_compose() {
        let opts = TestOptions::new()
            .concurrent()
            .failing()
            .skip_if(false)
            .todo_if(true)
            .timeout_ms(250)
            .repeats(3)
            .retry(1);

        assert!(opts.modifiers.concurrent && opts.modifiers.failing && opts.modifiers.todo);
        assert!(!opts.modifiers.skip);
        assert_eq!(opts.timeout, Some(Duration::from_millis(250)));
        assert_eq!(opts.repeats, Some(3));
        assert_eq!(opts.retry, Some(1));
        assert!(TestOptions::new().run_if(false).modifiers.skip);
    }

    #[test]
    fn test_todo_without_body() {
        let mut registry = Registry::new();
        registry.declare(|s| {
            s.todo("write me");
            s.test_with("bounded", Duration::from_millis(10), Task::noop());
        });
        let tree = registry.finish();
        let todo = tree.test_ids().next().unwrap();
        assert!(tree.test(todo).body().is_none());
        assert!(tree.test(todo).modifiers().todo);

        let bounded = tree.test_ids().nth(1).unwrap();
        assert_eq!(tree.test(bounded).timeout(), Some(Duration::from_millis(10)));
    }

    #[test]
    fn test_hooks_register_on_open_suite() {
        let mut registry = Registry::new();
        registry.declare(|s| {
            s.after_all(Task::noop());
            s.describe("s", |s| {
                s.before_all_with_timeout(Task::noop(), Duration::from_millis(5));
            });
        });
        let tree = registry.finish();
        let root = tree.root();
        assert_eq!(tree.suite(root).hooks(HookKind::AfterAll).len(), 1);

        let s = tree.suite(root).child_suites().next().unwrap();
        let hook = tree.suite(s).hooks(HookKind::BeforeAll)[0];
        assert_eq!(tree.hook(hook).timeout(), Some(Duration::from_millis(5)));
        assert_eq!(tree.hook(hook).suite(), s);
    }
}
