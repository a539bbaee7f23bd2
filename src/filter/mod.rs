//! Test selection
//!
//! Decides, before anything runs, what happens to every declared test:
//! run it, record it skipped or todo without running it, or prune it from the
//! run entirely. Modifiers are inherited top-down; `only` anywhere restricts
//! the run to only-marked branches.

use regex::Regex;
use serde::Serialize;
use std::fmt;
use tracing::debug;

use crate::models::Modifiers;
use crate::registry::{Node, SuiteId, SuiteTree, TestId};

/// What the scheduler does with a test
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Disposition {
    Run,
    /// Recorded `skipped`; no body or hook is invoked
    Skip,
    /// Recorded `todo` without running
    Todo,
    /// Excluded by the name filter; produces no record
    Pruned,
}

impl fmt::Display for Disposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Disposition::Run => write!(f, "run"),
            Disposition::Skip => write!(f, "skip"),
            Disposition::Todo => write!(f, "todo"),
            Disposition::Pruned => write!(f, "pruned"),
        }
    }
}

/// Selection policy applied to a tree
#[derive(Clone, Debug)]
pub struct FilterEngine {
    name_filter: Option<Regex>,
    run_todos: bool,
}

impl FilterEngine {
    pub fn new() -> Self {
        Self {
            name_filter: None,
            run_todos: true,
        }
    }

    /// Keep only tests whose fully-qualified name matches `pattern`
    pub fn with_name_filter(mut self, pattern: &str) -> Result<Self, regex::Error> {
        self.name_filter = Some(Regex::new(pattern)?);
        Ok(self)
    }

    /// Whether todo tests that have a body are executed
    pub fn with_run_todos(mut self, run_todos: bool) -> Self {
        self.run_todos = run_todos;
        self
    }

    /// Compute the disposition of every test in `tree`
    pub fn plan(&self, tree: &SuiteTree) -> Plan {
        let mut plan = Plan {
            tests: vec![Disposition::Pruned; tree.test_count()],
            effective: vec![Modifiers::none(); tree.test_count()],
            runnable: vec![0; tree.suite_count()],
            reported: vec![false; tree.suite_count()],
            has_only: false,
        };

        // Pass 1: inherit modifiers and apply the name filter.
        self.inherit(tree, tree.root(), Modifiers::none(), &mut plan);
        let mut surviving = vec![false; tree.test_count()];
        for id in tree.test_ids() {
            surviving[id.0] = match &self.name_filter {
                Some(re) => re.is_match(&tree.full_name(id)),
                None => true,
            };
        }

        // `only` counts only where it can still select something.
        plan.has_only = tree
            .test_ids()
            .any(|id| surviving[id.0] && plan.effective[id.0].only);

        // Pass 2: dispositions.
        for id in tree.test_ids() {
            plan.tests[id.0] = self.dispose(tree, id, surviving[id.0], &plan);
        }

        // Pass 3: roll counts up to suites.
        Self::roll_up(tree, tree.root(), &mut plan);

        debug!(
            "selection: {} to run, {} reported, only={}",
            plan.count(Disposition::Run),
            tree.test_count() - plan.count(Disposition::Pruned),
            plan.has_only
        );
        plan
    }

    fn inherit(&self, tree: &SuiteTree, suite: SuiteId, inherited: Modifiers, plan: &mut Plan) {
        let here = inherited.union(tree.suite(suite).modifiers());
        for node in tree.suite(suite).children() {
            match *node {
                Node::Test(id) => plan.effective[id.0] = tree.test(id).modifiers().union(here),
                Node::Suite(child) => self.inherit(tree, child, here, plan),
            }
        }
    }

    fn dispose(&self, tree: &SuiteTree, id: TestId, surviving: bool, plan: &Plan) -> Disposition {
        let modifiers = plan.effective[id.0];
        if !surviving {
            Disposition::Pruned
        } else if modifiers.skip || (plan.has_only && !modifiers.only) {
            Disposition::Skip
        } else if modifiers.todo && (tree.test(id).body().is_none() || !self.run_todos) {
            Disposition::Todo
        } else {
            Disposition::Run
        }
    }

    fn roll_up(tree: &SuiteTree, suite: SuiteId, plan: &mut Plan) {
        let mut runnable = 0;
        let mut reported = false;
        for node in tree.suite(suite).children() {
            match *node {
                Node::Test(id) => {
                    let disposition = plan.tests[id.0];
                    runnable += usize::from(disposition == Disposition::Run);
                    reported |= disposition != Disposition::Pruned;
                }
                Node::Suite(child) => {
                    Self::roll_up(tree, child, plan);
                    runnable += plan.runnable[child.0];
                    reported |= plan.reported[child.0];
                }
            }
        }
        plan.runnable[suite.0] = runnable;
        plan.reported[suite.0] = reported;
    }
}

impl Default for FilterEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-node selection computed by [`FilterEngine::plan`]
#[derive(Clone, Debug)]
pub struct Plan {
    tests: Vec<Disposition>,
    effective: Vec<Modifiers>,
    runnable: Vec<usize>,
    reported: Vec<bool>,
    has_only: bool,
}

impl Plan {
    pub fn disposition(&self, id: TestId) -> Disposition {
        self.tests[id.0]
    }

    /// The test's own modifiers merged with everything it inherits
    pub fn effective_modifiers(&self, id: TestId) -> Modifiers {
        self.effective[id.0]
    }

    /// Number of tests under `suite` that will actually run
    pub fn runnable_in(&self, suite: SuiteId) -> usize {
        self.runnable[suite.0]
    }

    /// Whether anything under `suite` survived the name filter
    pub fn is_reported(&self, suite: SuiteId) -> bool {
        self.reported[suite.0]
    }

    /// Whether a node will invoke any body
    pub fn selectable(&self, node: Node) -> bool {
        match node {
            Node::Test(id) => self.disposition(id) == Disposition::Run,
            Node::Suite(id) => self.runnable_in(id) > 0,
        }
    }

    pub fn has_only(&self) -> bool {
        self.has_only
    }

    pub fn count(&self, disposition: Disposition) -> usize {
        self.tests.iter().filter(|d| **d == disposition).count()
    }
}
