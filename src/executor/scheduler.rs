//! Suite tree walker
//!
//! Each suite moves through `Pending -> Entering -> Running -> Exiting -> Done`
//! and each test through `Pending -> Entering -> Running -> Exiting -> Done`.
//! Sibling tests run one full cycle at a time, except that consecutive
//! concurrent tests are started together and awaited as a batch.

use futures::future::{join_all, FutureExt, LocalBoxFuture};
use std::cell::RefCell;
use std::rc::Rc;
use tracing::{debug, info, warn};

use super::context::{Attributed, RunContext};
use crate::filter::{Disposition, Plan};
use crate::hooks::{HookManager, Phase};
use crate::models::{Modifiers, Outcome, RunIssue, TestError, TestRecord};
use crate::registry::{Node, SuiteId, SuiteTree, TestId};
use crate::results::ResultAggregator;
use crate::timeout::TimeoutController;
use crate::utils::Timer;

/// Lifecycle of a suite during a run
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SuitePhase {
    Pending,
    /// beforeAll hooks in progress
    Entering,
    /// beforeAll done; `failure` holds its error, if any
    Running { failure: Option<TestError> },
    /// afterAll hooks in progress
    Exiting,
    Done,
}

/// Outcome interpretation switches
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ExecSettings {
    /// Record a cleanly completing todo body as `todo` instead of `todo_passed`
    pub allow_passing_todo: bool,
    /// Repeat count for tests that do not set their own
    pub rerun_each: Option<u32>,
}

/// Walks a suite tree and drives hooks, bodies and deadlines
pub struct Scheduler<'r> {
    tree: &'r SuiteTree,
    plan: &'r Plan,
    hooks: HookManager<'r>,
    timeouts: TimeoutController,
    ctx: Rc<RunContext>,
    results: RefCell<ResultAggregator>,
    suites: RefCell<Vec<SuitePhase>>,
    settings: ExecSettings,
}

impl<'r> Scheduler<'r> {
    pub fn new(
        tree: &'r SuiteTree,
        plan: &'r Plan,
        timeouts: TimeoutController,
        ctx: Rc<RunContext>,
        results: ResultAggregator,
        settings: ExecSettings,
    ) -> Self {
        Self {
            tree,
            plan,
            hooks: HookManager::new(tree),
            timeouts,
            ctx,
            results: RefCell::new(results),
            suites: RefCell::new(vec![SuitePhase::Pending; tree.suite_count()]),
            settings,
        }
    }

    /// Run the whole tree and hand back the aggregator
    pub async fn run(self) -> ResultAggregator {
        self.run_suite(self.tree.root()).await;
        self.absorb_issues();
        self.results.into_inner()
    }

    pub fn suite_phase(&self, id: SuiteId) -> SuitePhase {
        self.suites.borrow()[id.index()].clone()
    }

    fn set_phase(&self, id: SuiteId, phase: SuitePhase) {
        self.suites.borrow_mut()[id.index()] = phase;
    }

    fn run_suite(&self, id: SuiteId) -> LocalBoxFuture<'_, ()> {
        async move {
            if !self.plan.is_reported(id) || self.ctx.bailed() {
                return;
            }
            if self.plan.runnable_in(id) == 0 {
                // Nothing runs: record without touching any hook.
                for test in self.tree.tests_within(id) {
                    self.record_unexecuted(test);
                }
                self.set_phase(id, SuitePhase::Done);
                return;
            }

            let children = self.tree.suite(id).children();
            let mut index = 0;
            while index < children.len() && !self.ctx.bailed() {
                match children[index] {
                    Node::Suite(child) => {
                        self.run_suite(child).await;
                        index += 1;
                    }
                    Node::Test(test) if self.is_concurrent(test) => {
                        let mut end = index;
                        while let Some(Node::Test(next)) = children.get(end) {
                            if !self.is_concurrent(*next) {
                                break;
                            }
                            end += 1;
                        }
                        let batch: Vec<TestId> = children[index..end]
                            .iter()
                            .filter_map(|n| match n {
                                Node::Test(t) => Some(*t),
                                Node::Suite(_) => None,
                            })
                            .collect();
                        self.run_batch(id, &batch).await;
                        index = end;
                    }
                    Node::Test(test) => {
                        self.run_test(test).await;
                        index += 1;
                    }
                }
            }

            self.exit_suite(id).await;
        }
        .boxed_local()
    }

    fn is_concurrent(&self, test: TestId) -> bool {
        self.plan.effective_modifiers(test).concurrent
    }

    /// Start every test of a concurrent batch in declaration order, then wait for all
    async fn run_batch(&self, suite: SuiteId, batch: &[TestId]) {
        if batch
            .iter()
            .any(|t| self.plan.disposition(*t) == Disposition::Run)
        {
            // Enter once up front so batch members never race on beforeAll.
            let _ = self.ensure_entered(suite).await;
        }

        let group = self.ctx.open_group();
        debug!("starting concurrent group {} with {} tests", group, batch.len());
        join_all(batch.iter().map(|t| self.run_test(*t))).await;
        self.ctx.close_group();
    }

    /// Run beforeAll for every not-yet-entered suite from the root down to `suite`
    ///
    /// Returns the first beforeAll failure on the chain. Suites below a failed
    /// one are left pending, so their own hooks never run.
    async fn ensure_entered(&self, suite: SuiteId) -> Result<(), TestError> {
        for id in self.tree.ancestry(suite) {
            match self.suite_phase(id) {
                SuitePhase::Running { failure: Some(err) } => return Err(err),
                SuitePhase::Running { failure: None } => continue,
                SuitePhase::Pending => {}
                SuitePhase::Entering | SuitePhase::Exiting | SuitePhase::Done => {
                    warn!("suite {:?} entered while {:?}", id, self.suite_phase(id));
                    continue;
                }
            }

            self.set_phase(id, SuitePhase::Entering);
            let scope = self.tree.suite_path(id);
            debug!("entering suite '{}'", scope.join(" "));

            let chain = self
                .hooks
                .run_chain(
                    &[self.hooks.own(id, Phase::BeforeAllEnter)],
                    Phase::BeforeAllEnter,
                    &self.timeouts,
                    self.ctx.sink(),
                    &scope,
                )
                .await;

            let failure = chain.error;
            self.set_phase(id, SuitePhase::Running { failure: failure.clone() });
            if let Some(err) = failure {
                warn!("beforeAll failed in '{}': {}", scope.join(" "), err);
                return Err(err);
            }
        }
        Ok(())
    }

    /// Run afterAll for an entered suite
    async fn exit_suite(&self, id: SuiteId) {
        if !matches!(self.suite_phase(id), SuitePhase::Running { .. }) {
            self.set_phase(id, SuitePhase::Done);
            return;
        }

        self.set_phase(id, SuitePhase::Exiting);
        let scope = self.tree.suite_path(id);
        let chain = self
            .hooks
            .run_chain(
                &[self.hooks.own(id, Phase::AfterAllExit)],
                Phase::AfterAllExit,
                &self.timeouts,
                self.ctx.sink(),
                &scope,
            )
            .await;

        if let Some(err) = chain.error {
            warn!("afterAll failed in '{}': {}", scope.join(" "), err);
            self.results.borrow_mut().issue(RunIssue::new(scope.clone(), err));
        }
        debug!("leaving suite '{}'", scope.join(" "));
        self.set_phase(id, SuitePhase::Done);
    }

    fn run_test(&self, id: TestId) -> LocalBoxFuture<'_, ()> {
        async move {
            if self.ctx.bailed() {
                debug!("not dispatching '{}' after bail", self.tree.full_name(id));
                return;
            }
            if self.plan.disposition(id) != Disposition::Run {
                self.record_unexecuted(id);
                return;
            }

            let test = self.tree.test(id);
            debug!("running '{}'", self.tree.full_name(id));
            let timer = Timer::start(test.name());

            self.ctx.begin_test(id);
            let (outcome, attempts) =
                Attributed::new(self.ctx.clone(), id, self.execute(id)).await;
            self.ctx.end_test(id, &self.tree.test_scope(id));

            let record = TestRecord::new(self.tree.suite_path(test.suite()), test.name(), outcome)
                .with_duration(timer.stop())
                .with_attempts(attempts);
            self.record(record);
        }
        .boxed_local()
    }

    /// Entering, repetitions and retries of one test
    async fn execute(&self, id: TestId) -> (Outcome, u32) {
        let test = self.tree.test(id);
        if let Err(err) = self.ensure_entered(test.suite()).await {
            return (Outcome::Failed(err), 0);
        }

        let modifiers = self.plan.effective_modifiers(id);
        let runs = test.repeats().or(self.settings.rerun_each).unwrap_or(1).max(1);
        let retries = test.retry().unwrap_or(0);
        let mut attempts = 0;
        let mut outcome = Outcome::Passed;

        for run in 1..=runs {
            for attempt in 0..=retries {
                attempts += 1;
                outcome = self.attempt(id, modifiers).await;
                if !matches!(outcome, Outcome::Failed(_)) {
                    break;
                }
                if attempt < retries {
                    info!(
                        "retrying '{}' ({}/{})",
                        self.tree.full_name(id),
                        attempt + 1,
                        retries
                    );
                }
            }
            if outcome != Outcome::Passed {
                if runs > 1 {
                    debug!("'{}' stopped at run {}/{}", self.tree.full_name(id), run, runs);
                }
                break;
            }
        }

        (outcome, attempts)
    }

    /// One beforeEach / body / afterEach cycle
    ///
    /// Errors passed to `report_uncaught` while the test is attributable fail
    /// an otherwise clean body when collected after it, or a test that still
    /// passed when collected after afterEach. Whatever cannot change the
    /// outcome is kept as a run issue for the test.
    async fn attempt(&self, id: TestId, modifiers: Modifiers) -> Outcome {
        let test = self.tree.test(id);
        let scope = self.tree.test_scope(id);
        let sink = self.ctx.sink();

        // Leftovers from beforeAll or an earlier attempt belong to neither this
        // attempt's body nor its hooks.
        self.report_leftovers(self.ctx.take_pending(id), &scope);

        let before = self.hooks.scoped(test.suite(), Phase::BeforeEachEnter);
        let setup = self
            .hooks
            .run_chain(&before, Phase::BeforeEachEnter, &self.timeouts, sink, &scope)
            .await;

        let body = match (&setup.error, test.body()) {
            (None, Some(body)) => {
                let result = self
                    .timeouts
                    .run_with_deadline(body, test.timeout(), &scope)
                    .await;
                let mut uncaught = self.ctx.take_pending(id).into_iter();
                let result = match result {
                    Ok(()) => uncaught.next().map_or(Ok(()), Err),
                    Err(err) => Err(err),
                };
                self.report_leftovers(uncaught, &scope);
                Some(result)
            }
            _ => None,
        };

        // Tear down only the scopes whose beforeEach chain was entered.
        let after: Vec<_> = self
            .hooks
            .scoped(test.suite(), Phase::AfterEachExit)
            .into_iter()
            .filter(|s| setup.entered.contains(&s.suite))
            .collect();
        let teardown = self
            .hooks
            .run_chain(&after, Phase::AfterEachExit, &self.timeouts, sink, &scope)
            .await;

        let outcome = match (setup.error, body) {
            (Some(err), _) => Outcome::Failed(err),
            (None, Some(result)) => self.interpret(result, modifiers),
            (None, None) => Outcome::Todo,
        };

        let outcome = match (teardown.error, outcome) {
            (Some(err), Outcome::Passed) => Outcome::Failed(err),
            (Some(err), outcome) => {
                sink.report(RunIssue::new(scope.clone(), err));
                outcome
            }
            (None, outcome) => outcome,
        };

        // Reported during beforeEach without a body run, or during afterEach.
        let mut late = self.ctx.take_pending(id).into_iter();
        let outcome = match outcome {
            Outcome::Passed => late.next().map_or(Outcome::Passed, Outcome::Failed),
            outcome => outcome,
        };
        self.report_leftovers(late, &scope);
        outcome
    }

    /// Keep uncaught errors that can no longer change an outcome
    fn report_leftovers(&self, errors: impl IntoIterator<Item = TestError>, scope: &[String]) {
        for err in errors {
            warn!("uncaught error in '{}' kept as a run issue: {}", scope.join(" "), err);
            self.ctx.sink().report(RunIssue::new(scope.to_vec(), err));
        }
    }

    /// Apply `todo` and `failing` semantics to a body result
    fn interpret(&self, result: Result<(), TestError>, modifiers: Modifiers) -> Outcome {
        if modifiers.todo {
            return match result {
                Ok(()) if self.settings.allow_passing_todo => Outcome::Todo,
                Ok(()) => Outcome::TodoPassed,
                Err(_) => Outcome::Todo,
            };
        }
        if modifiers.failing {
            return match result {
                Ok(()) => Outcome::Failed(TestError::assertion(
                    "test is marked as failing but it passed; remove the failing modifier if the behavior now works",
                )),
                Err(_) => Outcome::Passed,
            };
        }
        match result {
            Ok(()) => Outcome::Passed,
            Err(err) => Outcome::Failed(err),
        }
    }

    fn record_unexecuted(&self, id: TestId) {
        let outcome = match self.plan.disposition(id) {
            Disposition::Skip => Outcome::Skipped,
            Disposition::Todo => Outcome::Todo,
            // Runnable tests reach here only when their suite has nothing to run.
            Disposition::Run => Outcome::Skipped,
            Disposition::Pruned => return,
        };
        let test = self.tree.test(id);
        self.record(TestRecord::new(
            self.tree.suite_path(test.suite()),
            test.name(),
            outcome,
        ));
    }

    fn record(&self, record: TestRecord) {
        match &record.outcome {
            Outcome::Failed(err) => info!("✗ {} - {}", record.full_name(), err),
            Outcome::TodoPassed => info!("! {} - todo passed", record.full_name()),
            _ => debug!("{} {}", record.status().symbol(), record.full_name()),
        }

        let is_failure = record.outcome.is_failure();
        self.results.borrow_mut().record(record);
        if is_failure && self.ctx.count_failure() {
            warn!(
                "bailing out after {} failures; no further tests will be started",
                self.ctx.failures()
            );
        }
        self.absorb_issues();
    }

    fn absorb_issues(&self) {
        self.results.borrow_mut().absorb(self.ctx.sink());
    }
}
