//! Hook resolution and execution
//!
//! Resolves which hooks apply around a test or suite and in which order,
//! and runs a resolved chain under the timeout controller.
//!
//! ## Ordering
//!
//! - `beforeAll` / `beforeEach`: outer suite first, declaration order within a suite
//! - `afterEach` / `afterAll`: inner suite first, declaration order within a suite

use tracing::{debug, warn};

use crate::models::{HookKind, RunIssue, TestError};
use crate::registry::{HookId, SuiteId, SuiteTree};
use crate::results::IssueSink;
use crate::timeout::TimeoutController;

/// Points in the lifecycle at which hooks run
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Phase {
    BeforeAllEnter,
    BeforeEachEnter,
    AfterEachExit,
    AfterAllExit,
}

impl Phase {
    pub fn kind(&self) -> HookKind {
        match self {
            Phase::BeforeAllEnter => HookKind::BeforeAll,
            Phase::BeforeEachEnter => HookKind::BeforeEach,
            Phase::AfterEachExit => HookKind::AfterEach,
            Phase::AfterAllExit => HookKind::AfterAll,
        }
    }

    /// Outer-to-inner for setup phases, inner-to-outer for teardown
    pub fn is_outer_first(&self) -> bool {
        self.kind().is_setup()
    }
}

/// The hooks one suite contributes to a phase
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScopedHooks {
    pub suite: SuiteId,
    pub hooks: Vec<HookId>,
}

/// Result of running a hook chain
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChainOutcome {
    /// Suites whose hooks in this chain were started
    pub entered: Vec<SuiteId>,
    /// First failure, already wrapped as a hook failure
    pub error: Option<TestError>,
}

impl ChainOutcome {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Resolves and runs lifecycle hooks for a suite tree
pub struct HookManager<'t> {
    tree: &'t SuiteTree,
}

impl<'t> HookManager<'t> {
    pub fn new(tree: &'t SuiteTree) -> Self {
        Self { tree }
    }

    /// Ordered hooks applying at `phase` for anything inside `suite`
    pub fn hooks_for(&self, suite: SuiteId, phase: Phase) -> Vec<HookId> {
        self.scoped(suite, phase)
            .into_iter()
            .flat_map(|s| s.hooks)
            .collect()
    }

    /// Like [`hooks_for`](Self::hooks_for), grouped by owning suite
    ///
    /// Every suite on the chain appears, even one without hooks, so callers
    /// can track which scopes a chain has entered.
    pub fn scoped(&self, suite: SuiteId, phase: Phase) -> Vec<ScopedHooks> {
        let mut chain = self.tree.ancestry(suite);
        if !phase.is_outer_first() {
            chain.reverse();
        }
        chain
            .into_iter()
            .map(|id| ScopedHooks {
                suite: id,
                hooks: self.tree.suite(id).hooks(phase.kind()).to_vec(),
            })
            .collect()
    }

    /// The hooks `suite` itself declares for `phase`
    pub fn own(&self, suite: SuiteId, phase: Phase) -> ScopedHooks {
        ScopedHooks {
            suite,
            hooks: self.tree.suite(suite).hooks(phase.kind()).to_vec(),
        }
    }

    /// Run a resolved chain
    ///
    /// Setup phases stop at the first failure; suites after it are not
    /// entered. Teardown phases run every hook; the first failure is
    /// returned and later ones are reported to `sink`.
    pub async fn run_chain(
        &self,
        scopes: &[ScopedHooks],
        phase: Phase,
        timeouts: &TimeoutController,
        sink: &IssueSink,
        scope: &[String],
    ) -> ChainOutcome {
        let kind = phase.kind();
        let mut outcome = ChainOutcome::default();

        for scoped in scopes {
            outcome.entered.push(scoped.suite);

            for &id in &scoped.hooks {
                let hook = self.tree.hook(id);
                let result = timeouts
                    .run_with_deadline(hook.body(), hook.timeout(), scope)
                    .await;

                let Err(err) = result else { continue };
                let err = err.in_hook(kind);
                debug!("{} hook in {:?} failed: {}", kind, scoped.suite, err);

                if kind.is_setup() {
                    outcome.error = Some(err);
                    return outcome;
                }
                if outcome.error.is_none() {
                    outcome.error = Some(err);
                } else {
                    warn!("additional {} failure in {}: {}", kind, scope.join(" "), err);
                    sink.report(RunIssue::new(scope.to_vec(), err));
                }
            }
        }

        outcome
    }
}
