//! Run-wide execution state
//!
//! Tracks which test is currently attributable, the active concurrency
//! group, and the bail counter. Only the scheduler mutates it; test code
//! reaches it through [`report_uncaught`].

use std::cell::{Cell, RefCell};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};
use tracing::{error, warn};

use crate::models::{RunIssue, TestError};
use crate::registry::TestId;
use crate::results::IssueSink;

thread_local! {
    static ACTIVE: RefCell<Option<Rc<RunContext>>> = const { RefCell::new(None) };
}

/// Report an error that has no direct causal link to a test body
///
/// Charged to the test being polled when it is called, or to the only test in
/// flight during sequential execution. Otherwise it becomes an
/// `UnattributedError` against the run. Outside a run it is only logged.
pub fn report_uncaught(err: impl fmt::Display) {
    let message = err.to_string();
    let ctx = ACTIVE.with(|active| active.borrow().clone());
    match ctx {
        Some(ctx) => ctx.report_uncaught(message),
        None => error!("uncaught error outside of a run: {}", message),
    }
}

/// Scheduler-owned state for one run
#[derive(Debug)]
pub struct RunContext {
    current: Cell<Option<TestId>>,
    in_flight: RefCell<BTreeSet<TestId>>,
    group: Cell<Option<usize>>,
    next_group: Cell<usize>,
    pending: RefCell<HashMap<TestId, Vec<TestError>>>,
    bail_after: Option<usize>,
    failures: Cell<usize>,
    bailed: Cell<bool>,
    sink: IssueSink,
}

impl RunContext {
    pub fn new(bail_after: Option<u32>, sink: IssueSink) -> Self {
        Self {
            current: Cell::new(None),
            in_flight: RefCell::new(BTreeSet::new()),
            group: Cell::new(None),
            next_group: Cell::new(0),
            pending: RefCell::new(HashMap::new()),
            bail_after: bail_after.filter(|n| *n > 0).map(|n| n as usize),
            failures: Cell::new(0),
            bailed: Cell::new(false),
            sink,
        }
    }

    pub fn sink(&self) -> &IssueSink {
        &self.sink
    }

    /// The test being polled right now, if any
    pub fn current(&self) -> Option<TestId> {
        self.current.get()
    }

    /// The test errors with no causal link are charged to
    pub fn attributable(&self) -> Option<TestId> {
        self.current.get().or_else(|| {
            let in_flight = self.in_flight.borrow();
            match in_flight.len() {
                1 => in_flight.iter().next().copied(),
                _ => None,
            }
        })
    }

    pub(crate) fn begin_test(&self, id: TestId) {
        self.in_flight.borrow_mut().insert(id);
    }

    /// Take `id` out of flight; anything still charged to it becomes a run issue
    pub(crate) fn end_test(&self, id: TestId, scope: &[String]) {
        self.in_flight.borrow_mut().remove(&id);
        let leftover = self.pending.borrow_mut().remove(&id).unwrap_or_default();
        for err in leftover {
            warn!("uncaught error charged to finished test {:?}: {}", id, err);
            self.sink.report(RunIssue::new(scope.to_vec(), err));
        }
    }

    /// Errors reported against `id` since the last call
    pub(crate) fn take_pending(&self, id: TestId) -> Vec<TestError> {
        self.pending.borrow_mut().remove(&id).unwrap_or_default()
    }

    fn report_uncaught(&self, message: String) {
        match self.attributable() {
            Some(id) => {
                warn!("uncaught error charged to {:?}: {}", id, message);
                self.pending
                    .borrow_mut()
                    .entry(id)
                    .or_default()
                    .push(TestError::thrown(message));
            }
            None => self
                .sink
                .report(RunIssue::unscoped(TestError::unattributed(message))),
        }
    }

    /// Open a new concurrency group and return its number
    pub(crate) fn open_group(&self) -> usize {
        let group = self.next_group.get();
        self.next_group.set(group + 1);
        self.group.set(Some(group));
        group
    }

    pub(crate) fn close_group(&self) {
        self.group.set(None);
    }

    pub fn active_group(&self) -> Option<usize> {
        self.group.get()
    }

    /// Count a failing outcome; returns true when this one trips the bail threshold
    pub(crate) fn count_failure(&self) -> bool {
        let failures = self.failures.get() + 1;
        self.failures.set(failures);
        match self.bail_after {
            Some(limit) if failures >= limit && !self.bailed.get() => {
                self.bailed.set(true);
                true
            }
            _ => false,
        }
    }

    pub fn bailed(&self) -> bool {
        self.bailed.get()
    }

    pub fn failures(&self) -> usize {
        self.failures.get()
    }
}

/// Installs a context as the target of [`report_uncaught`] until dropped
pub(crate) struct ActiveGuard {
    previous: Option<Rc<RunContext>>,
}

impl ActiveGuard {
    pub(crate) fn install(ctx: Rc<RunContext>) -> Self {
        let previous = ACTIVE.with(|active| active.replace(Some(ctx)));
        Self { previous }
    }
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        let previous = self.previous.take();
        ACTIVE.with(|active| *active.borrow_mut() = previous);
    }
}

/// Marks `test` as the current test whenever the inner future is polled
pub(crate) struct Attributed<F> {
    ctx: Rc<RunContext>,
    test: TestId,
    inner: Pin<Box<F>>,
}

impl<F: Future> Attributed<F> {
    pub(crate) fn new(ctx: Rc<RunContext>, test: TestId, inner: F) -> Self {
        Self {
            ctx,
            test,
            inner: Box::pin(inner),
        }
    }
}

impl<F: Future> Future for Attributed<F> {
    type Output = F::Output;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = &mut *self;
        let previous = this.ctx.current.replace(Some(this.test));
        let poll = this.inner.as_mut().poll(cx);
        this.ctx.current.set(previous);
        poll
    }
}
