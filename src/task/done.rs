//! Completion handle for callback-style bodies

use std::cell::RefCell;
use std::fmt;
use std::future::Future;
use std::rc::Rc;
use tokio::sync::oneshot;
use tracing::warn;

use crate::models::{RunIssue, TestError};
use crate::results::IssueSink;

/// Handle passed to callback-style bodies
///
/// The first call decides the body's result. Any later call, or a call made
/// after the runner stopped waiting, is reported as a run-level
/// `DoubleCompletion` issue and changes nothing else.
#[derive(Clone)]
pub struct Done {
    state: Rc<RefCell<DoneState>>,
}

struct DoneState {
    sender: Option<oneshot::Sender<Result<(), TestError>>>,
    calls: u32,
    sink: IssueSink,
    scope: Vec<String>,
}

impl Done {
    pub(crate) fn new(
        sink: IssueSink,
        scope: Vec<String>,
    ) -> (Self, impl Future<Output = Result<(), TestError>>) {
        let (tx, rx) = oneshot::channel();
        let done = Self {
            state: Rc::new(RefCell::new(DoneState {
                sender: Some(tx),
                calls: 0,
                sink,
                scope,
            })),
        };

        let signal = async move {
            match rx.await {
                Ok(result) => result,
                // Every handle was dropped without a call; only the deadline can end this.
                Err(_) => futures::future::pending().await,
            }
        };

        (done, signal)
    }

    /// Signal success
    pub fn ok(&self) {
        self.complete(Ok(()));
    }

    /// Signal failure with the given reason
    pub fn fail(&self, err: impl fmt::Display) {
        self.complete(Err(TestError::DoneCalledWithError {
            message: err.to_string(),
        }));
    }

    /// Signal the result of a fallible operation
    pub fn finish(&self, result: anyhow::Result<()>) {
        match result {
            Ok(()) => self.ok(),
            Err(err) => self.fail(format!("{err:#}")),
        }
    }

    /// Number of times this handle has been called
    pub fn calls(&self) -> u32 {
        self.state.borrow().calls
    }

    fn complete(&self, result: Result<(), TestError>) {
        let mut state = self.state.borrow_mut();
        state.calls += 1;

        match state.sender.take() {
            Some(tx) => {
                let _ = tx.send(result);
            }
            None => {
                warn!(
                    "done() called again ({} calls) for {}",
                    state.calls,
                    state.scope.join(" ")
                );
                let issue = RunIssue::new(
                    state.scope.clone(),
                    TestError::DoubleCompletion { calls: state.calls },
                );
                let sink = state.sink.clone();
                drop(state);
                sink.report(issue);
            }
        }
    }

    /// Stop accepting the result; later calls become issues
    pub(crate) fn close(&self) {
        self.state.borrow_mut().sender.take();
    }
}

impl fmt::Debug for Done {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Done").field("calls", &self.calls()).finish()
    }
}
