//! Test and hook bodies
//!
//! A body is written in one of three calling conventions: a plain function,
//! a future, or a callback that receives a [`Done`] handle. [`Task::invoke`]
//! adapts all three to a single [`Completion`] so the scheduler never has to
//! care which one it is running.

mod done;

pub use done::Done;

use futures::future::{FutureExt, LocalBoxFuture};
use std::fmt;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;
use tracing::debug;

use crate::models::{RunIssue, TestError};
use crate::results::IssueSink;

/// What a body returns: `Ok(())` to pass, any error to fail
pub type BodyResult = anyhow::Result<()>;

/// A test or hook body in one of the supported calling conventions
#[derive(Clone)]
pub enum Task {
    Sync(Rc<dyn Fn() -> BodyResult>),
    Future(Rc<dyn Fn() -> LocalBoxFuture<'static, BodyResult>>),
    Callback(Rc<dyn Fn(Done)>),
}

/// Calling convention of a [`Task`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TaskKind {
    Sync,
    Future,
    Callback,
}

impl Task {
    pub fn sync<F>(f: F) -> Self
    where
        F: Fn() -> BodyResult + 'static,
    {
        Task::Sync(Rc::new(f))
    }

    pub fn future<F, Fut>(f: F) -> Self
    where
        F: Fn() -> Fut + 'static,
        Fut: Future<Output = BodyResult> + 'static,
    {
        Task::Future(Rc::new(move || f().boxed_local()))
    }

    pub fn callback<F>(f: F) -> Self
    where
        F: Fn(Done) + 'static,
    {
        Task::Callback(Rc::new(f))
    }

    /// A body that does nothing and passes
    pub fn noop() -> Self {
        Task::sync(|| Ok(()))
    }

    pub fn kind(&self) -> TaskKind {
        match self {
            Task::Sync(_) => TaskKind::Sync,
            Task::Future(_) => TaskKind::Future,
            Task::Callback(_) => TaskKind::Callback,
        }
    }

    /// Start the body and return its completion signal
    ///
    /// Synchronous bodies run to completion here. Future bodies are created
    /// but not polled. Callback bodies are called with a fresh [`Done`].
    /// `scope` names the test or hook and is attached to run-level issues
    /// raised by a misbehaving `Done`.
    pub fn invoke(&self, sink: &IssueSink, scope: &[String]) -> Completion {
        match self {
            Task::Sync(f) => {
                let result = match panic::catch_unwind(AssertUnwindSafe(|| f())) {
                    Ok(Ok(())) => Ok(()),
                    Ok(Err(err)) => Err(TestError::from_anyhow(err)),
                    Err(payload) => Err(TestError::from_panic(payload)),
                };
                Completion::ready(result)
            }
            Task::Future(f) => match panic::catch_unwind(AssertUnwindSafe(|| f())) {
                Ok(fut) => Completion::pending(
                    AssertUnwindSafe(fut)
                        .catch_unwind()
                        .map(|caught| match caught {
                            Ok(Ok(())) => Ok(()),
                            Ok(Err(err)) => Err(TestError::from_anyhow(err)),
                            Err(payload) => Err(TestError::from_panic(payload)),
                        })
                        .boxed_local(),
                    None,
                ),
                Err(payload) => Completion::ready(Err(TestError::from_panic(payload))),
            },
            Task::Callback(f) => {
                let (done, signal) = Done::new(sink.clone(), scope.to_vec());
                if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| f(done.clone()))) {
                    done.close();
                    return Completion::ready(Err(TestError::from_panic(payload)));
                }
                Completion::pending(signal.boxed_local(), Some(done))
            }
        }
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Task::{:?}", self.kind())
    }
}

/// The single completion signal produced by [`Task::invoke`]
pub struct Completion {
    future: LocalBoxFuture<'static, Result<(), TestError>>,
    done: Option<Done>,
    ready: bool,
}

impl Completion {
    fn ready(result: Result<(), TestError>) -> Self {
        Self {
            future: futures::future::ready(result).boxed_local(),
            done: None,
            ready: true,
        }
    }

    fn pending(future: LocalBoxFuture<'static, Result<(), TestError>>, done: Option<Done>) -> Self {
        Self {
            future,
            done,
            ready: false,
        }
    }

    /// Whether the body already finished during [`Task::invoke`]
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Split into the awaitable part and the remainder needed to abandon it
    pub(crate) fn into_parts(self) -> (LocalBoxFuture<'static, Result<(), TestError>>, Abandon) {
        (self.future, Abandon { done: self.done })
    }

    /// Await the body without any deadline
    pub async fn wait(self) -> Result<(), TestError> {
        self.future.await
    }
}

/// What to do with a body the caller has stopped waiting on
pub(crate) struct Abandon {
    done: Option<Done>,
}

impl Abandon {
    /// Stop waiting on `future` without destroying it
    ///
    /// A callback body's `Done` is closed so any later call is reported as a
    /// run-level issue. A future body keeps running on the local task set;
    /// if it fails later the failure is reported as unattributed.
    pub(crate) fn abandon(
        self,
        future: LocalBoxFuture<'static, Result<(), TestError>>,
        sink: &IssueSink,
        scope: Vec<String>,
    ) {
        if let Some(done) = self.done {
            done.close();
            return;
        }

        let sink = sink.clone();
        tokio::task::spawn_local(async move {
            match future.await {
                Ok(()) => debug!("abandoned body in {:?} completed after its deadline", scope),
                Err(err) => sink.report(RunIssue::new(
                    scope,
                    TestError::unattributed(format!("failed after timing out: {err}")),
                )),
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::bail;

    fn scope() -> Vec<String> {
        vec!["suite".to_string(), "case".to_string()]
    }

    #[test]
    fn test_sync_body_runs_inline() {
        let sink = IssueSink::new();
        let completion = Task::sync(|| Ok(())).invoke(&sink, &scope());
        assert!(completion.is_ready());
    }

    #[tokio::test]
    async fn test_sync_panic_is_assertion_failure() {
        let sink = IssueSink::new();
        let task = Task::sync(|| {
            assert_eq!(1 + 1, 3, "math is broken");
            Ok(())
        });
        let err = task.invoke(&sink, &scope()).wait().await.unwrap_err();
        assert!(matches!(err, TestError::AssertionFailure { .. }));
        assert!(err.to_string().contains("math is broken"));
    }

    #[tokio::test]
    async fn test_future_error_is_thrown() {
        let sink = IssueSink::new();
        let task = Task::future(|| async {
            tokio::task::yield_now().await;
            bail!("socket closed")
        });
        let completion = task.invoke(&sink, &scope());
        assert!(!completion.is_ready());
        assert_eq!(completion.wait().await, Err(TestError::thrown("socket closed")));
    }

    #[tokio::test]
    async fn test_future_panic_after_suspension() {
        let sink = IssueSink::new();
        let task = Task::future(|| async {
            tokio::task::yield_now().await;
            panic!("late assert");
        });
        let err = task.invoke(&sink, &scope()).wait().await.unwrap_err();
        assert_eq!(err, TestError::assertion("late assert"));
    }

    #[tokio::test]
    async fn test_callback_done_with_error() {
        let sink = IssueSink::new();
        let task = Task::callback(|done| done.fail("not connected"));
        let err = task.invoke(&sink, &scope()).wait().await.unwrap_err();
        assert_eq!(
            err,
            TestError::DoneCalledWithError {
                message: "not connected".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_callback_panic_before_done() {
        let sink = IssueSink::new();
        let task = Task::callback(|_done| panic!("exploded"));
        let completion = task.invoke(&sink, &scope());
        assert!(completion.is_ready());
        assert_eq!(completion.wait().await, Err(TestError::assertion("exploded")));
    }

    #[test]
    fn test_kind() {
        assert_eq!(Task::noop().kind(), TaskKind::Sync);
        assert_eq!(Task::callback(|d| d.ok()).kind(), TaskKind::Callback);
        assert_eq!(
            Task::future(|| async { Ok(()) }).kind(),
            TaskKind::Future
        );
    }
}
