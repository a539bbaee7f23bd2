//! Deadline enforcement
//!
//! Races a body against a timer. When the timer wins the body is reported as
//! timed out and abandoned, not destroyed: a future keeps running on the local
//! task set and a callback body's `Done` stops being listened to.

use futures::future::{self, Either};
use std::time::Duration;
use tracing::warn;

use crate::models::TestError;
use crate::results::IssueSink;
use crate::task::Task;

/// Default per-test deadline
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(5000);

/// Attaches deadlines to running tests and hooks
#[derive(Clone, Debug)]
pub struct TimeoutController {
    default_timeout: Duration,
    sink: IssueSink,
}

impl TimeoutController {
    pub fn new(default_timeout: Duration, sink: IssueSink) -> Self {
        Self {
            default_timeout,
            sink,
        }
    }

    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    /// The deadline that applies given an optional override
    pub fn resolve(&self, timeout: Option<Duration>) -> Duration {
        timeout.unwrap_or(self.default_timeout)
    }

    /// Run `task` until it completes or its deadline passes
    ///
    /// Must be awaited inside a `tokio::task::LocalSet` so a timed-out future
    /// can be moved onto it.
    pub async fn run_with_deadline(
        &self,
        task: &Task,
        timeout: Option<Duration>,
        scope: &[String],
    ) -> Result<(), TestError> {
        let deadline = self.resolve(timeout);
        let completion = task.invoke(&self.sink, scope);
        if completion.is_ready() {
            return completion.wait().await;
        }

        let (body, abandon) = completion.into_parts();
        let timer = Box::pin(tokio::time::sleep(deadline));

        match future::select(body, timer).await {
            Either::Left((result, _)) => result,
            Either::Right(((), body)) => {
                let timeout_ms = deadline.as_millis() as u64;
                warn!("{} timed out after {}ms", scope.join(" "), timeout_ms);
                abandon.abandon(body, &self.sink, scope.to_vec());
                Err(TestError::timeout(timeout_ms))
            }
        }
    }
}

impl Default for TimeoutController {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT, IssueSink::new())
    }
}
