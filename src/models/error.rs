//! Test failure taxonomy
//!
//! Every way a test, hook or run can fail is one variant of [`TestError`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::HookKind;

/// Failure reason attached to a failed outcome or a run-level issue
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TestError {
    /// A panic raised inside a body, usually by `assert!` and friends
    #[error("assertion failed: {message}")]
    AssertionFailure { message: String },

    /// The body returned an error
    #[error("{message}")]
    Thrown { message: String },

    #[error("timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("done() called with error: {message}")]
    DoneCalledWithError { message: String },

    /// `done()` was invoked again after the outcome was already decided
    #[error("done() called {calls} times")]
    DoubleCompletion { calls: u32 },

    #[error("{hook} hook failed: {cause}")]
    HookFailure {
        hook: HookKind,
        #[source]
        cause: Box<TestError>,
    },

    /// An error that could not be charged to a running test
    #[error("unhandled error between tests: {message}")]
    Unattributed { message: String },
}

impl TestError {
    pub fn assertion(message: impl Into<String>) -> Self {
        TestError::AssertionFailure {
            message: message.into(),
        }
    }

    pub fn thrown(message: impl Into<String>) -> Self {
        TestError::Thrown {
            message: message.into(),
        }
    }

    pub fn timeout(timeout_ms: u64) -> Self {
        TestError::Timeout { timeout_ms }
    }

    pub fn unattributed(message: impl Into<String>) -> Self {
        TestError::Unattributed {
            message: message.into(),
        }
    }

    /// Wrap this error as having occurred inside a hook of the given kind
    pub fn in_hook(self, hook: HookKind) -> Self {
        TestError::HookFailure {
            hook,
            cause: Box::new(self),
        }
    }

    /// Build an error from a caught panic payload
    pub fn from_panic(payload: Box<dyn std::any::Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "panic with non-string payload".to_string()
        };
        TestError::AssertionFailure { message }
    }

    /// Build an error from a body's `Err` return, keeping the whole context chain
    pub fn from_anyhow(err: anyhow::Error) -> Self {
        TestError::Thrown {
            message: format!("{err:#}"),
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, TestError::Timeout { .. })
    }

    pub fn is_hook_failure(&self) -> bool {
        matches!(self, TestError::HookFailure { .. })
    }

    /// Short machine-friendly name of the variant
    pub fn kind_name(&self) -> &'static str {
        match self {
            TestError::AssertionFailure { .. } => "AssertionFailure",
            TestError::Thrown { .. } => "ThrownError",
            TestError::Timeout { .. } => "TimeoutError",
            TestError::DoneCalledWithError { .. } => "DoneCalledWithError",
            TestError::DoubleCompletion { .. } => "DoubleCompletionError",
            TestError::HookFailure { .. } => "HookFailure",
            TestError::Unattributed { .. } => "UnattributedError",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_message_reports_deadline() {
        assert_eq!(TestError::timeout(10).to_string(), "timed out after 10ms");
    }

    #[test]
    fn test_hook_failure_wraps_cause() {
        let err = TestError::thrown("db down").in_hook(HookKind::BeforeAll);
        assert!(err.is_hook_failure());
        assert_eq!(err.to_string(), "beforeAll hook failed: db down");
        assert_eq!(err.kind_name(), "HookFailure");
    }

    #[test]
    fn test_from_panic_payloads() {
        let err = TestError::from_panic(Box::new("boom"));
        assert_eq!(err, TestError::assertion("boom"));

        let err = TestError::from_panic(Box::new(String::from("left != right")));
        assert_eq!(err, TestError::assertion("left != right"));

        let err = TestError::from_panic(Box::new(42u8));
        assert!(matches!(err, TestError::AssertionFailure { .. }));
    }

    #[test]
    fn test_from_anyhow_keeps_context() {
        let err = anyhow::anyhow!("connection refused").context("opening fixture");
        assert_eq!(
            TestError::from_anyhow(err),
            TestError::thrown("opening fixture: connection refused")
        );
    }

    #[test]
    fn test_serializes_with_kind_tag() {
        let json = serde_json::to_value(TestError::timeout(25)).unwrap();
        assert_eq!(json["kind"], "timeout");
        assert_eq!(json["timeout_ms"], 25);
    }
}
