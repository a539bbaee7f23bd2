//! Outcome and record models
//!
//! Defines the terminal classification of a test, the per-test record emitted
//! on the result stream, and the run summary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::TestError;

/// Terminal classification of a test case
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "error", rename_all = "snake_case")]
pub enum Outcome {
    Passed,
    Failed(TestError),
    Skipped,
    Todo,
    /// A todo test whose body completed cleanly
    TodoPassed,
}

impl Outcome {
    pub fn status(&self) -> OutcomeStatus {
        match self {
            Outcome::Passed => OutcomeStatus::Passed,
            Outcome::Failed(_) => OutcomeStatus::Failed,
            Outcome::Skipped => OutcomeStatus::Skipped,
            Outcome::Todo => OutcomeStatus::Todo,
            Outcome::TodoPassed => OutcomeStatus::TodoPassed,
        }
    }

    pub fn error(&self) -> Option<&TestError> {
        match self {
            Outcome::Failed(err) => Some(err),
            _ => None,
        }
    }

    /// Whether this outcome makes the run fail
    pub fn is_failure(&self) -> bool {
        self.status().is_failure()
    }
}

/// Outcome without its payload, used for counting and display
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    Passed,
    Failed,
    Skipped,
    Todo,
    TodoPassed,
}

impl OutcomeStatus {
    pub fn is_failure(&self) -> bool {
        matches!(self, OutcomeStatus::Failed | OutcomeStatus::TodoPassed)
    }

    /// Get status symbol
    pub fn symbol(&self) -> &'static str {
        match self {
            OutcomeStatus::Passed => "✓",
            OutcomeStatus::Failed => "✗",
            OutcomeStatus::Skipped => "○",
            OutcomeStatus::Todo => "✎",
            OutcomeStatus::TodoPassed => "!",
        }
    }
}

impl fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutcomeStatus::Passed => write!(f, "PASS"),
            OutcomeStatus::Failed => write!(f, "FAIL"),
            OutcomeStatus::Skipped => write!(f, "SKIP"),
            OutcomeStatus::Todo => write!(f, "TODO"),
            OutcomeStatus::TodoPassed => write!(f, "TODO-PASSED"),
        }
    }
}

/// One entry of the result stream
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TestRecord {
    pub suite_path: Vec<String>,
    pub test_name: String,
    pub outcome: Outcome,
    pub duration_ms: u64,
    /// Number of body invocations (repeats and retries included)
    pub attempts: u32,
}

impl TestRecord {
    pub fn new(suite_path: Vec<String>, test_name: impl Into<String>, outcome: Outcome) -> Self {
        Self {
            suite_path,
            test_name: test_name.into(),
            outcome,
            duration_ms: 0,
            attempts: 0,
        }
    }

    pub fn with_duration(mut self, duration_ms: u64) -> Self {
        self.duration_ms = duration_ms;
        self
    }

    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }

    /// `suitePath + " " + testName`
    pub fn full_name(&self) -> String {
        full_name(&self.suite_path, &self.test_name)
    }

    pub fn status(&self) -> OutcomeStatus {
        self.outcome.status()
    }
}

impl fmt::Display for TestRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = self.status();
        write!(
            f,
            "{} {} [{}ms]",
            status.symbol(),
            self.full_name(),
            self.duration_ms
        )?;
        match &self.outcome {
            Outcome::Failed(err) => write!(f, " - {err}"),
            Outcome::TodoPassed => write!(f, " - todo test passed; remove .todo"),
            _ => Ok(()),
        }
    }
}

/// Join a suite path and a test name into the fully-qualified name
pub fn full_name(suite_path: &[String], test_name: &str) -> String {
    if suite_path.is_empty() {
        test_name.to_string()
    } else {
        format!("{} {}", suite_path.join(" "), test_name)
    }
}

/// A run-level error that is not a test outcome
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunIssue {
    /// Suite path (and test name, when known) the error was raised under
    pub scope: Vec<String>,
    pub error: TestError,
}

impl RunIssue {
    pub fn new(scope: Vec<String>, error: TestError) -> Self {
        Self { scope, error }
    }

    pub fn unscoped(error: TestError) -> Self {
        Self::new(Vec::new(), error)
    }
}

impl fmt::Display for RunIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.scope.is_empty() {
            write!(f, "{}: {}", self.error.kind_name(), self.error)
        } else {
            write!(
                f,
                "{} ({}): {}",
                self.error.kind_name(),
                self.scope.join(" "),
                self.error
            )
        }
    }
}

/// Summary of a complete run
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub todo: usize,
    pub todo_passed: usize,
    pub total_duration_ms: u64,
    pub bailed: bool,
    pub records: Vec<TestRecord>,
    pub issues: Vec<RunIssue>,
}

impl RunSummary {
    pub fn new(
        started_at: DateTime<Utc>,
        records: Vec<TestRecord>,
        issues: Vec<RunIssue>,
        total_duration_ms: u64,
        bailed: bool,
    ) -> Self {
        let count = |status: OutcomeStatus| records.iter().filter(|r| r.status() == status).count();

        Self {
            started_at,
            total: records.len(),
            passed: count(OutcomeStatus::Passed),
            failed: count(OutcomeStatus::Failed),
            skipped: count(OutcomeStatus::Skipped),
            todo: count(OutcomeStatus::Todo),
            todo_passed: count(OutcomeStatus::TodoPassed),
            total_duration_ms,
            bailed,
            records,
            issues,
        }
    }

    pub fn pass_rate(&self) -> f64 {
        let executed = self.passed + self.failed + self.todo_passed;
        if executed == 0 {
            0.0
        } else {
            (self.passed as f64 / executed as f64) * 100.0
        }
    }

    pub fn is_success(&self) -> bool {
        self.failed == 0 && self.todo_passed == 0 && self.issues.is_empty()
    }

    /// Process exit code for this run
    pub fn exit_code(&self) -> i32 {
        if self.is_success() {
            0
        } else {
            1
        }
    }

    /// Find a record by its fully-qualified name
    pub fn record(&self, full_name: &str) -> Option<&TestRecord> {
        self.records.iter().find(|r| r.full_name() == full_name)
    }

    /// Status of the record with the given fully-qualified name
    pub fn status_of(&self, full_name: &str) -> Option<OutcomeStatus> {
        self.record(full_name).map(|r| r.status())
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━")?;
        for record in &self.records {
            writeln!(f, "  {record}")?;
        }
        for issue in &self.issues {
            writeln!(f, "  ! {issue}")?;
        }
        writeln!(f, "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━")?;
        writeln!(
            f,
            "Total: {} | Pass: {} | Fail: {} | Skip: {} | Todo: {} | Todo passed: {} | Errors: {}",
            self.total,
            self.passed,
            self.failed,
            self.skipped,
            self.todo,
            self.todo_passed,
            self.issues.len()
        )?;
        write!(
            f,
            "Pass Rate: {:.1}% | Duration: {}ms",
            self.pass_rate(),
            self.total_duration_ms
        )?;
        if self.bailed {
            write!(f, " | bailed out")?;
        }
        writeln!(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, outcome: Outcome) -> TestRecord {
        TestRecord::new(vec!["math".to_string()], name, outcome)
    }

    #[test]
    fn test_full_name_joins_with_spaces() {
        let r = TestRecord::new(vec!["a".into(), "b".into()], "works", Outcome::Passed);
        assert_eq!(r.full_name(), "a b works");
        assert_eq!(full_name(&[], "top"), "top");
    }

    #[test]
    fn test_todo_passed_is_a_failure() {
        assert!(Outcome::TodoPassed.is_failure());
        assert!(!Outcome::Todo.is_failure());
        assert!(!Outcome::Skipped.is_failure());
    }

    #[test]
    fn test_summary_counts() {
        let records = vec![
            record("adds", Outcome::Passed),
            record("divides", Outcome::Failed(TestError::thrown("div by zero"))),
            record("sqrt", Outcome::Skipped),
            record("pow", Outcome::Todo),
        ];

        let summary = RunSummary::new(Utc::now(), records, Vec::new(), 12, false);
        assert_eq!(summary.total, 4);
        assert_eq!(summary.passed, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.todo, 1);
        assert_eq!(summary.exit_code(), 1);
        assert_eq!(summary.status_of("math sqrt"), Some(OutcomeStatus::Skipped));
    }

    #[test]
    fn test_issue_alone_fails_the_run() {
        let summary = RunSummary::new(
            Utc::now(),
            vec![record("adds", Outcome::Passed)],
            vec![RunIssue::unscoped(TestError::unattributed("late"))],
            1,
            false,
        );
        assert!(!summary.is_success());
        assert_eq!(summary.exit_code(), 1);
    }

    #[test]
    fn test_outcome_serialization() {
        let json = serde_json::to_value(Outcome::Failed(TestError::timeout(10))).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["error"]["kind"], "timeout");

        let json = serde_json::to_value(Outcome::TodoPassed).unwrap();
        assert_eq!(json["status"], "todo_passed");
    }
}
