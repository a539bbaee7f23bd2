//! Result aggregation

use chrono::{DateTime, Utc};
use tracing::info;

use super::{IssueSink, Reporter};
use crate::models::{RunIssue, RunSummary, TestRecord};
use crate::utils::Timer;

/// Collects records and issues for one run and forwards them to reporters
pub struct ResultAggregator {
    started_at: DateTime<Utc>,
    timer: Timer,
    records: Vec<TestRecord>,
    issues: Vec<RunIssue>,
    failures: usize,
    reporters: Vec<Box<dyn Reporter>>,
}

impl ResultAggregator {
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            timer: Timer::start("run"),
            records: Vec::new(),
            issues: Vec::new(),
            failures: 0,
            reporters: Vec::new(),
        }
    }

    pub fn with_reporter(mut self, reporter: Box<dyn Reporter>) -> Self {
        self.reporters.push(reporter);
        self
    }

    pub fn add_reporter(&mut self, reporter: Box<dyn Reporter>) {
        self.reporters.push(reporter);
    }

    /// Record a test outcome and stream it
    pub fn record(&mut self, record: TestRecord) {
        if record.outcome.is_failure() {
            self.failures += 1;
        }
        for reporter in &mut self.reporters {
            reporter.on_test(&record);
        }
        self.records.push(record);
    }

    /// Record a run-level issue and stream it
    pub fn issue(&mut self, issue: RunIssue) {
        for reporter in &mut self.reporters {
            reporter.on_issue(&issue);
        }
        self.issues.push(issue);
    }

    /// Move every pending issue out of `sink`
    pub fn absorb(&mut self, sink: &IssueSink) {
        for issue in sink.drain() {
            self.issue(issue);
        }
    }

    /// Outcomes counted towards bail: `failed` and `todo-failed-because-passed`
    pub fn failures(&self) -> usize {
        self.failures
    }

    pub fn records(&self) -> &[TestRecord] {
        &self.records
    }

    pub fn finish(mut self, bailed: bool) -> RunSummary {
        let summary = RunSummary::new(
            self.started_at,
            std::mem::take(&mut self.records),
            std::mem::take(&mut self.issues),
            self.timer.elapsed_ms(),
            bailed,
        );

        info!(
            "Run completed in {}ms - Pass: {} | Fail: {} | Skip: {} | Todo: {} | Errors: {}",
            summary.total_duration_ms,
            summary.passed,
            summary.failed + summary.todo_passed,
            summary.skipped,
            summary.todo,
            summary.issues.len()
        );

        for reporter in &mut self.reporters {
            reporter.on_finish(&summary);
        }
        summary
    }
}

impl Default for ResultAggregator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Outcome, TestError};
    use crate::results::{CollectingReporter, RunEvent};

    #[test]
    fn test_failures_count_todo_passed() {
        let mut agg = ResultAggregator::new();
        agg.record(TestRecord::new(Vec::new(), "a", Outcome::Passed));
        agg.record(TestRecord::new(Vec::new(), "b", Outcome::TodoPassed));
        agg.record(TestRecord::new(
            Vec::new(),
            "c",
            Outcome::Failed(TestError::thrown("x")),
        ));
        assert_eq!(agg.failures(), 2);
    }

    #[test]
    fn test_streams_incrementally_and_absorbs_issues() {
        let reporter = CollectingReporter::new();
        let mut agg = ResultAggregator::new().with_reporter(Box::new(reporter.clone()));

        agg.record(TestRecord::new(vec!["s".into()], "first", Outcome::Passed));
        assert_eq!(reporter.test_order(), vec!["s first".to_string()]);

        let sink = IssueSink::new();
        sink.report(RunIssue::unscoped(TestError::unattributed("stray")));
        agg.absorb(&sink);
        assert!(sink.is_empty());

        let summary = agg.finish(false);
        assert_eq!(summary.issues.len(), 1);
        assert_eq!(summary.exit_code(), 1);
        assert!(matches!(
            reporter.events().last(),
            Some(RunEvent::Finished { exit_code: 1, total: 1 })
        ));
    }
}
