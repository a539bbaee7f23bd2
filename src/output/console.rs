//! Terminal reporter

use std::io::Write;

use super::{OutputFormat, ResultFormatter};
use crate::models::{RunIssue, RunSummary, TestRecord};
use crate::results::Reporter;

/// Prints results to stdout through a [`ResultFormatter`]
///
/// Streaming formats print each record as it arrives; the others print once
/// the run has finished.
pub struct ConsoleReporter<W: Write = std::io::Stdout> {
    formatter: ResultFormatter,
    out: W,
}

impl ConsoleReporter {
    pub fn stdout(formatter: ResultFormatter) -> Self {
        Self::new(formatter, std::io::stdout())
    }
}

impl<W: Write> ConsoleReporter<W> {
    pub fn new(formatter: ResultFormatter, out: W) -> Self {
        Self { formatter, out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn emit(&mut self, text: &str) {
        if !text.is_empty() {
            let _ = writeln!(self.out, "{}", text.trim_end_matches('\n'));
        }
    }
}

impl<W: Write> Reporter for ConsoleReporter<W> {
    fn on_test(&mut self, record: &TestRecord) {
        if self.formatter.format().is_streaming() {
            let line = self.formatter.format_record(record);
            self.emit(&line);
        }
    }

    fn on_issue(&mut self, issue: &RunIssue) {
        if self.formatter.format().is_streaming() {
            let line = self.formatter.format_issue(issue);
            self.emit(&line);
        }
    }

    fn on_finish(&mut self, summary: &RunSummary) {
        let text = match self.formatter.format() {
            // Records were already streamed line by line.
            OutputFormat::Json => serde_json::json!({
                "event": "finished",
                "exit_code": summary.exit_code(),
                "total": summary.total,
                "passed": summary.passed,
                "failed": summary.failed,
                "skipped": summary.skipped,
                "todo": summary.todo,
                "todo_passed": summary.todo_passed,
                "errors": summary.issues.len(),
                "bailed": summary.bailed,
                "duration_ms": summary.total_duration_ms,
            })
            .to_string(),
            _ => self.formatter.format_summary(summary),
        };
        self.emit(&text);
        let _ = self.out.flush();
    }
}
