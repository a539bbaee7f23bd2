//! Output formatters for test results
//!
//! Provides Table, JSON, CSV and summary output formats.

use serde::{Deserialize, Serialize};

use crate::filter::{Disposition, Plan};
use crate::models::{OutcomeStatus, RunIssue, RunSummary, TestRecord};
use crate::registry::{Node, SuiteId, SuiteTree};

/// Output format options
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    JsonPretty,
    Csv,
    Summary,
}

impl OutputFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "table" => Some(OutputFormat::Table),
            "json" => Some(OutputFormat::Json),
            "json-pretty" | "jsonpretty" => Some(OutputFormat::JsonPretty),
            "csv" => Some(OutputFormat::Csv),
            "summary" => Some(OutputFormat::Summary),
            _ => None,
        }
    }

    /// Whether records are printed one by one as they arrive
    pub fn is_streaming(&self) -> bool {
        matches!(
            self,
            OutputFormat::Table | OutputFormat::Json | OutputFormat::Summary
        )
    }
}

#[derive(Serialize)]
struct CsvRow<'a> {
    suite: String,
    test: &'a str,
    status: OutcomeStatus,
    duration_ms: u64,
    attempts: u32,
    error: String,
}

#[derive(Serialize)]
struct PlannedTest {
    name: String,
    disposition: Disposition,
}

/// Result formatter
pub struct ResultFormatter {
    format: OutputFormat,
    colorize: bool,
}

impl ResultFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            colorize: true,
        }
    }

    pub fn no_color(mut self) -> Self {
        self.colorize = false;
        self
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Format a single test record
    pub fn format_record(&self, record: &TestRecord) -> String {
        match self.format {
            OutputFormat::Table => self.format_record_table(record),
            OutputFormat::Json => serde_json::to_string(record).unwrap_or_default(),
            OutputFormat::JsonPretty => serde_json::to_string_pretty(record).unwrap_or_default(),
            OutputFormat::Csv => self.format_records_csv(std::slice::from_ref(record)),
            OutputFormat::Summary => record.to_string(),
        }
    }

    fn status_label(&self, status: OutcomeStatus) -> String {
        let label = format!("{} {}", status.symbol(), status);
        if !self.colorize {
            return label;
        }
        let color = match status {
            OutcomeStatus::Passed => "32",
            OutcomeStatus::Failed | OutcomeStatus::TodoPassed => "31",
            OutcomeStatus::Skipped => "33",
            OutcomeStatus::Todo => "35",
        };
        format!("\x1b[{color}m{label}\x1b[0m")
    }

    fn format_record_table(&self, record: &TestRecord) -> String {
        let mut line = format!(
            "{:16} {} [{:>6}ms]",
            self.status_label(record.status()),
            record.full_name(),
            record.duration_ms
        );
        if record.attempts > 1 {
            line.push_str(&format!(" ({} attempts)", record.attempts));
        }
        if let Some(err) = record.outcome.error() {
            line.push_str(&format!("\n    {}: {}", err.kind_name(), err));
        } else if record.status() == OutcomeStatus::TodoPassed {
            line.push_str("\n    todo test passed; remove the todo modifier");
        }
        line
    }

    /// Format a run-level issue
    pub fn format_issue(&self, issue: &RunIssue) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string(issue).unwrap_or_default(),
            OutputFormat::JsonPretty => serde_json::to_string_pretty(issue).unwrap_or_default(),
            _ if self.colorize => format!("\x1b[31m! {issue}\x1b[0m"),
            _ => format!("! {issue}"),
        }
    }

    /// Records as CSV, with a header row
    pub fn format_records_csv(&self, records: &[TestRecord]) -> String {
        let mut writer = csv::Writer::from_writer(Vec::new());
        for record in records {
            let row = CsvRow {
                suite: record.suite_path.join(" "),
                test: &record.test_name,
                status: record.status(),
                duration_ms: record.duration_ms,
                attempts: record.attempts,
                error: record
                    .outcome
                    .error()
                    .map(|e| e.to_string())
                    .unwrap_or_default(),
            };
            if writer.serialize(row).is_err() {
                return String::new();
            }
        }
        writer
            .into_inner()
            .ok()
            .and_then(|bytes| String::from_utf8(bytes).ok())
            .unwrap_or_default()
    }

    /// Format the run summary
    pub fn format_summary(&self, summary: &RunSummary) -> String {
        match self.format {
            OutputFormat::Table => self.format_summary_table(summary),
            OutputFormat::Json => serde_json::to_string(summary).unwrap_or_default(),
            OutputFormat::JsonPretty => serde_json::to_string_pretty(summary).unwrap_or_default(),
            OutputFormat::Csv => self.format_records_csv(&summary.records),
            OutputFormat::Summary => self.format_summary_brief(summary),
        }
    }

    fn format_summary_table(&self, summary: &RunSummary) -> String {
        let mut output = String::new();

        output.push_str("\n╔══════════════════════════════════════════════════════════════╗\n");
        output.push_str(&format!(
            "║  Run started {:47} ║\n",
            summary.started_at.format("%Y-%m-%d %H:%M:%S UTC").to_string()
        ));
        output.push_str("╠══════════════════════════════════════════════════════════════╣\n");

        let pass_str = if self.colorize {
            format!("\x1b[32m{:3}\x1b[0m", summary.passed)
        } else {
            format!("{:3}", summary.passed)
        };
        let failed = summary.failed + summary.todo_passed;
        let fail_str = if self.colorize && failed > 0 {
            format!("\x1b[31m{:3}\x1b[0m", failed)
        } else {
            format!("{:3}", failed)
        };

        output.push_str(&format!(
            "║  Total: {:3} | Pass: {} | Fail: {} | Skip: {:3} | Todo: {:3}  ║\n",
            summary.total, pass_str, fail_str, summary.skipped, summary.todo
        ));
        output.push_str(&format!(
            "║  Errors: {:3} | Pass Rate: {:5.1}% | Duration: {:8}ms     ║\n",
            summary.issues.len(),
            summary.pass_rate(),
            summary.total_duration_ms
        ));
        if summary.bailed {
            output.push_str("║  Bailed out early: remaining tests were not started        ║\n");
        }
        output.push_str("╚══════════════════════════════════════════════════════════════╝\n");

        output
    }

    fn format_summary_brief(&self, summary: &RunSummary) -> String {
        format!(
            "{} passed, {} failed, {} skipped, {} todo, {} errors ({:.1}%) in {}ms{}",
            summary.passed,
            summary.failed + summary.todo_passed,
            summary.skipped,
            summary.todo,
            summary.issues.len(),
            summary.pass_rate(),
            summary.total_duration_ms,
            if summary.bailed { " [bailed]" } else { "" }
        )
    }

    /// Format the declared tree with what will happen to each test
    pub fn format_plan(&self, tree: &SuiteTree, plan: &Plan) -> String {
        match self.format {
            OutputFormat::Json | OutputFormat::JsonPretty => {
                let tests: Vec<PlannedTest> = tree
                    .test_ids()
                    .filter(|id| plan.disposition(*id) != Disposition::Pruned)
                    .map(|id| PlannedTest {
                        name: tree.full_name(id),
                        disposition: plan.disposition(id),
                    })
                    .collect();
                if self.format == OutputFormat::JsonPretty {
                    serde_json::to_string_pretty(&tests).unwrap_or_default()
                } else {
                    serde_json::to_string(&tests).unwrap_or_default()
                }
            }
            _ => {
                let mut output = String::new();
                self.write_plan_suite(tree, plan, tree.root(), 0, &mut output);
                output.push_str(&format!(
                    "\n{} to run, {} skipped, {} todo\n",
                    plan.count(Disposition::Run),
                    plan.count(Disposition::Skip),
                    plan.count(Disposition::Todo)
                ));
                output
            }
        }
    }

    fn write_plan_suite(
        &self,
        tree: &SuiteTree,
        plan: &Plan,
        suite: SuiteId,
        depth: usize,
        output: &mut String,
    ) {
        for node in tree.suite(suite).children() {
            match *node {
                Node::Suite(child) if plan.is_reported(child) => {
                    let name = tree.suite(child).name();
                    let depth = match name {
                        Some(name) => {
                            output.push_str(&format!("{}{}\n", "  ".repeat(depth), name));
                            depth + 1
                        }
                        None => depth,
                    };
                    self.write_plan_suite(tree, plan, child, depth, output);
                }
                Node::Suite(_) => {}
                Node::Test(id) => {
                    let disposition = plan.disposition(id);
                    if disposition == Disposition::Pruned {
                        continue;
                    }
                    let test = tree.test(id);
                    let modifiers = plan.effective_modifiers(id);
                    output.push_str(&format!(
                        "{}- {} [{}]{}\n",
                        "  ".repeat(depth),
                        test.name(),
                        disposition,
                        if modifiers.is_empty() {
                            String::new()
                        } else {
                            format!(" ({modifiers})")
                        }
                    ));
                }
            }
        }
    }
}

impl Default for ResultFormatter {
    fn default() -> Self {
        Self::new(OutputFormat::Table)
    }
}
