//! Test run entry point
//!
//! Builds the selection plan from a [`RunConfig`], then drives the scheduler
//! on a single-threaded local task set.

use anyhow::{Context, Result};
use std::rc::Rc;
use std::time::Duration;
use tokio::task::LocalSet;
use tracing::info;

use super::context::{ActiveGuard, RunContext};
use super::scheduler::{ExecSettings, Scheduler};
use crate::config::RunConfig;
use crate::filter::{Disposition, FilterEngine, Plan};
use crate::models::RunSummary;
use crate::registry::SuiteTree;
use crate::results::{IssueSink, Reporter, ResultAggregator};
use crate::timeout::TimeoutController;

/// Runs a declared suite tree under one configuration
pub struct TestRunner {
    config: RunConfig,
    reporters: Vec<Box<dyn Reporter>>,
}

impl TestRunner {
    pub fn new(config: RunConfig) -> Self {
        Self {
            config,
            reporters: Vec::new(),
        }
    }

    /// Stream results to `reporter` as they are produced
    pub fn with_reporter(mut self, reporter: impl Reporter + 'static) -> Self {
        self.reporters.push(Box::new(reporter));
        self
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Selection plan for `tree` under this runner's configuration
    pub fn plan(&self, tree: &SuiteTree) -> Result<Plan> {
        let mut engine = FilterEngine::new().with_run_todos(self.config.run_todos);
        if let Some(pattern) = &self.config.name_filter {
            engine = engine
                .with_name_filter(pattern)
                .with_context(|| format!("Invalid test name pattern '{}'", pattern))?;
        }
        Ok(engine.plan(tree))
    }

    /// Execute every selected test of `tree`
    ///
    /// Must be called from within a tokio runtime; the run itself happens on
    /// a fresh `LocalSet` so bodies need not be `Send`.
    pub async fn run(self, tree: &SuiteTree) -> Result<RunSummary> {
        let plan = self.plan(tree)?;
        info!(
            "Starting run: {} tests declared, {} selected",
            tree.test_count(),
            plan.count(Disposition::Run)
        );

        let sink = IssueSink::new();
        let ctx = Rc::new(RunContext::new(self.config.bail, sink.clone()));
        let timeouts = TimeoutController::new(
            Duration::from_millis(self.config.default_timeout_ms),
            sink,
        );
        let mut results = ResultAggregator::new();
        for reporter in self.reporters {
            results.add_reporter(reporter);
        }
        let settings = ExecSettings {
            allow_passing_todo: self.config.allow_passing_todo,
            rerun_each: self.config.rerun_each,
        };

        let scheduler = Scheduler::new(tree, &plan, timeouts, ctx.clone(), results, settings);
        let results = LocalSet::new()
            .run_until(async {
                let _active = ActiveGuard::install(ctx.clone());
                scheduler.run().await
            })
            .await;

        Ok(results.finish(ctx.bailed()))
    }

    /// Run on a dedicated current-thread runtime
    pub fn run_blocking(self, tree: &SuiteTree) -> Result<RunSummary> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("Failed to build tokio runtime")?;
        runtime.block_on(self.run(tree))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::OutcomeStatus;
    use crate::registry::{Registry, TestOptions};
    use crate::task::Task;

    #[tokio::test]
    async fn test_run_counts_outcomes() {
        let mut registry = Registry::new();
        registry.declare(|s| {
            s.test("passes", Task::noop());
            s.test("fails", Task::sync(|| anyhow::bail!("nope")));
            s.test_with("skipped", TestOptions::new().skip(), Task::noop());
            s.todo("later");
        });
        let tree = registry.finish();

        let summary = TestRunner::new(RunConfig::default()).run(&tree).await.unwrap();
        assert_eq!(summary.total, 4);
        assert_eq!(summary.passed, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.todo, 1);
        assert_eq!(summary.exit_code(), 1);
        assert_eq!(summary.status_of("later"), Some(OutcomeStatus::Todo));
    }

    #[test]
    fn test_invalid_name_filter_fails_the_run() {
        let tree = Registry::new().finish();
        let config = RunConfig {
            name_filter: Some("(".to_string()),
            ..RunConfig::default()
        };
        let err = TestRunner::new(config).run_blocking(&tree).unwrap_err();
        assert!(err.to_string().contains("Invalid test name pattern"));
    }

    #[test]
    fn test_empty_tree_succeeds() {
        let tree = Registry::new().finish();
        let summary = TestRunner::new(RunConfig::default()).run_blocking(&tree).unwrap();
        assert_eq!(summary.total, 0);
        assert_eq!(summary.exit_code(), 0);
    }
}
