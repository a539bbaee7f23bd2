//! CLI argument parsing
//!
//! Defines the command-line interface using clap and the harness entry point
//! that turns a declaration function into a runnable test binary.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, error};

use crate::config::{ConfigFile, EnvConfig, RunConfig};
use crate::executor::TestRunner;
use crate::output::{ConsoleReporter, OutputFormat, ResultFormatter};
use crate::registry::{Registry, SuiteBuilder};
use crate::utils::{init_logger, LogLevel};

/// Run declared test suites
#[derive(Parser, Debug, Default)]
#[command(name = "trialrun")]
#[command(version)]
#[command(about = "Run nested test suites with hooks, timeouts and concurrent tests")]
#[command(long_about = None)]
pub struct Args {
    /// Configuration file (default: ./trialrun.yaml, ~/.config/trialrun/config.yaml)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Only run tests whose "suite path + test name" matches this regex
    #[arg(short = 't', long = "test-name-pattern")]
    pub test_name_pattern: Option<String>,

    /// Stop after N failures (bare flag means 1)
    #[arg(long, num_args = 0..=1, default_missing_value = "1")]
    pub bail: Option<u32>,

    /// Default timeout for tests and hooks, in milliseconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Do not run todo tests, even when they have a body
    #[arg(long)]
    pub no_todo: bool,

    /// Record a passing todo test as todo instead of failing it
    #[arg(long)]
    pub allow_passing_todo: bool,

    /// Run every test N times
    #[arg(long)]
    pub rerun_each: Option<u32>,

    /// Output format (table, json, json-pretty, csv, summary)
    #[arg(short, long)]
    pub format: Option<String>,

    /// Log level (off, error, warn, info, debug, trace)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Print the declared tests and what would happen to each, then exit
    #[arg(long)]
    pub list: bool,
}

impl Args {
    /// Layer command-line flags on top of `config`
    pub fn apply(&self, config: &mut RunConfig) -> Result<()> {
        if let Some(pattern) = &self.test_name_pattern {
            config.name_filter = Some(pattern.clone());
        }
        if let Some(bail) = self.bail {
            config.bail = Some(bail);
        }
        if let Some(timeout) = self.timeout {
            config.default_timeout_ms = timeout;
        }
        if self.no_todo {
            config.run_todos = false;
        }
        if self.allow_passing_todo {
            config.allow_passing_todo = true;
        }
        if let Some(runs) = self.rerun_each {
            config.rerun_each = Some(runs);
        }
        if let Some(format) = &self.format {
            config.format = OutputFormat::from_str(format)
                .ok_or_else(|| anyhow::anyhow!("Unknown output format: {}", format))?;
        }
        if let Some(level) = &self.log_level {
            config.log_level = level.parse::<LogLevel>()?;
        }
        Ok(())
    }
}

/// Build the effective configuration: defaults < file < environment < flags
pub fn resolve_config(args: &Args, env: &EnvConfig) -> Result<RunConfig> {
    let explicit = args
        .config
        .clone()
        .or_else(|| env.config_file.as_ref().map(PathBuf::from));

    let mut config = match explicit {
        Some(path) => ConfigFile::load(&path)?.run,
        None => ConfigFile::load_default()?.run,
    };
    if env.has_any() {
        debug!("Applying TRIALRUN_* environment overrides");
        env.apply(&mut config)?;
    }
    args.apply(&mut config)?;
    config.validate()?;
    Ok(config)
}

/// Parse the process arguments, declare the suites and run them
///
/// Intended as the body of a test binary's `main`:
///
/// ```no_run
/// use trialrun::task::Task;
///
/// fn main() -> std::process::ExitCode {
///     trialrun::cli::main_with(|s| {
///         s.test("adds", Task::sync(|| {
///             assert_eq!(1 + 1, 2);
///             Ok(())
///         }));
///     })
/// }
/// ```
pub fn main_with(declare: impl FnOnce(&mut SuiteBuilder<'_>)) -> ExitCode {
    match run_with(Args::parse(), declare) {
        Ok(0) => ExitCode::SUCCESS,
        Ok(_) => ExitCode::FAILURE,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("error: {:#}", e);
            ExitCode::from(2)
        }
    }
}

/// Run with already-parsed arguments; returns the process exit code
pub fn run_with(args: Args, declare: impl FnOnce(&mut SuiteBuilder<'_>)) -> Result<i32> {
    let config = resolve_config(&args, &EnvConfig::load())?;
    init_logger(config.log_level);
    debug!("Effective configuration: {:?}", config);

    let mut registry = Registry::new();
    registry.declare(declare);
    let tree = registry.finish();

    let mut formatter = ResultFormatter::new(config.format);
    if args.no_color {
        formatter = formatter.no_color();
    }

    let runner = TestRunner::new(config);
    if args.list {
        let plan = runner.plan(&tree)?;
        println!("{}", formatter.format_plan(&tree, &plan));
        return Ok(0);
    }

    let summary = runner
        .with_reporter(ConsoleReporter::stdout(formatter))
        .run_blocking(&tree)
        .context("Test run failed")?;
    Ok(summary.exit_code())
}
