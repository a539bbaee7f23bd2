//! Configuration module
//!
//! Handles loading and layering run configuration: built-in defaults, then a
//! config file, then `TRIALRUN_*` environment variables, then CLI flags.

mod env;
mod file;

pub use env::{EnvBuilder, EnvConfig, EnvGuard};
pub use file::ConfigFile;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::output::OutputFormat;
use crate::timeout::DEFAULT_TIMEOUT;
use crate::utils::LogLevel;

/// Settings for one test run
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Deadline for tests and hooks without their own, in milliseconds
    pub default_timeout_ms: u64,

    /// Stop dispatching after this many failing outcomes
    pub bail: Option<u32>,

    /// Regular expression matched against `suitePath testName`
    pub name_filter: Option<String>,

    /// Execute todo tests that have a body
    pub run_todos: bool,

    /// Record a cleanly completing todo body as `todo` rather than a failure
    pub allow_passing_todo: bool,

    /// Default repeat count for tests that do not set one
    pub rerun_each: Option<u32>,

    /// Result output format
    pub format: OutputFormat,

    pub log_level: LogLevel,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            default_timeout_ms: DEFAULT_TIMEOUT.as_millis() as u64,
            bail: None,
            name_filter: None,
            run_todos: true,
            allow_passing_todo: false,
            rerun_each: None,
            format: OutputFormat::Table,
            log_level: LogLevel::default(),
        }
    }
}

impl RunConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn default_timeout(&self) -> Duration {
        Duration::from_millis(self.default_timeout_ms)
    }

    pub fn with_timeout_ms(mut self, ms: u64) -> Self {
        self.default_timeout_ms = ms;
        self
    }

    pub fn with_bail(mut self, bail: u32) -> Self {
        self.bail = Some(bail);
        self
    }

    pub fn with_name_filter(mut self, pattern: impl Into<String>) -> Self {
        self.name_filter = Some(pattern.into());
        self
    }

    pub fn with_run_todos(mut self, run_todos: bool) -> Self {
        self.run_todos = run_todos;
        self
    }

    pub fn with_allow_passing_todo(mut self, allow: bool) -> Self {
        self.allow_passing_todo = allow;
        self
    }

    pub fn with_rerun_each(mut self, runs: u32) -> Self {
        self.rerun_each = Some(runs);
        self
    }

    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    /// Reject settings the scheduler cannot honor
    pub fn validate(&self) -> Result<()> {
        if self.default_timeout_ms == 0 {
            anyhow::bail!("default_timeout_ms must be greater than zero");
        }
        if self.rerun_each == Some(0) {
            anyhow::bail!("rerun_each must be at least 1");
        }
        if let Some(pattern) = &self.name_filter {
            regex::Regex::new(pattern)
                .with_context(|| format!("Invalid test name pattern '{}'", pattern))?;
        }
        Ok(())
    }

    /// Load configuration from file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).context("Failed to read config file")?;

        let config: Self = if is_yaml(path) {
            serde_yaml::from_str(&content).context("Failed to parse YAML config")?
        } else {
            serde_json::from_str(&content).context("Failed to parse JSON config")?
        };

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = if is_yaml(path) {
            serde_yaml::to_string(self).context("Failed to serialize config")?
        } else {
            serde_json::to_string_pretty(self).context("Failed to serialize config")?
        };

        std::fs::write(path, content).context("Failed to write config file")?;
        Ok(())
    }
}

fn is_yaml(path: &Path) -> bool {
    path.extension()
        .map(|e| e == "yaml" || e == "yml")
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = RunConfig::default();
        assert_eq!(config.default_timeout_ms, 5000);
        assert!(config.run_todos);
        assert!(!config.allow_passing_todo);
        assert_eq!(config.bail, None);
        assert_eq!(config.format, OutputFormat::Table);
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config: RunConfig = serde_yaml::from_str("bail: 3\nformat: json\n").unwrap();
        assert_eq!(config.bail, Some(3));
        assert_eq!(config.format, OutputFormat::Json);
        assert_eq!(config.default_timeout_ms, 5000);
        assert!(config.run_todos);
    }

    #[test]
    fn test_save_load_json() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("run.json");

        let config = RunConfig::new()
            .with_timeout_ms(250)
            .with_name_filter("^math")
            .with_rerun_each(2);
        config.save(&path).unwrap();

        assert_eq!(RunConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(RunConfig::new().with_timeout_ms(0).validate().is_err());
        assert!(RunConfig::new().with_rerun_each(0).validate().is_err());
        assert!(RunConfig::new().with_name_filter("[").validate().is_err());
        assert!(RunConfig::new().with_bail(1).validate().is_ok());
    }
}
