//! Environment variable configuration
//!
//! Provides environment variable overrides for configuration.

use anyhow::{Context, Result};
use std::env;

use super::RunConfig;
use crate::output::OutputFormat;
use crate::utils::LogLevel;

/// Environment variable prefix
const ENV_PREFIX: &str = "TRIALRUN";

/// Overrides read from `TRIALRUN_*` variables
#[derive(Clone, Debug, Default)]
pub struct EnvConfig {
    /// Default timeout in ms from TRIALRUN_TIMEOUT
    pub timeout: Option<u64>,
    /// Bail threshold from TRIALRUN_BAIL
    pub bail: Option<u32>,
    /// Name filter from TRIALRUN_FILTER
    pub filter: Option<String>,
    /// Run todo bodies from TRIALRUN_TODO
    pub todo: Option<bool>,
    /// From TRIALRUN_ALLOW_PASSING_TODO
    pub allow_passing_todo: Option<bool>,
    /// From TRIALRUN_RERUN_EACH
    pub rerun_each: Option<u32>,
    /// Output format from TRIALRUN_FORMAT
    pub format: Option<String>,
    /// From TRIALRUN_LOG_LEVEL
    pub log_level: Option<String>,
    /// Config file from TRIALRUN_CONFIG
    pub config_file: Option<String>,
}

impl EnvConfig {
    /// Load configuration from environment variables
    pub fn load() -> Self {
        Self {
            timeout: get_env_parse("TIMEOUT"),
            bail: get_env_parse("BAIL"),
            filter: get_env("FILTER"),
            todo: get_env_bool("TODO"),
            allow_passing_todo: get_env_bool("ALLOW_PASSING_TODO"),
            rerun_each: get_env_parse("RERUN_EACH"),
            format: get_env("FORMAT"),
            log_level: get_env("LOG_LEVEL"),
            config_file: get_env("CONFIG"),
        }
    }

    /// Check if any environment variables are set
    pub fn has_any(&self) -> bool {
        self.timeout.is_some()
            || self.bail.is_some()
            || self.filter.is_some()
            || self.todo.is_some()
            || self.allow_passing_todo.is_some()
            || self.rerun_each.is_some()
            || self.format.is_some()
            || self.log_level.is_some()
            || self.config_file.is_some()
    }

    /// Layer these overrides on top of `config`
    pub fn apply(&self, config: &mut RunConfig) -> Result<()> {
        if let Some(timeout) = self.timeout {
            config.default_timeout_ms = timeout;
        }
        if let Some(bail) = self.bail {
            config.bail = Some(bail);
        }
        if let Some(filter) = &self.filter {
            config.name_filter = Some(filter.clone());
        }
        if let Some(todo) = self.todo {
            config.run_todos = todo;
        }
        if let Some(allow) = self.allow_passing_todo {
            config.allow_passing_todo = allow;
        }
        if let Some(runs) = self.rerun_each {
            config.rerun_each = Some(runs);
        }
        if let Some(format) = &self.format {
            config.format = OutputFormat::from_str(format).ok_or_else(|| {
                anyhow::anyhow!("Unknown output format in {ENV_PREFIX}_FORMAT: {}", format)
            })?;
        }
        if let Some(level) = &self.log_level {
            config.log_level = level
                .parse::<LogLevel>()
                .with_context(|| format!("Invalid {ENV_PREFIX}_LOG_LEVEL"))?;
        }
        Ok(())
    }
}

/// Get environment variable with prefix
fn get_env(name: &str) -> Option<String> {
    env::var(format!("{ENV_PREFIX}_{name}")).ok()
}

/// Get environment variable and parse to type
fn get_env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    get_env(name).and_then(|v| v.parse().ok())
}

/// Get environment variable as boolean
fn get_env_bool(name: &str) -> Option<bool> {
    get_env(name).map(|v| {
        matches!(
            v.to_lowercase().as_str(),
            "1" | "true" | "yes" | "on" | "enabled"
        )
    })
}

/// Builder for setting environment variables (useful for testing)
pub struct EnvBuilder {
    vars: Vec<(String, String)>,
}

impl EnvBuilder {
    pub fn new() -> Self {
        Self { vars: Vec::new() }
    }

    fn var(mut self, name: &str, value: impl ToString) -> Self {
        self.vars.push((format!("{ENV_PREFIX}_{name}"), value.to_string()));
        self
    }

    pub fn timeout(self, ms: u64) -> Self {
        self.var("TIMEOUT", ms)
    }

    pub fn bail(self, bail: u32) -> Self {
        self.var("BAIL", bail)
    }

    pub fn filter(self, pattern: impl Into<String>) -> Self {
        self.var("FILTER", pattern.into())
    }

    pub fn todo(self, todo: bool) -> Self {
        self.var("TODO", todo)
    }

    pub fn format(self, format: impl Into<String>) -> Self {
        self.var("FORMAT", format.into())
    }

    /// Apply environment variables
    pub fn apply(self) {
        for (key, value) in self.vars {
            env::set_var(key, value);
        }
    }

    /// Apply and return guard that restores on drop
    pub fn apply_scoped(self) -> EnvGuard {
        let previous: Vec<_> = self
            .vars
            .iter()
            .map(|(k, _)| (k.clone(), env::var(k).ok()))
            .collect();

        self.apply();

        EnvGuard { previous }
    }
}

impl Default for EnvBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Guard that restores environment variables on drop
pub struct EnvGuard {
    previous: Vec<(String, Option<String>)>,
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (key, value) in &self.previous {
            match value {
                Some(v) => env::set_var(key, v),
                None => env::remove_var(key),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_config_default() {
        let config = EnvConfig::default();
        assert!(!config.has_any());
        let mut run = RunConfig::default();
        config.apply(&mut run).unwrap();
        assert_eq!(run, RunConfig::default());
    }

    #[test]
    fn test_env_overrides_apply() {
        let _guard = EnvBuilder::new()
            .timeout(120)
            .bail(1)
            .filter("^db ")
            .todo(false)
            .format("json")
            .apply_scoped();

        let env = EnvConfig::load();
        assert!(env.has_any());

        let mut run = RunConfig::default();
        env.apply(&mut run).unwrap();
        assert_eq!(run.default_timeout_ms, 120);
        assert_eq!(run.bail, Some(1));
        assert_eq!(run.name_filter.as_deref(), Some("^db "));
        assert!(!run.run_todos);
        assert_eq!(run.format, OutputFormat::Json);
    }

    #[test]
    fn test_unknown_format_is_rejected() {
        let env = EnvConfig {
            format: Some("xml".to_string()),
            ..Default::default()
        };
        assert!(env.apply(&mut RunConfig::default()).is_err());
    }
}
