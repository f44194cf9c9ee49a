//! Runtime configuration.
//!
//! Every field has a default, so an empty file or an empty environment
//! yields a working configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use crate::errors::PlanforgeError;
use crate::pipeline::RetryPolicy;

/// Prefix of every environment variable read by [`PlanforgeConfig::from_env`].
pub const ENV_PREFIX: &str = "PLANFORGE_";

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogConfig {
    /// Default filter directive, overridden by `RUST_LOG`.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Emit JSON lines instead of human-readable text.
    #[serde(default)]
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanforgeConfig {
    /// Default retry policy for generation calls.
    #[serde(default)]
    pub retry: RetryPolicy,
    /// Time budget for one generation call.
    #[serde(default = "default_step_timeout_ms")]
    pub step_timeout_ms: u64,
    /// How long a job stays registered after creation.
    #[serde(default = "default_job_retention_secs")]
    pub job_retention_secs: u64,
    /// Period of the expired-job sweeper.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
    /// Idle interval after which a stream emits a keep-alive.
    #[serde(default = "default_keepalive_interval_secs")]
    pub keepalive_interval_secs: u64,
    /// Logging.
    #[serde(default)]
    pub log: LogConfig,
}

const fn default_step_timeout_ms() -> u64 {
    120_000
}

const fn default_job_retention_secs() -> u64 {
    30 * 60
}

const fn default_sweep_interval_secs() -> u64 {
    60
}

const fn default_keepalive_interval_secs() -> u64 {
    15
}

impl Default for PlanforgeConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            step_timeout_ms: default_step_timeout_ms(),
            job_retention_secs: default_job_retention_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
            keepalive_interval_secs: default_keepalive_interval_secs(),
            log: LogConfig::default(),
        }
    }
}

impl PlanforgeConfig {
    /// Parses a JSON document.
    pub fn from_json_str(input: &str) -> Result<Self, PlanforgeError> {
        let config: Self = serde_json::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    /// Parses a TOML document.
    pub fn from_toml_str(input: &str) -> Result<Self, PlanforgeError> {
        let config: Self = toml::from_str(input)
            .map_err(|e| PlanforgeError::Config(format!("Invalid TOML: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a file, choosing the format by extension (`.json` or TOML).
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, PlanforgeError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;

        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        if is_json {
            Self::from_json_str(&content)
        } else {
            Self::from_toml_str(&content)
        }
    }

    /// Reads `PLANFORGE_*` variables over the defaults.
    pub fn from_env() -> Result<Self, PlanforgeError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env), reading through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, PlanforgeError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(&format!("{ENV_PREFIX}{name}"));
        let mut config = Self::default();

        if let Some(v) = get("STEP_TIMEOUT_MS") {
            config.step_timeout_ms = parse_var("STEP_TIMEOUT_MS", &v)?;
        }
        if let Some(v) = get("JOB_RETENTION_SECS") {
            config.job_retention_secs = parse_var("JOB_RETENTION_SECS", &v)?;
        }
        if let Some(v) = get("SWEEP_INTERVAL_SECS") {
            config.sweep_interval_secs = parse_var("SWEEP_INTERVAL_SECS", &v)?;
        }
        if let Some(v) = get("KEEPALIVE_INTERVAL_SECS") {
            config.keepalive_interval_secs = parse_var("KEEPALIVE_INTERVAL_SECS", &v)?;
        }
        if let Some(v) = get("MAX_RETRIES") {
            config.retry.max_retries = parse_var("MAX_RETRIES", &v)?;
        }
        if let Some(v) = get("INITIAL_DELAY_MS") {
            config.retry.initial_delay_ms = parse_var("INITIAL_DELAY_MS", &v)?;
        }
        if let Some(v) = get("MAX_DELAY_MS") {
            config.retry.max_delay_ms = parse_var("MAX_DELAY_MS", &v)?;
        }
        if let Some(v) = get("BACKOFF_MULTIPLIER") {
            config.retry.backoff_multiplier = parse_var("BACKOFF_MULTIPLIER", &v)?;
        }
        if let Some(v) = get("RETRY_JITTER") {
            config.retry.jitter = parse_var("RETRY_JITTER", &v)?;
        }
        if let Some(v) = get("LOG_LEVEL") {
            config.log.level = v;
        }
        if let Some(v) = get("LOG_JSON") {
            config.log.json = parse_var("LOG_JSON", &v)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Rejects values the runtime cannot work with.
    pub fn validate(&self) -> Result<(), PlanforgeError> {
        if self.step_timeout_ms == 0 {
            return Err(PlanforgeError::Config("step_timeout_ms must be positive".into()));
        }
        if self.job_retention_secs == 0 {
            return Err(PlanforgeError::Config("job_retention_secs must be positive".into()));
        }
        if self.sweep_interval_secs == 0 {
            return Err(PlanforgeError::Config("sweep_interval_secs must be positive".into()));
        }
        if self.keepalive_interval_secs == 0 {
            return Err(PlanforgeError::Config("keepalive_interval_secs must be positive".into()));
        }
        if !self.retry.backoff_multiplier.is_finite() || self.retry.backoff_multiplier < 1.0 {
            return Err(PlanforgeError::Config("retry.backoff_multiplier must be >= 1".into()));
        }
        if self.retry.initial_delay_ms > self.retry.max_delay_ms {
            return Err(PlanforgeError::Config(
                "retry.initial_delay_ms must not exceed retry.max_delay_ms".into(),
            ));
        }
        Ok(())
    }

    /// Per-step timeout.
    #[must_use]
    pub const fn step_timeout(&self) -> Duration {
        Duration::from_millis(self.step_timeout_ms)
    }

    /// Job retention window.
    #[must_use]
    pub const fn job_retention(&self) -> Duration {
        Duration::from_secs(self.job_retention_secs)
    }

    /// Sweeper period.
    #[must_use]
    pub const fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    /// Keep-alive interval.
    #[must_use]
    pub const fn keepalive_interval(&self) -> Duration {
        Duration::from_secs(self.keepalive_interval_secs)
    }
}

fn parse_var<T: FromStr>(name: &str, value: &str) -> Result<T, PlanforgeError> {
    value.trim().parse().map_err(|_| {
        PlanforgeError::Config(format!("Invalid value for {ENV_PREFIX}{name}: '{value}'"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = PlanforgeConfig::default();
        assert_eq!(config.step_timeout(), Duration::from_secs(120));
        assert_eq!(config.job_retention(), Duration::from_secs(1800));
        assert_eq!(config.keepalive_interval(), Duration::from_secs(15));
        assert_eq!(config.retry, RetryPolicy::default());
        assert_eq!(config.log.level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_json_partial() {
        let config = PlanforgeConfig::from_json_str(
            r#"{"step_timeout_ms": 5000, "retry": {"max_retries": 4, "jitter": false}}"#,
        )
        .unwrap();

        assert_eq!(config.step_timeout_ms, 5000);
        assert_eq!(config.retry.max_retries, 4);
        assert!(!config.retry.jitter);
        assert_eq!(config.retry.initial_delay_ms, 1000);
        assert_eq!(config.job_retention_secs, 1800);
    }

    #[test]
    fn test_from_toml_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "keepalive_interval_secs = 5\n\n[log]\nlevel = \"debug\"\njson = true\n\n[retry]\nmax_delay_ms = 2000"
        )
        .unwrap();

        let config = PlanforgeConfig::from_file(file.path()).unwrap();

        assert_eq!(config.keepalive_interval_secs, 5);
        assert_eq!(config.log, LogConfig { level: "debug".to_string(), json: true });
        assert_eq!(config.retry.max_delay_ms, 2000);
    }

    #[test]
    fn test_from_json_file() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, r#"{{"job_retention_secs": 60}}"#).unwrap();

        let config = PlanforgeConfig::from_file(file.path()).unwrap();
        assert_eq!(config.job_retention_secs, 60);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = PlanforgeConfig::from_file("/nonexistent/planforge.toml").unwrap_err();
        assert!(matches!(err, PlanforgeError::Io(_)));
    }

    #[test]
    fn test_from_lookup() {
        let vars: HashMap<&str, &str> = [
            ("PLANFORGE_MAX_RETRIES", "5"),
            ("PLANFORGE_RETRY_JITTER", "false"),
            ("PLANFORGE_LOG_LEVEL", "planforge=debug"),
        ]
        .into_iter()
        .collect();

        let config =
            PlanforgeConfig::from_lookup(|key| vars.get(key).map(|v| (*v).to_string())).unwrap();

        assert_eq!(config.retry.max_retries, 5);
        assert!(!config.retry.jitter);
        assert_eq!(config.log.level, "planforge=debug");
        assert_eq!(config.step_timeout_ms, 120_000);
    }

    #[test]
    fn test_from_lookup_rejects_garbage() {
        let err = PlanforgeConfig::from_lookup(|key| {
            (key == "PLANFORGE_STEP_TIMEOUT_MS").then(|| "soon".to_string())
        })
        .unwrap_err();

        assert_eq!(
            err.to_string(),
            "Configuration error: Invalid value for PLANFORGE_STEP_TIMEOUT_MS: 'soon'"
        );
    }

    #[test]
    fn test_validate_rejects_bad_retry() {
        let mut config = PlanforgeConfig::default();
        config.retry.backoff_multiplier = 0.5;
        assert!(config.validate().is_err());

        let mut config = PlanforgeConfig::default();
        config.retry.initial_delay_ms = 20_000;
        assert!(config.validate().is_err());

        let mut config = PlanforgeConfig::default();
        config.keepalive_interval_secs = 0;
        assert!(config.validate().is_err());
    }
}
