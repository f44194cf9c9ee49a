//! Tracing subscriber setup and span timing.

use std::time::Instant;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::LogConfig;
use crate::core::StepId;
use crate::errors::PlanforgeError;

/// Installs the global `tracing` subscriber.
///
/// `RUST_LOG` takes precedence over `config.level`. Fails if a global
/// subscriber is already installed.
pub fn init_tracing(config: &LogConfig) -> Result<(), PlanforgeError> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| PlanforgeError::Config(format!("Invalid log filter '{}': {e}", config.level)))?;

    let result = if config.json {
        fmt().json().with_env_filter(env_filter).try_init()
    } else {
        fmt().with_env_filter(env_filter).with_target(false).try_init()
    };

    result.map_err(|e| PlanforgeError::Internal(format!("Failed to install tracing subscriber: {e}")))
}

/// Span covering one step of one run.
#[must_use]
pub fn step_span(step: StepId, role: &str) -> tracing::Span {
    tracing::info_span!("step", step = step.as_str(), role)
}

/// Simple span timing helper.
#[derive(Debug)]
pub struct SpanTimer {
    start: Instant,
    name: String,
}

impl SpanTimer {
    /// Starts a new span timer.
    #[must_use]
    pub fn start(name: impl Into<String>) -> Self {
        Self {
            start: Instant::now(),
            name: name.into(),
        }
    }

    /// Returns the elapsed time in milliseconds.
    #[must_use]
    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }

    /// Returns the span name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Finishes the span, logs it at debug level and returns the duration.
    #[must_use]
    pub fn finish(self) -> f64 {
        let duration_ms = self.elapsed_ms();
        tracing::debug!(span_name = %self.name, duration_ms, "Span finished");
        duration_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_timer() {
        let timer = SpanTimer::start("requirements");
        assert_eq!(timer.name(), "requirements");
        std::thread::sleep(std::time::Duration::from_millis(5));
        assert!(timer.finish() >= 5.0);
    }

    #[test]
    fn test_invalid_filter_is_config_error() {
        if std::env::var_os("RUST_LOG").is_some() {
            return;
        }
        let config = LogConfig {
            level: "planforge=verbose".to_string(),
            json: false,
        };
        assert!(matches!(init_tracing(&config), Err(PlanforgeError::Config(_))));
    }

    #[test]
    fn test_step_span_is_constructible() {
        let span = step_span(StepId::Security, "Security Engineer");
        let _guard = span.enter();
    }
}
