// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::env;
use std::time::Duration;

use crate::constants;
use crate::error::ConfigError;
use crate::record::LevelSet;

/// Deployment environment, deciding which levels cross the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    /// Only warnings and errors are forwarded.
    Development,
    /// Only levels in the production filter are forwarded.
    Production,
}

impl Environment {
    /// `development` selects [`Environment::Development`]; any other mode is
    /// treated as production-like.
    #[must_use]
    pub fn from_mode(mode: &str) -> Self {
        if mode.trim().eq_ignore_ascii_case("development") {
            Environment::Development
        } else {
            Environment::Production
        }
    }
}

/// Configuration for the logger service and its HTTP shipper
#[derive(Debug, Clone)]
pub struct LoggerConfig {
    /// Deployment environment
    pub environment: Environment,
    /// Backend base URL, batches go to `{api_url}/log/batch`
    pub api_url: String,
    /// Levels forwarded in a production-like environment
    pub production_levels: LevelSet,
    /// Whether log calls are honoured at all (console included)
    pub enabled: bool,
    /// Whether records are forwarded to the backend
    pub send_to_backend: bool,
    /// Window during which a repeated (level, message prefix) is dropped
    pub throttle_window: Duration,
    /// Minimum spacing between trigger-driven dispatches and deferred dispatch delay
    pub buffer_time: Duration,
    /// Buffer length that triggers an immediate dispatch
    pub max_buffered_records: usize,
    /// Most recent records of a failed batch kept for the next dispatch
    pub requeue_limit: usize,
    /// Batch submission timeout
    pub timeout: Duration,
    /// Optional bearer token attached to batch submissions
    pub token: Option<String>,
    /// Log level for the local tracing subscriber (e.g., trace, debug, info, warn, error)
    pub log_level: String,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            environment: Environment::Development,
            api_url: constants::DEFAULT_API_URL.to_string(),
            production_levels: LevelSet::warnings_and_errors(),
            enabled: true,
            send_to_backend: true,
            throttle_window: constants::THROTTLE_WINDOW,
            buffer_time: constants::BUFFER_TIME,
            max_buffered_records: constants::MAX_BUFFERED_RECORDS,
            requeue_limit: constants::REQUEUE_LIMIT,
            timeout: constants::DEFAULT_TIMEOUT,
            token: None,
            log_level: "info".to_string(),
        }
    }
}

impl LoggerConfig {
    /// Create configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let environment = env::var("WEBLOG_MODE")
            .map(|mode| Environment::from_mode(&mode))
            .unwrap_or(defaults.environment);
        let api_url = env::var("WEBLOG_API_URL").unwrap_or(defaults.api_url);
        let production_levels = match env::var("WEBLOG_PRODUCTION_LEVELS") {
            Ok(levels) => levels.parse()?,
            Err(_) => defaults.production_levels,
        };
        let enabled = env::var("WEBLOG_ENABLED")
            .map(|val| val.to_lowercase() != "false")
            .unwrap_or(defaults.enabled);
        let send_to_backend = env::var("WEBLOG_SEND_TO_BACKEND")
            .map(|val| val.to_lowercase() != "false")
            .unwrap_or(defaults.send_to_backend);
        let throttle_window =
            millis_from_env("WEBLOG_THROTTLE_MS").unwrap_or(defaults.throttle_window);
        let buffer_time = millis_from_env("WEBLOG_BUFFER_MS").unwrap_or(defaults.buffer_time);
        let requeue_limit = env::var("WEBLOG_REQUEUE_LIMIT")
            .ok()
            .and_then(|val| val.parse::<usize>().ok())
            .unwrap_or(defaults.requeue_limit);
        let timeout = millis_from_env("WEBLOG_TIMEOUT_MS").unwrap_or(defaults.timeout);
        let token = env::var("WEBLOG_TOKEN").ok().filter(|t| !t.trim().is_empty());
        let log_level = env::var("WEBLOG_LOG_LEVEL")
            .map(|val| val.to_lowercase())
            .unwrap_or(defaults.log_level);

        let config = Self {
            environment,
            api_url,
            production_levels,
            enabled,
            send_to_backend,
            throttle_window,
            buffer_time,
            max_buffered_records: defaults.max_buffered_records,
            requeue_limit,
            timeout,
            token,
            log_level,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = self.api_url.trim();
        if url.is_empty() {
            return Err(ConfigError::Invalid("api url cannot be empty".to_string()));
        }
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::Invalid(format!(
                "api url '{url}' must start with http:// or https://"
            )));
        }

        if self.throttle_window.is_zero() || self.buffer_time.is_zero() || self.timeout.is_zero() {
            return Err(ConfigError::Invalid(
                "throttle window, buffer time and timeout must be greater than 0".to_string(),
            ));
        }

        if self.max_buffered_records == 0 {
            return Err(ConfigError::Invalid(
                "max buffered records must be greater than 0".to_string(),
            ));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&self.log_level.as_str()) {
            return Err(ConfigError::Invalid(format!(
                "Invalid log level '{}'. Must be one of: trace, debug, info, warn, error",
                self.log_level
            )));
        }

        Ok(())
    }

    /// Full URL of the batch ingestion endpoint
    #[must_use]
    pub fn batch_url(&self) -> String {
        format!(
            "{}{}",
            self.api_url.trim().trim_end_matches('/'),
            constants::BATCH_PATH
        )
    }
}

fn millis_from_env(key: &str) -> Option<Duration> {
    env::var(key)
        .ok()
        .and_then(|val| val.parse::<u64>().ok())
        .map(Duration::from_millis)
}
