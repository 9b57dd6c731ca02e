// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

/// Errors raised while building or validating the logger configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Unknown log level '{0}'. Must be one of: debug, info, warning, error")]
    InvalidLevel(String),
}

/// Errors returned by the logger lifecycle calls.
///
/// Log calls themselves never fail; these only surface from `shutdown` and
/// queries against a service that has already stopped.
#[derive(Debug, thiserror::Error)]
pub enum LoggerError {
    #[error("Logger service is not running")]
    NotRunning,

    #[error("Logger service dropped the response: {0}")]
    ResponseDropped(String),
}
