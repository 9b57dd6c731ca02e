// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use reqwest::StatusCode;
use serde_json::Value;

/// Errors returned to callers of [`crate::ApiClient`].
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The server answered with a non-2xx status.
    #[error("Request failed with status {status}")]
    Status { status: StatusCode, body: Value },

    /// The request was sent but no response arrived.
    #[error("No response received: {0}")]
    Network(String),

    /// The request could not be built or was rejected by an interceptor.
    #[error("Request configuration error: {0}")]
    Config(String),

    /// The response body could not be decoded into the requested type.
    #[error("Failed to decode response: {0}")]
    Decode(String),
}

impl ApiError {
    #[must_use]
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Body returned with an error status, if any.
    #[must_use]
    pub fn body(&self) -> Option<&Value> {
        match self {
            ApiError::Status { body, .. } => Some(body),
            _ => None,
        }
    }

    #[must_use]
    pub fn failure(&self) -> HttpFailure {
        match self {
            ApiError::Status { status, .. } => HttpFailure::from_status(*status),
            ApiError::Network(_) => HttpFailure::Network,
            ApiError::Config(message) | ApiError::Decode(message) => {
                HttpFailure::Config(message.clone())
            }
        }
    }
}

/// Classification of a failed request, used to pick the user-facing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HttpFailure {
    BadRequest,
    Unauthorized,
    Forbidden,
    NotFound,
    ServerError,
    OtherStatus(u16),
    Network,
    Config(String),
}

impl HttpFailure {
    #[must_use]
    pub fn from_status(status: StatusCode) -> Self {
        match status.as_u16() {
            400 => HttpFailure::BadRequest,
            401 => HttpFailure::Unauthorized,
            403 => HttpFailure::Forbidden,
            404 => HttpFailure::NotFound,
            500 => HttpFailure::ServerError,
            other => HttpFailure::OtherStatus(other),
        }
    }

    /// Message shown when a response interceptor sees this failure.
    ///
    /// `None` for 401, which asks the user to re-authenticate instead.
    /// 400 has no dedicated message on this path.
    #[must_use]
    pub fn interceptor_message(&self) -> Option<String> {
        match self {
            HttpFailure::Unauthorized => None,
            HttpFailure::Forbidden => {
                Some("You do not have permission to access this resource".to_string())
            }
            HttpFailure::NotFound => Some("The requested resource does not exist".to_string()),
            HttpFailure::ServerError => {
                Some("Internal server error, please try again later".to_string())
            }
            HttpFailure::BadRequest => Some("Request failed: 400".to_string()),
            HttpFailure::OtherStatus(status) => Some(format!("Request failed: {status}")),
            HttpFailure::Network => {
                Some("Network error, please check your network connection".to_string())
            }
            HttpFailure::Config(message) => Some(format!("Request configuration error: {message}")),
        }
    }

    /// Message shown by [`crate::report::report_api_error`] when neither a
    /// custom message nor a server message is available.
    #[must_use]
    pub fn report_message(&self) -> String {
        match self {
            HttpFailure::BadRequest => "Invalid request parameters".to_string(),
            HttpFailure::Unauthorized => "Unauthorized, please log in again".to_string(),
            HttpFailure::Forbidden => "Access denied".to_string(),
            HttpFailure::NotFound => "The requested resource does not exist".to_string(),
            HttpFailure::ServerError => "Internal server error".to_string(),
            HttpFailure::OtherStatus(status) => format!("Request failed: {status}"),
            HttpFailure::Network => "Network error, please check your network connection".to_string(),
            HttpFailure::Config(message) => format!("Request error: {message}"),
        }
    }
}
