// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use client_logger::Logger;
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::notifier::Notifier;

/// Logs a failed API call and tells the user about it.
///
/// The message shown is, in order of preference: `custom_message`, the
/// `message` field of the server's error body, then a per-status default.
pub fn report_api_error(
    logger: &Logger,
    notifier: &dyn Notifier,
    error: &ApiError,
    custom_message: Option<&str>,
    context: Value,
) {
    let custom_message = custom_message.filter(|m| !m.is_empty());
    logger.error(
        "API request error",
        Some(
            json!({
                "message": custom_message.unwrap_or("API request failed"),
                "error": error.to_string(),
                "status": error.status().map(|s| s.as_u16()),
                "context": context,
            })
            .into(),
        ),
    );

    if let Some(message) = custom_message {
        notifier.error(message);
        return;
    }

    let server_message = error
        .body()
        .and_then(|body| body.get("message"))
        .and_then(Value::as_str)
        .filter(|m| !m.is_empty());
    match server_message {
        Some(message) => notifier.error(message),
        None => notifier.error(&error.failure().report_message()),
    }
}
