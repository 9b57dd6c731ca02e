// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Defaults for the dispatcher's throttle, buffer and transport.

use std::time::Duration;

/// A repeated (level, message prefix) pair is dropped while it was accepted
/// within this window.
pub const THROTTLE_WINDOW: Duration = Duration::from_millis(5_000);

/// Number of message characters, after the level, that make up a throttle key.
pub const THROTTLE_KEY_PREFIX_CHARS: usize = 100;

/// Buffer length that triggers an immediate dispatch.
pub const MAX_BUFFERED_RECORDS: usize = 20;

/// Minimum spacing between trigger-driven dispatches, and the delay of the
/// deferred dispatch scheduled when neither threshold is reached.
pub const BUFFER_TIME: Duration = Duration::from_millis(1_000);

/// Records of a failed batch kept for the next dispatch (the most recent ones).
pub const REQUEUE_LIMIT: usize = 10;

/// Request timeout for batch submission.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(30_000);

/// Path of the batch ingestion endpoint, relative to the API base URL.
pub const BATCH_PATH: &str = "/log/batch";

/// Default API base URL.
pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8000";

/// Source stamped on records when no route has been set.
pub const FALLBACK_SOURCE: &str = "frontend";

/// Target used for the local console mirror of every log call.
pub const CONSOLE_TARGET: &str = "client_logger::console";
