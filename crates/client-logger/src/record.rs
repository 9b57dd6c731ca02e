// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Log record model shipped to the backend.
//!
//! A [`LogRecord`] is stamped with its capture time when it is created, not
//! when it is sent, and its `additional_data` is carried verbatim.
//!
//! On the wire a record looks like:
//! ```json
//! {
//!   "level": "error",
//!   "message": "Upload failed",
//!   "timestamp": "2025-09-05 15:32:00.125",
//!   "source": "/reports/monthly",
//!   "additional_data": {"error": "timeout", "stack": "timeout"}
//! }
//! ```

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::constants::THROTTLE_KEY_PREFIX_CHARS;
use crate::error::ConfigError;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Debug,
    Info,
    Warning,
    Error,
}

impl Level {
    pub const ALL: [Level; 4] = [Level::Debug, Level::Info, Level::Warning, Level::Error];

    /// Lowercase wire name, also used in throttle keys.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warning => "warning",
            Level::Error => "error",
        }
    }

    fn bit(self) -> u8 {
        match self {
            Level::Debug => 1,
            Level::Info => 1 << 1,
            Level::Warning => 1 << 2,
            Level::Error => 1 << 3,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_str().to_uppercase())
    }
}

impl FromStr for Level {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "debug" => Ok(Level::Debug),
            "info" => Ok(Level::Info),
            "warning" | "warn" => Ok(Level::Warning),
            "error" => Ok(Level::Error),
            other => Err(ConfigError::InvalidLevel(other.to_string())),
        }
    }
}

/// Set of levels, stored as a bitmask so it fits in an atomic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LevelSet(u8);

impl LevelSet {
    #[must_use]
    pub const fn empty() -> Self {
        LevelSet(0)
    }

    /// Warning and error, the default production filter.
    #[must_use]
    pub fn warnings_and_errors() -> Self {
        [Level::Error, Level::Warning].into_iter().collect()
    }

    #[must_use]
    pub fn contains(self, level: Level) -> bool {
        self.0 & level.bit() != 0
    }

    pub fn insert(&mut self, level: Level) {
        self.0 |= level.bit();
    }

    #[must_use]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn iter(self) -> impl Iterator<Item = Level> {
        Level::ALL.into_iter().filter(move |l| self.contains(*l))
    }

    pub(crate) fn bits(self) -> u8 {
        self.0
    }

    pub(crate) fn from_bits(bits: u8) -> Self {
        LevelSet(bits & 0b1111)
    }
}

impl FromIterator<Level> for LevelSet {
    fn from_iter<I: IntoIterator<Item = Level>>(iter: I) -> Self {
        let mut set = LevelSet::empty();
        for level in iter {
            set.insert(level);
        }
        set
    }
}

impl FromStr for LevelSet {
    type Err = ConfigError;

    /// Parses a comma separated list such as `error,warning`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(Level::from_str)
            .collect()
    }
}

/// Second argument of an error log call: either an error value, which is
/// normalized to `{error, stack}`, or arbitrary data passed through unchanged.
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorOrData {
    Error { message: String, stack: String },
    Data(Value),
}

impl ErrorOrData {
    /// Builds the error form from a `std::error::Error`, rendering its source
    /// chain as the stack.
    pub fn from_error<E: std::error::Error + ?Sized>(err: &E) -> Self {
        let message = err.to_string();
        let mut stack = message.clone();
        let mut source = err.source();
        while let Some(cause) = source {
            stack.push_str("\n    caused by: ");
            stack.push_str(&cause.to_string());
            source = cause.source();
        }
        ErrorOrData::Error { message, stack }
    }

    #[must_use]
    pub fn into_additional_data(self) -> Value {
        match self {
            ErrorOrData::Error { message, stack } => json!({ "error": message, "stack": stack }),
            ErrorOrData::Data(value) => value,
        }
    }
}

impl From<Value> for ErrorOrData {
    fn from(value: Value) -> Self {
        ErrorOrData::Data(value)
    }
}

impl From<&anyhow::Error> for ErrorOrData {
    fn from(err: &anyhow::Error) -> Self {
        ErrorOrData::Error {
            message: err.to_string(),
            stack: format!("{err:?}"),
        }
    }
}

impl From<anyhow::Error> for ErrorOrData {
    fn from(err: anyhow::Error) -> Self {
        ErrorOrData::from(&err)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    level: Level,
    message: String,
    timestamp: String,
    source: String,
    additional_data: Option<Value>,
}

impl LogRecord {
    /// Creates a record stamped with the current wall-clock time.
    #[must_use]
    pub fn new(
        level: Level,
        message: impl Into<String>,
        source: impl Into<String>,
        additional_data: Option<Value>,
    ) -> Self {
        Self::with_timestamp(level, message, source, additional_data, Utc::now())
    }

    #[must_use]
    pub fn with_timestamp(
        level: Level,
        message: impl Into<String>,
        source: impl Into<String>,
        additional_data: Option<Value>,
        captured_at: DateTime<Utc>,
    ) -> Self {
        LogRecord {
            level,
            message: message.into(),
            timestamp: format_timestamp(captured_at),
            source: source.into(),
            additional_data,
        }
    }

    #[must_use]
    pub fn level(&self) -> Level {
        self.level
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[must_use]
    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    #[must_use]
    pub fn additional_data(&self) -> Option<&Value> {
        self.additional_data.as_ref()
    }

    #[must_use]
    pub fn throttle_key(&self) -> String {
        throttle_key(self.level, &self.message)
    }
}

/// `level:` followed by the first [`THROTTLE_KEY_PREFIX_CHARS`] characters of
/// the message.
#[must_use]
pub fn throttle_key(level: Level, message: &str) -> String {
    let prefix: String = message.chars().take(THROTTLE_KEY_PREFIX_CHARS).collect();
    format!("{}:{prefix}", level.as_str())
}

#[must_use]
pub fn format_timestamp(captured_at: DateTime<Utc>) -> String {
    captured_at.format(TIMESTAMP_FORMAT).to_string()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    #[derive(Debug, thiserror::Error)]
    #[error("connection reset")]
    struct Reset;

    #[derive(Debug, thiserror::Error)]
    #[error("upload failed")]
    struct Upload(#[source] Reset);

    #[test]
    fn test_level_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Level::Warning).unwrap(), "\"warning\"");
        assert_eq!(Level::Error.to_string(), "ERROR");
    }

    #[test]
    fn test_level_parse_accepts_aliases() {
        assert_eq!("WARN".parse::<Level>().unwrap(), Level::Warning);
        assert_eq!(" Info ".parse::<Level>().unwrap(), Level::Info);
        assert!("fatal".parse::<Level>().is_err());
    }

    #[test]
    fn test_level_set_parse() {
        let set: LevelSet = "error, warning".parse().unwrap();
        assert_eq!(set, LevelSet::warnings_and_errors());
        assert!(!set.contains(Level::Info));
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![Level::Warning, Level::Error]);
        assert!("".parse::<LevelSet>().unwrap().is_empty());
        assert!("error,loud".parse::<LevelSet>().is_err());
    }

    #[test]
    fn test_timestamp_format_has_millis() {
        let at = Utc.with_ymd_and_hms(2025, 9, 5, 15, 32, 0).unwrap()
            + chrono::Duration::milliseconds(125);
        let record = LogRecord::with_timestamp(Level::Info, "hi", "frontend", None, at);
        assert_eq!(record.timestamp(), "2025-09-05 15:32:00.125");
    }

    #[test]
    fn test_record_serialization() {
        let at = Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap();
        let record = LogRecord::with_timestamp(
            Level::Error,
            "boom",
            "/home",
            Some(json!({"k": 1})),
            at,
        );
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(
            value,
            json!({
                "level": "error",
                "message": "boom",
                "timestamp": "2025-01-02 03:04:05.000",
                "source": "/home",
                "additional_data": {"k": 1}
            })
        );
    }

    #[test]
    fn test_error_value_is_normalized() {
        let data = ErrorOrData::from_error(&Upload(Reset)).into_additional_data();
        assert_eq!(
            data,
            json!({
                "error": "upload failed",
                "stack": "upload failed\n    caused by: connection reset"
            })
        );
    }

    #[test]
    fn test_anyhow_error_is_normalized() {
        let err = anyhow::anyhow!("disk full").context("saving report");
        let data = ErrorOrData::from(&err).into_additional_data();
        assert_eq!(data["error"], "saving report");
        assert!(data["stack"].as_str().unwrap().contains("disk full"));
    }

    #[test]
    fn test_plain_data_passes_through() {
        let value = json!({"requestId": "abc", "status": 500});
        assert_eq!(ErrorOrData::from(value.clone()).into_additional_data(), value);
    }

    #[test]
    fn test_throttle_key_truncates_message() {
        let message = "x".repeat(250);
        let key = throttle_key(Level::Error, &message);
        assert_eq!(key, format!("error:{}", "x".repeat(100)));
    }

    proptest! {
        #[test]
        fn throttle_key_keeps_at_most_prefix_chars(message in "\\PC{0,300}") {
            let key = throttle_key(Level::Info, &message);
            let prefix = key.strip_prefix("info:").unwrap();
            prop_assert!(prefix.chars().count() <= THROTTLE_KEY_PREFIX_CHARS);
            prop_assert!(message.starts_with(prefix));
        }
    }
}
