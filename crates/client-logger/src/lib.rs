// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Buffered, throttled client-side logger.
//!
//! Log calls are mirrored to the local `tracing` subscriber and, when the
//! environment policy allows it, forwarded to a dispatcher task that batches
//! them and ships each batch to `{api_url}/log/batch`. Delivery is best
//! effort: a failed batch keeps only its most recent records for the next
//! attempt.
//!
//! ```rust,ignore
//! let config = LoggerConfig::from_env()?;
//! let logger = Logger::start_http(&config, None)?;
//! logger.error("Upload failed", Some(json!({"file": "report.xlsx"}).into()));
//! logger.flush().await;
//! ```

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

pub mod buffer;
pub mod config;
pub mod constants;
pub mod dispatcher;
pub mod error;
pub mod flusher;
pub mod logger;
pub mod policy;
pub mod record;
pub mod throttle;
pub mod token;

#[cfg(test)]
mod test_support;

pub use config::{Environment, LoggerConfig};
pub use error::{ConfigError, LoggerError};
pub use flusher::{HttpShipper, LogShipper, ShippingError};
pub use logger::Logger;
pub use record::{ErrorOrData, Level, LevelSet, LogRecord};
pub use token::{MemoryTokenStore, TokenStore};
