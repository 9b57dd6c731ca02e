// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Public logging facade.
//!
//! Every call on an enabled [`Logger`] is mirrored locally as a `tracing`
//! event under the [`CONSOLE_TARGET`] target. Calls whose level passes the
//! environment policy are then handed to the dispatcher, which throttles,
//! buffers and ships them. Log calls never block and never fail.

use std::sync::{Arc, RwLock};

use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::config::LoggerConfig;
use crate::constants::{CONSOLE_TARGET, FALLBACK_SOURCE};
use crate::dispatcher::{DispatcherHandle, DispatcherService};
use crate::error::LoggerError;
use crate::flusher::{HttpShipper, LogShipper, ShippingError};
use crate::policy::Policy;
use crate::record::{ErrorOrData, Level, LevelSet, LogRecord};
use crate::token::TokenStore;

#[derive(Clone, Debug)]
pub struct Logger {
    handle: DispatcherHandle,
    policy: Arc<Policy>,
    source: Arc<RwLock<Option<String>>>,
}

impl Logger {
    /// Spawns the dispatcher service on the current Tokio runtime and returns
    /// a handle to it.
    #[must_use]
    pub fn start(config: &LoggerConfig, shipper: Arc<dyn LogShipper>) -> Self {
        let policy = Arc::new(Policy::new(config));
        let (service, handle) = DispatcherService::new(config, Arc::clone(&policy), shipper);
        tokio::spawn(service.run());

        Logger {
            handle,
            policy,
            source: Arc::new(RwLock::new(None)),
        }
    }

    /// Starts a logger shipping to `{api_url}/log/batch` over HTTP.
    pub fn start_http(
        config: &LoggerConfig,
        token_store: Option<Arc<dyn TokenStore>>,
    ) -> Result<Self, ShippingError> {
        let shipper = HttpShipper::new(config, token_store)?;
        Ok(Self::start(config, Arc::new(shipper)))
    }

    pub fn debug(&self, message: impl Into<String>, data: Option<Value>) {
        self.log(Level::Debug, message, data);
    }

    pub fn info(&self, message: impl Into<String>, data: Option<Value>) {
        self.log(Level::Info, message, data);
    }

    pub fn warning(&self, message: impl Into<String>, data: Option<Value>) {
        self.log(Level::Warning, message, data);
    }

    /// Logs an error. An error value becomes `{"error", "stack"}`; plain data
    /// is passed through unchanged.
    pub fn error(&self, message: impl Into<String>, detail: Option<ErrorOrData>) {
        self.log(
            Level::Error,
            message,
            detail.map(ErrorOrData::into_additional_data),
        );
    }

    /// Shorthand for [`Logger::error`] with an error value.
    pub fn error_with<E: std::error::Error + ?Sized>(&self, message: impl Into<String>, err: &E) {
        self.error(message, Some(ErrorOrData::from_error(err)));
    }

    pub fn log(&self, level: Level, message: impl Into<String>, data: Option<Value>) {
        if !self.policy.enabled() {
            return;
        }
        let message = message.into();
        mirror(level, &message, data.as_ref());

        if !self.policy.forwards(level) {
            return;
        }
        let record = LogRecord::new(level, message, self.source(), data);
        // Dropped once the service has stopped.
        let _ = self.handle.insert(record);
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.policy.set_enabled(enabled);
    }

    pub fn set_send_to_backend(&self, send: bool) {
        self.policy.set_send_to_backend(send);
    }

    pub fn set_production_levels(&self, levels: LevelSet) {
        self.policy.set_production_levels(levels);
    }

    /// Route or view stamped on subsequent records.
    pub fn set_source(&self, source: impl Into<String>) {
        #[allow(clippy::expect_used)]
        let mut guard = self.source.write().expect("lock poisoned");
        *guard = Some(source.into());
    }

    pub fn clear_source(&self) {
        #[allow(clippy::expect_used)]
        let mut guard = self.source.write().expect("lock poisoned");
        *guard = None;
    }

    #[must_use]
    pub fn source(&self) -> String {
        #[allow(clippy::expect_used)]
        let guard = self.source.read().expect("lock poisoned");
        guard
            .as_deref()
            .filter(|s| !s.is_empty())
            .unwrap_or(FALLBACK_SOURCE)
            .to_string()
    }

    #[must_use]
    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    /// Dispatches everything buffered and waits for the attempt to finish.
    /// Resolves even when the backend rejects the batch or the service is gone.
    pub async fn flush(&self) {
        if let Err(e) = self.handle.flush().await {
            debug!("Flush skipped: {e}");
        }
    }

    /// Ships whatever is still buffered and stops the service. Later log calls
    /// are mirrored locally only.
    pub async fn shutdown(&self) -> Result<(), LoggerError> {
        self.handle.shutdown().await
    }

    /// Number of records waiting for dispatch.
    pub async fn buffered_len(&self) -> Result<usize, LoggerError> {
        self.handle.buffered_len().await
    }
}

fn mirror(level: Level, message: &str, data: Option<&Value>) {
    let additional_data = data.map_or_else(|| "null".to_string(), Value::to_string);
    match level {
        Level::Debug => debug!(target: CONSOLE_TARGET, %additional_data, "[{level}] {message}"),
        Level::Info => info!(target: CONSOLE_TARGET, %additional_data, "[{level}] {message}"),
        Level::Warning => warn!(target: CONSOLE_TARGET, %additional_data, "[{level}] {message}"),
        Level::Error => error!(target: CONSOLE_TARGET, %additional_data, "[{level}] {message}"),
    }
}
