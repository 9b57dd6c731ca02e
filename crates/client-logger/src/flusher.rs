// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Submission of record batches to the backend ingestion endpoint.
//!
//! ```text
//!   Dispatcher
//!       │ Vec<LogRecord>
//!       v
//!   ┌─────────────┐
//!   │ LogShipper  │ one call per batch
//!   └──────┬──────┘
//!          │ POST {"logs": [...]}
//!          v
//!   /log/batch
//! ```
//!
//! The HTTP shipper talks to reqwest directly. It must never go through a
//! client that logs its own requests, or every submission would produce new
//! records to submit.

use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Serialize;
use tracing::debug;

use crate::config::LoggerConfig;
use crate::record::LogRecord;
use crate::token::TokenStore;

#[derive(Debug, thiserror::Error)]
pub enum ShippingError {
    #[error("Failed to build batch payload: {0}")]
    Payload(String),

    #[error("Failed to ship batch (status {0:?}): {1}")]
    Destination(Option<StatusCode>, String),
}

/// Transport that submits one batch of records.
#[async_trait]
pub trait LogShipper: Send + Sync + Debug {
    async fn ship(&self, batch: &[LogRecord]) -> Result<(), ShippingError>;
}

#[derive(Serialize)]
struct BatchPayload<'a> {
    logs: &'a [LogRecord],
}

#[derive(Debug, Clone)]
pub struct HttpShipper {
    client: reqwest::Client,
    batch_url: String,
    token_store: Option<Arc<dyn TokenStore>>,
}

impl HttpShipper {
    pub fn new(
        config: &LoggerConfig,
        token_store: Option<Arc<dyn TokenStore>>,
    ) -> Result<Self, ShippingError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ShippingError::Payload(format!("failed to build http client: {e}")))?;
        Ok(Self {
            client,
            batch_url: config.batch_url(),
            token_store,
        })
    }

    #[must_use]
    pub fn batch_url(&self) -> &str {
        &self.batch_url
    }
}

#[async_trait]
impl LogShipper for HttpShipper {
    async fn ship(&self, batch: &[LogRecord]) -> Result<(), ShippingError> {
        let body = serde_json::to_vec(&BatchPayload { logs: batch })
            .map_err(|e| ShippingError::Payload(e.to_string()))?;

        let mut request = self
            .client
            .post(&self.batch_url)
            .header("Content-Type", "application/json")
            .body(body);
        if let Some(authorization) = self.token_store.as_ref().and_then(|s| s.authorization()) {
            request = request.header("Authorization", authorization);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ShippingError::Destination(e.status(), e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            debug!("Shipped {} records to {}", batch.len(), self.batch_url);
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(ShippingError::Destination(Some(status), body))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::record::Level;
    use crate::token::MemoryTokenStore;
    use mockito::Matcher;
    use serde_json::json;
    use std::time::Duration;

    fn config_for(server: &mockito::ServerGuard) -> LoggerConfig {
        LoggerConfig {
            api_url: server.url(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_ship_posts_logs_envelope() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/log/batch")
            .match_header("content-type", "application/json")
            .match_body(Matcher::PartialJson(json!({
                "logs": [{"level": "error", "message": "boom", "source": "frontend"}]
            })))
            .with_status(200)
            .create_async()
            .await;

        let shipper = HttpShipper::new(&config_for(&server), None).unwrap();
        assert_eq!(shipper.batch_url(), format!("{}/log/batch", server.url()));
        let batch = vec![LogRecord::new(Level::Error, "boom", "frontend", None)];
        shipper.ship(&batch).await.unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_ship_attaches_bearer_token() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/log/batch")
            .match_header("authorization", "Bearer abc")
            .with_status(200)
            .create_async()
            .await;

        let store: Arc<dyn TokenStore> = MemoryTokenStore::new(Some("abc".to_string()));
        let shipper = HttpShipper::new(&config_for(&server), Some(store)).unwrap();
        let batch = vec![LogRecord::new(Level::Warning, "slow", "frontend", None)];
        shipper.ship(&batch).await.unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_ship_reports_error_status() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/log/batch")
            .with_status(500)
            .with_body("ingestion down")
            .create_async()
            .await;

        let shipper = HttpShipper::new(&config_for(&server), None).unwrap();
        let batch = vec![LogRecord::new(Level::Error, "boom", "frontend", None)];
        let err = shipper.ship(&batch).await.unwrap_err();

        match err {
            ShippingError::Destination(status, body) => {
                assert_eq!(status, Some(StatusCode::INTERNAL_SERVER_ERROR));
                assert_eq!(body, "ingestion down");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_ship_reports_transport_error() {
        let config = LoggerConfig {
            api_url: "http://127.0.0.1:1".to_string(),
            timeout: Duration::from_millis(500),
            ..Default::default()
        };
        let shipper = HttpShipper::new(&config, None).unwrap();
        let batch = vec![LogRecord::new(Level::Error, "boom", "frontend", None)];

        let err = shipper.ship(&batch).await.unwrap_err();
        assert!(matches!(err, ShippingError::Destination(None, _)));
    }

    #[tokio::test]
    async fn test_ship_times_out_on_silent_backend() {
        // Accepts connections but never answers.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let _server = tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let config = LoggerConfig {
            api_url: format!("http://{addr}"),
            timeout: Duration::from_millis(200),
            ..Default::default()
        };
        let shipper = HttpShipper::new(&config, None).unwrap();
        let batch = vec![LogRecord::new(Level::Error, "boom", "frontend", None)];

        let started = std::time::Instant::now();
        let err = tokio::time::timeout(Duration::from_secs(5), shipper.ship(&batch))
            .await
            .expect("client timeout did not fire")
            .unwrap_err();

        assert!(matches!(err, ShippingError::Destination(None, _)));
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
