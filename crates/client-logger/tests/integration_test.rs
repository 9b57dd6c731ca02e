// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;

use client_logger::{Environment, Level, Logger, LoggerConfig, MemoryTokenStore, TokenStore};
use mockito::{Matcher, Server};
use serde_json::json;

fn config_for(server: &mockito::ServerGuard) -> LoggerConfig {
    LoggerConfig {
        api_url: server.url(),
        ..Default::default()
    }
}

#[tokio::test]
async fn logger_ships_batch_envelope() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/log/batch")
        .match_header("Content-Type", "application/json")
        .match_header("Authorization", "Bearer session-token")
        .match_body(Matcher::PartialJson(json!({
            "logs": [
                {"level": "warning", "message": "Slow response", "source": "/dashboard"},
                {
                    "level": "error",
                    "message": "Upload failed",
                    "source": "/dashboard",
                    "additional_data": {"file": "report.xlsx"}
                }
            ]
        })))
        .with_status(200)
        .expect(1)
        .create_async()
        .await;

    let store: Arc<dyn TokenStore> = MemoryTokenStore::new(Some("session-token".to_string()));
    let logger = Logger::start_http(&config_for(&server), Some(store))
        .expect("failed to start logger");
    logger.set_source("/dashboard");

    logger.info("Not forwarded in development", None);
    logger.warning("Slow response", None);
    logger.error(
        "Upload failed",
        Some(json!({"file": "report.xlsx"}).into()),
    );
    logger.flush().await;

    mock.assert_async().await;
    assert_eq!(logger.buffered_len().await.expect("service running"), 0);
}

#[tokio::test]
async fn logger_requeues_tail_of_failed_batch() {
    let mut server = Server::new_async().await;
    let failing = server
        .mock("POST", "/log/batch")
        .with_status(500)
        .expect(1)
        .create_async()
        .await;

    let logger = Logger::start_http(&config_for(&server), None).expect("failed to start logger");
    for i in 0..15 {
        logger.error(format!("failure {i}"), None);
    }
    logger.flush().await;

    failing.assert_async().await;
    assert_eq!(logger.buffered_len().await.expect("service running"), 10);

    failing.remove_async().await;
    let expected: Vec<_> = (5..15)
        .map(|i| json!({"level": "error", "message": format!("failure {i}")}))
        .collect();
    let recovered = server
        .mock("POST", "/log/batch")
        .match_body(Matcher::PartialJson(json!({ "logs": expected })))
        .with_status(200)
        .expect(1)
        .create_async()
        .await;

    logger.flush().await;

    recovered.assert_async().await;
    assert_eq!(logger.buffered_len().await.expect("service running"), 0);
}

#[tokio::test]
async fn logger_flush_resolves_when_backend_unreachable() {
    let config = LoggerConfig {
        api_url: "http://127.0.0.1:1".to_string(),
        timeout: std::time::Duration::from_millis(500),
        ..Default::default()
    };
    let logger = Logger::start_http(&config, None).expect("failed to start logger");

    logger.error("Nobody is listening", None);
    logger.flush().await;

    assert_eq!(logger.buffered_len().await.expect("service running"), 1);
}

#[tokio::test]
async fn logger_production_filter_applies_to_shipping() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/log/batch")
        .match_body(Matcher::PartialJson(json!({
            "logs": [{"level": "info", "message": "Checkout completed"}]
        })))
        .with_status(200)
        .expect(1)
        .create_async()
        .await;

    let config = LoggerConfig {
        environment: Environment::Production,
        ..config_for(&server)
    };
    let logger = Logger::start_http(&config, None).expect("failed to start logger");
    logger.set_production_levels([Level::Info].into_iter().collect());

    logger.debug("Cart rendered", None);
    logger.info("Checkout completed", None);
    logger.flush().await;

    mock.assert_async().await;
}

#[tokio::test]
async fn logger_shutdown_ships_pending_records() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/log/batch")
        .match_body(Matcher::PartialJson(json!({
            "logs": [{"message": "Closing session"}]
        })))
        .with_status(200)
        .expect(1)
        .create_async()
        .await;

    let logger = Logger::start_http(&config_for(&server), None).expect("failed to start logger");
    logger.error("Closing session", None);
    logger.shutdown().await.expect("shutdown failed");

    mock.assert_async().await;
}
