// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! One WebSocket connection per session id.
//!
//! [`WsConnection::connect`] opens `{url_base}/{session_id}` and spawns a pump
//! task that owns the socket. Outbound messages reach the pump over a
//! channel; inbound messages are handed to the receiver returned by
//! `connect`. The connected flag flips to `false` as soon as the pump sees a
//! close frame, an error or the end of the stream.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use futures_util::{SinkExt, StreamExt};
use serde::Serialize;
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, warn};

use crate::error::WsError;

pub const DEFAULT_URL_BASE: &str = "ws://localhost:8000/ws/excel";

/// Message received from the server.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    /// Text frame holding valid JSON.
    Json(Value),
    /// Text frame that is not JSON.
    Text(String),
    Binary(Vec<u8>),
}

impl Inbound {
    fn from_text(text: String) -> Self {
        match serde_json::from_str(&text) {
            Ok(value) => Inbound::Json(value),
            Err(_) => Inbound::Text(text),
        }
    }
}

#[derive(Debug)]
struct Session {
    url: String,
    outbound: mpsc::UnboundedSender<WsMessage>,
    connected: Arc<AtomicBool>,
    pump: JoinHandle<()>,
}

#[derive(Debug)]
pub struct WsConnection {
    url_base: String,
    session: Mutex<Option<Session>>,
}

impl Default for WsConnection {
    fn default() -> Self {
        Self::new(DEFAULT_URL_BASE)
    }
}

impl WsConnection {
    #[must_use]
    pub fn new(url_base: impl Into<String>) -> Self {
        Self {
            url_base: url_base.into(),
            session: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn url_base(&self) -> &str {
        &self.url_base
    }

    /// Closes any current connection, then connects to
    /// `{url_base}/{session_id}`.
    pub async fn connect(
        &self,
        session_id: &str,
    ) -> Result<mpsc::UnboundedReceiver<Inbound>, WsError> {
        self.close();

        let url = format!("{}/{session_id}", self.url_base.trim_end_matches('/'));
        let (socket, _response) = connect_async(url.as_str())
            .await
            .map_err(|e| WsError::Connect {
                url: url.clone(),
                reason: e.to_string(),
            })?;
        debug!("WebSocket connected to {url}");

        let (outbound, outbound_rx) = mpsc::unbounded_channel();
        let (inbound_tx, inbound) = mpsc::unbounded_channel();
        let connected = Arc::new(AtomicBool::new(true));
        let pump = tokio::spawn(pump(
            socket,
            outbound_rx,
            inbound_tx,
            Arc::clone(&connected),
        ));

        let previous = self.lock_session().replace(Session {
            url,
            outbound,
            connected,
            pump,
        });
        // A concurrent connect may have won the race; keep only the newest.
        if let Some(previous) = previous {
            shut(previous);
        }
        Ok(inbound)
    }

    /// Serializes `payload` as JSON and sends it as a text frame.
    pub fn send_message<T: Serialize + ?Sized>(&self, payload: &T) -> Result<(), WsError> {
        let guard = self.lock_session();
        let session = guard
            .as_ref()
            .filter(|s| s.connected.load(Ordering::SeqCst))
            .ok_or(WsError::NotConnected)?;

        let text = serde_json::to_string(payload)?;
        session
            .outbound
            .send(WsMessage::Text(text))
            .map_err(|_| WsError::Send)
    }

    /// Closes the connection, if any, and marks it disconnected.
    pub fn close(&self) {
        if let Some(session) = self.lock_session().take() {
            shut(session);
        }
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.lock_session()
            .as_ref()
            .is_some_and(|s| s.connected.load(Ordering::SeqCst))
    }

    /// URL of the current connection.
    #[must_use]
    pub fn url(&self) -> Option<String> {
        self.lock_session().as_ref().map(|s| s.url.clone())
    }

    fn lock_session(&self) -> std::sync::MutexGuard<'_, Option<Session>> {
        #[allow(clippy::expect_used)]
        self.session.lock().expect("lock poisoned")
    }
}

impl Drop for WsConnection {
    fn drop(&mut self) {
        self.close();
    }
}

fn shut(session: Session) {
    debug!("Closing WebSocket connection to {}", session.url);
    session.connected.store(false, Ordering::SeqCst);
    if session.outbound.send(WsMessage::Close(None)).is_err() {
        session.pump.abort();
    }
}

async fn pump(
    mut socket: WebSocketStream<MaybeTlsStream<TcpStream>>,
    mut outbound: mpsc::UnboundedReceiver<WsMessage>,
    inbound: mpsc::UnboundedSender<Inbound>,
    connected: Arc<AtomicBool>,
) {
    loop {
        tokio::select! {
            message = outbound.recv() => {
                let Some(message) = message else {
                    let _ = socket.close(None).await;
                    break;
                };
                let closing = matches!(message, WsMessage::Close(_));
                if let Err(e) = socket.send(message).await {
                    warn!("WebSocket send failed: {e}");
                    break;
                }
                if closing {
                    break;
                }
            }
            frame = socket.next() => match frame {
                Some(Ok(WsMessage::Text(text))) => {
                    let _ = inbound.send(Inbound::from_text(text));
                }
                Some(Ok(WsMessage::Binary(bytes))) => {
                    let _ = inbound.send(Inbound::Binary(bytes));
                }
                Some(Ok(WsMessage::Close(frame))) => {
                    debug!("WebSocket closed by server: {frame:?}");
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!("WebSocket error: {e}");
                    break;
                }
                None => break,
            },
        }
    }
    connected.store(false, Ordering::SeqCst);
}
