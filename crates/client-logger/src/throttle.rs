// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Time-windowed suppression of repeated log records.
//!
//! Each distinct key (see [`crate::record::throttle_key`]) is accepted at most
//! once per window:
//!
//! ```text
//! key "error:Upload failed"
//! - T=0s    accepted, deletion scheduled for T=5s
//! - T=2s    dropped (within window)
//! - T=5s    entry deleted
//! - T=6s    accepted again
//! ```
//!
//! Entries expire through a [`DelayQueue`], so the table only ever holds keys
//! accepted within the last window. The owner must drive expirations with
//! [`Throttle::next_expired`].

use std::collections::HashMap;
use std::future::poll_fn;
use std::task::{Context, Poll};
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::time::{delay_queue, DelayQueue};

#[derive(Debug)]
pub struct Throttle {
    window: Duration,
    accepted: HashMap<String, (Instant, delay_queue::Key)>,
    expirations: DelayQueue<String>,
}

impl Throttle {
    #[must_use]
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            accepted: HashMap::new(),
            expirations: DelayQueue::new(),
        }
    }

    /// Returns `true` when `key` was accepted within the window and the
    /// record must be dropped. Otherwise records the acceptance and schedules
    /// the key's deletion one window from now.
    pub fn should_throttle(&mut self, key: String) -> bool {
        let now = Instant::now();
        if let Some((accepted_at, _)) = self.accepted.get(&key) {
            if now.duration_since(*accepted_at) < self.window {
                return true;
            }
        }

        if let Some((_, pending)) = self.accepted.remove(&key) {
            self.expirations.try_remove(&pending);
        }
        let expiry = self.expirations.insert(key.clone(), self.window);
        self.accepted.insert(key, (now, expiry));
        false
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.accepted.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.accepted.is_empty()
    }

    pub fn poll_expired(&mut self, cx: &mut Context<'_>) -> Poll<Option<String>> {
        match self.expirations.poll_expired(cx) {
            Poll::Ready(Some(expired)) => {
                let key = expired.into_inner();
                self.accepted.remove(&key);
                Poll::Ready(Some(key))
            }
            Poll::Ready(None) => Poll::Ready(None),
            Poll::Pending => Poll::Pending,
        }
    }

    /// Waits for the next key to expire and removes it from the table.
    ///
    /// Resolves to `None` immediately when nothing is scheduled.
    pub async fn next_expired(&mut self) -> Option<String> {
        poll_fn(|cx| self.poll_expired(cx)).await
    }
}
