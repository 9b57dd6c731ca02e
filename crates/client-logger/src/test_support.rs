// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, Semaphore};

use crate::flusher::{LogShipper, ShippingError};
use crate::record::LogRecord;

/// Shipper that forwards every attempted batch to a channel and fails on
/// demand.
#[derive(Debug)]
pub(crate) struct ChannelShipper {
    batches: mpsc::UnboundedSender<Vec<LogRecord>>,
    pub(crate) fail: AtomicBool,
}

impl ChannelShipper {
    pub(crate) fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<Vec<LogRecord>>) {
        let (batches, rx) = mpsc::unbounded_channel();
        let shipper = Arc::new(Self {
            batches,
            fail: AtomicBool::new(false),
        });
        (shipper, rx)
    }

    pub(crate) fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl LogShipper for ChannelShipper {
    async fn ship(&self, batch: &[LogRecord]) -> Result<(), ShippingError> {
        let _ = self.batches.send(batch.to_vec());
        if self.fail.load(Ordering::SeqCst) {
            return Err(ShippingError::Destination(
                None,
                "connection refused".to_string(),
            ));
        }
        Ok(())
    }
}

pub(crate) fn messages(batch: &[LogRecord]) -> Vec<&str> {
    batch.iter().map(LogRecord::message).collect()
}

/// Shipper whose calls block until the test releases them with
/// [`GatedShipper::release`]. The failure flag is sampled when the call
/// starts.
#[derive(Debug)]
pub(crate) struct GatedShipper {
    batches: mpsc::UnboundedSender<Vec<LogRecord>>,
    gate: Semaphore,
    fail: AtomicBool,
}

impl GatedShipper {
    pub(crate) fn new(fail: bool) -> (Arc<Self>, mpsc::UnboundedReceiver<Vec<LogRecord>>) {
        let (batches, rx) = mpsc::unbounded_channel();
        let shipper = Arc::new(Self {
            batches,
            gate: Semaphore::new(0),
            fail: AtomicBool::new(fail),
        });
        (shipper, rx)
    }

    pub(crate) fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Lets `calls` pending or future ship calls complete.
    pub(crate) fn release(&self, calls: usize) {
        self.gate.add_permits(calls);
    }
}

#[async_trait]
impl LogShipper for GatedShipper {
    async fn ship(&self, batch: &[LogRecord]) -> Result<(), ShippingError> {
        let fail = self.fail.load(Ordering::SeqCst);
        let _ = self.batches.send(batch.to_vec());
        if let Ok(permit) = self.gate.acquire().await {
            permit.forget();
        }
        if fail {
            return Err(ShippingError::Destination(
                Some(reqwest::StatusCode::SERVICE_UNAVAILABLE),
                "backend unavailable".to_string(),
            ));
        }
        Ok(())
    }
}
