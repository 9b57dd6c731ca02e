// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Actor owning the record buffer, the throttle table and the dispatch timer.
//!
//! ```text
//!    ┌──────────────┐
//!    │   Handles    │ (Logger clones)
//!    └──────┬───────┘
//!           │ DispatcherCommand
//!           v
//!    ┌──────────────┐   spawn per batch   ┌──────────────┐
//!    │   Service    │ ──────────────────> │  LogShipper  │
//!    │  Actor Task  │ <────────────────── │              │
//!    └──────────────┘   DispatchOutcome   └──────────────┘
//! ```
//!
//! Commands are processed one at a time, so the buffer and the throttle table
//! need no locks. Each dispatch runs on its own task and reports back over an
//! internal channel, where a failed batch is requeued.
//!
//! Flush triggers, evaluated after every accepted record:
//! - buffer length reached `max_buffered_records`: dispatch now;
//! - `buffer_time` elapsed since the last triggered dispatch: dispatch now;
//! - otherwise (re)arm the single deferred dispatch `buffer_time` from now.

use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::time::{sleep_until, Instant, Sleep};
use tracing::{debug, error};

use crate::buffer::LogBuffer;
use crate::config::LoggerConfig;
use crate::error::LoggerError;
use crate::flusher::{LogShipper, ShippingError};
use crate::policy::Policy;
use crate::record::LogRecord;
use crate::throttle::Throttle;

#[derive(Debug)]
pub enum DispatcherCommand {
    /// Throttle-check a record and buffer it.
    Insert(LogRecord),
    /// Dispatch everything now. Answered once the attempt's outcome is applied.
    Flush(oneshot::Sender<()>),
    /// Number of records currently buffered.
    BufferedLen(oneshot::Sender<usize>),
    /// Final dispatch, then stop.
    Shutdown(oneshot::Sender<()>),
}

#[derive(Clone, Debug)]
pub struct DispatcherHandle {
    tx: mpsc::UnboundedSender<DispatcherCommand>,
}

impl DispatcherHandle {
    pub fn insert(&self, record: LogRecord) -> Result<(), mpsc::error::SendError<DispatcherCommand>> {
        self.tx.send(DispatcherCommand::Insert(record))
    }

    pub async fn flush(&self) -> Result<(), LoggerError> {
        let (response_tx, response_rx) = oneshot::channel();
        self.tx
            .send(DispatcherCommand::Flush(response_tx))
            .map_err(|_| LoggerError::NotRunning)?;
        response_rx
            .await
            .map_err(|e| LoggerError::ResponseDropped(e.to_string()))
    }

    pub async fn buffered_len(&self) -> Result<usize, LoggerError> {
        let (response_tx, response_rx) = oneshot::channel();
        self.tx
            .send(DispatcherCommand::BufferedLen(response_tx))
            .map_err(|_| LoggerError::NotRunning)?;
        response_rx
            .await
            .map_err(|e| LoggerError::ResponseDropped(e.to_string()))
    }

    pub async fn shutdown(&self) -> Result<(), LoggerError> {
        let (response_tx, response_rx) = oneshot::channel();
        self.tx
            .send(DispatcherCommand::Shutdown(response_tx))
            .map_err(|_| LoggerError::NotRunning)?;
        response_rx
            .await
            .map_err(|e| LoggerError::ResponseDropped(e.to_string()))
    }
}

struct DispatchOutcome {
    batch: Vec<LogRecord>,
    result: Result<(), ShippingError>,
    waiter: Option<oneshot::Sender<()>>,
}

pub struct DispatcherService {
    rx: mpsc::UnboundedReceiver<DispatcherCommand>,
    policy: Arc<Policy>,
    shipper: Arc<dyn LogShipper>,
    buffer: LogBuffer,
    throttle: Throttle,
    deferred: Pin<Box<Sleep>>,
    deferred_armed: bool,
    last_dispatch: Instant,
    buffer_time: Duration,
    max_buffered_records: usize,
    requeue_limit: usize,
    outcomes_tx: mpsc::UnboundedSender<DispatchOutcome>,
    outcomes_rx: mpsc::UnboundedReceiver<DispatchOutcome>,
    in_flight: usize,
}

impl DispatcherService {
    /// Creates the service and its handle.
    ///
    /// Must be called from within a Tokio runtime. The "last dispatch"
    /// instant starts now.
    #[must_use]
    pub fn new(
        config: &LoggerConfig,
        policy: Arc<Policy>,
        shipper: Arc<dyn LogShipper>,
    ) -> (Self, DispatcherHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let (outcomes_tx, outcomes_rx) = mpsc::unbounded_channel();
        let now = Instant::now();

        let service = Self {
            rx,
            policy,
            shipper,
            buffer: LogBuffer::new(),
            throttle: Throttle::new(config.throttle_window),
            deferred: Box::pin(sleep_until(now + config.buffer_time)),
            deferred_armed: false,
            last_dispatch: now,
            buffer_time: config.buffer_time,
            max_buffered_records: config.max_buffered_records,
            requeue_limit: config.requeue_limit,
            outcomes_tx,
            outcomes_rx,
            in_flight: 0,
        };
        (service, DispatcherHandle { tx })
    }

    /// Processes commands, timers and dispatch outcomes until a `Shutdown`
    /// command arrives or every handle is dropped.
    pub async fn run(mut self) {
        debug!("Log dispatcher service started");

        loop {
            tokio::select! {
                command = self.rx.recv() => {
                    let Some(command) = command else {
                        debug!("All logger handles dropped, stopping dispatcher");
                        self.drain().await;
                        break;
                    };
                    match command {
                        DispatcherCommand::Insert(record) => self.insert(record),
                        DispatcherCommand::Flush(waiter) => {
                            self.deferred_armed = false;
                            self.dispatch(Some(waiter));
                        }
                        DispatcherCommand::BufferedLen(response_tx) => {
                            if response_tx.send(self.buffer.len()).is_err() {
                                debug!("Buffered length receiver dropped");
                            }
                        }
                        DispatcherCommand::Shutdown(done) => {
                            debug!("Log dispatcher service shutting down");
                            self.drain().await;
                            self.rx.close();
                            if done.send(()).is_err() {
                                debug!("Shutdown receiver dropped");
                            }
                            break;
                        }
                    }
                }
                () = &mut self.deferred, if self.deferred_armed => {
                    self.deferred_armed = false;
                    self.dispatch(None);
                    self.last_dispatch = Instant::now();
                }
                Some(key) = self.throttle.next_expired(), if !self.throttle.is_empty() => {
                    debug!("Throttle entry expired: {key}");
                }
                Some(outcome) = self.outcomes_rx.recv() => self.apply(outcome),
            }
        }

        debug!("Log dispatcher service stopped");
    }

    fn insert(&mut self, record: LogRecord) {
        if self.throttle.should_throttle(record.throttle_key()) {
            return;
        }
        self.buffer.push(record);

        let now = Instant::now();
        if self.buffer.len() >= self.max_buffered_records
            || now.duration_since(self.last_dispatch) >= self.buffer_time
        {
            self.deferred_armed = false;
            self.dispatch(None);
            self.last_dispatch = now;
        } else {
            self.deferred.as_mut().reset(now + self.buffer_time);
            self.deferred_armed = true;
        }
    }

    /// Hands the whole buffer to the shipper on its own task. Records stay
    /// buffered while forwarding is switched off.
    fn dispatch(&mut self, waiter: Option<oneshot::Sender<()>>) {
        if self.buffer.is_empty() || !self.policy.send_to_backend() {
            if let Some(waiter) = waiter {
                let _ = waiter.send(());
            }
            return;
        }

        let batch = self.buffer.take();
        debug!("Dispatching {} records", batch.len());

        let shipper = Arc::clone(&self.shipper);
        let outcomes = self.outcomes_tx.clone();
        self.in_flight += 1;
        tokio::spawn(async move {
            let result = shipper.ship(&batch).await;
            if outcomes
                .send(DispatchOutcome {
                    batch,
                    result,
                    waiter,
                })
                .is_err()
            {
                debug!("Dispatcher stopped before the batch outcome arrived");
            }
        });
    }

    fn apply(&mut self, outcome: DispatchOutcome) {
        self.in_flight = self.in_flight.saturating_sub(1);
        let DispatchOutcome {
            batch,
            result,
            waiter,
        } = outcome;

        if let Err(e) = result {
            let total = batch.len();
            let dropped = self.buffer.requeue_failed(batch, self.requeue_limit);
            error!(
                "Failed to send batch logs to backend: {e}. Requeued {} of {total} records",
                total - dropped
            );
        }

        if let Some(waiter) = waiter {
            let _ = waiter.send(());
        }
    }

    /// Waits for in-flight batches, then ships what is left inline.
    async fn drain(&mut self) {
        self.deferred_armed = false;
        while self.in_flight > 0 {
            match self.outcomes_rx.recv().await {
                Some(outcome) => self.apply(outcome),
                None => break,
            }
        }

        if self.buffer.is_empty() || !self.policy.send_to_backend() {
            return;
        }
        let batch = self.buffer.take();
        match self.shipper.ship(&batch).await {
            Ok(()) => debug!("Shipped final batch of {} records", batch.len()),
            Err(e) => error!(
                "Failed to send final batch logs to backend: {e}. Discarding {} records",
                batch.len()
            ),
        }
    }
}
