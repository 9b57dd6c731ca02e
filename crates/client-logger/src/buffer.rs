// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! FIFO buffer of records waiting for dispatch.
//!
//! The buffer is drained whole: [`LogBuffer::take`] swaps the pending records
//! out for an empty queue, so records pushed while a batch is in flight join
//! the next batch. A failed batch gives back only its most recent records via
//! [`LogBuffer::requeue_failed`], ahead of anything pushed since.

use std::collections::VecDeque;

use crate::record::LogRecord;

#[derive(Debug, Default, Clone)]
pub struct LogBuffer {
    records: VecDeque<LogRecord>,
}

impl LogBuffer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: LogRecord) {
        self.records.push_back(record);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Takes every pending record, leaving the buffer empty.
    pub fn take(&mut self) -> Vec<LogRecord> {
        std::mem::take(&mut self.records).into()
    }

    /// Puts the last `limit` records of a failed batch back at the front of
    /// the buffer, in their original order. Older records of the batch are
    /// dropped. Returns how many were dropped.
    pub fn requeue_failed(&mut self, mut failed: Vec<LogRecord>, limit: usize) -> usize {
        let dropped = failed.len().saturating_sub(limit);
        let kept = failed.split_off(dropped);
        for record in kept.into_iter().rev() {
            self.records.push_front(record);
        }
        dropped
    }

    pub fn iter(&self) -> impl Iterator<Item = &LogRecord> {
        self.records.iter()
    }
}
