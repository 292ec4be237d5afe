// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::errors;
use crate::fanout;
use crate::record::Record;
use crate::severity::Severity;
use async_trait::async_trait;
use std::sync::Arc;

/// A destination for log records.
///
/// Only `write_one` is required. The default `write_many` fans out one
/// `write_one` per record concurrently; backends with a cheaper batch path
/// override it. The sampling hooks default to pass-through so plain sinks
/// compose with sampling-aware callers unchanged.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Write a single record.
    async fn write_one(&self, record: Arc<Record>) -> Result<(), errors::Write>;

    /// Write a batch of records. Every record is attempted even when some
    /// fail; failures collapse into `errors::Write::Partial`.
    async fn write_many(&self, records: &[Arc<Record>]) -> Result<(), errors::Write> {
        let results =
            fanout::dispatch_unordered(records, |record, _| self.write_one(Arc::clone(record)))
                .await;
        fanout::aggregate(&results)
    }

    /// Whether a record with this severity would be accepted right now.
    /// Sampling backends park the resulting decision until the matching
    /// `write_sampled` call; everyone else always accepts.
    fn will_sample(&self, _severity: Severity, _key: Option<&str>) -> bool {
        true
    }

    /// Commit a record whose acceptance was already decided by
    /// `will_sample`. Non-sampling backends treat this as a plain write.
    async fn write_sampled(&self, record: Arc<Record>) -> Result<(), errors::Write> {
        self.write_one(record).await
    }

    /// One-time startup hook. Idempotence is up to the caller.
    async fn bootstrap(&self) -> Result<(), errors::Write> {
        Ok(())
    }

    /// Graceful shutdown hook. Buffering backends flush here.
    async fn destroy(&self) -> Result<(), errors::Write> {
        Ok(())
    }
}
