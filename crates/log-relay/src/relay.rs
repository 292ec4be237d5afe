// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Logger front-end fanning each record out to every configured backend.

use crate::backend::Backend;
use crate::errors;
use crate::fanout::{self, FanoutPool};
use crate::record::{Metadata, Record};
use crate::severity::Severity;
use std::sync::Arc;

/// Idle result buffers retained between fan-outs.
const FANOUT_POOL_IDLE: usize = 16;

/// Entry point for producing log records.
///
/// Holds one or more backends; every write goes to all of them
/// concurrently. A single-backend relay skips the fan-out machinery
/// entirely.
pub struct Relay {
    backends: Vec<Arc<dyn Backend>>,
    pool: FanoutPool<()>,
}

macro_rules! severity_methods {
    ($(($plain:ident, $sampled:ident, $severity:expr)),+ $(,)?) => {
        $(
            /// Write a record at this severity.
            pub async fn $plain(
                &self,
                message: impl Into<String>,
                metadata: Metadata,
            ) -> Result<(), errors::Write> {
                self.log($severity, message, metadata).await
            }

            /// Write a record at this severity against a prior sampling
            /// decision.
            pub async fn $sampled(
                &self,
                message: impl Into<String>,
                metadata: Metadata,
            ) -> Result<(), errors::Write> {
                self.slog($severity, message, metadata).await
            }
        )+
    };
}

impl Relay {
    pub fn new(backends: Vec<Arc<dyn Backend>>) -> Result<Self, errors::Creation> {
        if backends.is_empty() {
            return Err(errors::Creation::NoBackends);
        }
        Ok(Relay {
            backends,
            pool: FanoutPool::new(FANOUT_POOL_IDLE),
        })
    }

    /// Write one record to every backend.
    pub async fn log(
        &self,
        severity: Severity,
        message: impl Into<String>,
        metadata: Metadata,
    ) -> Result<(), errors::Write> {
        let record = Arc::new(Record::new(severity, message, metadata));
        self.dispatch(record, false).await
    }

    /// Commit a record whose acceptance was already probed with
    /// [`Relay::will_sample`]. Calling this without the probe is a caller
    /// bug and surfaces as `errors::Write::NoSamplingDecision` from
    /// sampling backends.
    pub async fn slog(
        &self,
        severity: Severity,
        message: impl Into<String>,
        metadata: Metadata,
    ) -> Result<(), errors::Write> {
        let record = Arc::new(Record::new(severity, message, metadata));
        self.dispatch(record, true).await
    }

    /// Whether any backend would accept a record at this severity right
    /// now. Sampling backends park a decision that the matching `slog`
    /// consumes; call the two as an adjacent pair.
    pub fn will_sample(&self, severity: Severity, key: Option<&str>) -> bool {
        self.backends
            .iter()
            .any(|backend| backend.will_sample(severity, key))
    }

    /// Start every backend.
    pub async fn bootstrap(&self) -> Result<(), errors::Write> {
        self.pool
            .run(&self.backends, |backend, _| backend.bootstrap())
            .await
    }

    /// Shut every backend down, flushing whatever they hold.
    pub async fn destroy(&self) -> Result<(), errors::Write> {
        self.pool
            .run(&self.backends, |backend, _| backend.destroy())
            .await
    }

    async fn dispatch(&self, record: Arc<Record>, sampled: bool) -> Result<(), errors::Write> {
        if let [backend] = self.backends.as_slice() {
            return if sampled {
                backend.write_sampled(record).await
            } else {
                backend.write_one(record).await
            };
        }

        self.pool
            .run_unordered(
                &self.backends,
                |backend, _| {
                    let backend = Arc::clone(backend);
                    let record = Arc::clone(&record);
                    async move {
                        if sampled {
                            backend.write_sampled(record).await
                        } else {
                            backend.write_one(record).await
                        }
                    }
                },
                |results| fanout::aggregate(results),
            )
            .await
    }

    severity_methods!(
        (trace, strace, Severity::Trace),
        (debug, sdebug, Severity::Debug),
        (access, saccess, Severity::Access),
        (info, sinfo, Severity::Info),
        (warn, swarn, Severity::Warn),
        (error, serror, Severity::Error),
        (fatal, sfatal, Severity::Fatal),
    );
}
