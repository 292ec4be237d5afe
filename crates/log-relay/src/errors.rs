// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::severity::Severity;

/// Configuration faults raised synchronously at construction. Fatal to
/// startup; never produced at runtime.
#[derive(Debug, thiserror::Error)]
pub enum Creation {
    #[error("reservoir capacity must be between {min} and {max}, got {got}")]
    InvalidCapacity { min: usize, max: usize, got: usize },

    #[error("flush interval must be between {min_ms}ms and {max_ms}ms, got {got_ms}ms")]
    InvalidFlushInterval {
        min_ms: u128,
        max_ms: u128,
        got_ms: u128,
    },

    #[error("at least one backend is required")]
    NoBackends,

    #[error("no backend routed for severity {0} and no default provided")]
    MissingSeverityRoute(Severity),
}

/// Runtime failures reported through write results. An individual sink
/// failure never blocks or cancels sibling operations; fan-outs collapse
/// them into `Partial`.
#[derive(Debug, thiserror::Error)]
pub enum Write {
    #[error("sink write failed: {0}")]
    Sink(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("{failed} of {total} backend operations failed")]
    Partial { failed: usize, total: usize },

    /// Protocol misuse: a sampled write was committed with no pending
    /// sampling decision. Indicates a caller bug, not a runtime condition
    /// to recover from.
    #[error("sampled write issued without a prior sampling decision")]
    NoSamplingDecision,
}
