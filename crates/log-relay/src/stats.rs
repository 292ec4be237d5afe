// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::time::Duration;

/// Side channel for operational counters and timings emitted by the
/// sampling layer. Implementations must be cheap and non-blocking; they are
/// called from flush paths.
pub trait StatsSink: Send + Sync {
    fn increment_counter(&self, name: &str, delta: u64);
    fn record_timing(&self, name: &str, duration: Duration);
}

/// Discards all stats. The default when no sink is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullStats;

impl StatsSink for NullStats {
    fn increment_counter(&self, _name: &str, _delta: u64) {}
    fn record_timing(&self, _name: &str, _duration: Duration) {}
}

/// Emits stats as `tracing` debug events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingStats;

impl StatsSink for TracingStats {
    fn increment_counter(&self, name: &str, delta: u64) {
        tracing::debug!(counter = name, delta, "stat");
    }

    fn record_timing(&self, name: &str, duration: Duration) {
        tracing::debug!(timer = name, duration_us = duration.as_micros() as u64, "stat");
    }
}
