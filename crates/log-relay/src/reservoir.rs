// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Bounded weighted reservoir sampling backend.
//!
//! Holds at most `capacity` records per flush window. Every offered record
//! has a `capacity / seen` chance of being kept; once the buffer is full,
//! an accepted record evicts a uniformly chosen resident. A background
//! timer flushes the window downstream and resets the sample.
//!
//! Sampling decisions split into two phases so callers can probe before
//! paying for record construction: `will_sample` draws and parks a
//! decision, `write_sampled` commits it. `write_one` performs both phases
//! atomically under the state lock.

use crate::backend::Backend;
use crate::errors;
use crate::record::{Metadata, Record};
use crate::severity::{Severity, SeverityCounts};
use crate::stats::{NullStats, StatsSink};
use async_trait::async_trait;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

/// Smallest allowed reservoir. Tiny reservoirs distort sampling odds too
/// much to be useful.
pub const MIN_CAPACITY: usize = 5;
pub const MAX_CAPACITY: usize = 1_000_000_000;
pub const DEFAULT_CAPACITY: usize = 100;

pub const MIN_FLUSH_INTERVAL: Duration = Duration::from_millis(2);
pub const MAX_FLUSH_INTERVAL: Duration = Duration::from_millis(999_999);
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_millis(50);

/// Source of replacement indices. Swappable so tests can drive the sampler
/// deterministically.
pub trait ReplacementRng: Send {
    /// Uniform draw in `[lo, hi)`.
    fn pick(&mut self, lo: u64, hi: u64) -> u64;
}

/// Default rng backed by `fastrand`.
pub struct UniformRng(fastrand::Rng);

impl UniformRng {
    pub fn new() -> Self {
        UniformRng(fastrand::Rng::new())
    }
}

impl Default for UniformRng {
    fn default() -> Self {
        Self::new()
    }
}

impl ReplacementRng for UniformRng {
    fn pick(&mut self, lo: u64, hi: u64) -> u64 {
        if hi <= lo {
            return lo;
        }
        self.0.u64(lo..hi)
    }
}

/// Construction parameters for [`ReservoirBackend`].
pub struct ReservoirConfig {
    pub downstream: Arc<dyn Backend>,
    pub stats: Arc<dyn StatsSink>,
    pub capacity: usize,
    pub flush_interval: Duration,
    pub rng: Box<dyn ReplacementRng>,
}

impl ReservoirConfig {
    pub fn new(downstream: Arc<dyn Backend>) -> Self {
        ReservoirConfig {
            downstream,
            stats: Arc::new(NullStats),
            capacity: DEFAULT_CAPACITY,
            flush_interval: DEFAULT_FLUSH_INTERVAL,
            rng: Box::new(UniformRng::new()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Decision {
    Append,
    Replace(usize),
    Skip,
}

struct State {
    capacity: usize,
    flush_interval: Duration,
    buffer: Vec<Arc<Record>>,
    /// Records offered this window, kept or not.
    seen: u64,
    drops: SeverityCounts,
    /// Decision parked by `will_sample` awaiting its `write_sampled`.
    pending: Option<Decision>,
    rng: Box<dyn ReplacementRng>,
    timer_started: bool,
}

impl State {
    /// Draw the fate of the next offered record. Does not mutate the
    /// buffer; `commit` applies the outcome.
    fn decide(&mut self) -> Decision {
        if self.buffer.len() < self.capacity {
            return Decision::Append;
        }
        let drawn = self.rng.pick(0, self.seen.max(1));
        if drawn < self.capacity as u64 {
            Decision::Replace(drawn as usize)
        } else {
            Decision::Skip
        }
    }

    fn commit(&mut self, decision: Decision, record: Arc<Record>) {
        self.seen += 1;
        match decision {
            Decision::Append => {
                // Capacity may have shrunk between decide and commit.
                if self.buffer.len() < self.capacity {
                    self.buffer.push(record);
                } else {
                    self.drops.increment(record.severity);
                }
            }
            Decision::Replace(index) => match self.buffer.get_mut(index) {
                Some(slot) => {
                    self.drops.increment(slot.severity);
                    *slot = record;
                }
                // Slot evicted by a capacity shrink; the draw is stale,
                // keep nothing and count nothing for the evictee.
                None => self.drops.increment(record.severity),
            },
            Decision::Skip => self.drops.increment(record.severity),
        }
    }
}

struct Inner {
    downstream: Arc<dyn Backend>,
    stats: Arc<dyn StatsSink>,
    state: Mutex<State>,
    shutdown: CancellationToken,
    interval_changed: Notify,
}

#[allow(clippy::expect_used)]
fn lock_state(inner: &Inner) -> MutexGuard<'_, State> {
    inner.state.lock().expect("lock poisoned")
}

/// Sampling backend wrapping a downstream [`Backend`].
pub struct ReservoirBackend {
    inner: Arc<Inner>,
}

impl ReservoirBackend {
    pub fn new(config: ReservoirConfig) -> Result<Self, errors::Creation> {
        validate_capacity(config.capacity)?;
        validate_flush_interval(config.flush_interval)?;

        let inner = Arc::new(Inner {
            downstream: config.downstream,
            stats: config.stats,
            state: Mutex::new(State {
                capacity: config.capacity,
                flush_interval: config.flush_interval,
                buffer: Vec::with_capacity(config.capacity),
                seen: 0,
                drops: SeverityCounts::default(),
                pending: None,
                rng: config.rng,
                timer_started: false,
            }),
            shutdown: CancellationToken::new(),
            interval_changed: Notify::new(),
        });
        Ok(ReservoirBackend { inner })
    }

    /// Resize the reservoir. Shrinking evicts the tail of the current
    /// buffer immediately and counts each evictee as dropped.
    pub fn set_capacity(&self, capacity: usize) -> Result<(), errors::Creation> {
        validate_capacity(capacity)?;
        let mut guard = lock_state(&self.inner);
        let State { buffer, drops, .. } = &mut *guard;
        if capacity < buffer.len() {
            for record in buffer.drain(capacity..) {
                drops.increment(record.severity);
            }
        }
        guard.capacity = capacity;
        Ok(())
    }

    /// Change the flush cadence. Takes effect from the next timer arming;
    /// an in-progress sleep is interrupted and re-armed.
    pub fn set_flush_interval(&self, interval: Duration) -> Result<(), errors::Creation> {
        validate_flush_interval(interval)?;
        lock_state(&self.inner).flush_interval = interval;
        self.inner.interval_changed.notify_waiters();
        Ok(())
    }

    /// Spawn the flush timer if it is not already running. Called from
    /// `bootstrap`; safe to call repeatedly.
    pub fn start_timer(&self) {
        {
            let mut state = lock_state(&self.inner);
            if state.timer_started {
                return;
            }
            state.timer_started = true;
        }
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            loop {
                // Register the waiter before reading the interval; an
                // update landing between the read and the select would
                // otherwise be missed for one full sleep.
                let notified = inner.interval_changed.notified();
                tokio::pin!(notified);
                notified.as_mut().enable();
                let interval = lock_state(&inner).flush_interval;
                tokio::select! {
                    _ = inner.shutdown.cancelled() => break,
                    _ = &mut notified => continue,
                    _ = tokio::time::sleep(interval) => {
                        // Re-arm only after the downstream write settles,
                        // so a slow sink stretches the window instead of
                        // stacking flushes.
                        flush(&inner).await;
                    }
                }
            }
        });
    }

    /// Flush the current window immediately, outside the timer cadence.
    pub async fn flush_now(&self) {
        flush(&self.inner).await;
    }
}

fn validate_capacity(capacity: usize) -> Result<(), errors::Creation> {
    if capacity < MIN_CAPACITY || capacity >= MAX_CAPACITY {
        return Err(errors::Creation::InvalidCapacity {
            min: MIN_CAPACITY,
            max: MAX_CAPACITY,
            got: capacity,
        });
    }
    Ok(())
}

fn validate_flush_interval(interval: Duration) -> Result<(), errors::Creation> {
    if interval < MIN_FLUSH_INTERVAL || interval > MAX_FLUSH_INTERVAL {
        return Err(errors::Creation::InvalidFlushInterval {
            min_ms: MIN_FLUSH_INTERVAL.as_millis(),
            max_ms: MAX_FLUSH_INTERVAL.as_millis(),
            got_ms: interval.as_millis(),
        });
    }
    Ok(())
}

/// Record synthesized at flush time when the window overflowed.
fn dropped_logs_record(drops: &SeverityCounts, flush_interval: Duration, size: usize) -> Record {
    let mut metadata = Metadata::new();
    metadata.insert("dropCount".to_string(), drops.to_metadata());
    metadata.insert(
        "flushIntervalMs".to_string(),
        (flush_interval.as_millis() as u64).into(),
    );
    metadata.insert("size".to_string(), size.into());
    Record::new(Severity::Warn, "dropped logs", metadata)
}

/// Drain the window and hand it downstream.
///
/// Window state resets before the downstream awaits, so records offered
/// during a slow flush land in the next window instead of being lost.
async fn flush(inner: &Inner) {
    let start = Instant::now();

    let (warning, batch, drops, keeps) = {
        let mut guard = lock_state(inner);
        let warning = if guard.seen > guard.capacity as u64 {
            Some(Arc::new(dropped_logs_record(
                &guard.drops,
                guard.flush_interval,
                guard.capacity,
            )))
        } else {
            None
        };

        let mut keeps = SeverityCounts::default();
        for record in guard.buffer.iter() {
            keeps.increment(record.severity);
        }

        let batch = std::mem::take(&mut guard.buffer);
        let drops = std::mem::take(&mut guard.drops);
        guard.seen = 0;
        (warning, batch, drops, keeps)
    };

    for (severity, count) in drops.iter_nonzero() {
        inner
            .stats
            .increment_counter(&format!("dropped.{severity}"), count);
    }
    for (severity, count) in keeps.iter_nonzero() {
        inner
            .stats
            .increment_counter(&format!("logged.{severity}"), count);
    }
    inner.stats.record_timing("sync.flushTime", start.elapsed());

    if let Some(warning) = warning {
        if let Err(cause) = inner.downstream.write_one(warning).await {
            warn!("failed to report dropped logs: {cause}");
            inner.stats.increment_counter("errors", 1);
        }
    }

    if !batch.is_empty() {
        match inner.downstream.write_many(&batch).await {
            Ok(()) => debug!(records = batch.len(), "flushed sampled window"),
            Err(errors::Write::Partial { failed, total }) => {
                error!("flush partially failed: {failed} of {total} writes");
                inner.stats.increment_counter("errors", failed as u64);
            }
            Err(cause) => {
                error!("flush failed: {cause}");
                inner.stats.increment_counter("errors", 1);
            }
        }
    }

    inner.stats.record_timing("flushTime", start.elapsed());
}

#[async_trait]
impl Backend for ReservoirBackend {
    async fn write_one(&self, record: Arc<Record>) -> Result<(), errors::Write> {
        let mut state = lock_state(&self.inner);
        let decision = state.decide();
        // A direct write supersedes any parked probe.
        state.pending = None;
        state.commit(decision, record);
        Ok(())
    }

    fn will_sample(&self, _severity: Severity, _key: Option<&str>) -> bool {
        let mut state = lock_state(&self.inner);
        let decision = state.decide();
        state.pending = Some(decision);
        decision != Decision::Skip
    }

    async fn write_sampled(&self, record: Arc<Record>) -> Result<(), errors::Write> {
        let mut state = lock_state(&self.inner);
        let decision = state
            .pending
            .take()
            .ok_or(errors::Write::NoSamplingDecision)?;
        state.commit(decision, record);
        Ok(())
    }

    async fn bootstrap(&self) -> Result<(), errors::Write> {
        self.start_timer();
        self.inner.downstream.bootstrap().await
    }

    async fn destroy(&self) -> Result<(), errors::Write> {
        flush(&self.inner).await;
        self.inner.shutdown.cancel();
        self.inner.downstream.destroy().await
    }
}
