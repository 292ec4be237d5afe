// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use log_relay::errors;
use log_relay::record::Record;
use log_relay::reservoir::ReplacementRng;
use log_relay::stats::StatsSink;
use log_relay::Backend;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Backend capturing everything written to it.
#[derive(Default)]
pub struct MockBackend {
    received: Mutex<Vec<Arc<Record>>>,
    batch_sizes: Mutex<Vec<usize>>,
    bootstrapped: AtomicBool,
    destroyed: AtomicBool,
    fail_writes: AtomicBool,
}

impl MockBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(MockBackend::default())
    }

    pub fn records(&self) -> Vec<Arc<Record>> {
        self.received.lock().unwrap().clone()
    }

    pub fn messages(&self) -> Vec<String> {
        self.received
            .lock()
            .unwrap()
            .iter()
            .map(|record| record.message.clone())
            .collect()
    }

    pub fn batch_sizes(&self) -> Vec<usize> {
        self.batch_sizes.lock().unwrap().clone()
    }

    pub fn is_bootstrapped(&self) -> bool {
        self.bootstrapped.load(Ordering::SeqCst)
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::SeqCst)
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl Backend for MockBackend {
    async fn write_one(&self, record: Arc<Record>) -> Result<(), errors::Write> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(errors::Write::Sink("mock backend down".to_string()));
        }
        self.received.lock().unwrap().push(record);
        Ok(())
    }

    async fn write_many(&self, records: &[Arc<Record>]) -> Result<(), errors::Write> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(errors::Write::Sink("mock backend down".to_string()));
        }
        self.batch_sizes.lock().unwrap().push(records.len());
        self.received.lock().unwrap().extend_from_slice(records);
        Ok(())
    }

    async fn bootstrap(&self) -> Result<(), errors::Write> {
        self.bootstrapped.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn destroy(&self) -> Result<(), errors::Write> {
        self.destroyed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Rng replaying a fixed sequence, repeating the final value forever.
pub struct StubRng {
    values: Vec<u64>,
    next: usize,
}

impl StubRng {
    pub fn new(values: Vec<u64>) -> Self {
        StubRng { values, next: 0 }
    }

    pub fn constant(value: u64) -> Self {
        StubRng::new(vec![value])
    }
}

impl ReplacementRng for StubRng {
    fn pick(&mut self, lo: u64, _hi: u64) -> u64 {
        let value = self
            .values
            .get(self.next)
            .or_else(|| self.values.last())
            .copied()
            .unwrap_or(lo);
        self.next += 1;
        value
    }
}

/// Stats sink recording every counter and timing it sees.
#[derive(Default)]
pub struct RecordingStats {
    counters: Mutex<Vec<(String, u64)>>,
    timings: Mutex<Vec<String>>,
}

impl RecordingStats {
    pub fn new() -> Arc<Self> {
        Arc::new(RecordingStats::default())
    }

    pub fn counter_total(&self, name: &str) -> u64 {
        self.counters
            .lock()
            .unwrap()
            .iter()
            .filter(|(seen, _)| seen == name)
            .map(|(_, delta)| delta)
            .sum()
    }

    pub fn timing_names(&self) -> Vec<String> {
        self.timings.lock().unwrap().clone()
    }
}

impl StatsSink for RecordingStats {
    fn increment_counter(&self, name: &str, delta: u64) {
        self.counters.lock().unwrap().push((name.to_string(), delta));
    }

    fn record_timing(&self, name: &str, _duration: Duration) {
        self.timings.lock().unwrap().push(name.to_string());
    }
}
