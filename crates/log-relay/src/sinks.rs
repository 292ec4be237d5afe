// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Concrete terminal backends.

use crate::backend::Backend;
use crate::errors;
use crate::record::Record;
use async_trait::async_trait;
use std::io::Write;
use std::sync::{Arc, Mutex, MutexGuard};

/// Discards every record. Useful as a sampling downstream in benchmarks
/// and as a routing default.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullBackend;

#[async_trait]
impl Backend for NullBackend {
    async fn write_one(&self, _record: Arc<Record>) -> Result<(), errors::Write> {
        Ok(())
    }

    async fn write_many(&self, _records: &[Arc<Record>]) -> Result<(), errors::Write> {
        Ok(())
    }
}

/// Serializes each record as one JSON line to a writer.
///
/// Batches share a single lock acquisition, so records within one
/// `write_many` are never interleaved with concurrent writes.
pub struct JsonLinesBackend<W> {
    writer: Mutex<W>,
}

impl<W: Write + Send + 'static> JsonLinesBackend<W> {
    pub fn new(writer: W) -> Self {
        JsonLinesBackend {
            writer: Mutex::new(writer),
        }
    }

    #[allow(clippy::expect_used)]
    fn lock_writer(&self) -> MutexGuard<'_, W> {
        self.writer.lock().expect("lock poisoned")
    }

    fn write_line(writer: &mut W, record: &Record) -> Result<(), errors::Write> {
        serde_json::to_writer(&mut *writer, record)
            .map_err(|cause| errors::Write::Sink(cause.to_string()))?;
        writer.write_all(b"\n")?;
        Ok(())
    }
}

impl JsonLinesBackend<std::io::Stdout> {
    pub fn stdout() -> Self {
        JsonLinesBackend::new(std::io::stdout())
    }
}

#[async_trait]
impl<W: Write + Send + 'static> Backend for JsonLinesBackend<W> {
    async fn write_one(&self, record: Arc<Record>) -> Result<(), errors::Write> {
        let mut writer = self.lock_writer();
        Self::write_line(&mut writer, &record)
    }

    async fn write_many(&self, records: &[Arc<Record>]) -> Result<(), errors::Write> {
        let mut writer = self.lock_writer();
        let mut failed = 0;
        for record in records {
            if Self::write_line(&mut writer, record).is_err() {
                failed += 1;
            }
        }
        if failed == 0 {
            Ok(())
        } else {
            Err(errors::Write::Partial {
                failed,
                total: records.len(),
            })
        }
    }

    async fn destroy(&self) -> Result<(), errors::Write> {
        self.lock_writer().flush()?;
        Ok(())
    }
}
