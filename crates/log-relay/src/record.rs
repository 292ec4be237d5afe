// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::severity::Severity;
use serde::Serialize;
use serde_json::{Map, Value};
use std::time::{SystemTime, UNIX_EPOCH};

/// Structured metadata attached to a record.
pub type Metadata = Map<String, Value>;

/// One log event. Immutable once constructed; shared across concurrently
/// dispatching backends as `Arc<Record>`.
#[derive(Debug, Clone, Serialize)]
pub struct Record {
    pub severity: Severity,
    pub message: String,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub metadata: Metadata,
    /// Unix timestamp in milliseconds, captured at construction.
    pub timestamp_ms: i64,
}

impl Record {
    pub fn new(severity: Severity, message: impl Into<String>, metadata: Metadata) -> Self {
        Record {
            severity,
            message: message.into(),
            metadata,
            timestamp_ms: now_ms(),
        }
    }
}

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as i64)
        .unwrap_or(0)
}
