// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// An ordered log level. Ordering follows severity: `Trace` is the least
/// severe, `Fatal` the most, with `Access` sitting between `Debug` and
/// `Info`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Trace,
    Debug,
    Access,
    Info,
    Warn,
    Error,
    Fatal,
}

impl Severity {
    /// All severities, least to most severe.
    pub const ALL: [Severity; 7] = [
        Severity::Trace,
        Severity::Debug,
        Severity::Access,
        Severity::Info,
        Severity::Warn,
        Severity::Error,
        Severity::Fatal,
    ];

    /// Numeric priority used for minimum-level filtering.
    pub fn priority(self) -> u8 {
        match self {
            Severity::Trace => 10,
            Severity::Debug => 20,
            Severity::Access => 25,
            Severity::Info => 30,
            Severity::Warn => 40,
            Severity::Error => 50,
            Severity::Fatal => 60,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Trace => "trace",
            Severity::Debug => "debug",
            Severity::Access => "access",
            Severity::Info => "info",
            Severity::Warn => "warn",
            Severity::Error => "error",
            Severity::Fatal => "fatal",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown severity: {0}")]
pub struct ParseSeverityError(String);

impl FromStr for Severity {
    type Err = ParseSeverityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "trace" => Ok(Severity::Trace),
            "debug" => Ok(Severity::Debug),
            "access" => Ok(Severity::Access),
            "info" => Ok(Severity::Info),
            "warn" => Ok(Severity::Warn),
            "error" => Ok(Severity::Error),
            "fatal" => Ok(Severity::Fatal),
            other => Err(ParseSeverityError(other.to_string())),
        }
    }
}

/// Per-severity counters used for drop/keep accounting within a flush
/// window.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SeverityCounts([u64; Severity::ALL.len()]);

impl SeverityCounts {
    pub fn increment(&mut self, severity: Severity) {
        self.add(severity, 1);
    }

    pub fn add(&mut self, severity: Severity, delta: u64) {
        self.0[severity as usize] += delta;
    }

    pub fn get(&self, severity: Severity) -> u64 {
        self.0[severity as usize]
    }

    pub fn total(&self) -> u64 {
        self.0.iter().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.0.iter().all(|&count| count == 0)
    }

    /// Severities with a nonzero count, least to most severe.
    pub fn iter_nonzero(&self) -> impl Iterator<Item = (Severity, u64)> + '_ {
        Severity::ALL
            .iter()
            .map(|&severity| (severity, self.get(severity)))
            .filter(|&(_, count)| count > 0)
    }

    /// JSON object keyed by severity name, nonzero entries only.
    pub fn to_metadata(&self) -> serde_json::Value {
        let mut map = serde_json::Map::new();
        for (severity, count) in self.iter_nonzero() {
            map.insert(severity.as_str().to_string(), count.into());
        }
        serde_json::Value::Object(map)
    }
}
