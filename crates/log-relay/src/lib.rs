// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Log record distribution with bounded reservoir sampling.
//!
//! A [`Relay`] fans each record out to a set of [`Backend`]s in parallel.
//! Backends compose: a [`ReservoirBackend`] caps downstream volume by
//! weighted reservoir sampling over timed flush windows, and a
//! [`LevelRouter`] splits traffic by severity. Terminal sinks live in
//! [`sinks`].

pub mod backend;
pub mod errors;
pub mod fanout;
pub mod record;
pub mod relay;
pub mod reservoir;
pub mod router;
pub mod severity;
pub mod sinks;
pub mod stats;

pub use backend::Backend;
pub use record::{Metadata, Record};
pub use relay::Relay;
pub use reservoir::{ReservoirBackend, ReservoirConfig};
pub use router::LevelRouter;
pub use severity::Severity;
pub use stats::{NullStats, StatsSink, TracingStats};
