// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::backend::Backend;
use crate::errors;
use crate::fanout;
use crate::record::Record;
use crate::severity::Severity;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// Routes each record to a backend by severity.
///
/// Every severity resolves to exactly one backend, either an explicit route
/// or the default. Lifecycle hooks run once per distinct backend even when
/// it serves several severities.
pub struct LevelRouter {
    routes: [Arc<dyn Backend>; Severity::ALL.len()],
    unique: Vec<Arc<dyn Backend>>,
}

impl LevelRouter {
    pub fn new(
        routes: HashMap<Severity, Arc<dyn Backend>>,
        default: Option<Arc<dyn Backend>>,
    ) -> Result<Self, errors::Creation> {
        let mut table = Vec::with_capacity(Severity::ALL.len());
        for severity in Severity::ALL {
            let backend = routes
                .get(&severity)
                .or(default.as_ref())
                .ok_or(errors::Creation::MissingSeverityRoute(severity))?;
            table.push(Arc::clone(backend));
        }

        let mut unique: Vec<Arc<dyn Backend>> = Vec::new();
        for backend in &table {
            if !unique.iter().any(|seen| Arc::ptr_eq(seen, backend)) {
                unique.push(Arc::clone(backend));
            }
        }

        let routes = table
            .try_into()
            .unwrap_or_else(|_| unreachable!("route table sized to Severity::ALL"));
        Ok(LevelRouter { routes, unique })
    }

    fn route(&self, severity: Severity) -> &Arc<dyn Backend> {
        &self.routes[severity as usize]
    }
}

#[async_trait]
impl Backend for LevelRouter {
    async fn write_one(&self, record: Arc<Record>) -> Result<(), errors::Write> {
        self.route(record.severity).write_one(record).await
    }

    fn will_sample(&self, severity: Severity, key: Option<&str>) -> bool {
        self.route(severity).will_sample(severity, key)
    }

    async fn write_sampled(&self, record: Arc<Record>) -> Result<(), errors::Write> {
        self.route(record.severity).write_sampled(record).await
    }

    async fn bootstrap(&self) -> Result<(), errors::Write> {
        let results =
            fanout::dispatch_ordered(&self.unique, |backend, _| backend.bootstrap()).await;
        fanout::aggregate(&results)
    }

    async fn destroy(&self) -> Result<(), errors::Write> {
        let results = fanout::dispatch_ordered(&self.unique, |backend, _| backend.destroy()).await;
        fanout::aggregate(&results)
    }
}
