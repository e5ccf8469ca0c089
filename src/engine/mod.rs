// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The batching and merging engine.
//!
//! One fetch cycle flows through four stages:
//!
//! 1. [`CallPlanner`] builds a tagged batch for the listed devices
//! 2. [`BatchExecutor`] runs the listing and the batch on worker threads
//! 3. [`demultiplex`] routes the positional results back to their tags
//! 4. [`merge_records`] layers everything into one record per device
//!
//! [`FleetEngine`] chains the stages. It does not catch errors: timeouts,
//! provider and authentication failures surface to the caller unchanged.

mod demux;
mod executor;
mod merge;
mod planner;

pub use demux::{ResultBuckets, demultiplex};
pub use executor::BatchExecutor;
pub use merge::merge_records;
pub use planner::{CallPlan, CallPlanner, PlannedQuery, QueryTag};

use std::collections::HashSet;
use std::sync::Arc;

use crate::config::PollerConfig;
use crate::error::Result;
use crate::model::FleetSnapshot;
use crate::provider::QueryProvider;

/// Runs complete fetch cycles against a provider.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use geotab_fleet::config::PollerConfig;
/// use geotab_fleet::engine::FleetEngine;
/// use geotab_fleet::provider::GeotabConfig;
///
/// # async fn example() -> geotab_fleet::Result<()> {
/// let client = GeotabConfig::new("fleet@example.com", "secret").into_client()?;
/// let engine = FleetEngine::new(Arc::new(client), &PollerConfig::default());
///
/// let snapshot = engine.fetch().await?;
/// for (id, record) in &snapshot {
///     println!("{id}: {:?} km/h", record.speed());
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct FleetEngine<P> {
    planner: CallPlanner,
    executor: BatchExecutor<P>,
}

impl<P: QueryProvider> FleetEngine<P> {
    /// Creates an engine using the deadlines and sizing from `config`.
    #[must_use]
    pub fn new(provider: Arc<P>, config: &PollerConfig) -> Self {
        Self {
            planner: CallPlanner::new(config.limits.clone()),
            executor: BatchExecutor::new(
                provider,
                config.device_list_timeout,
                config.batch_timeout,
            ),
        }
    }

    /// Runs one fetch cycle.
    ///
    /// An empty device listing returns an empty snapshot without issuing
    /// the batch. That is an `Ok`, so a scheduler treats it as a successful
    /// cycle.
    ///
    /// # Errors
    ///
    /// Returns the first error of the listing or batch call.
    pub async fn fetch(&self) -> Result<FleetSnapshot> {
        let devices = self.executor.list_devices().await?;

        let device_ids: Vec<String> = {
            let mut seen = HashSet::new();
            devices
                .iter()
                .filter(|device| device.has_id() && seen.insert(device.id.as_str()))
                .map(|device| device.id.clone())
                .collect()
        };

        let plan = self.planner.plan(&device_ids);
        if plan.is_empty() {
            tracing::debug!("No devices listed, skipping batch");
            return Ok(FleetSnapshot::new());
        }

        let results = self.executor.execute(&plan).await?;
        let snapshot = merge_records(devices, demultiplex(&plan, results));

        tracing::debug!(devices = snapshot.len(), "Merged fleet snapshot");
        Ok(snapshot)
    }
}
