// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Call planning: turns a device list into an ordered, tagged batch.

use std::fmt;

use serde_json::json;

use crate::config::FetchLimits;
use crate::model::DiagnosticKey;
use crate::provider::{EntityType, Query};

/// The bucket a planned query's result belongs in.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QueryTag {
    /// Live status of every device.
    Status,
    /// Samples of one diagnostic.
    Diagnostic(DiagnosticKey),
    /// Active faults of every device.
    Faults,
    /// Recent trips of one device.
    Trips(String),
}

impl fmt::Display for QueryTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Status => f.write_str("status"),
            Self::Diagnostic(key) => write!(f, "diagnostic:{key}"),
            Self::Faults => f.write_str("faults"),
            Self::Trips(device_id) => write!(f, "trips:{device_id}"),
        }
    }
}

/// A query together with its tag.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedQuery {
    /// Where the result goes.
    pub tag: QueryTag,
    /// What to ask the backend.
    pub query: Query,
}

/// An ordered list of tagged queries for one cycle.
///
/// Order: status, one query per tracked diagnostic, faults, then one
/// trip query per device.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallPlan {
    entries: Vec<PlannedQuery>,
}

impl CallPlan {
    /// Returns the planned queries in order.
    #[must_use]
    pub fn entries(&self) -> &[PlannedQuery] {
        &self.entries
    }

    /// Returns the number of planned queries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing needs to be fetched.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the queries without their tags, in order.
    #[must_use]
    pub fn queries(&self) -> Vec<Query> {
        self.entries.iter().map(|entry| entry.query.clone()).collect()
    }

    fn push(&mut self, tag: QueryTag, query: Query) {
        self.entries.push(PlannedQuery { tag, query });
    }
}

/// Builds the batch for a set of devices.
///
/// # Examples
///
/// ```
/// use geotab_fleet::config::FetchLimits;
/// use geotab_fleet::engine::{CallPlanner, QueryTag};
///
/// let planner = CallPlanner::new(FetchLimits::default());
/// let plan = planner.plan(&["b1".to_string(), "b2".to_string()]);
///
/// assert_eq!(plan.entries()[0].tag, QueryTag::Status);
/// assert_eq!(plan.entries().last().unwrap().tag, QueryTag::Trips("b2".to_string()));
/// ```
#[derive(Debug, Clone)]
pub struct CallPlanner {
    limits: FetchLimits,
}

impl CallPlanner {
    /// Creates a planner with the given sizing.
    #[must_use]
    pub fn new(limits: FetchLimits) -> Self {
        Self { limits }
    }

    /// Plans the queries for `device_ids`. An empty list yields an empty plan.
    #[must_use]
    pub fn plan(&self, device_ids: &[String]) -> CallPlan {
        let mut plan = CallPlan::default();
        if device_ids.is_empty() {
            return plan;
        }

        let device_count = device_ids.len();

        plan.push(QueryTag::Status, Query::new(EntityType::DeviceStatusInfo));

        let diagnostic_limit = device_count.saturating_mul(self.limits.diagnostic_overfetch);
        for &key in &self.limits.diagnostics {
            plan.push(
                QueryTag::Diagnostic(key),
                Query::new(EntityType::StatusData)
                    .with_search(json!({"diagnosticSearch": {"id": key.backend_id()}}))
                    .with_results_limit(diagnostic_limit),
            );
        }

        plan.push(
            QueryTag::Faults,
            Query::new(EntityType::FaultData)
                .with_results_limit(device_count.saturating_mul(self.limits.fault_overfetch)),
        );

        // Trips come back unsorted, so ask for a small window rather than one.
        for device_id in device_ids {
            plan.push(
                QueryTag::Trips(device_id.clone()),
                Query::new(EntityType::Trip)
                    .with_search(json!({"deviceSearch": {"id": device_id}}))
                    .with_results_limit(self.limits.trip_window),
            );
        }

        plan
    }
}
