// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Routing positional batch results back to their tags.

use std::collections::HashMap;

use serde_json::Value;

use crate::model::DiagnosticKey;
use crate::provider::BatchResults;

use super::planner::{CallPlan, QueryTag};

/// Batch results sorted into their semantic buckets.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultBuckets {
    /// Live status entities.
    pub statuses: Vec<Value>,
    /// Sample entities per diagnostic.
    pub diagnostics: HashMap<DiagnosticKey, Vec<Value>>,
    /// Fault entities.
    pub faults: Vec<Value>,
    /// Trip entities per device identifier.
    pub trips: HashMap<String, Vec<Value>>,
}

/// Sorts `results` into buckets using the tags of `plan`.
///
/// # Panics
///
/// Panics if `results` does not hold exactly one entry per planned query.
/// The batch executor checks this before results reach here.
#[must_use]
pub fn demultiplex(plan: &CallPlan, results: BatchResults) -> ResultBuckets {
    assert_eq!(
        plan.len(),
        results.len(),
        "batch results must align with the call plan"
    );

    let mut buckets = ResultBuckets::default();
    for (entry, entities) in plan.entries().iter().zip(results) {
        match &entry.tag {
            QueryTag::Status => buckets.statuses.extend(entities),
            QueryTag::Diagnostic(key) => buckets
                .diagnostics
                .entry(*key)
                .or_default()
                .extend(entities),
            QueryTag::Faults => buckets.faults.extend(entities),
            QueryTag::Trips(device_id) => buckets
                .trips
                .entry(device_id.clone())
                .or_default()
                .extend(entities),
        }
    }
    buckets
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::config::FetchLimits;
    use crate::engine::CallPlanner;

    #[test]
    fn results_land_in_their_tagged_buckets() {
        let limits = FetchLimits::default()
            .with_diagnostics([DiagnosticKey::Odometer, DiagnosticKey::Voltage]);
        let plan = CallPlanner::new(limits).plan(&["d1".to_string(), "d2".to_string()]);

        let results = vec![
            vec![json!({"device": {"id": "d1"}, "speed": 10})],
            vec![json!({"device": {"id": "d1"}, "data": 1000})],
            vec![json!({"device": {"id": "d2"}, "data": 12.5})],
            vec![json!({"device": {"id": "d2"}, "id": "f1"})],
            vec![json!({"start": "2026-01-01T00:00:00Z"})],
            vec![],
        ];

        let buckets = demultiplex(&plan, results);

        assert_eq!(buckets.statuses.len(), 1);
        assert_eq!(buckets.diagnostics[&DiagnosticKey::Odometer][0]["data"], 1000);
        assert_eq!(buckets.diagnostics[&DiagnosticKey::Voltage][0]["data"], 12.5);
        assert_eq!(buckets.faults[0]["id"], "f1");
        assert_eq!(buckets.trips["d1"].len(), 1);
        assert!(buckets.trips["d2"].is_empty());
    }

    #[test]
    fn empty_plan_yields_empty_buckets() {
        let buckets = demultiplex(&CallPlan::default(), Vec::new());
        assert_eq!(buckets, ResultBuckets::default());
    }

    #[test]
    #[should_panic(expected = "batch results must align with the call plan")]
    fn misaligned_results_panic() {
        let plan = CallPlanner::new(FetchLimits::default()).plan(&["d1".to_string()]);
        let _ = demultiplex(&plan, vec![Vec::new()]);
    }
}
