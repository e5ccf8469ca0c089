// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Merging all sources into one record per device.
//!
//! Layers are applied in increasing precedence:
//!
//! 1. base attributes from the device listing
//! 2. the most recent sample per diagnostic
//! 3. active faults (always a list, possibly empty)
//! 4. the trip with the latest start time
//! 5. live status, which also decides `ignition` when it carries a flag
//!
//! Entities referring to devices missing from the listing are dropped.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::model::{
    CombinedDeviceRecord, Device, DeviceStatus, DiagnosticKey, FaultRecord, FleetSnapshot, Sample,
    TripRecord,
};

use super::demux::ResultBuckets;

/// Builds the fleet snapshot from a device listing and its batch results.
///
/// Devices without an identifier are skipped. If the listing contains the
/// same identifier twice, the first entry is kept.
#[must_use]
pub fn merge_records(devices: Vec<Device>, buckets: ResultBuckets) -> FleetSnapshot {
    let mut records = FleetSnapshot::with_capacity(devices.len());
    for device in devices {
        if !device.has_id() {
            tracing::debug!("Skipping device without identifier");
            continue;
        }
        records
            .entry(device.id.clone())
            .or_insert_with(|| CombinedDeviceRecord::new(device));
    }

    for (key, entities) in buckets.diagnostics {
        overlay_diagnostic(&mut records, key, decode("StatusData", entities));
    }

    for fault in decode::<FaultRecord>("FaultData", buckets.faults) {
        let record = fault
            .device_id()
            .and_then(|device_id| records.get_mut(device_id));
        if let Some(record) = record {
            record.active_faults.push(fault);
        }
    }

    for (device_id, entities) in buckets.trips {
        if let Some(record) = records.get_mut(&device_id) {
            record.last_trip = latest_trip(decode("Trip", entities));
        }
    }

    for status in decode::<DeviceStatus>("DeviceStatusInfo", buckets.statuses) {
        if let Some(record) = records.get_mut(&status.device.id) {
            if let Some(ignition) = status.ignition {
                record.ignition = Some(ignition);
            }
            record.status = Some(status);
        }
    }

    records
}

/// Records the freshest sample per device for one diagnostic.
///
/// Samples are sorted newest first and the first one seen per device wins,
/// so an older sample later in the window never replaces a fresher one.
/// Timestamps are fixed-width ISO-8601 strings and compare lexicographically.
fn overlay_diagnostic(records: &mut FleetSnapshot, key: DiagnosticKey, mut samples: Vec<Sample>) {
    samples.sort_by(|a, b| b.date_time.cmp(&a.date_time));

    for sample in samples {
        let Some(record) = records.get_mut(&sample.device.id) else {
            continue;
        };
        if record.diagnostics.contains_key(&key) {
            continue;
        }
        if key == DiagnosticKey::Ignition {
            record.ignition = Some(sample.data.as_bool());
        }
        record.diagnostics.insert(key, sample);
    }
}

/// Picks the trip with the greatest start time.
fn latest_trip(mut trips: Vec<TripRecord>) -> Option<TripRecord> {
    trips.sort_by(|a, b| b.start.cmp(&a.start));
    trips.into_iter().next()
}

/// Decodes entities, skipping the ones that don't fit the expected shape.
fn decode<T: DeserializeOwned>(type_name: &'static str, entities: Vec<Value>) -> Vec<T> {
    let total = entities.len();
    let decoded: Vec<T> = entities
        .into_iter()
        .filter_map(|entity| serde_json::from_value(entity).ok())
        .collect();

    if decoded.len() < total {
        tracing::debug!(
            type_name,
            skipped = total - decoded.len(),
            "Skipping malformed entities"
        );
    }
    decoded
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use serde_json::json;

    use super::*;
    use crate::model::SampleValue;

    fn devices(ids: &[&str]) -> Vec<Device> {
        ids.iter().map(|id| Device::new(*id)).collect()
    }

    fn diagnostics(key: DiagnosticKey, entities: Vec<Value>) -> HashMap<DiagnosticKey, Vec<Value>> {
        HashMap::from([(key, entities)])
    }

    #[test]
    fn most_recent_sample_wins_regardless_of_order() {
        let buckets = ResultBuckets {
            diagnostics: diagnostics(
                DiagnosticKey::Odometer,
                vec![
                    json!({
                        "device": {"id": "d1"},
                        "data": 90000,
                        "dateTime": "2026-02-13T10:00:00.000Z"
                    }),
                    json!({
                        "device": {"id": "d1"},
                        "data": 100000,
                        "dateTime": "2026-02-13T12:00:00.000Z"
                    }),
                    json!({
                        "device": {"id": "d1"},
                        "data": 95000,
                        "dateTime": "2026-02-13T11:00:00.000Z"
                    }),
                ],
            ),
            ..ResultBuckets::default()
        };

        let snapshot = merge_records(devices(&["d1"]), buckets);

        assert_eq!(
            snapshot["d1"].diagnostic(DiagnosticKey::Odometer),
            Some(SampleValue::Number(100_000.0))
        );
    }

    #[test]
    fn samples_are_tracked_per_device() {
        let buckets = ResultBuckets {
            diagnostics: diagnostics(
                DiagnosticKey::FuelLevel,
                vec![
                    json!({"device": {"id": "d1"}, "data": 40, "dateTime": "2026-02-13T10:00:00Z"}),
                    json!({"device": {"id": "d2"}, "data": 75, "dateTime": "2026-02-13T09:00:00Z"}),
                ],
            ),
            ..ResultBuckets::default()
        };

        let snapshot = merge_records(devices(&["d1", "d2"]), buckets);

        assert_eq!(
            snapshot["d1"].diagnostic(DiagnosticKey::FuelLevel),
            Some(SampleValue::Number(40.0))
        );
        assert_eq!(
            snapshot["d2"].diagnostic(DiagnosticKey::FuelLevel),
            Some(SampleValue::Number(75.0))
        );
    }

    #[test]
    fn latest_trip_by_start_is_kept() {
        let buckets = ResultBuckets {
            trips: HashMap::from([(
                "d1".to_string(),
                vec![
                    json!({
                        "id": "t1", "start": "2026-02-08T10:00:00Z", "stop": "2026-02-08T10:30:00Z"
                    }),
                    json!({"id": "t3", "start": "2026-02-09T08:00:00Z"}),
                    json!({
                        "id": "t2", "start": "2026-02-08T18:00:00Z", "stop": "2026-02-08T19:00:00Z"
                    }),
                ],
            )]),
            ..ResultBuckets::default()
        };

        let snapshot = merge_records(devices(&["d1"]), buckets);
        let trip = snapshot["d1"].last_trip.as_ref().unwrap();

        assert_eq!(trip.id.as_deref(), Some("t3"));
        assert!(trip.is_ongoing());
    }

    #[test]
    fn empty_trip_window_leaves_last_trip_unset() {
        let buckets = ResultBuckets {
            trips: HashMap::from([("d1".to_string(), Vec::new())]),
            ..ResultBuckets::default()
        };
        let snapshot = merge_records(devices(&["d1"]), buckets);
        assert!(snapshot["d1"].last_trip.is_none());
    }

    #[test]
    fn faults_are_grouped_and_always_present() {
        let buckets = ResultBuckets {
            faults: vec![
                json!({"id": "f1", "device": {"id": "d1"}}),
                json!({"id": "f2", "device": {"id": "d1"}}),
                json!({"id": "f3", "device": {"id": "ghost"}}),
                json!({"id": "f4"}),
            ],
            ..ResultBuckets::default()
        };

        let snapshot = merge_records(devices(&["d1", "d2"]), buckets);

        assert_eq!(snapshot["d1"].active_faults.len(), 2);
        assert!(snapshot["d2"].active_faults.is_empty());
        assert_eq!(snapshot["d2"].properties()["active_faults"], json!([]));
    }

    #[test]
    fn status_ignition_overrides_diagnostic() {
        let buckets = ResultBuckets {
            diagnostics: diagnostics(
                DiagnosticKey::Ignition,
                vec![json!({
                    "device": {"id": "d1"}, "data": 0, "dateTime": "2026-02-13T12:00:00Z"
                })],
            ),
            statuses: vec![json!({"device": {"id": "d1"}, "ignition": true, "isDriving": true})],
            ..ResultBuckets::default()
        };

        let snapshot = merge_records(devices(&["d1"]), buckets);
        let record = &snapshot["d1"];

        assert_eq!(record.ignition, Some(true));
        assert_eq!(record.properties()["ignition"], 1);
    }

    #[test]
    fn diagnostic_ignition_used_without_status_flag() {
        let buckets = ResultBuckets {
            diagnostics: diagnostics(
                DiagnosticKey::Ignition,
                vec![json!({
                    "device": {"id": "d1"}, "data": 1, "dateTime": "2026-02-13T12:00:00Z"
                })],
            ),
            statuses: vec![json!({"device": {"id": "d1"}, "speed": 0})],
            ..ResultBuckets::default()
        };

        let snapshot = merge_records(devices(&["d1"]), buckets);
        assert_eq!(snapshot["d1"].ignition, Some(true));
    }

    #[test]
    fn unknown_and_anonymous_devices_are_never_emitted() {
        let mut listing = devices(&["d1"]);
        listing.push(Device::default());
        let buckets = ResultBuckets {
            statuses: vec![json!({"device": {"id": "d9"}, "speed": 80})],
            diagnostics: diagnostics(
                DiagnosticKey::Rpm,
                vec![json!({"device": {"id": "d9"}, "data": 3000})],
            ),
            trips: HashMap::from([(
                "d9".to_string(),
                vec![json!({"start": "2026-01-01T00:00:00Z"})],
            )]),
            ..ResultBuckets::default()
        };

        let snapshot = merge_records(listing, buckets);

        assert_eq!(snapshot.len(), 1);
        assert!(snapshot.contains_key("d1"));
        assert!(snapshot["d1"].status.is_none());
    }

    #[test]
    fn malformed_entities_are_skipped() {
        let buckets = ResultBuckets {
            diagnostics: diagnostics(
                DiagnosticKey::Voltage,
                vec![
                    json!({"device": {"id": "d1"}}),
                    json!({"device": {"id": "d1"}, "data": 13.5}),
                ],
            ),
            statuses: vec![json!({"speed": 10})],
            ..ResultBuckets::default()
        };

        let snapshot = merge_records(devices(&["d1"]), buckets);

        assert_eq!(
            snapshot["d1"].diagnostic(DiagnosticKey::Voltage),
            Some(SampleValue::Number(13.5))
        );
        assert!(snapshot["d1"].status.is_none());
    }
}
