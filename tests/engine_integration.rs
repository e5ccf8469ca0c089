// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Integration tests for the fetch pipeline using an in-memory provider.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use geotab_fleet::config::{FetchLimits, PollerConfig};
use geotab_fleet::engine::FleetEngine;
use geotab_fleet::model::{Device, DiagnosticKey, SampleValue};
use geotab_fleet::provider::{BatchResults, EntityType, Query, QueryProvider};
use geotab_fleet::{Error, ProviderError};
use serde_json::{Value, json};

/// Answers every query from fixed per-type tables.
#[derive(Default)]
struct FleetFixture {
    devices: Vec<Device>,
    statuses: Vec<Value>,
    samples: Vec<(DiagnosticKey, Value)>,
    faults: Vec<Value>,
    trips: Vec<Value>,
    batch_calls: AtomicUsize,
    last_batch: parking_lot::Mutex<Vec<Query>>,
}

impl FleetFixture {
    fn answer(&self, query: &Query) -> Vec<Value> {
        match query.entity {
            EntityType::DeviceStatusInfo => self.statuses.clone(),
            EntityType::StatusData => {
                let id = query.search.as_ref().map(|s| &s["diagnosticSearch"]["id"]);
                self.samples
                    .iter()
                    .filter(|(key, _)| id == Some(&json!(key.backend_id())))
                    .map(|(_, sample)| sample.clone())
                    .collect()
            }
            EntityType::FaultData => self.faults.clone(),
            EntityType::Trip => {
                let device = query.search.as_ref().map(|s| s["deviceSearch"]["id"].clone());
                self.trips
                    .iter()
                    .filter(|trip| Some(&trip["device"]["id"]) == device.as_ref())
                    .cloned()
                    .collect()
            }
            EntityType::Device => Vec::new(),
        }
    }
}

impl QueryProvider for FleetFixture {
    fn list_devices(&self) -> Result<Vec<Device>, ProviderError> {
        Ok(self.devices.clone())
    }

    fn run_batch(&self, queries: &[Query]) -> Result<BatchResults, ProviderError> {
        self.batch_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_batch.lock() = queries.to_vec();
        Ok(queries.iter().map(|query| self.answer(query)).collect())
    }
}

fn engine(fixture: &Arc<FleetFixture>) -> FleetEngine<FleetFixture> {
    FleetEngine::new(Arc::clone(fixture), &PollerConfig::default())
}

#[tokio::test]
async fn odometer_takes_most_recent_sample() {
    let fixture = Arc::new(FleetFixture {
        devices: vec![Device::new("d1")],
        statuses: vec![json!({"device": {"id": "d1"}, "isDriving": true, "speed": 50})],
        samples: vec![
            (
                DiagnosticKey::Odometer,
                json!({"device": {"id": "d1"}, "data": 100000, "dateTime": "2026-02-13T12:00:00Z"}),
            ),
            (
                DiagnosticKey::Odometer,
                json!({"device": {"id": "d1"}, "data": 90000, "dateTime": "2026-02-13T10:00:00Z"}),
            ),
        ],
        ..FleetFixture::default()
    });

    let snapshot = engine(&fixture).fetch().await.unwrap();
    let record = &snapshot["d1"];

    assert_eq!(
        record.diagnostic(DiagnosticKey::Odometer),
        Some(SampleValue::Number(100_000.0))
    );
    assert_eq!(record.is_driving(), Some(true));
    assert_eq!(record.speed(), Some(50.0));

    let props = record.properties();
    assert_eq!(props["odometer"], 100_000);
    assert_eq!(props["speed"], 50.0);
}

#[tokio::test]
async fn empty_fleet_never_reaches_batch() {
    let fixture = Arc::new(FleetFixture::default());

    let snapshot = engine(&fixture).fetch().await.unwrap();

    assert!(snapshot.is_empty());
    assert_eq!(fixture.batch_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn full_fleet_merge() {
    let fixture = Arc::new(FleetFixture {
        devices: vec![
            Device::new("d1").with_name("Truck"),
            Device::new("d2").with_name("Van"),
        ],
        statuses: vec![
            json!({
                "device": {"id": "d1"},
                "latitude": 45.46,
                "longitude": 9.19,
                "isIgnitionOn": true
            }),
            json!({"device": {"id": "d2"}, "speed": 0}),
            json!({"device": {"id": "ghost"}, "speed": 120}),
        ],
        samples: vec![
            (
                DiagnosticKey::Ignition,
                json!({"device": {"id": "d1"}, "data": 0, "dateTime": "2026-02-13T12:00:00Z"}),
            ),
            (
                DiagnosticKey::FuelLevel,
                json!({"device": {"id": "d2"}, "data": 62.5, "dateTime": "2026-02-13T11:00:00Z"}),
            ),
        ],
        faults: vec![json!({
            "id": "f1",
            "device": {"id": "d2"},
            "diagnostic": {"id": "DiagnosticCheckEngineLightId"},
            "faultState": "Active",
            "malfunctionLamp": true
        })],
        trips: vec![
            json!({
                "id": "t1",
                "device": {"id": "d1"},
                "start": "2026-02-12T08:00:00Z",
                "stop": "2026-02-12T09:00:00Z"
            }),
            json!({
                "id": "t2",
                "device": {"id": "d1"},
                "start": "2026-02-13T08:00:00Z",
                "stop": "2026-02-13T08:45:00Z"
            }),
        ],
        ..FleetFixture::default()
    });

    let snapshot = engine(&fixture).fetch().await.unwrap();

    assert_eq!(snapshot.len(), 2);
    assert!(!snapshot.contains_key("ghost"));

    let truck = &snapshot["d1"];
    assert_eq!(truck.ignition, Some(true));
    assert!(truck.position().is_some());
    assert_eq!(
        truck.last_trip.as_ref().and_then(|trip| trip.id.as_deref()),
        Some("t2")
    );
    assert!(truck.active_faults.is_empty());

    let van = &snapshot["d2"];
    assert_eq!(van.name(), Some("Van"));
    assert_eq!(
        van.diagnostic(DiagnosticKey::FuelLevel),
        Some(SampleValue::Number(62.5))
    );
    assert!(van.has_active_faults());
    assert!(van.last_trip.is_none());
    assert!(van.ignition.is_none());
}

#[tokio::test]
async fn batch_is_sized_to_device_count() {
    let fixture = Arc::new(FleetFixture {
        devices: vec![Device::new("d1"), Device::new("d2"), Device::new("d1")],
        ..FleetFixture::default()
    });
    let config = PollerConfig::default().with_limits(
        FetchLimits::default().with_diagnostics([DiagnosticKey::Rpm, DiagnosticKey::Voltage]),
    );

    FleetEngine::new(Arc::clone(&fixture), &config)
        .fetch()
        .await
        .unwrap();

    let batch = fixture.last_batch.lock().clone();
    // status, two diagnostics, faults, one trip query per distinct device
    assert_eq!(batch.len(), 6);
    assert_eq!(batch[1].results_limit, Some(4));
    assert_eq!(batch[3].entity, EntityType::FaultData);
    assert_eq!(batch[3].results_limit, Some(10));
    assert_eq!(batch[4].results_limit, Some(5));
}

#[tokio::test]
async fn provider_errors_are_classified() {
    struct Rejecting;

    impl QueryProvider for Rejecting {
        fn list_devices(&self) -> Result<Vec<Device>, ProviderError> {
            Err(ProviderError::Authentication("Incorrect login credentials".to_string()))
        }

        fn run_batch(&self, _queries: &[Query]) -> Result<BatchResults, ProviderError> {
            unreachable!("batch must not run after a failed listing")
        }
    }

    let engine = FleetEngine::new(Arc::new(Rejecting), &PollerConfig::default());
    let err = engine.fetch().await.unwrap_err();

    assert!(matches!(err, Error::Authentication(_)));
    assert!(!err.is_retryable());
}
