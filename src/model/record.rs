// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Merged per-device records.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use serde_json::{Map, Value};

use super::{
    Device, DeviceStatus, DiagnosticKey, FaultRecord, Position, Sample, SampleValue, TripRecord,
};

/// The published output of a successful cycle, keyed by device identifier.
pub type FleetSnapshot = HashMap<String, CombinedDeviceRecord>;

/// Everything known about one device after a fetch cycle.
///
/// Records are rebuilt from scratch every cycle. Sources are layered in
/// precedence order: device attributes, then diagnostics, faults and the
/// latest trip, then live status. `ignition` is derived from the status
/// flag when present and falls back to the ignition diagnostic otherwise.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CombinedDeviceRecord {
    /// Base attributes from the device listing.
    pub device: Device,
    /// Most recent sample per tracked diagnostic.
    pub diagnostics: BTreeMap<DiagnosticKey, Sample>,
    /// Faults active in this cycle.
    pub active_faults: Vec<FaultRecord>,
    /// The trip with the latest start time, if any was returned.
    pub last_trip: Option<TripRecord>,
    /// Live status, if the device appeared in the status listing.
    pub status: Option<DeviceStatus>,
    /// Normalized ignition state.
    pub ignition: Option<bool>,
}

impl CombinedDeviceRecord {
    /// Starts a record from the device's base attributes.
    #[must_use]
    pub fn new(device: Device) -> Self {
        Self {
            device,
            diagnostics: BTreeMap::new(),
            active_faults: Vec::new(),
            last_trip: None,
            status: None,
            ignition: None,
        }
    }

    /// Returns the device identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.device.id
    }

    /// Returns the device's display name.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.device.name.as_deref()
    }

    /// Returns the latest value of a diagnostic.
    #[must_use]
    pub fn diagnostic(&self, key: DiagnosticKey) -> Option<SampleValue> {
        self.diagnostics.get(&key).map(|sample| sample.data)
    }

    /// Returns the live position.
    #[must_use]
    pub fn position(&self) -> Option<Position> {
        self.status.as_ref().and_then(DeviceStatus::position)
    }

    /// Returns the live speed.
    #[must_use]
    pub fn speed(&self) -> Option<f64> {
        self.status.as_ref().and_then(|status| status.speed)
    }

    /// Returns whether the vehicle is driving.
    #[must_use]
    pub fn is_driving(&self) -> Option<bool> {
        self.status.as_ref().and_then(|status| status.is_driving)
    }

    /// Returns `true` if any fault is active.
    #[must_use]
    pub fn has_active_faults(&self) -> bool {
        !self.active_faults.is_empty()
    }

    /// Flattens the record into a single name-to-value map.
    ///
    /// Later layers overwrite earlier ones on name collisions, so status
    /// fields win over diagnostic values of the same name. `ignition` is
    /// written last as `1` or `0`. The status' own `device` reference is
    /// omitted.
    ///
    /// # Examples
    ///
    /// ```
    /// use geotab_fleet::model::{CombinedDeviceRecord, Device};
    ///
    /// let mut record = CombinedDeviceRecord::new(Device::new("b1").with_name("Van"));
    /// record.ignition = Some(true);
    ///
    /// let props = record.properties();
    /// assert_eq!(props["name"], "Van");
    /// assert_eq!(props["ignition"], 1);
    /// assert_eq!(props["active_faults"], serde_json::json!([]));
    /// ```
    #[must_use]
    pub fn properties(&self) -> Map<String, Value> {
        let mut props = to_object(&self.device);

        for (key, sample) in &self.diagnostics {
            props.insert(key.name().to_string(), sample.data.to_json());
        }

        props.insert(
            "active_faults".to_string(),
            serde_json::to_value(&self.active_faults).unwrap_or_default(),
        );

        if let Some(trip) = &self.last_trip {
            props.insert("last_trip".to_string(), Value::Object(to_object(trip)));
        }

        if let Some(status) = &self.status {
            let mut fields = to_object(status);
            fields.remove("device");
            props.extend(fields);
        }

        if let Some(ignition) = self.ignition {
            props.insert("ignition".to_string(), Value::from(u8::from(ignition)));
        }

        props
    }
}

fn to_object<T: Serialize>(value: &T) -> Map<String, Value> {
    match serde_json::to_value(value) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    }
}
