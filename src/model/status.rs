// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Live device status.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use super::EntityRef;

/// GPS position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Position {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
}

/// Live status of a device (`DeviceStatusInfo`).
///
/// This is the most real-time source in a cycle, so its fields take
/// precedence over diagnostics when records are merged.
///
/// # Examples
///
/// ```
/// use geotab_fleet::model::DeviceStatus;
///
/// let json = r#"{"device":{"id":"b1"},"latitude":45.0,"longitude":9.0,"isDriving":true}"#;
/// let status: DeviceStatus = serde_json::from_str(json).unwrap();
///
/// assert_eq!(status.is_driving, Some(true));
/// assert!(status.position().is_some());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceStatus {
    /// The device this status describes.
    pub device: EntityRef,
    /// Latitude in degrees.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    /// Longitude in degrees.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    /// Current speed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,
    /// Heading in degrees.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bearing: Option<f64>,
    /// Whether the vehicle is currently driving.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_driving: Option<bool>,
    /// Whether the device is currently communicating.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_device_communicating: Option<bool>,
    /// Time of the status fix, ISO-8601 UTC.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_time: Option<String>,
    /// Ignition flag, when the backend reports one.
    #[serde(
        default,
        alias = "isIgnitionOn",
        deserialize_with = "deserialize_flag",
        skip_serializing_if = "Option::is_none"
    )]
    pub ignition: Option<bool>,
    /// Remaining status fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl DeviceStatus {
    /// Creates an empty status for the given device.
    #[must_use]
    pub fn new(device_id: impl Into<String>) -> Self {
        Self {
            device: EntityRef::new(device_id),
            latitude: None,
            longitude: None,
            speed: None,
            bearing: None,
            is_driving: None,
            is_device_communicating: None,
            date_time: None,
            ignition: None,
            extra: Map::new(),
        }
    }

    /// Returns the position if both coordinates are known.
    #[must_use]
    pub fn position(&self) -> Option<Position> {
        Some(Position {
            latitude: self.latitude?,
            longitude: self.longitude?,
        })
    }
}

/// Accepts `true`/`false` as well as numeric 1/0 flags.
fn deserialize_flag<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Bool(flag)) => Some(flag),
        Some(Value::Number(n)) => n.as_f64().map(|n| n != 0.0),
        _ => None,
    })
}
