// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device listing entries.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// A telematics device as returned by the device listing.
///
/// A fresh snapshot is produced every cycle; devices are never mutated in
/// place. Attributes the library does not model are kept in `extra` so they
/// still reach the merged record.
///
/// # Examples
///
/// ```
/// use geotab_fleet::model::Device;
///
/// let json = r#"{"id":"b1","name":"Van 12","deviceType":"GO9","licensePlate":"AB-123"}"#;
/// let device: Device = serde_json::from_str(json).unwrap();
///
/// assert_eq!(device.id, "b1");
/// assert_eq!(device.device_type.as_deref(), Some("GO9"));
/// assert!(device.extra.contains_key("licensePlate"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    /// Unique identifier, stable across cycles. Empty if the backend omitted it.
    #[serde(default, deserialize_with = "deserialize_id")]
    pub id: String,
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Hardware type tag (e.g. `GO9`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_type: Option<String>,
    /// Hardware serial number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serial_number: Option<String>,
    /// Firmware version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Remaining attributes.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Device {
    /// Creates a device with the given identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// Sets the display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the hardware type tag.
    #[must_use]
    pub fn with_device_type(mut self, device_type: impl Into<String>) -> Self {
        self.device_type = Some(device_type.into());
        self
    }

    /// Returns `true` if the listing supplied a usable identifier.
    #[must_use]
    pub fn has_id(&self) -> bool {
        !self.id.is_empty()
    }
}

/// Treats a `null` identifier like a missing one.
fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}
