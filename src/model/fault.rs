// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Active fault records.

use serde::{Deserialize, Serialize};

use super::EntityRef;

/// Known device faults, matched by a substring of the diagnostic id.
const KNOWN_FAULTS: [(&str, FaultInfo); 6] = [
    (
        "DeviceHasBeenUnplugged",
        FaultInfo::new("Device Unplugged", "136"),
    ),
    (
        "RestartedBecauseAllPower",
        FaultInfo::new("Device Restarted - Power Removed", "130"),
    ),
    ("LowVoltage", FaultInfo::new("Low Battery Voltage", "131")),
    ("FirmwareUpdate", FaultInfo::new("Firmware Update", "132")),
    ("InternalWatchdog", FaultInfo::new("Internal Watchdog", "133")),
    ("InternalReset", FaultInfo::new("Internal Reset", "134")),
];

/// Human-readable description of a known fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FaultInfo {
    /// Display name.
    pub name: &'static str,
    /// Fault code.
    pub code: &'static str,
}

impl FaultInfo {
    const fn new(name: &'static str, code: &'static str) -> Self {
        Self { name, code }
    }
}

/// Severity derived from a fault's warning lamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FaultSeverity {
    /// No lamp is lit.
    Info,
    /// Amber warning, malfunction or protect lamp is lit.
    Warning,
    /// Red stop lamp is lit.
    Critical,
}

/// One active fault reported for a device.
///
/// Each cycle's fault list is authoritative: records are never
/// deduplicated against earlier cycles.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FaultRecord {
    /// Fault identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// The device the fault belongs to.
    #[serde(default)]
    pub device: Option<EntityRef>,
    /// The diagnostic the fault refers to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnostic: Option<EntityRef>,
    /// When the fault was recorded, ISO-8601 UTC.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_time: Option<String>,
    /// Backend fault state (e.g. `Active`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fault_state: Option<String>,
    /// Amber warning lamp.
    #[serde(default)]
    pub amber_warning_lamp: bool,
    /// Red stop lamp.
    #[serde(default)]
    pub red_stop_lamp: bool,
    /// Malfunction indicator lamp.
    #[serde(default)]
    pub malfunction_lamp: bool,
    /// Protect warning lamp.
    #[serde(default)]
    pub protect_warning_lamp: bool,
}

impl FaultRecord {
    /// Returns the identifier of the device this fault belongs to.
    #[must_use]
    pub fn device_id(&self) -> Option<&str> {
        self.device.as_ref().map(|device| device.id.as_str())
    }

    /// Returns the severity implied by the lamp flags.
    #[must_use]
    pub fn severity(&self) -> FaultSeverity {
        if self.red_stop_lamp {
            FaultSeverity::Critical
        } else if self.amber_warning_lamp || self.malfunction_lamp || self.protect_warning_lamp {
            FaultSeverity::Warning
        } else {
            FaultSeverity::Info
        }
    }

    /// Looks up a description for well-known device faults.
    ///
    /// # Examples
    ///
    /// ```
    /// use geotab_fleet::model::{EntityRef, FaultRecord};
    ///
    /// let fault = FaultRecord {
    ///     diagnostic: Some(EntityRef::new("DiagnosticLowVoltageId")),
    ///     ..FaultRecord::default()
    /// };
    /// let info = fault.info().unwrap();
    /// assert_eq!(info.name, "Low Battery Voltage");
    /// assert_eq!(info.code, "131");
    /// ```
    #[must_use]
    pub fn info(&self) -> Option<FaultInfo> {
        let diagnostic = &self.diagnostic.as_ref()?.id;
        KNOWN_FAULTS
            .iter()
            .find(|(pattern, _)| diagnostic.contains(pattern))
            .map(|(_, info)| *info)
    }
}
