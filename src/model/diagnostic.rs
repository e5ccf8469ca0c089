// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Tracked diagnostics and their samples.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::EntityRef;

/// A named telemetry channel bound to a backend diagnostic identifier.
///
/// The set is static: every key maps to exactly one backend id, and the
/// key's name is what appears in the merged record.
///
/// # Examples
///
/// ```
/// use geotab_fleet::model::DiagnosticKey;
///
/// let key: DiagnosticKey = "fuel_level".parse().unwrap();
/// assert_eq!(key, DiagnosticKey::FuelLevel);
/// assert_eq!(key.backend_id(), "DiagnosticFuelLevelId");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKey {
    /// Adjusted odometer, in metres.
    Odometer,
    /// Raw odometer reported by the vehicle, in metres.
    OdometerRaw,
    /// Device supply voltage.
    Voltage,
    /// Fuel level, in percent.
    FuelLevel,
    /// Front left tire pressure, in pascals.
    TirePressureFrontLeft,
    /// Front right tire pressure, in pascals.
    TirePressureFrontRight,
    /// Rear left tire pressure, in pascals.
    TirePressureRearLeft,
    /// Rear right tire pressure, in pascals.
    TirePressureRearRight,
    /// Engine speed.
    Rpm,
    /// Engine coolant temperature.
    CoolantTemp,
    /// Accelerator pedal position.
    AcceleratorPos,
    /// Adjusted engine hours.
    EngineHours,
    /// Raw engine hours reported by the vehicle.
    EngineHoursRaw,
    /// Ignition state (1 on, 0 off).
    Ignition,
    /// Any door ajar.
    DoorStatus,
    /// Driver seatbelt (1 unbuckled).
    SeatbeltStatus,
}

impl DiagnosticKey {
    /// Every tracked diagnostic, in planning order.
    pub const ALL: [Self; 16] = [
        Self::Odometer,
        Self::OdometerRaw,
        Self::Voltage,
        Self::FuelLevel,
        Self::TirePressureFrontLeft,
        Self::TirePressureFrontRight,
        Self::TirePressureRearLeft,
        Self::TirePressureRearRight,
        Self::Rpm,
        Self::CoolantTemp,
        Self::AcceleratorPos,
        Self::EngineHours,
        Self::EngineHoursRaw,
        Self::Ignition,
        Self::DoorStatus,
        Self::SeatbeltStatus,
    ];

    /// Returns the field name used in merged records.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Odometer => "odometer",
            Self::OdometerRaw => "odometer_raw",
            Self::Voltage => "voltage",
            Self::FuelLevel => "fuel_level",
            Self::TirePressureFrontLeft => "tire_pressure_front_left",
            Self::TirePressureFrontRight => "tire_pressure_front_right",
            Self::TirePressureRearLeft => "tire_pressure_rear_left",
            Self::TirePressureRearRight => "tire_pressure_rear_right",
            Self::Rpm => "rpm",
            Self::CoolantTemp => "coolant_temp",
            Self::AcceleratorPos => "accelerator_pos",
            Self::EngineHours => "engine_hours",
            Self::EngineHoursRaw => "engine_hours_raw",
            Self::Ignition => "ignition",
            Self::DoorStatus => "door_status",
            Self::SeatbeltStatus => "seatbelt_status",
        }
    }

    /// Returns the backend diagnostic identifier.
    #[must_use]
    pub const fn backend_id(self) -> &'static str {
        match self {
            Self::Odometer => "DiagnosticOdometerAdjustmentId",
            Self::OdometerRaw => "DiagnosticOdometerId",
            Self::Voltage => "DiagnosticGoDeviceVoltageId",
            Self::FuelLevel => "DiagnosticFuelLevelId",
            Self::TirePressureFrontLeft => "DiagnosticTirePressureFrontLeftId",
            Self::TirePressureFrontRight => "DiagnosticTirePressureFrontRightId",
            Self::TirePressureRearLeft => "DiagnosticTirePressureRearLeftId",
            Self::TirePressureRearRight => "DiagnosticTirePressureRearRightId",
            Self::Rpm => "DiagnosticEngineSpeedId",
            Self::CoolantTemp => "DiagnosticEngineCoolantTemperatureId",
            Self::AcceleratorPos => "DiagnosticAcceleratorPedalPositionId",
            Self::EngineHours => "DiagnosticEngineHoursAdjustmentId",
            Self::EngineHoursRaw => "DiagnosticEngineHoursId",
            Self::Ignition => "DiagnosticIgnitionId",
            Self::DoorStatus => "DiagnosticDoorAjarId",
            Self::SeatbeltStatus => "DiagnosticDriverSeatbeltId",
        }
    }
}

impl fmt::Display for DiagnosticKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DiagnosticKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|key| key.name() == s)
            .ok_or_else(|| format!("unknown diagnostic: {s}"))
    }
}

/// Payload of a diagnostic sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SampleValue {
    /// Boolean payload.
    Flag(bool),
    /// Numeric payload.
    Number(f64),
}

impl SampleValue {
    /// Returns the payload as a number (`true` is 1, `false` is 0).
    #[must_use]
    pub fn as_f64(self) -> f64 {
        match self {
            Self::Flag(flag) => f64::from(u8::from(flag)),
            Self::Number(n) => n,
        }
    }

    /// Returns the payload as a flag (any non-zero number is `true`).
    #[must_use]
    pub fn as_bool(self) -> bool {
        match self {
            Self::Flag(flag) => flag,
            Self::Number(n) => n != 0.0,
        }
    }

    /// Converts the payload to JSON, keeping integral numbers integral.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn to_json(self) -> Value {
        match self {
            Self::Flag(flag) => Value::Bool(flag),
            Self::Number(n) if n.fract() == 0.0 && n.abs() < 9.0e15 => Value::from(n as i64),
            Self::Number(n) => Value::from(n),
        }
    }
}

/// One diagnostic observation for one device.
///
/// # Examples
///
/// ```
/// use geotab_fleet::model::{Sample, SampleValue};
///
/// let json = r#"{"device":{"id":"b1"},"data":13.8,"dateTime":"2026-02-13T12:00:00.000Z"}"#;
/// let sample: Sample = serde_json::from_str(json).unwrap();
///
/// assert_eq!(sample.device.id, "b1");
/// assert_eq!(sample.data, SampleValue::Number(13.8));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sample {
    /// The device the sample belongs to.
    pub device: EntityRef,
    /// Observed value.
    pub data: SampleValue,
    /// Observation time, ISO-8601 UTC. Empty if the backend omitted it.
    #[serde(default)]
    pub date_time: String,
    /// The backend diagnostic the sample was recorded for.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnostic: Option<EntityRef>,
}

impl Sample {
    /// Creates a sample for the given device.
    #[must_use]
    pub fn new(
        device_id: impl Into<String>,
        data: SampleValue,
        date_time: impl Into<String>,
    ) -> Self {
        Self {
            device: EntityRef::new(device_id),
            data,
            date_time: date_time.into(),
            diagnostic: None,
        }
    }
}
