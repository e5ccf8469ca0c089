// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Trip records.

use serde::{Deserialize, Serialize};

use super::EntityRef;

/// A trip driven by a device.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripRecord {
    /// Trip identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// The device that drove the trip.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<EntityRef>,
    /// Start time, ISO-8601 UTC.
    #[serde(default)]
    pub start: String,
    /// Stop time; absent while the trip is ongoing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop: Option<String>,
    /// Distance driven, in kilometres.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
    /// Driving duration as reported by the backend (e.g. `00:30:00`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driving_duration: Option<String>,
    /// Maximum speed during the trip.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum_speed: Option<f64>,
    /// Average speed during the trip.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_speed: Option<f64>,
}

impl TripRecord {
    /// Creates a trip starting at `start`.
    #[must_use]
    pub fn new(start: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            ..Self::default()
        }
    }

    /// Returns `true` if the trip has not stopped yet.
    #[must_use]
    pub fn is_ongoing(&self) -> bool {
        self.stop.is_none()
    }
}
