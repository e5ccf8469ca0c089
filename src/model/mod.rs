// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Typed fleet telemetry entities.
//!
//! These types mirror the backend's JSON objects closely enough to be
//! deserialized straight from query results:
//!
//! - [`Device`] - an entry of the device listing
//! - [`Sample`] - one diagnostic observation (`StatusData`)
//! - [`FaultRecord`] - one active fault (`FaultData`)
//! - [`TripRecord`] - one trip (`Trip`)
//! - [`DeviceStatus`] - live status (`DeviceStatusInfo`)
//!
//! [`CombinedDeviceRecord`] is the merged per-device output of a fetch cycle.

mod device;
mod diagnostic;
mod fault;
mod record;
mod status;
mod trip;

use serde::{Deserialize, Serialize};

pub use device::Device;
pub use diagnostic::{DiagnosticKey, Sample, SampleValue};
pub use fault::{FaultInfo, FaultRecord, FaultSeverity};
pub use record::{CombinedDeviceRecord, FleetSnapshot};
pub use status::{DeviceStatus, Position};
pub use trip::TripRecord;

/// Reference to another backend entity by identifier (e.g. `{"id": "b12"}`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityRef {
    /// The referenced entity's identifier.
    pub id: String,
}

impl EntityRef {
    /// Creates a reference to the entity with the given identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}
