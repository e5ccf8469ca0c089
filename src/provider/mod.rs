// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Remote query providers.
//!
//! A [`QueryProvider`] performs object queries against the telematics
//! backend: one device listing, or a batch of queries executed in a single
//! round trip with results returned in the same order as the queries.
//!
//! Provider calls are blocking. The engine always runs them on a worker
//! thread under a deadline, so implementations may block freely.
//!
//! # Providers
//!
//! - [`GeotabClient`]: JSON-RPC over HTTPS (feature `http`)

#[cfg(feature = "http")]
mod geotab;

#[cfg(feature = "http")]
pub use geotab::{GeotabClient, GeotabConfig};

use std::fmt;

use serde_json::{Map, Value};

use crate::error::ProviderError;
use crate::model::Device;

/// Results of a batch: one list of raw entities per query, in query order.
pub type BatchResults = Vec<Vec<Value>>;

/// Backend object types the engine queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityType {
    /// Device listing.
    Device,
    /// Live status per device.
    DeviceStatusInfo,
    /// Diagnostic samples.
    StatusData,
    /// Active faults.
    FaultData,
    /// Trips.
    Trip,
}

impl EntityType {
    /// Returns the backend type name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Device => "Device",
            Self::DeviceStatusInfo => "DeviceStatusInfo",
            Self::StatusData => "StatusData",
            Self::FaultData => "FaultData",
            Self::Trip => "Trip",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single object query.
///
/// # Examples
///
/// ```
/// use geotab_fleet::provider::{EntityType, Query};
/// use serde_json::json;
///
/// let query = Query::new(EntityType::Trip)
///     .with_search(json!({"deviceSearch": {"id": "b1"}}))
///     .with_results_limit(5);
///
/// assert_eq!(
///     query.to_params(),
///     json!({"typeName": "Trip", "search": {"deviceSearch": {"id": "b1"}}, "resultsLimit": 5})
/// );
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    /// The object type to fetch.
    pub entity: EntityType,
    /// Backend search criteria.
    pub search: Option<Value>,
    /// Maximum number of results.
    pub results_limit: Option<usize>,
}

impl Query {
    /// Creates an unrestricted query for the given type.
    #[must_use]
    pub fn new(entity: EntityType) -> Self {
        Self {
            entity,
            search: None,
            results_limit: None,
        }
    }

    /// Sets the search criteria.
    #[must_use]
    pub fn with_search(mut self, search: Value) -> Self {
        self.search = Some(search);
        self
    }

    /// Sets the results limit.
    #[must_use]
    pub fn with_results_limit(mut self, limit: usize) -> Self {
        self.results_limit = Some(limit);
        self
    }

    /// Builds the backend `Get` parameters.
    #[must_use]
    pub fn to_params(&self) -> Value {
        let mut params = Map::new();
        params.insert("typeName".to_string(), Value::from(self.entity.as_str()));
        if let Some(search) = &self.search {
            params.insert("search".to_string(), search.clone());
        }
        if let Some(limit) = self.results_limit {
            params.insert("resultsLimit".to_string(), Value::from(limit));
        }
        Value::Object(params)
    }
}

/// A blocking remote query backend.
///
/// Both calls may fail with [`ProviderError::Authentication`] when the
/// credentials are rejected, or with any other [`ProviderError`] variant
/// for transient failures.
pub trait QueryProvider: Send + Sync + 'static {
    /// Lists every device visible to the configured account.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError` if the backend call fails.
    fn list_devices(&self) -> Result<Vec<Device>, ProviderError>;

    /// Executes the queries in one round trip.
    ///
    /// The result must contain exactly one entry per query, in query order.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError` if the backend call fails.
    fn run_batch(&self, queries: &[Query]) -> Result<BatchResults, ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_query_params_only_carry_type() {
        let params = Query::new(EntityType::DeviceStatusInfo).to_params();
        assert_eq!(params, serde_json::json!({"typeName": "DeviceStatusInfo"}));
    }

    #[test]
    fn entity_type_display() {
        assert_eq!(EntityType::FaultData.to_string(), "FaultData");
    }
}
