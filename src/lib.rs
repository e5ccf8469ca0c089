// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `geotab_fleet` - Batched fleet telemetry polling for Geotab MyGeotab.
//!
//! This library periodically fetches devices, live status, diagnostic
//! samples, active faults and recent trips from a telematics backend,
//! bundles the queries into one round trip, and merges the results into
//! one record per device. A circuit breaker keeps a failing backend from
//! being hammered and recovers after a cooldown.
//!
//! # Pipeline
//!
//! - **Planning**: one tagged query per data source ([`engine::CallPlanner`])
//! - **Execution**: blocking provider calls on worker threads under a deadline
//!   ([`engine::BatchExecutor`])
//! - **Demultiplexing**: positional results routed back by tag
//! - **Merging**: sources layered by precedence into a [`CombinedDeviceRecord`]
//! - **Scheduling**: interval polling behind a circuit breaker ([`Poller`])
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use geotab_fleet::{GeotabConfig, PollEvent, Poller, PollerConfig};
//!
//! #[tokio::main]
//! async fn main() -> geotab_fleet::Result<()> {
//!     let client = GeotabConfig::new("fleet@example.com", "secret")
//!         .with_database("acme")
//!         .into_client()?;
//!
//!     let config = PollerConfig::default()
//!         .with_scan_interval(Duration::from_secs(120))
//!         .with_failure_threshold(3);
//!
//!     let poller = Poller::new(Arc::new(client), config)?;
//!     let mut events = poller.subscribe();
//!     let handle = poller.spawn();
//!
//!     while let Ok(event) = events.recv().await {
//!         match event {
//!             PollEvent::Refreshed { .. } => {
//!                 for (id, record) in handle.data().iter() {
//!                     println!("{id}: {:?}", record.properties().get("speed"));
//!                 }
//!             }
//!             PollEvent::AuthenticationRequired { message } => {
//!                 eprintln!("reconfigure credentials: {message}");
//!                 break;
//!             }
//!             PollEvent::Unavailable { reason, .. } => eprintln!("retrying: {reason}"),
//!         }
//!     }
//!
//!     handle.stop().await
//! }
//! ```
//!
//! # Custom Providers
//!
//! Anything implementing [`QueryProvider`] can feed the engine. Provider
//! calls are blocking and run on tokio's blocking pool.

pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod model;
pub mod provider;
pub mod scheduler;

pub use config::{FetchLimits, PollerConfig};
pub use engine::FleetEngine;
pub use error::{ConfigError, Error, ProviderError, Result};
pub use event::{EventBus, ListenerId, PollEvent};
pub use model::{CombinedDeviceRecord, DiagnosticKey, FleetSnapshot};
#[cfg(feature = "http")]
pub use provider::{GeotabClient, GeotabConfig};
pub use provider::{Query, QueryProvider};
pub use scheduler::{CircuitBreaker, Poller, PollerHandle};
