// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Periodic polling behind a circuit breaker.
//!
//! [`Poller`] wraps a [`FleetEngine`](crate::engine::FleetEngine) fetch as
//! a single fallible operation. Retryable failures feed the
//! [`CircuitBreaker`]; once it opens, cycles are skipped without touching
//! the provider until the cooldown has elapsed. Rejected credentials stop
//! the loop instead, since retrying cannot fix them.
//!
//! Breaker timing reads a [`Clock`], so tests can substitute a
//! [`ManualClock`].

mod breaker;
mod clock;
mod poller;

pub use breaker::{BreakerCheck, CircuitBreaker, CircuitBreakerState};
pub use clock::{Clock, ManualClock, SystemClock};
pub use poller::{Poller, PollerHandle};
