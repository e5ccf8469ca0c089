// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Circuit breaker guarding the fetch cycle.
//!
//! The breaker is either closed (every cycle runs) or open since a given
//! instant (cycles are skipped). Once the cooldown has elapsed the next
//! cycle runs as a trial: success closes the breaker, failure re-opens it
//! straight away because the failure count is still at or above the
//! threshold.

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::error::Error;

/// Mutable breaker state, owned by the scheduler.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CircuitBreakerState {
    /// Retryable failures since the last success.
    pub consecutive_failures: u32,
    /// When the breaker opened, if it is open.
    pub open_since: Option<DateTime<Utc>>,
}

impl CircuitBreakerState {
    /// Returns `true` if cycles are currently being skipped.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.open_since.is_some()
    }
}

/// Verdict for an upcoming cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerCheck {
    /// Breaker closed, run the cycle.
    Closed,
    /// Cooldown elapsed, run one trial cycle.
    Trial,
    /// Breaker open, skip the cycle.
    Open {
        /// Remaining cooldown.
        retry_in: Duration,
    },
}

impl BreakerCheck {
    /// Returns `true` if the cycle may contact the provider.
    #[must_use]
    pub fn allows_attempt(&self) -> bool {
        !matches!(self, Self::Open { .. })
    }
}

/// Counts consecutive retryable failures and opens after a threshold.
#[derive(Debug, Clone)]
pub struct CircuitBreaker {
    threshold: u32,
    cooldown: Duration,
    state: CircuitBreakerState,
}

impl CircuitBreaker {
    /// Creates a closed breaker.
    #[must_use]
    pub fn new(threshold: u32, cooldown: Duration) -> Self {
        Self {
            threshold,
            cooldown,
            state: CircuitBreakerState::default(),
        }
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> CircuitBreakerState {
        self.state
    }

    /// Decides whether a cycle starting at `now` may run.
    ///
    /// Clears `open_since` when the cooldown has elapsed.
    pub fn check(&mut self, now: DateTime<Utc>) -> BreakerCheck {
        let Some(open_since) = self.state.open_since else {
            return BreakerCheck::Closed;
        };

        let elapsed = (now - open_since).to_std().unwrap_or_default();
        if elapsed < self.cooldown {
            return BreakerCheck::Open {
                retry_in: self.cooldown - elapsed,
            };
        }

        self.state.open_since = None;
        tracing::info!(
            failures = self.state.consecutive_failures,
            "Cooldown elapsed, attempting trial cycle"
        );
        BreakerCheck::Trial
    }

    /// Returns the remaining cooldown at `now`, if the breaker is open.
    #[must_use]
    pub fn retry_in(&self, now: DateTime<Utc>) -> Option<Duration> {
        let open_since = self.state.open_since?;
        let elapsed = (now - open_since).to_std().unwrap_or_default();
        Some(self.cooldown.saturating_sub(elapsed))
    }

    /// Records a successful cycle.
    pub fn record_success(&mut self) {
        if self.state.consecutive_failures > 0 {
            tracing::info!(
                failures = self.state.consecutive_failures,
                "Fleet backend recovered"
            );
        }
        self.state = CircuitBreakerState::default();
    }

    /// Records a failed cycle.
    ///
    /// Errors that don't count toward the breaker, such as rejected
    /// credentials, leave the state untouched. Returns `true` if this
    /// failure opened the breaker.
    pub fn record_failure(&mut self, error: &Error, now: DateTime<Utc>) -> bool {
        if !error.counts_toward_breaker() {
            return false;
        }

        self.state.consecutive_failures = self.state.consecutive_failures.saturating_add(1);
        if self.state.consecutive_failures < self.threshold {
            return false;
        }

        self.state.open_since = Some(now);
        tracing::error!(
            failures = self.state.consecutive_failures,
            cooldown_secs = self.cooldown.as_secs(),
            error = %error,
            "Circuit breaker opened"
        );
        true
    }
}
