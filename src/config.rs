// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Poller configuration.

use std::time::Duration;

use crate::error::ConfigError;
use crate::model::DiagnosticKey;

/// Configuration for the poll scheduler.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use geotab_fleet::config::PollerConfig;
///
/// let config = PollerConfig::default()
///     .with_scan_interval(Duration::from_secs(120))
///     .with_failure_threshold(3)
///     .with_cooldown(Duration::from_secs(600));
///
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct PollerConfig {
    /// Time between the starts of two cycles.
    pub scan_interval: Duration,
    /// Consecutive retryable failures that open the breaker.
    pub failure_threshold: u32,
    /// Time the breaker stays open before a trial cycle.
    pub cooldown: Duration,
    /// Deadline for the device listing call.
    pub device_list_timeout: Duration,
    /// Deadline for the batch call.
    pub batch_timeout: Duration,
    /// Query sizing.
    pub limits: FetchLimits,
}

impl PollerConfig {
    /// Default scan interval.
    pub const DEFAULT_SCAN_INTERVAL: Duration = Duration::from_secs(60);
    /// Shortest scan interval accepted, to stay clear of backend rate limits.
    pub const MIN_SCAN_INTERVAL: Duration = Duration::from_secs(30);
    /// Default breaker threshold.
    pub const DEFAULT_FAILURE_THRESHOLD: u32 = 5;
    /// Default breaker cooldown.
    pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(300);
    /// Default device listing deadline.
    pub const DEFAULT_DEVICE_LIST_TIMEOUT: Duration = Duration::from_secs(10);
    /// Default batch deadline.
    pub const DEFAULT_BATCH_TIMEOUT: Duration = Duration::from_secs(30);

    /// Sets the scan interval.
    #[must_use]
    pub fn with_scan_interval(mut self, interval: Duration) -> Self {
        self.scan_interval = interval;
        self
    }

    /// Sets the breaker threshold.
    #[must_use]
    pub fn with_failure_threshold(mut self, threshold: u32) -> Self {
        self.failure_threshold = threshold;
        self
    }

    /// Sets the breaker cooldown.
    #[must_use]
    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }

    /// Sets the device listing and batch deadlines.
    #[must_use]
    pub fn with_timeouts(mut self, device_list: Duration, batch: Duration) -> Self {
        self.device_list_timeout = device_list;
        self.batch_timeout = batch;
        self
    }

    /// Sets the query sizing.
    #[must_use]
    pub fn with_limits(mut self, limits: FetchLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Checks every bound.
    ///
    /// # Errors
    ///
    /// Returns the first violated bound.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scan_interval < Self::MIN_SCAN_INTERVAL {
            return Err(ConfigError::ScanIntervalTooShort {
                min_secs: Self::MIN_SCAN_INTERVAL.as_secs(),
                actual_secs: self.scan_interval.as_secs(),
            });
        }
        if self.failure_threshold == 0 {
            return Err(ConfigError::ZeroFailureThreshold);
        }
        if self.cooldown.is_zero() {
            return Err(ConfigError::ZeroDuration("cooldown"));
        }
        if self.device_list_timeout.is_zero() {
            return Err(ConfigError::ZeroDuration("device list timeout"));
        }
        if self.batch_timeout.is_zero() {
            return Err(ConfigError::ZeroDuration("batch timeout"));
        }
        self.limits.validate()
    }
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            scan_interval: Self::DEFAULT_SCAN_INTERVAL,
            failure_threshold: Self::DEFAULT_FAILURE_THRESHOLD,
            cooldown: Self::DEFAULT_COOLDOWN,
            device_list_timeout: Self::DEFAULT_DEVICE_LIST_TIMEOUT,
            batch_timeout: Self::DEFAULT_BATCH_TIMEOUT,
            limits: FetchLimits::default(),
        }
    }
}

/// Sizing of the planned queries.
///
/// The backend returns unsorted result windows rather than the latest
/// entry per device, so diagnostic and fault queries over-fetch by a
/// multiple of the device count. This is a heuristic: large fleets can
/// still miss a device's sample in a given cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchLimits {
    /// Diagnostic results limit as a multiple of the device count.
    pub diagnostic_overfetch: usize,
    /// Fault results limit as a multiple of the device count.
    pub fault_overfetch: usize,
    /// Trips requested per device.
    pub trip_window: usize,
    /// Tracked diagnostics, in planning order.
    pub diagnostics: Vec<DiagnosticKey>,
}

impl FetchLimits {
    /// Default diagnostic over-fetch factor.
    pub const DEFAULT_DIAGNOSTIC_OVERFETCH: usize = 2;
    /// Default fault over-fetch factor.
    pub const DEFAULT_FAULT_OVERFETCH: usize = 5;
    /// Default trip window.
    pub const DEFAULT_TRIP_WINDOW: usize = 5;

    /// Restricts the tracked diagnostics.
    #[must_use]
    pub fn with_diagnostics(
        mut self,
        diagnostics: impl IntoIterator<Item = DiagnosticKey>,
    ) -> Self {
        self.diagnostics = diagnostics.into_iter().collect();
        self
    }

    /// Sets the trip window.
    #[must_use]
    pub fn with_trip_window(mut self, window: usize) -> Self {
        self.trip_window = window;
        self
    }

    /// Checks every bound.
    ///
    /// # Errors
    ///
    /// Returns the first violated bound.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.diagnostic_overfetch == 0 {
            return Err(ConfigError::ZeroLimit("diagnostic over-fetch factor"));
        }
        if self.fault_overfetch == 0 {
            return Err(ConfigError::ZeroLimit("fault over-fetch factor"));
        }
        if self.trip_window == 0 {
            return Err(ConfigError::ZeroLimit("trip window"));
        }
        if self.diagnostics.is_empty() {
            return Err(ConfigError::NoDiagnostics);
        }
        Ok(())
    }
}

impl Default for FetchLimits {
    fn default() -> Self {
        Self {
            diagnostic_overfetch: Self::DEFAULT_DIAGNOSTIC_OVERFETCH,
            fault_overfetch: Self::DEFAULT_FAULT_OVERFETCH,
            trip_window: Self::DEFAULT_TRIP_WINDOW,
            diagnostics: DiagnosticKey::ALL.to_vec(),
        }
    }
}
