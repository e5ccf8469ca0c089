// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the `geotab_fleet` library.
//!
//! The hierarchy mirrors how failures are handled by the poll scheduler:
//!
//! - [`ProviderError`] is what a remote query provider reports.
//! - [`Error`] is what a fetch cycle reports. Converting a provider error
//!   classifies it: rejected credentials become [`Error::Authentication`],
//!   everything else becomes [`Error::Provider`].
//! - [`ConfigError`] covers invalid poller configuration values.

use std::time::Duration;

use thiserror::Error;

/// The main error type for this library.
#[derive(Debug, Error)]
pub enum Error {
    /// The backend rejected the configured credentials.
    ///
    /// This failure is not retried by the circuit breaker: the
    /// configuration has to change before polling can succeed again.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// A device listing or batch call exceeded its deadline.
    #[error("{operation} timed out after {after_ms} ms")]
    Timeout {
        /// The operation that timed out.
        operation: &'static str,
        /// The deadline that elapsed, in milliseconds.
        after_ms: u64,
    },

    /// Any other backend or connection failure.
    #[error("provider error: {0}")]
    Provider(ProviderError),

    /// The cycle was skipped because the circuit breaker is open.
    #[error("circuit breaker open, retrying in {}s", retry_in.as_secs())]
    CircuitOpen {
        /// Time left until the next trial attempt.
        retry_in: Duration,
    },

    /// The worker running a blocking provider call panicked or was cancelled.
    #[error("worker task failed: {0}")]
    Worker(String),

    /// The poller configuration is invalid.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl Error {
    /// Returns `true` if polling may succeed again without reconfiguration.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::Authentication(_) | Self::Config(_))
    }

    /// Returns `true` if this failure increments the breaker's failure counter.
    #[must_use]
    pub fn counts_toward_breaker(&self) -> bool {
        matches!(
            self,
            Self::Timeout { .. } | Self::Provider(_) | Self::Worker(_)
        )
    }

    /// Returns `true` if this is an authentication failure.
    #[must_use]
    pub fn is_authentication(&self) -> bool {
        matches!(self, Self::Authentication(_))
    }
}

impl From<ProviderError> for Error {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::Authentication(message) => Self::Authentication(message),
            other => Self::Provider(other),
        }
    }
}

/// Errors reported by a remote query provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Credentials were rejected by the backend.
    #[error("invalid credentials: {0}")]
    Authentication(String),

    /// The backend reported an exception.
    #[error("{name}: {message}")]
    Api {
        /// The backend's exception name.
        name: String,
        /// The backend's error message.
        message: String,
    },

    /// HTTP request failed.
    #[cfg(feature = "http")]
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Connection-level failure or unexpected HTTP status.
    #[error("transport error: {0}")]
    Transport(String),

    /// The backend reply could not be understood.
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl From<serde_json::Error> for ProviderError {
    fn from(err: serde_json::Error) -> Self {
        Self::Malformed(err.to_string())
    }
}

/// Errors related to invalid configuration values.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The scan interval is below the enforced minimum.
    #[error("scan interval {actual_secs}s is below the minimum of {min_secs}s")]
    ScanIntervalTooShort {
        /// Minimum allowed interval in seconds.
        min_secs: u64,
        /// The interval that was provided.
        actual_secs: u64,
    },

    /// The breaker would never open.
    #[error("failure threshold must be at least 1")]
    ZeroFailureThreshold,

    /// A duration that must be positive was zero.
    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),

    /// A fetch limit that must be positive was zero.
    #[error("{0} must be at least 1")]
    ZeroLimit(&'static str),

    /// No diagnostics are configured.
    #[error("at least one diagnostic must be tracked")]
    NoDiagnostics,
}

/// A specialized Result type for this library.
pub type Result<T> = std::result::Result<T, Error>;
