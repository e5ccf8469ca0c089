// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Poll event types.

use std::time::Duration;

use crate::error::Error;

/// Outcome of a poll cycle, as seen by consumers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollEvent {
    /// A new snapshot was published.
    Refreshed {
        /// Number of devices in the snapshot.
        device_count: usize,
    },

    /// The backend rejected the credentials; polling needs reconfiguration.
    AuthenticationRequired {
        /// The backend's explanation.
        message: String,
    },

    /// The cycle failed and will be retried; the last snapshot stays visible.
    Unavailable {
        /// What went wrong.
        reason: String,
        /// Time until the breaker allows the next attempt, when it is open.
        retry_in: Option<Duration>,
    },
}

impl PollEvent {
    /// Builds the event describing a failed cycle.
    #[must_use]
    pub fn from_error(error: &Error, retry_in: Option<Duration>) -> Self {
        match error {
            Error::Authentication(message) => Self::AuthenticationRequired {
                message: message.clone(),
            },
            Error::CircuitOpen { retry_in } => Self::Unavailable {
                reason: error.to_string(),
                retry_in: Some(*retry_in),
            },
            other => Self::Unavailable {
                reason: other.to_string(),
                retry_in,
            },
        }
    }

    /// Returns `true` if the consumer must prompt for new credentials.
    #[must_use]
    pub fn requires_reconfiguration(&self) -> bool {
        matches!(self, Self::AuthenticationRequired { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authentication_error_requires_reconfiguration() {
        let event = PollEvent::from_error(&Error::Authentication("bad password".to_string()), None);
        assert!(event.requires_reconfiguration());
        assert_eq!(
            event,
            PollEvent::AuthenticationRequired {
                message: "bad password".to_string()
            }
        );
    }

    #[test]
    fn circuit_open_carries_remaining_cooldown() {
        let retry_in = Duration::from_secs(120);
        let event = PollEvent::from_error(&Error::CircuitOpen { retry_in }, None);
        assert!(matches!(
            event,
            PollEvent::Unavailable { retry_in: Some(r), .. } if r == retry_in
        ));
    }

    #[test]
    fn transient_error_is_unavailable() {
        let event = PollEvent::from_error(
            &Error::Timeout {
                operation: "batch call",
                after_ms: 30_000,
            },
            None,
        );
        assert!(!event.requires_reconfiguration());
        assert!(matches!(event, PollEvent::Unavailable { retry_in: None, .. }));
    }
}
