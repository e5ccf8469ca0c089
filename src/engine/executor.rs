// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Running blocking provider calls on worker threads under deadlines.

use std::sync::Arc;
use std::time::Duration;

use crate::error::{Error, ProviderError, Result};
use crate::model::Device;
use crate::provider::{BatchResults, QueryProvider};

use super::planner::CallPlan;

/// Submits provider calls off the async scheduler.
///
/// Each call runs on tokio's blocking pool. A deadline bounds how long the
/// caller waits, not the call itself: a call that overruns keeps running
/// on its worker and its result is discarded when it finishes.
///
/// The executor never retries.
#[derive(Debug)]
pub struct BatchExecutor<P> {
    provider: Arc<P>,
    device_list_timeout: Duration,
    batch_timeout: Duration,
}

impl<P: QueryProvider> BatchExecutor<P> {
    /// Creates an executor with the given deadlines.
    #[must_use]
    pub fn new(provider: Arc<P>, device_list_timeout: Duration, batch_timeout: Duration) -> Self {
        Self {
            provider,
            device_list_timeout,
            batch_timeout,
        }
    }

    /// Fetches the device listing.
    ///
    /// # Errors
    ///
    /// Returns `Error::Timeout` if the deadline elapses, otherwise the
    /// classified provider or worker error.
    pub async fn list_devices(&self) -> Result<Vec<Device>> {
        let provider = Arc::clone(&self.provider);
        run_on_worker("device listing", self.device_list_timeout, move || {
            provider.list_devices()
        })
        .await
    }

    /// Executes a plan as one batch.
    ///
    /// # Errors
    ///
    /// Returns `Error::Timeout` if the deadline elapses, or
    /// `Error::Provider` if the call fails or the reply does not hold one
    /// result per planned query.
    pub async fn execute(&self, plan: &CallPlan) -> Result<BatchResults> {
        let queries = plan.queries();
        let expected = queries.len();
        let provider = Arc::clone(&self.provider);

        tracing::debug!(queries = expected, "Submitting batch");

        let results = run_on_worker("batch call", self.batch_timeout, move || {
            provider.run_batch(&queries)
        })
        .await?;

        if results.len() != expected {
            return Err(ProviderError::Malformed(format!(
                "batch returned {} results for {expected} queries",
                results.len()
            ))
            .into());
        }
        Ok(results)
    }
}

/// Runs `call` on the blocking pool and waits at most `deadline` for it.
async fn run_on_worker<T, F>(operation: &'static str, deadline: Duration, call: F) -> Result<T>
where
    F: FnOnce() -> std::result::Result<T, ProviderError> + Send + 'static,
    T: Send + 'static,
{
    match tokio::time::timeout(deadline, tokio::task::spawn_blocking(call)).await {
        Ok(Ok(result)) => result.map_err(Error::from),
        Ok(Err(join_error)) => Err(Error::Worker(join_error.to_string())),
        Err(_) => {
            tracing::debug!(operation, "Deadline elapsed, abandoning worker call");
            Err(Error::Timeout {
                operation,
                after_ms: u64::try_from(deadline.as_millis()).unwrap_or(u64::MAX),
            })
        }
    }
}
