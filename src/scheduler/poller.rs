// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The circuit-breaker-guarded poll loop.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::{broadcast, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::config::PollerConfig;
use crate::engine::FleetEngine;
use crate::error::{Error, Result};
use crate::event::{EventBus, ListenerId, ListenerRegistry, PollEvent};
use crate::model::FleetSnapshot;
use crate::provider::QueryProvider;

use super::breaker::{BreakerCheck, CircuitBreaker, CircuitBreakerState};
use super::clock::{Clock, SystemClock};

/// Periodically fetches the fleet and publishes merged snapshots.
///
/// Cycles never overlap: [`Poller::poll_once`] takes `&mut self` and the
/// run loop awaits each cycle before the next tick. A failed cycle leaves
/// the previously published snapshot in place.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use geotab_fleet::config::PollerConfig;
/// use geotab_fleet::event::PollEvent;
/// use geotab_fleet::provider::GeotabConfig;
/// use geotab_fleet::scheduler::Poller;
///
/// # async fn example() -> geotab_fleet::Result<()> {
/// let client = GeotabConfig::new("fleet@example.com", "secret")
///     .with_database("acme")
///     .into_client()?;
///
/// let poller = Poller::new(Arc::new(client), PollerConfig::default())?;
/// poller.add_listener(|event| {
///     if let PollEvent::AuthenticationRequired { message } = event {
///         eprintln!("credentials rejected: {message}");
///     }
/// });
///
/// let handle = poller.spawn();
/// let mut data = handle.watch_data();
/// data.changed().await.ok();
/// println!("{} devices", data.borrow().len());
///
/// handle.stop().await
/// # }
/// ```
#[derive(Debug)]
pub struct Poller<P> {
    engine: FleetEngine<P>,
    config: PollerConfig,
    breaker: CircuitBreaker,
    clock: Arc<dyn Clock>,
    data: watch::Sender<Arc<FleetSnapshot>>,
    events: EventBus,
    listeners: ListenerRegistry,
}

impl<P: QueryProvider> Poller<P> {
    /// Creates a poller with a closed breaker and an empty snapshot.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the configuration is invalid.
    pub fn new(provider: Arc<P>, config: PollerConfig) -> Result<Self> {
        config.validate()?;

        let (data, _) = watch::channel(Arc::new(FleetSnapshot::new()));
        Ok(Self {
            engine: FleetEngine::new(provider, &config),
            breaker: CircuitBreaker::new(config.failure_threshold, config.cooldown),
            config,
            clock: Arc::new(SystemClock),
            data,
            events: EventBus::new(),
            listeners: ListenerRegistry::new(),
        })
    }

    /// Replaces the clock used for breaker timing.
    #[must_use]
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &PollerConfig {
        &self.config
    }

    /// Returns the breaker state.
    #[must_use]
    pub fn breaker_state(&self) -> CircuitBreakerState {
        self.breaker.state()
    }

    /// Returns the last published snapshot.
    #[must_use]
    pub fn data(&self) -> Arc<FleetSnapshot> {
        Arc::clone(&self.data.borrow())
    }

    /// Returns a receiver that observes every published snapshot.
    #[must_use]
    pub fn watch_data(&self) -> watch::Receiver<Arc<FleetSnapshot>> {
        self.data.subscribe()
    }

    /// Subscribes to poll events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<PollEvent> {
        self.events.subscribe()
    }

    /// Registers a callback invoked after every cycle.
    pub fn add_listener<F>(&self, callback: F) -> ListenerId
    where
        F: Fn(&PollEvent) + Send + Sync + 'static,
    {
        self.listeners.add(callback)
    }

    /// Removes a callback. Returns `true` if it was registered.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }

    /// Runs exactly one cycle.
    ///
    /// On success the new snapshot is published and returned. While the
    /// breaker is open and the cooldown has not elapsed, the provider is
    /// not contacted and `Error::CircuitOpen` is returned.
    ///
    /// An empty device listing counts as a success: the empty snapshot is
    /// published and the breaker's failure count is reset.
    ///
    /// # Errors
    ///
    /// Returns `Error::Authentication` when credentials are rejected,
    /// `Error::CircuitOpen` for a skipped cycle, and the cycle's timeout,
    /// provider or worker error otherwise.
    pub async fn poll_once(&mut self) -> Result<Arc<FleetSnapshot>> {
        if let BreakerCheck::Open { retry_in } = self.breaker.check(self.clock.now()) {
            tracing::warn!(
                retry_in_secs = retry_in.as_secs(),
                "Circuit breaker open, skipping cycle"
            );
            let error = Error::CircuitOpen { retry_in };
            self.notify(&PollEvent::from_error(&error, Some(retry_in)));
            return Err(error);
        }

        match self.engine.fetch().await {
            Ok(snapshot) => {
                self.breaker.record_success();
                let snapshot = Arc::new(snapshot);
                self.data.send_replace(Arc::clone(&snapshot));

                tracing::debug!(devices = snapshot.len(), "Published fleet snapshot");
                self.notify(&PollEvent::Refreshed {
                    device_count: snapshot.len(),
                });
                Ok(snapshot)
            }
            Err(error) => {
                self.handle_failure(&error);
                Err(error)
            }
        }
    }

    fn handle_failure(&mut self, error: &Error) {
        if error.is_authentication() {
            tracing::error!(error = %error, "Fleet backend rejected credentials");
            self.notify(&PollEvent::from_error(error, None));
            return;
        }

        let now = self.clock.now();
        self.breaker.record_failure(error, now);
        let state = self.breaker.state();
        tracing::warn!(
            error = %error,
            failures = state.consecutive_failures,
            "Fleet fetch failed, will retry"
        );
        self.notify(&PollEvent::from_error(error, self.breaker.retry_in(now)));
    }

    fn notify(&self, event: &PollEvent) {
        self.listeners.dispatch(event);
        self.events.publish(event.clone());
    }

    /// Polls on the configured interval until `shutdown` resolves.
    ///
    /// The first cycle starts immediately. A cycle that overruns the
    /// interval delays the next one instead of triggering a burst.
    ///
    /// # Errors
    ///
    /// Returns `Error::Authentication` and stops polling when credentials
    /// are rejected. Other failures are absorbed by the breaker.
    pub async fn run<F>(mut self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let mut interval = tokio::time::interval(self.config.scan_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        tracing::info!(
            interval_secs = self.config.scan_interval.as_secs(),
            "Starting fleet poller"
        );

        loop {
            tokio::select! {
                () = &mut shutdown => {
                    tracing::info!("Fleet poller stopped");
                    return Ok(());
                }
                _ = interval.tick() => {
                    if let Err(error) = self.poll_once().await
                        && error.is_authentication()
                    {
                        return Err(error);
                    }
                }
            }
        }
    }

    /// Runs the poll loop on a new task.
    ///
    /// Dropping the returned handle stops the loop after the current cycle.
    #[must_use]
    pub fn spawn(self) -> PollerHandle {
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let data = self.watch_data();
        let events = self.events.clone();
        let listeners = self.listeners.clone();

        let task = tokio::spawn(self.run(async move {
            // Either an explicit signal or the handle going away
            let _ = shutdown_rx.await;
        }));

        PollerHandle {
            shutdown: Some(shutdown_tx),
            task,
            data,
            events,
            listeners,
        }
    }
}

/// Handle to a poller running on its own task.
#[derive(Debug)]
pub struct PollerHandle {
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<Result<()>>,
    data: watch::Receiver<Arc<FleetSnapshot>>,
    events: EventBus,
    listeners: ListenerRegistry,
}

impl PollerHandle {
    /// Returns the last published snapshot.
    #[must_use]
    pub fn data(&self) -> Arc<FleetSnapshot> {
        Arc::clone(&self.data.borrow())
    }

    /// Returns a receiver that observes every published snapshot.
    #[must_use]
    pub fn watch_data(&self) -> watch::Receiver<Arc<FleetSnapshot>> {
        self.data.clone()
    }

    /// Subscribes to poll events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<PollEvent> {
        self.events.subscribe()
    }

    /// Registers a callback invoked after every cycle.
    pub fn add_listener<F>(&self, callback: F) -> ListenerId
    where
        F: Fn(&PollEvent) + Send + Sync + 'static,
    {
        self.listeners.add(callback)
    }

    /// Removes a callback. Returns `true` if it was registered.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }

    /// Returns `true` if the poll loop has exited.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Asks the loop to stop after the current cycle.
    pub fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }

    /// Waits for the loop to exit.
    ///
    /// # Errors
    ///
    /// Returns the loop's error, or `Error::Worker` if the task panicked.
    pub async fn join(self) -> Result<()> {
        let _shutdown = self.shutdown;
        match self.task.await {
            Ok(result) => result,
            Err(join_error) => Err(Error::Worker(join_error.to_string())),
        }
    }

    /// Stops the loop and waits for it to exit.
    ///
    /// # Errors
    ///
    /// Same as [`PollerHandle::join`].
    pub async fn stop(mut self) -> Result<()> {
        self.shutdown();
        self.join().await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use serde_json::json;

    use super::*;
    use crate::error::ProviderError;
    use crate::model::Device;
    use crate::provider::{BatchResults, EntityType, Query};
    use crate::scheduler::ManualClock;

    #[derive(Default)]
    struct FakeProvider {
        fail_with_auth: bool,
        list_calls: AtomicUsize,
    }

    impl QueryProvider for FakeProvider {
        fn list_devices(&self) -> std::result::Result<Vec<Device>, ProviderError> {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_with_auth {
                return Err(ProviderError::Authentication("bad password".to_string()));
            }
            Ok(vec![Device::new("d1")])
        }

        fn run_batch(&self, queries: &[Query]) -> std::result::Result<BatchResults, ProviderError> {
            Ok(queries
                .iter()
                .map(|query| match query.entity {
                    EntityType::DeviceStatusInfo => {
                        vec![json!({"device": {"id": "d1"}, "speed": 42})]
                    }
                    _ => Vec::new(),
                })
                .collect())
        }
    }

    fn config() -> PollerConfig {
        PollerConfig::default()
            .with_failure_threshold(2)
            .with_cooldown(Duration::from_secs(60))
    }

    #[test]
    fn invalid_config_is_rejected() {
        let result = Poller::new(
            Arc::new(FakeProvider::default()),
            PollerConfig::default().with_scan_interval(Duration::from_secs(1)),
        );
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[tokio::test]
    async fn success_publishes_and_notifies() {
        let mut poller = Poller::new(Arc::new(FakeProvider::default()), config()).unwrap();
        let mut events = poller.subscribe();
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&seen);
        poller.add_listener(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let snapshot = poller.poll_once().await.unwrap();

        assert_eq!(snapshot["d1"].speed(), Some(42.0));
        assert_eq!(poller.data()["d1"].speed(), Some(42.0));
        assert_eq!(
            events.try_recv().unwrap(),
            PollEvent::Refreshed { device_count: 1 }
        );
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn authentication_failure_bypasses_breaker() {
        let provider = Arc::new(FakeProvider {
            fail_with_auth: true,
            ..FakeProvider::default()
        });
        let mut poller = Poller::new(Arc::clone(&provider), config())
            .unwrap()
            .with_clock(ManualClock::default());
        let mut events = poller.subscribe();

        for _ in 0..3 {
            let error = poller.poll_once().await.unwrap_err();
            assert!(error.is_authentication());
        }

        assert_eq!(poller.breaker_state(), CircuitBreakerState::default());
        assert_eq!(provider.list_calls.load(Ordering::SeqCst), 3);
        assert!(events.try_recv().unwrap().requires_reconfiguration());
    }

    #[tokio::test]
    async fn run_stops_on_authentication_failure() {
        let provider = Arc::new(FakeProvider {
            fail_with_auth: true,
            ..FakeProvider::default()
        });
        let poller = Poller::new(provider, config()).unwrap();

        let result = poller.run(std::future::pending()).await;
        assert!(matches!(result, Err(Error::Authentication(_))));
    }

    #[tokio::test]
    async fn spawned_poller_stops_on_request() {
        let poller = Poller::new(Arc::new(FakeProvider::default()), config()).unwrap();
        let mut events = poller.subscribe();
        let handle = poller.spawn();

        assert_eq!(
            events.recv().await.unwrap(),
            PollEvent::Refreshed { device_count: 1 }
        );
        assert_eq!(handle.data().len(), 1);

        handle.stop().await.unwrap();
    }
}
