// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Callback listeners for poll events.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

use super::PollEvent;

/// Unique identifier for a registered listener.
///
/// Returned by [`ListenerRegistry::add`] and used to remove the listener
/// later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

impl ListenerId {
    /// Returns the raw ID value.
    #[must_use]
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ListenerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Listener({})", self.0)
    }
}

type Listener = Arc<dyn Fn(&PollEvent) + Send + Sync>;

/// Thread-safe registry of poll event callbacks.
///
/// Callbacks run synchronously on the polling task, so they should return
/// quickly. Cloning the registry shares the same set of listeners.
#[derive(Clone)]
pub struct ListenerRegistry {
    next_id: Arc<AtomicU64>,
    listeners: Arc<RwLock<HashMap<ListenerId, Listener>>>,
}

impl ListenerRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_id: Arc::new(AtomicU64::new(1)),
            listeners: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Registers a callback invoked for every poll event.
    pub fn add<F>(&self, callback: F) -> ListenerId
    where
        F: Fn(&PollEvent) + Send + Sync + 'static,
    {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners.write().insert(id, Arc::new(callback));
        id
    }

    /// Removes a callback.
    ///
    /// Returns `true` if the listener was registered.
    pub fn remove(&self, id: ListenerId) -> bool {
        self.listeners.write().remove(&id).is_some()
    }

    /// Invokes every registered callback with the event.
    pub fn dispatch(&self, event: &PollEvent) {
        // Snapshot so callbacks may add or remove listeners
        let listeners: Vec<Listener> = self.listeners.read().values().cloned().collect();
        for listener in listeners {
            listener(event);
        }
    }

    /// Returns the number of registered callbacks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.listeners.read().len()
    }

    /// Returns `true` if no callback is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ListenerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("listener_count", &self.len())
            .finish()
    }
}
