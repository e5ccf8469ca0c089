// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Notifications about poll cycle outcomes.
//!
//! Consumers can either subscribe to the [`EventBus`], which uses tokio's
//! broadcast channel, or register callbacks in a [`ListenerRegistry`].
//! Both receive the same [`PollEvent`]s.
//!
//! # Examples
//!
//! ```
//! use geotab_fleet::event::{EventBus, PollEvent};
//!
//! let bus = EventBus::new();
//! let mut rx = bus.subscribe();
//!
//! bus.publish(PollEvent::Refreshed { device_count: 3 });
//! assert_eq!(rx.try_recv().unwrap(), PollEvent::Refreshed { device_count: 3 });
//! ```

mod event_bus;
mod listener;
mod poll_event;

pub use event_bus::EventBus;
pub use listener::{ListenerId, ListenerRegistry};
pub use poll_event::PollEvent;
