// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Event bus for broadcasting remote events.

use tokio::sync::broadcast;

use super::RemoteEvent;

/// Default channel capacity for the event bus.
const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Fan-out of [`RemoteEvent`]s from the engine to any number of receivers.
///
/// A receiver more than 256 events behind (by default) loses the
/// oldest ones; its next `recv` reports `RecvError::Lagged`.
///
/// # Examples
///
/// ```
/// use rs90_lib::event::{EventBus, RemoteEvent};
/// use rs90_lib::state::{RemoteState, StateChange};
/// use rs90_lib::types::RemoteStatus;
///
/// let bus = EventBus::new();
/// let mut rx = bus.subscribe();
///
/// bus.publish(RemoteEvent::StateChanged {
///     change: StateChange::Status(RemoteStatus::Online),
///     new_state: RemoteState::new(),
/// });
///
/// // Multiple subscribers can exist
/// let mut rx2 = bus.subscribe();
/// ```
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<RemoteEvent>,
}

impl EventBus {
    /// Creates a new event bus with default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Creates a new event bus with the specified capacity.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Returns a receiver for events published from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<RemoteEvent> {
        self.sender.subscribe()
    }

    /// Returns the number of active subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Sends an event to the current receivers; dropped when there are none.
    pub fn publish(&self, event: RemoteEvent) {
        if self.sender.send(event).is_err() {
            tracing::trace!("No event receivers");
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
