// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Callback management for remote subscriptions.
//!
//! - [`SubscriptionId`] - Unique identifier for unsubscribing
//! - [`CallbackRegistry`] - Registry for storing and dispatching callbacks

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

use crate::event::KeyPress;
use crate::state::{RemoteState, StateChange};
use crate::types::{BatteryLevel, RemoteStatus, SwitchState};

/// Unique identifier for a subscription.
///
/// IDs are unique within one registry's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    /// Creates a new subscription ID with the given value.
    #[must_use]
    pub(crate) fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw ID value.
    #[must_use]
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Sub({})", self.0)
    }
}

type StateChangedCallback = Arc<dyn Fn(&StateChange) + Send + Sync>;
type StatusCallback = Arc<dyn Fn(RemoteStatus) + Send + Sync>;
type BatteryCallback = Arc<dyn Fn(BatteryLevel) + Send + Sync>;
type MacroStateCallback = Arc<dyn Fn(&str, Option<SwitchState>) + Send + Sync>;
type RingLightCallback = Arc<dyn Fn(SwitchState, u8) + Send + Sync>;
type ListsCallback = Arc<dyn Fn(&RemoteState) + Send + Sync>;
type KeyCallback = Arc<dyn Fn(&KeyPress) + Send + Sync>;

/// Registry for remote subscription callbacks.
///
/// Thread-safe through `parking_lot::RwLock`; callbacks are wrapped in `Arc`
/// so they can be cloned cheaply.
pub struct CallbackRegistry {
    next_id: AtomicU64,
    state_changed_callbacks: RwLock<HashMap<SubscriptionId, StateChangedCallback>>,
    status_callbacks: RwLock<HashMap<SubscriptionId, StatusCallback>>,
    battery_callbacks: RwLock<HashMap<SubscriptionId, BatteryCallback>>,
    macro_state_callbacks: RwLock<HashMap<SubscriptionId, MacroStateCallback>>,
    ring_light_callbacks: RwLock<HashMap<SubscriptionId, RingLightCallback>>,
    lists_callbacks: RwLock<HashMap<SubscriptionId, ListsCallback>>,
    key_callbacks: RwLock<HashMap<SubscriptionId, KeyCallback>>,
}

impl CallbackRegistry {
    /// Creates a new empty callback registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            state_changed_callbacks: RwLock::new(HashMap::new()),
            status_callbacks: RwLock::new(HashMap::new()),
            battery_callbacks: RwLock::new(HashMap::new()),
            macro_state_callbacks: RwLock::new(HashMap::new()),
            ring_light_callbacks: RwLock::new(HashMap::new()),
            lists_callbacks: RwLock::new(HashMap::new()),
            key_callbacks: RwLock::new(HashMap::new()),
        }
    }

    fn next_id(&self) -> SubscriptionId {
        SubscriptionId::new(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    // =========================================================================
    // Registration methods
    // =========================================================================

    /// Registers a callback for every applied state change.
    pub fn on_state_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&StateChange) + Send + Sync + 'static,
    {
        let id = self.next_id();
        self.state_changed_callbacks
            .write()
            .insert(id, Arc::new(callback));
        id
    }

    /// Registers a callback for status transitions.
    pub fn on_status_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(RemoteStatus) + Send + Sync + 'static,
    {
        let id = self.next_id();
        self.status_callbacks.write().insert(id, Arc::new(callback));
        id
    }

    /// Registers a callback for battery level changes.
    pub fn on_battery_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(BatteryLevel) + Send + Sync + 'static,
    {
        let id = self.next_id();
        self.battery_callbacks.write().insert(id, Arc::new(callback));
        id
    }

    /// Registers a callback for macro state changes.
    pub fn on_macro_state_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&str, Option<SwitchState>) + Send + Sync + 'static,
    {
        let id = self.next_id();
        self.macro_state_callbacks
            .write()
            .insert(id, Arc::new(callback));
        id
    }

    /// Registers a callback for ring light changes.
    pub fn on_ring_light_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(SwitchState, u8) + Send + Sync + 'static,
    {
        let id = self.next_id();
        self.ring_light_callbacks
            .write()
            .insert(id, Arc::new(callback));
        id
    }

    /// Registers a callback for list updates.
    pub fn on_lists_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&RemoteState) + Send + Sync + 'static,
    {
        let id = self.next_id();
        self.lists_callbacks.write().insert(id, Arc::new(callback));
        id
    }

    /// Registers a callback for key presses.
    pub fn on_key_pressed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&KeyPress) + Send + Sync + 'static,
    {
        let id = self.next_id();
        self.key_callbacks.write().insert(id, Arc::new(callback));
        id
    }

    // =========================================================================
    // Unsubscription
    // =========================================================================

    /// Unregisters a callback by its subscription ID.
    ///
    /// Returns `true` if a callback was found and removed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.state_changed_callbacks.write().remove(&id).is_some()
            || self.status_callbacks.write().remove(&id).is_some()
            || self.battery_callbacks.write().remove(&id).is_some()
            || self.macro_state_callbacks.write().remove(&id).is_some()
            || self.ring_light_callbacks.write().remove(&id).is_some()
            || self.lists_callbacks.write().remove(&id).is_some()
            || self.key_callbacks.write().remove(&id).is_some()
    }

    /// Clears all callbacks.
    pub fn clear(&self) {
        self.state_changed_callbacks.write().clear();
        self.status_callbacks.write().clear();
        self.battery_callbacks.write().clear();
        self.macro_state_callbacks.write().clear();
        self.ring_light_callbacks.write().clear();
        self.lists_callbacks.write().clear();
        self.key_callbacks.write().clear();
    }

    // =========================================================================
    // Dispatch methods
    // =========================================================================

    /// Dispatches an applied change to the relevant callbacks.
    ///
    /// Generic and list callbacks run once per call; typed callbacks run
    /// once per matching change inside a batch.
    ///
    /// Callbacks run without any registry lock held, so they may subscribe
    /// or unsubscribe themselves.
    pub fn dispatch(&self, change: &StateChange, new_state: &RemoteState) {
        for callback in snapshot(&self.state_changed_callbacks) {
            callback(change);
        }

        self.dispatch_typed(change);

        if change.affects_catalog() {
            for callback in snapshot(&self.lists_callbacks) {
                callback(new_state);
            }
        }
    }

    fn dispatch_typed(&self, change: &StateChange) {
        match change {
            StateChange::Status(status) => {
                for callback in snapshot(&self.status_callbacks) {
                    callback(*status);
                }
            }
            StateChange::BatteryLevel(level) => {
                for callback in snapshot(&self.battery_callbacks) {
                    callback(*level);
                }
            }
            StateChange::MacroState { name, state } => {
                for callback in snapshot(&self.macro_state_callbacks) {
                    callback(name, Some(*state));
                }
            }
            StateChange::MacroStateRemoved { name } => {
                for callback in snapshot(&self.macro_state_callbacks) {
                    callback(name, None);
                }
            }
            StateChange::RingLight { state, duration } => {
                let seconds = if state.is_on() {
                    duration.map_or(0, |d| d.seconds())
                } else {
                    0
                };
                for callback in snapshot(&self.ring_light_callbacks) {
                    callback(*state, seconds);
                }
            }
            StateChange::Batch(changes) => {
                for nested in changes {
                    self.dispatch_typed(nested);
                }
            }
            StateChange::LastKey(_)
            | StateChange::RunningMacro(_)
            | StateChange::Devices(_)
            | StateChange::Macros(_)
            | StateChange::DeviceCommands { .. }
            | StateChange::DeviceCommandsRemoved { .. } => {
                // Covered by the generic and list callbacks
            }
        }
    }

    /// Dispatches a key press.
    pub fn dispatch_key(&self, press: &KeyPress) {
        for callback in snapshot(&self.key_callbacks) {
            callback(press);
        }
    }

    // =========================================================================
    // Statistics
    // =========================================================================

    /// Returns the total number of registered callbacks.
    #[must_use]
    pub fn callback_count(&self) -> usize {
        self.state_changed_callbacks.read().len()
            + self.status_callbacks.read().len()
            + self.battery_callbacks.read().len()
            + self.macro_state_callbacks.read().len()
            + self.ring_light_callbacks.read().len()
            + self.lists_callbacks.read().len()
            + self.key_callbacks.read().len()
    }

    /// Returns `true` if there are no registered callbacks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.callback_count() == 0
    }
}

/// Clones the registered callbacks out so none is invoked under the lock.
fn snapshot<C: Clone>(callbacks: &RwLock<HashMap<SubscriptionId, C>>) -> Vec<C> {
    callbacks.read().values().cloned().collect()
}

impl Default for CallbackRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CallbackRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackRegistry")
            .field("callback_count", &self.callback_count())
            .finish()
    }
}
