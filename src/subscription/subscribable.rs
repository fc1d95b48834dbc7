// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Subscribable trait for types that accept change callbacks.

use crate::event::KeyPress;
use crate::state::{RemoteState, StateChange};
use crate::subscription::SubscriptionId;
use crate::types::{BatteryLevel, RemoteStatus, SwitchState};

/// Trait for types that support callback subscriptions.
///
/// # Examples
///
/// ```no_run
/// use rs90_lib::subscription::Subscribable;
/// use rs90_lib::{MemoryBus, Remote, RemoteConfig};
///
/// # async fn example() -> rs90_lib::Result<()> {
/// let remote = Remote::start(MemoryBus::new(), RemoteConfig::new("abc123")).await?;
///
/// remote.on_battery_changed(|level| {
///     println!("Battery: {level}");
/// });
///
/// let sub_id = remote.on_macro_state_changed(|name, state| {
///     println!("Macro {name} is now {state:?}");
/// });
///
/// remote.unsubscribe(sub_id);
/// # Ok(())
/// # }
/// ```
pub trait Subscribable {
    /// Subscribes to every applied state change.
    fn on_state_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&StateChange) + Send + Sync + 'static;

    /// Subscribes to online/offline transitions.
    fn on_status_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(RemoteStatus) + Send + Sync + 'static;

    /// Subscribes to battery readings that changed the level.
    fn on_battery_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(BatteryLevel) + Send + Sync + 'static;

    /// Subscribes to macro state changes.
    ///
    /// The callback receives the macro name and its new state, or `None`
    /// when the macro left the macro list.
    fn on_macro_state_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&str, Option<SwitchState>) + Send + Sync + 'static;

    /// Subscribes to ring light changes.
    ///
    /// The callback receives the new state and its duration in seconds
    /// (`0` while off).
    fn on_ring_light_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(SwitchState, u8) + Send + Sync + 'static;

    /// Subscribes to device, macro, command and macro state updates.
    ///
    /// The callback receives the full state so an entity layer can diff its
    /// own entities against it.
    fn on_lists_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&RemoteState) + Send + Sync + 'static;

    /// Subscribes to key presses, one call per press.
    fn on_key_pressed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&KeyPress) + Send + Sync + 'static;

    /// Unsubscribes a callback by its subscription ID.
    ///
    /// Returns `true` if the subscription was found and removed.
    fn unsubscribe(&self, id: SubscriptionId) -> bool;
}
