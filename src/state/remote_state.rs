// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Remote state tracking.

use std::collections::{BTreeMap, BTreeSet};

use crate::types::{BatteryLevel, ButtonId, LedDuration, RemoteStatus, SwitchState};

use super::StateChange;
use super::entry::{Device, DeviceCommand, Macro};

/// Mirrored state of one RS90 remote.
///
/// `devices` and `macros` always hold the last snapshot verbatim, in the
/// order the remote sent it. Command lists and macro states are keyed by
/// **name**: two devices sharing a name share one command list.
///
/// # Examples
///
/// ```
/// use rs90_lib::state::RemoteState;
/// use rs90_lib::types::{RemoteStatus, SwitchState};
///
/// let state = RemoteState::new();
/// assert_eq!(state.status(), RemoteStatus::Offline);
/// assert_eq!(state.led_state(), SwitchState::Off);
/// assert!(state.devices().is_empty());
/// ```
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RemoteState {
    status: RemoteStatus,
    battery_level: Option<BatteryLevel>,
    last_key: Option<ButtonId>,
    running_macro: Option<String>,
    devices: Vec<Device>,
    macros: Vec<Macro>,
    device_commands: BTreeMap<String, Vec<DeviceCommand>>,
    macro_states: BTreeMap<String, SwitchState>,
    led_state: SwitchState,
    led_duration: Option<LedDuration>,
}

impl RemoteState {
    /// Creates an empty state: offline, no lists, ring light off.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the remote availability.
    #[must_use]
    pub fn status(&self) -> RemoteStatus {
        self.status
    }

    /// Returns the last battery reading.
    #[must_use]
    pub fn battery_level(&self) -> Option<BatteryLevel> {
        self.battery_level
    }

    /// Returns the last pressed button.
    #[must_use]
    pub fn last_key(&self) -> Option<&ButtonId> {
        self.last_key.as_ref()
    }

    /// Returns the text of the test/status channel.
    ///
    /// This mirrors the remote's own channel and is not derived from the
    /// macro states.
    #[must_use]
    pub fn running_macro(&self) -> Option<&str> {
        self.running_macro.as_deref()
    }

    /// Returns the device list from the last snapshot.
    #[must_use]
    pub fn devices(&self) -> &[Device] {
        &self.devices
    }

    /// Returns the macro list from the last snapshot.
    #[must_use]
    pub fn macros(&self) -> &[Macro] {
        &self.macros
    }

    /// Returns all known command lists, keyed by device name.
    #[must_use]
    pub fn all_device_commands(&self) -> &BTreeMap<String, Vec<DeviceCommand>> {
        &self.device_commands
    }

    /// Returns the command list of a device.
    ///
    /// `None` means unknown; an empty slice means the remote reported that
    /// the device has no commands.
    #[must_use]
    pub fn device_commands(&self, device: &str) -> Option<&[DeviceCommand]> {
        self.device_commands.get(device).map(Vec::as_slice)
    }

    /// Returns all known macro states, keyed by macro name.
    #[must_use]
    pub fn macro_states(&self) -> &BTreeMap<String, SwitchState> {
        &self.macro_states
    }

    /// Returns the state of a macro.
    #[must_use]
    pub fn macro_state(&self, name: &str) -> Option<SwitchState> {
        self.macro_states.get(name).copied()
    }

    /// Returns the ring light state.
    #[must_use]
    pub fn led_state(&self) -> SwitchState {
        self.led_state
    }

    /// Returns the ring light duration in seconds, `0` while off.
    #[must_use]
    pub fn led_duration(&self) -> u8 {
        self.led_duration.map_or(0, |d| d.seconds())
    }

    /// Returns the non-empty device names of the current snapshot.
    #[must_use]
    pub fn device_names(&self) -> BTreeSet<String> {
        names_of(&self.devices)
    }

    /// Returns the non-empty macro names of the current snapshot.
    #[must_use]
    pub fn macro_names(&self) -> BTreeSet<String> {
        names_of(&self.macros)
    }

    /// Finds a device by its id.
    #[must_use]
    pub fn find_device(&self, id: &str) -> Option<&Device> {
        self.devices.iter().find(|d| d.id.as_deref() == Some(id))
    }

    /// Finds a macro by its id.
    #[must_use]
    pub fn find_macro(&self, id: &str) -> Option<&Macro> {
        self.macros.iter().find(|m| m.id.as_deref() == Some(id))
    }

    /// Applies a state change.
    ///
    /// Returns `true` if the state actually changed.
    pub fn apply(&mut self, change: &StateChange) -> bool {
        match change {
            StateChange::Status(status) => replace(&mut self.status, *status),
            StateChange::BatteryLevel(level) => {
                replace(&mut self.battery_level, Some(*level))
            }
            StateChange::LastKey(key) => replace(&mut self.last_key, Some(key.clone())),
            StateChange::RunningMacro(text) => replace(&mut self.running_macro, text.clone()),
            StateChange::Devices(devices) => replace(&mut self.devices, devices.clone()),
            StateChange::Macros(macros) => replace(&mut self.macros, macros.clone()),
            StateChange::DeviceCommands { device, commands } => {
                let previous = self.device_commands.insert(device.clone(), commands.clone());
                previous.as_ref() != Some(commands)
            }
            StateChange::DeviceCommandsRemoved { device } => {
                self.device_commands.remove(device).is_some()
            }
            StateChange::MacroState { name, state } => {
                self.macro_states.insert(name.clone(), *state) != Some(*state)
            }
            StateChange::MacroStateRemoved { name } => self.macro_states.remove(name).is_some(),
            StateChange::RingLight { state, duration } => {
                let duration = if state.is_on() { *duration } else { None };
                let state_changed = replace(&mut self.led_state, *state);
                let duration_changed = replace(&mut self.led_duration, duration);
                state_changed || duration_changed
            }
            StateChange::Batch(changes) => {
                let mut changed = false;
                for nested in changes {
                    changed |= self.apply(nested);
                }
                changed
            }
        }
    }
}

/// Stores `value` in `slot`, returning `true` if it differed.
fn replace<T: PartialEq>(slot: &mut T, value: T) -> bool {
    if *slot == value {
        false
    } else {
        *slot = value;
        true
    }
}

fn names_of(entries: &[super::ListEntry]) -> BTreeSet<String> {
    entries
        .iter()
        .filter_map(super::ListEntry::usable_name)
        .map(str::to_string)
        .collect()
}
