// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! State change representation.
//!
//! State changes are the only way [`RemoteState`](super::RemoteState) is
//! mutated. Every change that is applied is also what listeners receive, so
//! a subscriber can tell *what* changed without diffing two snapshots.
//!
//! # Change Types
//!
//! - [`StateChange::Status`] - Remote went online/offline
//! - [`StateChange::BatteryLevel`] - New battery reading
//! - [`StateChange::LastKey`] - A button was pressed
//! - [`StateChange::RunningMacro`] - Free text from the test/status channel
//! - [`StateChange::Devices`] / [`StateChange::Macros`] - Full list snapshots
//! - [`StateChange::DeviceCommands`] / [`StateChange::DeviceCommandsRemoved`]
//! - [`StateChange::MacroState`] / [`StateChange::MacroStateRemoved`]
//! - [`StateChange::RingLight`] - Ring light on/off
//! - [`StateChange::Batch`] - Several changes published as one update

use crate::types::{BatteryLevel, ButtonId, LedDuration, RemoteStatus, SwitchState};

use super::entry::{Device, DeviceCommand, Macro};

/// Represents a change in remote state.
///
/// # Examples
///
/// ```
/// use rs90_lib::state::{RemoteState, StateChange};
/// use rs90_lib::types::RemoteStatus;
///
/// let mut state = RemoteState::new();
///
/// // Apply returns true if state actually changed
/// assert!(state.apply(&StateChange::Status(RemoteStatus::Online)));
///
/// // Applying the same change again returns false
/// assert!(!state.apply(&StateChange::Status(RemoteStatus::Online)));
/// ```
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum StateChange {
    /// Remote availability changed.
    Status(RemoteStatus),

    /// Battery level reported.
    BatteryLevel(BatteryLevel),

    /// Last pressed button.
    LastKey(ButtonId),

    /// Text of the test/status channel; `None` when the remote cleared it.
    RunningMacro(Option<String>),

    /// Full device list snapshot.
    Devices(Vec<Device>),

    /// Full macro list snapshot.
    Macros(Vec<Macro>),

    /// Command list of a device, keyed by device name.
    ///
    /// An empty list means the remote explicitly reported no commands.
    DeviceCommands {
        /// Device name.
        device: String,
        /// Commands in the order the remote sent them.
        commands: Vec<DeviceCommand>,
    },

    /// Cached commands of a device that left the device list.
    DeviceCommandsRemoved {
        /// Device name.
        device: String,
    },

    /// Confirmed (or optimistically written) macro state.
    MacroState {
        /// Macro name.
        name: String,
        /// New state.
        state: SwitchState,
    },

    /// State of a macro that left the macro list.
    MacroStateRemoved {
        /// Macro name.
        name: String,
    },

    /// Ring light switched.
    RingLight {
        /// On or off.
        state: SwitchState,
        /// Lit duration; `None` while off.
        duration: Option<LedDuration>,
    },

    /// Multiple changes at once.
    ///
    /// Used when a list snapshot replaces the list and drops cached entries
    /// in a single update.
    Batch(Vec<StateChange>),
}

impl StateChange {
    /// Creates a macro state change.
    #[must_use]
    pub fn macro_state(name: impl Into<String>, state: SwitchState) -> Self {
        Self::MacroState {
            name: name.into(),
            state,
        }
    }

    /// Creates a device commands change.
    #[must_use]
    pub fn device_commands(device: impl Into<String>, commands: Vec<DeviceCommand>) -> Self {
        Self::DeviceCommands {
            device: device.into(),
            commands,
        }
    }

    /// Creates a ring-light-on change.
    #[must_use]
    pub fn ring_light_on(duration: LedDuration) -> Self {
        Self::RingLight {
            state: SwitchState::On,
            duration: Some(duration),
        }
    }

    /// Creates a ring-light-off change.
    #[must_use]
    pub fn ring_light_off() -> Self {
        Self::RingLight {
            state: SwitchState::Off,
            duration: None,
        }
    }

    /// Returns `true` if this change touches the device, macro, command or
    /// macro-state collections (directly or inside a batch).
    #[must_use]
    pub fn affects_catalog(&self) -> bool {
        match self {
            Self::Devices(_)
            | Self::Macros(_)
            | Self::DeviceCommands { .. }
            | Self::DeviceCommandsRemoved { .. }
            | Self::MacroState { .. }
            | Self::MacroStateRemoved { .. } => true,
            Self::Batch(changes) => changes.iter().any(Self::affects_catalog),
            Self::Status(_)
            | Self::BatteryLevel(_)
            | Self::LastKey(_)
            | Self::RunningMacro(_)
            | Self::RingLight { .. } => false,
        }
    }
}
