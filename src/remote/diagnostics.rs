// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Reports returned by the maintenance operations of a remote.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::state::{Device, DeviceCommand, Macro};
use crate::types::{BatteryLevel, RemoteStatus};

/// Number of commands listed per device in [`CommandSummary`].
const FIRST_COMMANDS: usize = 5;

/// Result of [`Remote::force_refresh_lists`](super::Remote::force_refresh_lists).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RefreshReport {
    /// Device names from the current list that had no subscription.
    pub devices_resubscribed: Vec<String>,
    /// Macro names from the current list that had no subscription.
    pub macros_resubscribed: Vec<String>,
    /// Whether the battery request was published.
    pub battery_requested: bool,
}

impl RefreshReport {
    /// Returns the number of subscriptions started by the refresh.
    #[must_use]
    pub fn resubscribed_count(&self) -> usize {
        self.devices_resubscribed.len() + self.macros_resubscribed.len()
    }
}

/// Command list overview of one device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandSummary {
    /// Number of commands.
    pub count: usize,
    /// Ids of the commands that have one.
    pub ids: Vec<String>,
    /// The first few commands, in the order the remote sent them.
    pub first_commands: Vec<DeviceCommand>,
}

impl CommandSummary {
    pub(crate) fn from_commands(commands: &[DeviceCommand]) -> Self {
        Self {
            count: commands.len(),
            ids: commands.iter().filter_map(|c| c.id.clone()).collect(),
            first_commands: commands.iter().take(FIRST_COMMANDS).cloned().collect(),
        }
    }
}

/// Live subscription counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SubscriptionCounts {
    /// Status, lists, battery, keys and test status.
    pub global: usize,
    /// One per device with a live `commands` subscription.
    pub devices: usize,
    /// One per macro with a live `trigger` subscription.
    pub macros: usize,
}

/// Names tracked by the reconciler of each pool.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TrackedNames {
    /// Devices with a live subscription.
    pub active_devices: Vec<String>,
    /// Devices whose subscribe call is in flight.
    pub pending_devices: Vec<String>,
    /// Macros with a live subscription.
    pub active_macros: Vec<String>,
    /// Macros whose subscribe call is in flight.
    pub pending_macros: Vec<String>,
}

/// Local timers of a remote.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TimerStatus {
    /// The periodic battery request is scheduled.
    pub battery_poll: bool,
    /// A ring light auto-off is pending.
    pub ring_light_armed: bool,
}

/// Snapshot of a remote's state and subscriptions, for troubleshooting.
///
/// Serializes to JSON with `serde_json::to_string_pretty`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostics {
    /// Remote id.
    pub remote_id: String,
    /// Display name, if configured.
    pub name: Option<String>,
    /// `{prefix}/{remote_id}`.
    pub base_topic: String,
    /// Availability.
    pub status: RemoteStatus,
    /// Last battery reading.
    pub battery_level: Option<BatteryLevel>,
    /// Number of entries in the device list.
    pub device_count: usize,
    /// Number of entries in the macro list.
    pub macro_count: usize,
    /// Device list.
    pub devices: Vec<Device>,
    /// Macro list.
    pub macros: Vec<Macro>,
    /// Command overview per device name.
    pub device_commands: BTreeMap<String, CommandSummary>,
    /// Device names that have a command list.
    pub command_keys: Vec<String>,
    /// Live subscription counts.
    pub subscriptions: SubscriptionCounts,
    /// Number of topics the engine routes, pending entities included.
    pub routed_topics: usize,
    /// Timer state.
    pub timers: TimerStatus,
    /// Reconciler tracking sets.
    pub tracked: TrackedNames,
}
