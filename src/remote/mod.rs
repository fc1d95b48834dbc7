// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Mirroring and driving one RS90 remote.
//!
//! [`Remote::start`] spawns the engine of a remote on a [`Transport`]
//! and returns a [`Remote`] handle. The engine keeps the remote's state in
//! sync with its bus topics:
//!
//! - every device and macro list snapshot is diffed against the names
//!   already tracked; new names get a per-entity subscription, names that
//!   disappeared lose theirs together with their cached commands or state,
//! - key presses surface as [`KeyPress`](crate::event::KeyPress) events,
//!   one per press,
//! - the battery is polled on a fixed period and the ring light is switched
//!   off locally once its duration elapsed.
//!
//! [`Transport`]: crate::protocol::Transport

mod config;
mod diagnostics;
mod dispatcher;
mod engine;
mod handle;
mod reconciler;
mod registry;
mod timers;

pub use config::{DEFAULT_BATTERY_POLL_INTERVAL, DEFAULT_TOPIC_PREFIX, RemoteConfig};
pub use diagnostics::{
    CommandSummary, Diagnostics, RefreshReport, SubscriptionCounts, TimerStatus, TrackedNames,
};
pub use handle::Remote;
