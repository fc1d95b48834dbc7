// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Value types for RS90 remote state and commands.
//!
//! Each type keeps its value inside the range the remote accepts, so a value
//! that made it into [`RemoteState`](crate::state::RemoteState) is always
//! valid.
//!
//! # Types
//!
//! - [`RemoteStatus`] - Online/offline availability of the remote
//! - [`SwitchState`] - On/off state of a macro or of the ring light
//! - [`BatteryLevel`] - Battery charge (0-100%)
//! - [`LedDuration`] - Ring light duration in seconds (1-10)
//! - [`ButtonId`] - Identifier of a physical button

mod battery;
mod button;
mod led_duration;
mod status;
mod switch;

pub use battery::BatteryLevel;
pub use button::ButtonId;
pub use led_duration::LedDuration;
pub use status::RemoteStatus;
pub use switch::SwitchState;
