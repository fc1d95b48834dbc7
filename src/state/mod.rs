// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Remote state management types.
//!
//! [`RemoteState`] is the in-memory mirror of one remote. It is only ever
//! mutated by the engine through [`StateChange`] values; callers receive
//! clones of it.
//!
//! # Examples
//!
//! ```
//! use rs90_lib::state::{RemoteState, StateChange};
//! use rs90_lib::types::SwitchState;
//!
//! let mut state = RemoteState::new();
//!
//! let change = StateChange::macro_state("Movie", SwitchState::On);
//! assert!(state.apply(&change));
//!
//! assert_eq!(state.macro_state("Movie"), Some(SwitchState::On));
//! ```

mod entry;
mod remote_state;
mod state_change;

pub use entry::{Device, DeviceCommand, ListEntry, Macro};
pub use remote_state::RemoteState;
pub use state_change::StateChange;
