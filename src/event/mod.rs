// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Event system for remote state changes and key presses.
//!
//! The [`EventBus`] uses tokio's broadcast channel so that any number of
//! consumers (an entity layer, an automation engine, a logger) can follow
//! one remote. Two kinds of [`RemoteEvent`] are published:
//!
//! - `StateChanged` after every mutation of the remote state (and once per
//!   list snapshot, even an unchanged one),
//! - `KeyPressed` for every key payload, including repeats of one button.
//!
//! # Examples
//!
//! ```
//! use rs90_lib::event::{EventBus, KeyPress, RemoteEvent};
//! use rs90_lib::types::ButtonId;
//!
//! let bus = EventBus::new();
//! let mut rx = bus.subscribe();
//!
//! bus.publish(RemoteEvent::KeyPressed(KeyPress::new("abc", ButtonId::new("5"), 1)));
//! assert!(rx.try_recv().unwrap().is_key_press());
//! ```

mod event_bus;
mod remote_event;

pub use event_bus::EventBus;
pub use remote_event::{KeyPress, RemoteEvent};
