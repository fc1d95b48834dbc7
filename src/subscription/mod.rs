// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Callback-based subscriptions to remote changes.
//!
//! Next to the broadcast [`EventBus`](crate::event::EventBus), a running
//! [`Remote`](crate::Remote) accepts plain callbacks. Callbacks run on the
//! engine task, right after the change was applied, so they must return
//! quickly and must not call back into the remote and wait for the answer.
//!
//! - [`SubscriptionId`] - A unique identifier for a subscription, used to unsubscribe
//! - [`CallbackRegistry`] - Registry that stores callbacks and dispatches changes
//! - [`Subscribable`] - Trait for types that support callback subscriptions
//!
//! # Usage
//!
//! ```no_run
//! use rs90_lib::subscription::Subscribable;
//! use rs90_lib::{MemoryBus, Remote, RemoteConfig};
//!
//! # async fn example() -> rs90_lib::Result<()> {
//! let remote = Remote::start(MemoryBus::new(), RemoteConfig::new("abc123")).await?;
//!
//! let sub_id = remote.on_key_pressed(|press| {
//!     println!("Button {} pressed", press.button);
//! });
//!
//! remote.unsubscribe(sub_id);
//! # Ok(())
//! # }
//! ```

mod callback;
mod subscribable;

pub use callback::{CallbackRegistry, SubscriptionId};
pub use subscribable::Subscribable;
