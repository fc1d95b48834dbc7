// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `RS90` Lib - A Rust library to mirror and drive Haptique RS90 remotes.
//!
//! An RS90 remote publishes its state on MQTT topics under
//! `Haptique/{remote_id}/...`: availability, battery, key presses and
//! retained lists of the devices and macros configured on it. This library
//! keeps a typed copy of that state up to date and sends commands back.
//!
//! # Features
//!
//! - **State mirroring**: status, battery, last key, device and macro lists,
//!   per-device command lists, macro states and the ring light
//! - **Reconciliation**: one subscription per listed device and macro,
//!   added and released as the lists change
//! - **Commands**: macro triggers, device commands, ring light
//! - **Events**: state changes and key presses via a broadcast channel or
//!   callbacks
//!
//! # Quick Start
//!
//! ```no_run
//! use rs90_lib::types::SwitchState;
//! use rs90_lib::{MqttBroker, Remote, RemoteConfig};
//!
//! #[tokio::main]
//! async fn main() -> rs90_lib::Result<()> {
//!     let broker = MqttBroker::builder()
//!         .host("192.168.1.50")
//!         .build()
//!         .await?;
//!
//!     let remote = Remote::start(broker, RemoteConfig::new("abc123")).await?;
//!
//!     remote.trigger_macro("Movie", SwitchState::On).await?;
//!     remote.ring_light_on(3).await?;
//!
//!     println!("{:?}", remote.state().devices());
//!
//!     remote.shutdown().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Events
//!
//! ```no_run
//! use rs90_lib::event::RemoteEvent;
//! use rs90_lib::subscription::Subscribable;
//! use rs90_lib::{MemoryBus, Remote, RemoteConfig};
//!
//! # async fn example() -> rs90_lib::Result<()> {
//! let remote = Remote::start(MemoryBus::new(), RemoteConfig::new("abc123")).await?;
//!
//! // Callbacks
//! remote.on_key_pressed(|press| {
//!     println!("Button {} (#{})", press.button, press.sequence);
//! });
//!
//! // Or a broadcast receiver
//! let mut events = remote.subscribe();
//! while let Ok(event) = events.recv().await {
//!     if let RemoteEvent::StateChanged { change, .. } = event {
//!         println!("{change:?}");
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Testing
//!
//! [`MemoryBus`] is an in-process [`Transport`](protocol::Transport) with
//! retained messages. Inject what a remote would publish and inspect what
//! the library published back.

pub mod error;
pub mod event;
pub mod payload;
pub mod protocol;
pub mod remote;
pub mod state;
pub mod subscription;
pub mod types;

pub use error::{Error, ParseError, ProtocolError, Result, ValueError};
pub use event::{EventBus, KeyPress, RemoteEvent};
pub use protocol::{MemoryBus, MqttBroker, MqttBrokerBuilder, QoS, Transport};
pub use remote::{Diagnostics, RefreshReport, Remote, RemoteConfig};
pub use state::{RemoteState, StateChange};
pub use subscription::{CallbackRegistry, Subscribable, SubscriptionId};
pub use types::{BatteryLevel, ButtonId, LedDuration, RemoteStatus, SwitchState};
