// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Publish/subscribe transports and the RS90 topic layout.
//!
//! The engine talks to the bus through the [`Transport`] trait only. Every
//! subscription delivers [`InboundMessage`]s into a bounded channel owned by
//! the subscriber and returns a [`SubscriptionHandle`], an owned capability
//! that cancels the subscription when used (or dropped).
//!
//! # Transports
//!
//! - [`MqttBroker`]: a real MQTT connection built on `rumqttc`
//! - [`MemoryBus`]: an in-process bus with retained messages, for tests
//!
//! # Examples
//!
//! ```
//! use rs90_lib::protocol::{MemoryBus, QoS, Transport};
//! use tokio::sync::mpsc;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), rs90_lib::ProtocolError> {
//! let bus = MemoryBus::new();
//! bus.inject_retained("Haptique/abc/status", "online");
//!
//! let (tx, mut rx) = mpsc::channel(8);
//! let handle = bus.subscribe("Haptique/abc/status", QoS::AtMostOnce, tx).await?;
//!
//! let message = rx.recv().await.unwrap();
//! assert_eq!(message.payload, "online");
//!
//! handle.cancel();
//! assert_eq!(bus.unsubscribe_count("Haptique/abc/status"), 1);
//! # Ok(())
//! # }
//! ```

mod handle;
mod memory;
mod mqtt_broker;
mod topic_router;
mod topics;

pub use handle::{SubscriptionHandle, Unsubscribe};
pub use memory::{MemoryBus, PublishedMessage};
pub use mqtt_broker::{MqttBroker, MqttBrokerBuilder};
pub use topic_router::{Route, TopicRouter};
pub use topics::RemoteTopics;

use std::future::Future;

use tokio::sync::mpsc;

use crate::error::ProtocolError;

/// Delivery guarantee of a subscription or publish.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
pub enum QoS {
    /// Fire and forget (QoS 0).
    #[default]
    AtMostOnce,
    /// Delivered at least once (QoS 1).
    AtLeastOnce,
    /// Delivered exactly once (QoS 2).
    ExactlyOnce,
}

impl QoS {
    /// Returns the numeric MQTT level.
    #[must_use]
    pub const fn level(self) -> u8 {
        match self {
            Self::AtMostOnce => 0,
            Self::AtLeastOnce => 1,
            Self::ExactlyOnce => 2,
        }
    }
}

impl From<QoS> for rumqttc::QoS {
    fn from(qos: QoS) -> Self {
        match qos {
            QoS::AtMostOnce => Self::AtMostOnce,
            QoS::AtLeastOnce => Self::AtLeastOnce,
            QoS::ExactlyOnce => Self::ExactlyOnce,
        }
    }
}

/// A message delivered to a subscriber.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    /// Topic the message was published on.
    pub topic: String,
    /// Payload decoded as UTF-8.
    pub payload: String,
}

impl InboundMessage {
    /// Creates a message.
    #[must_use]
    pub fn new(topic: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
        }
    }
}

/// A publish/subscribe client.
///
/// Implementations deliver every message received on a subscribed topic to
/// the sink given at subscribe time, in arrival order, until the returned
/// handle is cancelled or dropped.
pub trait Transport: Send + Sync + 'static {
    /// Subscribes `sink` to an exact topic.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError` if the bus refuses the subscription.
    fn subscribe(
        &self,
        topic: &str,
        qos: QoS,
        sink: mpsc::Sender<InboundMessage>,
    ) -> impl Future<Output = Result<SubscriptionHandle, ProtocolError>> + Send;

    /// Publishes a payload.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError` if the message could not be handed to the bus.
    fn publish(
        &self,
        topic: &str,
        payload: &str,
        qos: QoS,
        retain: bool,
    ) -> impl Future<Output = Result<(), ProtocolError>> + Send;
}
