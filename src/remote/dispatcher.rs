// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Outbound messages and their delivery policy.
//!
//! | Message | Topic | Payload | QoS | Retain |
//! |---|---|---|---|---|
//! | Macro trigger | `macro/{name}/trigger` | `on` / `off` | 1 | yes |
//! | Device command | `device/{name}/trigger` | command name | 1 | no |
//! | Battery request | `battery/status` | empty | 0 | no |
//! | Ring light on | `ledlight/on` | seconds, 1-10 | 1 | no |
//! | Command list request | `device/{name}/detail` | empty | 0 | no |
//!
//! A macro trigger is retained so the remote finds the requested state after
//! a reconnect. A ring light request is not, it must never replay.

use crate::error::ProtocolError;
use crate::protocol::{QoS, RemoteTopics, Transport};
use crate::types::{LedDuration, SwitchState};

/// A message ready to be published.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Outbound {
    pub topic: String,
    pub payload: String,
    pub qos: QoS,
    pub retain: bool,
}

impl Outbound {
    /// Publishes the message.
    pub async fn send<T: Transport>(&self, transport: &T) -> Result<(), ProtocolError> {
        tracing::debug!(
            topic = %self.topic,
            payload = %self.payload,
            qos = self.qos.level(),
            retain = self.retain,
            "Publishing"
        );
        transport
            .publish(&self.topic, &self.payload, self.qos, self.retain)
            .await
            .inspect_err(|e| {
                tracing::error!(topic = %self.topic, error = %e, "Publish failed");
            })
    }
}

/// Builds the outbound messages of one remote.
#[derive(Debug, Clone)]
pub(crate) struct CommandDispatcher {
    topics: RemoteTopics,
}

impl CommandDispatcher {
    pub fn new(topics: RemoteTopics) -> Self {
        Self { topics }
    }

    pub fn macro_trigger(&self, name: &str, state: SwitchState) -> Outbound {
        Outbound {
            topic: self.topics.macro_trigger(name),
            payload: state.as_str().to_string(),
            qos: QoS::AtLeastOnce,
            retain: true,
        }
    }

    pub fn device_command(&self, device: &str, command: &str) -> Outbound {
        Outbound {
            topic: self.topics.device_trigger(device),
            payload: command.to_string(),
            qos: QoS::AtLeastOnce,
            retain: false,
        }
    }

    pub fn battery_request(&self) -> Outbound {
        Outbound {
            topic: self.topics.battery_request(),
            payload: String::new(),
            qos: QoS::AtMostOnce,
            retain: false,
        }
    }

    pub fn ring_light_on(&self, duration: LedDuration) -> Outbound {
        Outbound {
            topic: self.topics.ring_light_on(),
            payload: duration.to_string(),
            qos: QoS::AtLeastOnce,
            retain: false,
        }
    }

    pub fn device_detail(&self, device: &str) -> Outbound {
        Outbound {
            topic: self.topics.device_detail(device),
            payload: String::new(),
            qos: QoS::AtMostOnce,
            retain: false,
        }
    }
}
