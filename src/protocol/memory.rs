// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! In-process transport with retained-message semantics.
//!
//! [`MemoryBus`] behaves like a broker that the remote and the engine both
//! talk to: retained payloads are replayed to every new subscriber, and
//! everything the engine publishes is recorded so tests can assert on it.
//! Messages the remote would send are pushed with [`MemoryBus::inject`] and
//! [`MemoryBus::inject_retained`].

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;

use super::{InboundMessage, QoS, SubscriptionHandle, Transport, Unsubscribe};
use crate::error::ProtocolError;

/// A message published through a [`MemoryBus`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedMessage {
    /// Topic.
    pub topic: String,
    /// Payload.
    pub payload: String,
    /// Requested delivery guarantee.
    pub qos: QoS,
    /// Whether the message was retained.
    pub retain: bool,
}

/// An in-memory publish/subscribe bus.
///
/// Cloning is cheap; clones share the same bus.
#[derive(Clone, Default)]
pub struct MemoryBus {
    inner: Arc<MemoryBusInner>,
}

#[derive(Default)]
struct MemoryBusInner {
    state: Mutex<BusState>,
    next_sink_id: AtomicU64,
}

#[derive(Default)]
struct BusState {
    sinks: HashMap<String, Vec<(u64, mpsc::Sender<InboundMessage>)>>,
    retained: HashMap<String, String>,
    published: Vec<PublishedMessage>,
    subscribe_counts: HashMap<String, usize>,
    unsubscribe_counts: HashMap<String, usize>,
    rejected_topics: HashSet<String>,
    reject_publishes: bool,
    subscribe_delay: Option<Duration>,
}

impl BusState {
    fn deliver(&self, topic: &str, payload: &str) -> usize {
        let Some(sinks) = self.sinks.get(topic) else {
            return 0;
        };
        let mut delivered = 0;
        for (sink_id, sink) in sinks {
            match sink.try_send(InboundMessage::new(topic, payload)) {
                Ok(()) => delivered += 1,
                Err(e) => {
                    tracing::warn!(topic = %topic, sink = sink_id, error = %e, "Dropping message for sink");
                }
            }
        }
        delivered
    }
}

impl MemoryBus {
    /// Creates an empty bus.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Delivers a message to the current subscribers of `topic` without
    /// retaining it. Returns the number of sinks that received it.
    pub fn inject(&self, topic: &str, payload: &str) -> usize {
        tracing::debug!(topic = %topic, payload = %payload, "Injecting message");
        self.inner.state.lock().deliver(topic, payload)
    }

    /// Retains a message and delivers it to the current subscribers.
    ///
    /// An empty payload clears the retained message, as on an MQTT broker.
    pub fn inject_retained(&self, topic: &str, payload: &str) -> usize {
        let mut state = self.inner.state.lock();
        if payload.is_empty() {
            state.retained.remove(topic);
        } else {
            state.retained.insert(topic.to_string(), payload.to_string());
        }
        state.deliver(topic, payload)
    }

    /// Returns the retained payload of a topic.
    #[must_use]
    pub fn retained(&self, topic: &str) -> Option<String> {
        self.inner.state.lock().retained.get(topic).cloned()
    }

    /// Returns every message published so far, oldest first.
    #[must_use]
    pub fn published(&self) -> Vec<PublishedMessage> {
        self.inner.state.lock().published.clone()
    }

    /// Returns the messages published to one topic, oldest first.
    #[must_use]
    pub fn published_to(&self, topic: &str) -> Vec<PublishedMessage> {
        self.inner
            .state
            .lock()
            .published
            .iter()
            .filter(|m| m.topic == topic)
            .cloned()
            .collect()
    }

    /// Forgets the publish log.
    pub fn clear_published(&self) {
        self.inner.state.lock().published.clear();
    }

    /// Returns how many subscribe calls for `topic` succeeded.
    #[must_use]
    pub fn subscribe_count(&self, topic: &str) -> usize {
        let state = self.inner.state.lock();
        state.subscribe_counts.get(topic).copied().unwrap_or(0)
    }

    /// Returns how many subscriptions to `topic` were released.
    #[must_use]
    pub fn unsubscribe_count(&self, topic: &str) -> usize {
        let state = self.inner.state.lock();
        state.unsubscribe_counts.get(topic).copied().unwrap_or(0)
    }

    /// Returns the number of live sinks on `topic`.
    #[must_use]
    pub fn active_subscriptions(&self, topic: &str) -> usize {
        self.inner.state.lock().sinks.get(topic).map_or(0, Vec::len)
    }

    /// Returns the number of live sinks across all topics.
    #[must_use]
    pub fn total_active_subscriptions(&self) -> usize {
        self.inner.state.lock().sinks.values().map(Vec::len).sum()
    }

    /// Makes every later subscribe call for `topic` fail.
    pub fn reject_subscriptions_to(&self, topic: &str) {
        self.inner.state.lock().rejected_topics.insert(topic.to_string());
    }

    /// Lets subscribe calls for `topic` succeed again.
    pub fn accept_subscriptions_to(&self, topic: &str) {
        self.inner.state.lock().rejected_topics.remove(topic);
    }

    /// Makes every later publish call fail (or succeed again).
    pub fn reject_publishes(&self, reject: bool) {
        self.inner.state.lock().reject_publishes = reject;
    }

    /// Delays every later subscribe call before it completes.
    pub fn set_subscribe_delay(&self, delay: Option<Duration>) {
        self.inner.state.lock().subscribe_delay = delay;
    }
}

impl Unsubscribe for MemoryBusInner {
    fn unsubscribe(&self, topic: &str, sink_id: u64) {
        let mut state = self.state.lock();
        let Some(sinks) = state.sinks.get_mut(topic) else {
            return;
        };
        let before = sinks.len();
        sinks.retain(|(id, _)| *id != sink_id);
        if sinks.len() == before {
            return;
        }
        if sinks.is_empty() {
            state.sinks.remove(topic);
        }
        *state.unsubscribe_counts.entry(topic.to_string()).or_default() += 1;
    }
}

impl Transport for MemoryBus {
    async fn subscribe(
        &self,
        topic: &str,
        qos: QoS,
        sink: mpsc::Sender<InboundMessage>,
    ) -> Result<SubscriptionHandle, ProtocolError> {
        let delay = self.inner.state.lock().subscribe_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let sink_id = self.inner.next_sink_id.fetch_add(1, Ordering::Relaxed);
        {
            let mut state = self.inner.state.lock();
            if state.rejected_topics.contains(topic) {
                return Err(ProtocolError::SubscriptionRejected {
                    topic: topic.to_string(),
                });
            }
            tracing::debug!(topic = %topic, qos = qos.level(), sink = sink_id, "Subscribed");
            if let Some(retained) = state.retained.get(topic)
                && let Err(e) = sink.try_send(InboundMessage::new(topic, retained.clone()))
            {
                tracing::warn!(topic = %topic, error = %e, "Dropping retained message");
            }
            state
                .sinks
                .entry(topic.to_string())
                .or_default()
                .push((sink_id, sink));
            *state.subscribe_counts.entry(topic.to_string()).or_default() += 1;
        }

        let owner: Arc<dyn Unsubscribe> = self.inner.clone();
        Ok(SubscriptionHandle::new(topic, sink_id, owner))
    }

    async fn publish(
        &self,
        topic: &str,
        payload: &str,
        qos: QoS,
        retain: bool,
    ) -> Result<(), ProtocolError> {
        let mut state = self.inner.state.lock();
        if state.reject_publishes {
            return Err(ProtocolError::ConnectionFailed(format!(
                "publish to {topic} rejected"
            )));
        }
        tracing::debug!(topic = %topic, payload = %payload, qos = qos.level(), retain, "Published");
        state.published.push(PublishedMessage {
            topic: topic.to_string(),
            payload: payload.to_string(),
            qos,
            retain,
        });
        if retain {
            if payload.is_empty() {
                state.retained.remove(topic);
            } else {
                state.retained.insert(topic.to_string(), payload.to_string());
            }
        }
        state.deliver(topic, payload);
        Ok(())
    }
}

impl std::fmt::Debug for MemoryBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("MemoryBus")
            .field("topics", &state.sinks.len())
            .field("retained", &state.retained.len())
            .field("published", &state.published.len())
            .finish()
    }
}
