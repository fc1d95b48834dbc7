// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! MQTT broker connection.
//!
//! [`MqttBroker`] holds one persistent connection that any number of remotes
//! can share. Incoming messages are routed by exact topic to every sink that
//! subscribed to it. rumqttc reconnects on its own after a network error;
//! because sessions are clean, every live topic is subscribed again once the
//! broker acknowledges the new connection.
//!
//! # Examples
//!
//! ```no_run
//! use rs90_lib::protocol::MqttBroker;
//!
//! # async fn example() -> rs90_lib::Result<()> {
//! let broker = MqttBroker::builder()
//!     .host("192.168.1.50")
//!     .port(1883)
//!     .credentials("user", "password")
//!     .build()
//!     .await?;
//!
//! // The broker can be cloned and shared between remotes
//! let broker_clone = broker.clone();
//!
//! if broker.is_connected() {
//!     println!("Connected to MQTT broker");
//! }
//!
//! broker.disconnect().await?;
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::RwLock;
use rumqttc::{AsyncClient, EventLoop, MqttOptions, SubscribeFilter};
use tokio::sync::{mpsc, oneshot};

use super::{InboundMessage, QoS, SubscriptionHandle, Transport, Unsubscribe};
use crate::error::ProtocolError;

/// Pause between two connection attempts after an event loop error.
const RECONNECT_DELAY: Duration = Duration::from_secs(1);

/// Capacity of the rumqttc request queue.
const REQUEST_QUEUE_CAPACITY: usize = 64;

/// Maximum number of filters carried by one re-subscribe packet.
const RESUBSCRIBE_BATCH: usize = 32;

/// Configuration for an MQTT broker connection.
#[derive(Debug, Clone)]
pub struct MqttBrokerConfig {
    host: String,
    port: u16,
    credentials: Option<(String, String)>,
    keep_alive: Duration,
    connection_timeout: Duration,
    client_id: Option<String>,
}

impl Default for MqttBrokerConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: 1883,
            credentials: None,
            keep_alive: Duration::from_secs(30),
            connection_timeout: Duration::from_secs(10),
            client_id: None,
        }
    }
}

/// Sinks registered for one topic.
struct TopicSinks {
    qos: QoS,
    sinks: Vec<(u64, mpsc::Sender<InboundMessage>)>,
}

/// A shared MQTT broker connection.
///
/// `MqttBroker` is cheaply cloneable (via `Arc`).
#[derive(Clone)]
pub struct MqttBroker {
    inner: Arc<MqttBrokerInner>,
}

struct MqttBrokerInner {
    client: AsyncClient,
    topics: RwLock<HashMap<String, TopicSinks>>,
    config: MqttBrokerConfig,
    client_id: String,
    connected: AtomicBool,
    closing: AtomicBool,
    next_sink_id: AtomicU64,
}

impl MqttBroker {
    /// Creates a new builder for configuring an MQTT broker connection.
    #[must_use]
    pub fn builder() -> MqttBrokerBuilder {
        MqttBrokerBuilder::default()
    }

    /// Returns whether the broker is currently connected.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.inner.connected.load(Ordering::Acquire)
    }

    /// Returns the host address of the broker.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.inner.config.host
    }

    /// Returns the port of the broker.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.inner.config.port
    }

    /// Returns the MQTT client id in use.
    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.inner.client_id
    }

    /// Returns whether authentication is configured.
    #[must_use]
    pub fn has_credentials(&self) -> bool {
        self.inner.config.credentials.is_some()
    }

    /// Returns the number of topics with at least one live sink.
    #[must_use]
    pub fn subscription_count(&self) -> usize {
        self.inner.topics.read().len()
    }

    /// Routes an incoming message to every sink of its topic.
    fn route_message(&self, topic: &str, payload: &str) {
        let topics = self.inner.topics.read();
        let Some(entry) = topics.get(topic) else {
            tracing::trace!(topic = %topic, "No sink for topic");
            return;
        };
        for (sink_id, sink) in &entry.sinks {
            // The engine drains its inbox continuously; a full inbox means
            // the subscriber is gone or stuck.
            if let Err(e) = sink.try_send(InboundMessage::new(topic, payload)) {
                tracing::warn!(topic = %topic, sink = sink_id, error = %e, "Dropping message for sink");
            }
        }
    }

    /// Subscribes every live topic again after a reconnect.
    ///
    /// Runs on its own task: the event loop is the only consumer of the
    /// request queue and must keep polling while the packets are queued.
    fn resubscribe_all(&self) {
        let batches = resubscribe_batches(&self.inner.topics.read());
        if batches.is_empty() {
            return;
        }
        tokio::spawn(resubscribe(self.inner.client.clone(), batches));
    }

    /// Disconnects from the broker.
    ///
    /// All sinks are dropped, so every subscriber sees its channel close.
    ///
    /// # Errors
    ///
    /// Returns error if the disconnect operation fails.
    pub async fn disconnect(&self) -> Result<(), ProtocolError> {
        tracing::info!(
            host = %self.inner.config.host,
            port = %self.inner.config.port,
            "Disconnecting from MQTT broker"
        );

        self.inner.closing.store(true, Ordering::Release);
        self.inner.topics.write().clear();

        self.inner
            .client
            .disconnect()
            .await
            .map_err(ProtocolError::Mqtt)?;

        self.inner.connected.store(false, Ordering::Release);
        Ok(())
    }
}

impl Unsubscribe for MqttBrokerInner {
    fn unsubscribe(&self, topic: &str, sink_id: u64) {
        let mut topics = self.topics.write();
        let Some(entry) = topics.get_mut(topic) else {
            return;
        };
        entry.sinks.retain(|(id, _)| *id != sink_id);
        if !entry.sinks.is_empty() {
            return;
        }
        topics.remove(topic);

        if self.closing.load(Ordering::Acquire) {
            return;
        }
        // Queued under the write lock, so a new first sink for the same topic
        // always sends its SUBSCRIBE after this UNSUBSCRIBE.
        match self.client.try_unsubscribe(topic) {
            Ok(()) => tracing::debug!(topic = %topic, "Unsubscribed from topic"),
            Err(e) => tracing::warn!(topic = %topic, error = %e, "Failed to unsubscribe"),
        }
    }
}

impl Transport for MqttBroker {
    async fn subscribe(
        &self,
        topic: &str,
        qos: QoS,
        sink: mpsc::Sender<InboundMessage>,
    ) -> Result<SubscriptionHandle, ProtocolError> {
        let sink_id = self.inner.next_sink_id.fetch_add(1, Ordering::Relaxed);

        // Register before subscribing so a retained message sent right after
        // SUBACK already finds its sink.
        let first = {
            let mut topics = self.inner.topics.write();
            let entry = topics.entry(topic.to_string()).or_insert_with(|| TopicSinks {
                qos,
                sinks: Vec::new(),
            });
            entry.sinks.push((sink_id, sink));
            entry.sinks.len() == 1
        };

        let owner: Arc<dyn Unsubscribe> = self.inner.clone();
        let handle = SubscriptionHandle::new(topic, sink_id, owner);

        if first {
            // On failure the handle drops and removes the sink again.
            self.inner
                .client
                .subscribe(topic, qos.into())
                .await
                .map_err(ProtocolError::Mqtt)?;
            tracing::debug!(topic = %topic, qos = qos.level(), "Subscribed to topic");
        }

        Ok(handle)
    }

    async fn publish(
        &self,
        topic: &str,
        payload: &str,
        qos: QoS,
        retain: bool,
    ) -> Result<(), ProtocolError> {
        tracing::debug!(topic = %topic, payload = %payload, qos = qos.level(), retain, "Publishing");
        self.inner
            .client
            .publish(topic, qos.into(), retain, payload.as_bytes().to_vec())
            .await
            .map_err(ProtocolError::Mqtt)
    }
}

impl std::fmt::Debug for MqttBroker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MqttBroker")
            .field("host", &self.inner.config.host)
            .field("port", &self.inner.config.port)
            .field("client_id", &self.inner.client_id)
            .field("connected", &self.is_connected())
            .finish()
    }
}

/// Builder for creating an MQTT broker connection.
///
/// # Examples
///
/// ```no_run
/// use rs90_lib::protocol::MqttBroker;
/// use std::time::Duration;
///
/// # async fn example() -> rs90_lib::Result<()> {
/// let broker = MqttBroker::builder()
///     .host("192.168.1.50")
///     .port(1883)
///     .credentials("user", "password")
///     .keep_alive(Duration::from_secs(60))
///     .connection_timeout(Duration::from_secs(5))
///     .client_id("rs90-living-room")
///     .build()
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct MqttBrokerBuilder {
    config: MqttBrokerConfig,
}

impl MqttBrokerBuilder {
    /// Sets the broker host address.
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    /// Sets the broker port (default: 1883).
    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Sets authentication credentials.
    #[must_use]
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.config.credentials = Some((username.into(), password.into()));
        self
    }

    /// Sets the keep-alive interval (default: 30 seconds).
    #[must_use]
    pub fn keep_alive(mut self, duration: Duration) -> Self {
        self.config.keep_alive = duration;
        self
    }

    /// Sets the connection timeout (default: 10 seconds).
    #[must_use]
    pub fn connection_timeout(mut self, duration: Duration) -> Self {
        self.config.connection_timeout = duration;
        self
    }

    /// Sets the MQTT client id (default: `rs90_<uuid>`).
    #[must_use]
    pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
        self.config.client_id = Some(client_id.into());
        self
    }

    /// Builds and connects to the MQTT broker.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Host is not set
    /// - Connection fails
    /// - Connection times out
    pub async fn build(self) -> Result<MqttBroker, ProtocolError> {
        if self.config.host.is_empty() {
            return Err(ProtocolError::InvalidAddress(
                "MQTT broker host is required".to_string(),
            ));
        }

        let client_id = self
            .config
            .client_id
            .clone()
            .unwrap_or_else(|| format!("rs90_{}", uuid::Uuid::new_v4().simple()));

        let mut mqtt_options = MqttOptions::new(&client_id, &self.config.host, self.config.port);
        mqtt_options.set_keep_alive(self.config.keep_alive);
        mqtt_options.set_clean_session(true);

        if let Some((ref username, ref password)) = self.config.credentials {
            mqtt_options.set_credentials(username, password);
        }

        let (client, event_loop) = AsyncClient::new(mqtt_options, REQUEST_QUEUE_CAPACITY);

        let inner = MqttBrokerInner {
            client,
            topics: RwLock::new(HashMap::new()),
            config: self.config.clone(),
            client_id,
            connected: AtomicBool::new(false),
            closing: AtomicBool::new(false),
            next_sink_id: AtomicU64::new(0),
        };

        let broker = MqttBroker {
            inner: Arc::new(inner),
        };

        let broker_clone = broker.clone();
        let (connack_tx, connack_rx) = oneshot::channel();

        tokio::spawn(async move {
            handle_broker_events(event_loop, broker_clone, Some(connack_tx)).await;
        });

        let timeout = self.config.connection_timeout;
        match tokio::time::timeout(timeout, connack_rx).await {
            Ok(Ok(())) => {
                broker.inner.connected.store(true, Ordering::Release);
                tracing::info!(
                    host = %self.config.host,
                    port = %self.config.port,
                    client_id = %broker.inner.client_id,
                    "Connected to MQTT broker"
                );
            }
            Ok(Err(_)) => {
                broker.inner.closing.store(true, Ordering::Release);
                return Err(ProtocolError::ConnectionFailed(
                    "MQTT event loop terminated unexpectedly".to_string(),
                ));
            }
            Err(_) => {
                broker.inner.closing.store(true, Ordering::Release);
                return Err(ProtocolError::ConnectionFailed(format!(
                    "MQTT connection timeout after {}s",
                    timeout.as_secs()
                )));
            }
        }

        Ok(broker)
    }
}

/// Groups the live topics into SUBSCRIBE packets of at most
/// [`RESUBSCRIBE_BATCH`] filters.
fn resubscribe_batches(topics: &HashMap<String, TopicSinks>) -> Vec<Vec<SubscribeFilter>> {
    let filters: Vec<SubscribeFilter> = topics
        .iter()
        .map(|(topic, entry)| SubscribeFilter::new(topic.clone(), entry.qos.into()))
        .collect();
    filters.chunks(RESUBSCRIBE_BATCH).map(<[_]>::to_vec).collect()
}

/// Sends the re-subscribe packets and returns how many topics were queued.
async fn resubscribe(client: AsyncClient, batches: Vec<Vec<SubscribeFilter>>) -> usize {
    let mut queued = 0;
    for batch in batches {
        let count = batch.len();
        match client.subscribe_many(batch).await {
            Ok(()) => queued += count,
            Err(e) => tracing::error!(topics = count, error = %e, "Failed to re-subscribe"),
        }
    }
    tracing::info!(count = queued, "Re-subscribed topics after reconnect");
    queued
}

/// Handles MQTT events for the broker connection.
///
/// Runs until [`MqttBroker::disconnect`] is called or the connection could
/// not be established in the first place.
async fn handle_broker_events(
    mut event_loop: EventLoop,
    broker: MqttBroker,
    connack_tx: Option<oneshot::Sender<()>>,
) {
    use rumqttc::{Event, Packet};

    let mut connack_tx = connack_tx;

    loop {
        match event_loop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(connack))) => {
                tracing::debug!(?connack, "MQTT broker connected");
                broker.inner.connected.store(true, Ordering::Release);
                match connack_tx.take() {
                    Some(tx) => {
                        let _ = tx.send(());
                    }
                    None => broker.resubscribe_all(),
                }
            }
            Ok(Event::Incoming(Packet::SubAck(suback))) => {
                tracing::debug!(?suback, "MQTT subscription acknowledged");
            }
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                match String::from_utf8(publish.payload.to_vec()) {
                    Ok(payload) => {
                        tracing::debug!(
                            topic = %publish.topic,
                            payload = %payload,
                            "MQTT message received"
                        );
                        broker.route_message(&publish.topic, &payload);
                    }
                    Err(e) => {
                        tracing::warn!(topic = %publish.topic, error = %e, "Ignoring non UTF-8 payload");
                    }
                }
            }
            Ok(Event::Incoming(Packet::Disconnect)) => {
                tracing::info!("MQTT broker disconnected");
                broker.inner.connected.store(false, Ordering::Release);
            }
            Ok(_) => {}
            Err(e) => {
                broker.inner.connected.store(false, Ordering::Release);
                if broker.inner.closing.load(Ordering::Acquire) {
                    tracing::debug!(error = %e, "MQTT event loop stopped");
                    break;
                }
                if connack_tx.is_some() {
                    // Never connected: let `build` report the failure.
                    tracing::error!(error = %e, "MQTT connection failed");
                    break;
                }
                tracing::error!(error = %e, "MQTT broker event loop error, reconnecting");
                tokio::time::sleep(RECONNECT_DELAY).await;
            }
        }
    }
}
