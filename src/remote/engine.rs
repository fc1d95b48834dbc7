// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The reconciliation engine.
//!
//! One task owns the [`RemoteState`] of a remote together with its
//! subscriptions and timers. It polls three channels, in this order:
//!
//! 1. inbound bus messages,
//! 2. internal completions (entity subscribe results, timer ticks),
//! 3. requests from [`Remote`](super::Remote) handles.
//!
//! Entity subscribe calls run on tasks of their own and report back through
//! the internal channel, so a slow subscribe never holds up message handling
//! and a completion is always applied by the engine itself.
//!
//! ```text
//! bus ──► inbound ──┐
//! subscribe tasks ──┤
//! timers ─► internal┼──► Engine ──► watch / EventBus / callbacks
//! Remote ─► requests┘      │
//!                          └──► Transport::publish
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

use crate::error::{Error, ProtocolError, ValueError};
use crate::event::{EventBus, KeyPress, RemoteEvent};
use crate::payload;
use crate::protocol::{InboundMessage, QoS, RemoteTopics, Route, SubscriptionHandle, Transport};
use crate::state::{ListEntry, RemoteState, StateChange};
use crate::subscription::CallbackRegistry;
use crate::types::{LedDuration, SwitchState};

use super::config::RemoteConfig;
use super::diagnostics::{
    CommandSummary, Diagnostics, RefreshReport, SubscriptionCounts, TimerStatus, TrackedNames,
};
use super::dispatcher::CommandDispatcher;
use super::reconciler::{Completion, Reconciler};
use super::registry::{Pool, SubscriptionRegistry};
use super::timers::TimerScheduler;

/// Capacity of the internal completion channel.
const INTERNAL_CAPACITY: usize = 64;

/// Capacity of the request channel.
const REQUEST_CAPACITY: usize = 32;

type Reply<T> = oneshot::Sender<Result<T, Error>>;

/// How a command names its macro or device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Target {
    /// By name, used as-is.
    Name(String),
    /// By list id, resolved through the current snapshot.
    Id(String),
}

/// A call from a [`Remote`](super::Remote) handle.
#[derive(Debug)]
pub(crate) enum Request {
    TriggerMacro {
        target: Target,
        state: SwitchState,
        reply: Reply<()>,
    },
    TriggerDeviceCommand {
        target: Target,
        command: String,
        reply: Reply<()>,
    },
    RingLight {
        state: SwitchState,
        duration: Option<i64>,
        reply: Reply<()>,
    },
    ForceRefresh {
        reply: oneshot::Sender<RefreshReport>,
    },
    Diagnostics {
        reply: oneshot::Sender<Diagnostics>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

/// Work posted to the engine by its own tasks.
#[derive(Debug)]
pub(crate) enum Internal {
    /// An entity subscribe call resolved.
    EntitySubscribed {
        pool: Pool,
        name: String,
        attempt: u64,
        result: Result<SubscriptionHandle, ProtocolError>,
    },
    /// The battery poll period elapsed.
    BatteryPollDue,
    /// A ring light auto-off elapsed.
    RingLightExpired { generation: u64 },
}

/// Channel ends a [`Remote`](super::Remote) keeps once the engine runs.
pub(crate) struct Launched {
    pub requests: mpsc::Sender<Request>,
    pub state_rx: watch::Receiver<RemoteState>,
    pub events: EventBus,
    pub callbacks: Arc<CallbackRegistry>,
    pub task: JoinHandle<()>,
}

/// Creates the engine of one remote, sets up its global subscriptions and
/// spawns its task.
pub(crate) async fn launch<T>(transport: T, config: RemoteConfig) -> Launched
where
    T: Transport + Clone,
{
    let (inbound_tx, inbound_rx) = mpsc::channel(config.inbound_capacity);
    let (internal_tx, internal_rx) = mpsc::channel(INTERNAL_CAPACITY);
    let (requests, requests_rx) = mpsc::channel(REQUEST_CAPACITY);
    let (state_tx, state_rx) = watch::channel(RemoteState::new());
    let events = EventBus::with_capacity(config.event_capacity);
    let callbacks = Arc::new(CallbackRegistry::new());

    let topics = RemoteTopics::new(config.base_topic());
    let mut engine = Engine {
        transport,
        dispatcher: CommandDispatcher::new(topics.clone()),
        topics,
        config,
        state: RemoteState::new(),
        state_tx,
        events: events.clone(),
        callbacks: Arc::clone(&callbacks),
        registry: SubscriptionRegistry::new(),
        devices: Reconciler::new(),
        macros: Reconciler::new(),
        timers: TimerScheduler::new(internal_tx.clone()),
        inbound_tx,
        internal_tx,
        key_sequence: 0,
        last_key_at: None,
    };
    engine.start().await;

    let task = tokio::spawn(engine.run(inbound_rx, internal_rx, requests_rx));
    Launched {
        requests,
        state_rx,
        events,
        callbacks,
        task,
    }
}

/// Single owner of a remote's state.
struct Engine<T> {
    transport: T,
    config: RemoteConfig,
    topics: RemoteTopics,
    dispatcher: CommandDispatcher,
    state: RemoteState,
    state_tx: watch::Sender<RemoteState>,
    events: EventBus,
    callbacks: Arc<CallbackRegistry>,
    registry: SubscriptionRegistry,
    devices: Reconciler,
    macros: Reconciler,
    timers: TimerScheduler,
    inbound_tx: mpsc::Sender<InboundMessage>,
    internal_tx: mpsc::Sender<Internal>,
    key_sequence: u64,
    last_key_at: Option<DateTime<Utc>>,
}

impl<T> Engine<T>
where
    T: Transport + Clone,
{
    // =========================================================================
    // Lifecycle
    // =========================================================================

    async fn start(&mut self) {
        let globals = [
            (self.topics.status(), Route::Status),
            (self.topics.device_list(), Route::DeviceList),
            (self.topics.macro_list(), Route::MacroList),
            (self.topics.battery_level(), Route::BatteryLevel),
            (self.topics.keys(), Route::Keys),
            (self.topics.test_status(), Route::TestStatus),
        ];
        for (topic, route) in globals {
            match self
                .transport
                .subscribe(&topic, QoS::AtMostOnce, self.inbound_tx.clone())
                .await
            {
                Ok(handle) => {
                    tracing::debug!(topic = %topic, "Subscribed");
                    self.registry.subscribe_global(route, handle);
                }
                Err(e) => {
                    tracing::error!(topic = %topic, error = %e, "Global subscription failed");
                }
            }
        }

        self.request_battery().await;
        self.timers
            .start_battery_poll(self.config.battery_poll_interval());

        tracing::info!(
            remote = %self.config.remote_id,
            base_topic = %self.topics.base(),
            subscriptions = self.registry.global_count(),
            "Remote started"
        );
    }

    async fn run(
        mut self,
        mut inbound_rx: mpsc::Receiver<InboundMessage>,
        mut internal_rx: mpsc::Receiver<Internal>,
        mut requests_rx: mpsc::Receiver<Request>,
    ) {
        loop {
            tokio::select! {
                biased;

                Some(message) = inbound_rx.recv() => self.handle_message(message),
                Some(internal) = internal_rx.recv() => self.handle_internal(internal).await,
                request = requests_rx.recv() => match request {
                    Some(Request::Shutdown { reply }) => {
                        self.shutdown();
                        let _ = reply.send(());
                        break;
                    }
                    Some(request) => self.handle_request(request).await,
                    None => {
                        tracing::debug!(remote = %self.config.remote_id, "All handles dropped");
                        self.shutdown();
                        break;
                    }
                },
            }
        }
    }

    fn shutdown(&mut self) {
        self.timers.shutdown();
        self.registry.shutdown();
        self.devices.clear();
        self.macros.clear();
        tracing::info!(remote = %self.config.remote_id, "Remote stopped");
    }

    // =========================================================================
    // Notification
    // =========================================================================

    /// Applies a change and notifies listeners if the state changed.
    fn commit(&mut self, change: StateChange) {
        if self.state.apply(&change) {
            self.notify(change);
        }
    }

    /// Applies a change and notifies listeners unconditionally.
    fn publish_change(&mut self, change: StateChange) {
        self.state.apply(&change);
        self.notify(change);
    }

    fn notify(&self, change: StateChange) {
        self.state_tx.send_replace(self.state.clone());
        self.callbacks.dispatch(&change, &self.state);
        self.events.publish(RemoteEvent::StateChanged {
            change,
            new_state: self.state.clone(),
        });
    }

    // =========================================================================
    // Inbound messages
    // =========================================================================

    fn handle_message(&mut self, message: InboundMessage) {
        let InboundMessage { topic, payload } = message;
        tracing::debug!(topic = %topic, payload = %payload, "Received message");

        let Some(route) = self.registry.route(&topic).cloned() else {
            tracing::debug!(topic = %topic, "No route for topic");
            return;
        };

        match route {
            Route::Status => self.handle_status(&payload),
            Route::DeviceList => self.handle_device_list(&payload),
            Route::MacroList => self.handle_macro_list(&payload),
            Route::BatteryLevel => self.handle_battery(&payload),
            Route::Keys => self.handle_key(&payload),
            Route::TestStatus => {
                self.commit(StateChange::RunningMacro(payload::parse_test_status(&payload)));
            }
            Route::DeviceCommands(device) => self.handle_device_commands(device, &payload),
            Route::MacroTrigger(name) => self.handle_macro_state(name, &payload),
        }
    }

    fn handle_status(&mut self, payload: &str) {
        match payload::parse_status(payload) {
            Ok(status) => self.commit(StateChange::Status(status)),
            Err(e) => tracing::warn!(payload = %payload, error = %e, "Ignoring status"),
        }
    }

    fn handle_battery(&mut self, payload: &str) {
        match payload::parse_battery_level(payload) {
            Ok(level) => self.commit(StateChange::BatteryLevel(level)),
            Err(e) => tracing::warn!(payload = %payload, error = %e, "Ignoring battery level"),
        }
    }

    fn handle_key(&mut self, payload: &str) {
        let button = match payload::parse_key(payload) {
            Ok(button) => button,
            Err(e) => {
                tracing::warn!(payload = %payload, error = %e, "Ignoring key payload");
                return;
            }
        };

        self.key_sequence += 1;
        let mut press = KeyPress::new(&self.config.remote_id, button.clone(), self.key_sequence);
        if let Some(last) = self.last_key_at
            && press.timestamp <= last
        {
            press.timestamp = last + TimeDelta::microseconds(1);
        }
        self.last_key_at = Some(press.timestamp);
        tracing::info!(button = %button, sequence = press.sequence, "Key pressed");

        self.commit(StateChange::LastKey(button));
        self.callbacks.dispatch_key(&press);
        self.events.publish(RemoteEvent::KeyPressed(press));
    }

    fn handle_device_commands(&mut self, device: String, payload: &str) {
        match payload::parse_command_list(payload) {
            Ok(commands) => {
                tracing::debug!(device = %device, count = commands.len(), "Command list received");
                self.commit(StateChange::device_commands(device, commands));
            }
            Err(e) => {
                tracing::warn!(device = %device, error = %e, "Ignoring malformed command list");
            }
        }
    }

    fn handle_macro_state(&mut self, name: String, payload: &str) {
        match payload::parse_macro_state(payload) {
            Ok(state) => self.commit(StateChange::macro_state(name, state)),
            Err(e) => {
                tracing::warn!(name = %name, payload = %payload, error = %e, "Ignoring macro state");
            }
        }
    }

    // =========================================================================
    // Reconciliation
    // =========================================================================

    fn handle_device_list(&mut self, payload: &str) {
        let devices = match payload::parse_device_list(payload) {
            Ok(devices) => devices,
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring malformed device list");
                return;
            }
        };
        let names = usable_names(&devices);
        let mut changes = vec![StateChange::Devices(devices)];
        changes.extend(
            self.reconcile(Pool::Devices, &names)
                .into_iter()
                .map(|device| StateChange::DeviceCommandsRemoved { device }),
        );
        self.publish_changes(changes);
    }

    fn handle_macro_list(&mut self, payload: &str) {
        let macros = match payload::parse_macro_list(payload) {
            Ok(macros) => macros,
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring malformed macro list");
                return;
            }
        };
        let names = usable_names(&macros);
        let mut changes = vec![StateChange::Macros(macros)];
        changes.extend(
            self.reconcile(Pool::Macros, &names)
                .into_iter()
                .map(|name| StateChange::MacroStateRemoved { name }),
        );
        self.publish_changes(changes);
    }

    /// Tears down names missing from a snapshot and subscribes new ones.
    ///
    /// Returns the removed names.
    fn reconcile(&mut self, pool: Pool, names: &BTreeSet<String>) -> Vec<String> {
        let diff = self.reconciler(pool).diff(names);
        if diff.is_empty() {
            tracing::debug!(pool = %pool, tracked = names.len(), "List unchanged");
            return diff.removed;
        }

        for name in &diff.removed {
            self.reconciler_mut(pool).remove(name);
            let topic = self.entity_topic(pool, name);
            let released = self.registry.unsubscribe_entity(pool, name, &topic);
            tracing::info!(pool = %pool, name = %name, released, "Entity removed");
        }
        for name in &diff.added {
            tracing::info!(pool = %pool, name = %name, "Entity discovered");
            self.begin_entity(pool, name);
        }
        diff.removed
    }

    /// Publishes the changes of one snapshot as a single notification.
    fn publish_changes(&mut self, mut changes: Vec<StateChange>) {
        let change = if changes.len() == 1 {
            changes.remove(0)
        } else {
            StateChange::Batch(changes)
        };
        self.publish_change(change);
    }

    /// Routes an entity topic and subscribes to it on a separate task.
    fn begin_entity(&mut self, pool: Pool, name: &str) {
        let attempt = self.reconciler_mut(pool).begin(name);
        let topic = self.entity_topic(pool, name);
        let (route, request) = match pool {
            Pool::Devices => (
                Route::DeviceCommands(name.to_string()),
                Some(self.dispatcher.device_detail(name)),
            ),
            Pool::Macros => (Route::MacroTrigger(name.to_string()), None),
        };
        self.registry.route_entity(topic.clone(), route);

        let transport = self.transport.clone();
        let sink = self.inbound_tx.clone();
        let internal_tx = self.internal_tx.clone();
        let name = name.to_string();
        tokio::spawn(async move {
            if let Some(request) = request {
                // Logged by `send`; the subscription is still useful without it.
                let _ = request.send(&transport).await;
            }
            let result = transport.subscribe(&topic, QoS::AtMostOnce, sink).await;
            let completion = Internal::EntitySubscribed {
                pool,
                name,
                attempt,
                result,
            };
            // A closed channel drops the handle, which releases it.
            let _ = internal_tx.send(completion).await;
        });
    }

    fn complete_entity(
        &mut self,
        pool: Pool,
        name: &str,
        attempt: u64,
        result: Result<SubscriptionHandle, ProtocolError>,
    ) {
        match result {
            Ok(handle) => match self.reconciler_mut(pool).complete(name, attempt) {
                Completion::Admitted => {
                    tracing::info!(pool = %pool, name = %name, topic = %handle.topic(), "Subscribed");
                    self.registry.insert_entity(pool, name, handle);
                }
                Completion::Stale => {
                    tracing::debug!(pool = %pool, name = %name, attempt, "Releasing outdated subscription");
                    handle.cancel();
                }
            },
            Err(e) => {
                tracing::error!(pool = %pool, name = %name, error = %e, "Entity subscription failed");
                if self.reconciler_mut(pool).fail(name, attempt) {
                    let topic = self.entity_topic(pool, name);
                    self.registry.unroute(&topic);
                }
            }
        }
    }

    fn reconciler(&self, pool: Pool) -> &Reconciler {
        match pool {
            Pool::Devices => &self.devices,
            Pool::Macros => &self.macros,
        }
    }

    fn reconciler_mut(&mut self, pool: Pool) -> &mut Reconciler {
        match pool {
            Pool::Devices => &mut self.devices,
            Pool::Macros => &mut self.macros,
        }
    }

    fn entity_topic(&self, pool: Pool, name: &str) -> String {
        match pool {
            Pool::Devices => self.topics.device_commands(name),
            Pool::Macros => self.topics.macro_trigger(name),
        }
    }

    // =========================================================================
    // Internal work
    // =========================================================================

    async fn handle_internal(&mut self, internal: Internal) {
        match internal {
            Internal::EntitySubscribed {
                pool,
                name,
                attempt,
                result,
            } => self.complete_entity(pool, &name, attempt, result),
            Internal::BatteryPollDue => {
                tracing::debug!(remote = %self.config.remote_id, "Battery poll due");
                self.request_battery().await;
            }
            Internal::RingLightExpired { generation } => {
                if self.timers.is_current_ring_light(generation) {
                    self.timers.ring_light_fired();
                    tracing::debug!(remote = %self.config.remote_id, "Ring light auto-off");
                    self.commit(StateChange::ring_light_off());
                }
            }
        }
    }

    /// Publishes a battery request; returns `true` if the bus accepted it.
    async fn request_battery(&self) -> bool {
        self.dispatcher
            .battery_request()
            .send(&self.transport)
            .await
            .is_ok()
    }

    // =========================================================================
    // Requests
    // =========================================================================

    async fn handle_request(&mut self, request: Request) {
        match request {
            Request::TriggerMacro {
                target,
                state,
                reply,
            } => {
                let result = self.trigger_macro(target, state).await;
                let _ = reply.send(result);
            }
            Request::TriggerDeviceCommand {
                target,
                command,
                reply,
            } => {
                let result = self.trigger_device_command(target, command).await;
                let _ = reply.send(result);
            }
            Request::RingLight {
                state,
                duration,
                reply,
            } => {
                let result = self.control_ring_light(state, duration).await;
                let _ = reply.send(result);
            }
            Request::ForceRefresh { reply } => {
                let report = self.force_refresh().await;
                let _ = reply.send(report);
            }
            Request::Diagnostics { reply } => {
                let _ = reply.send(self.diagnostics());
            }
            // Handled by the run loop.
            Request::Shutdown { reply } => {
                let _ = reply.send(());
            }
        }
    }

    async fn trigger_macro(&mut self, target: Target, state: SwitchState) -> Result<(), Error> {
        let name = match target {
            Target::Name(name) => name,
            Target::Id(id) => self
                .state
                .find_macro(&id)
                .and_then(ListEntry::usable_name)
                .map(str::to_string)
                .ok_or(Error::MacroNotFound { id })?,
        };
        if name.is_empty() {
            return Err(ValueError::EmptyName("macro").into());
        }

        self.dispatcher
            .macro_trigger(&name, state)
            .send(&self.transport)
            .await?;
        tracing::info!(name = %name, state = %state, "Macro triggered");
        self.publish_change(StateChange::macro_state(name, state));
        Ok(())
    }

    async fn trigger_device_command(&mut self, target: Target, command: String) -> Result<(), Error> {
        let device = match target {
            Target::Name(name) => name,
            Target::Id(id) => self
                .state
                .find_device(&id)
                .and_then(ListEntry::usable_name)
                .map(str::to_string)
                .ok_or(Error::DeviceNotFound { id })?,
        };
        if device.is_empty() {
            return Err(ValueError::EmptyName("device").into());
        }
        if command.is_empty() {
            return Err(ValueError::EmptyName("command").into());
        }

        self.dispatcher
            .device_command(&device, &command)
            .send(&self.transport)
            .await?;
        tracing::info!(device = %device, command = %command, "Device command sent");
        Ok(())
    }

    async fn control_ring_light(
        &mut self,
        state: SwitchState,
        duration: Option<i64>,
    ) -> Result<(), Error> {
        match state {
            SwitchState::On => {
                let duration =
                    duration.map_or_else(|| self.config.default_ring_light(), LedDuration::clamped);
                self.dispatcher
                    .ring_light_on(duration)
                    .send(&self.transport)
                    .await?;
                self.timers.arm_ring_light(duration.as_duration());
                tracing::info!(duration = %duration, "Ring light on");
                self.publish_change(StateChange::ring_light_on(duration));
            }
            SwitchState::Off => {
                self.timers.cancel_ring_light();
                tracing::info!("Ring light off");
                self.commit(StateChange::ring_light_off());
            }
        }
        Ok(())
    }

    async fn force_refresh(&mut self) -> RefreshReport {
        let mut report = RefreshReport::default();
        for pool in [Pool::Devices, Pool::Macros] {
            let names = match pool {
                Pool::Devices => self.state.device_names(),
                Pool::Macros => self.state.macro_names(),
            };
            let missing = self.reconciler(pool).diff(&names).added;
            for name in &missing {
                self.begin_entity(pool, name);
            }
            match pool {
                Pool::Devices => report.devices_resubscribed = missing,
                Pool::Macros => report.macros_resubscribed = missing,
            }
        }
        report.battery_requested = self.request_battery().await;

        tracing::info!(
            devices = ?self.state.device_names(),
            macros = ?self.state.macro_names(),
            tracked_devices = ?self.devices.active_names(),
            tracked_macros = ?self.macros.active_names(),
            resubscribed = report.resubscribed_count(),
            "Lists refreshed"
        );
        report
    }

    fn diagnostics(&self) -> Diagnostics {
        let device_commands: BTreeMap<_, _> = self
            .state
            .all_device_commands()
            .iter()
            .map(|(device, commands)| (device.clone(), CommandSummary::from_commands(commands)))
            .collect();

        Diagnostics {
            remote_id: self.config.remote_id.clone(),
            name: self.config.name.clone(),
            base_topic: self.topics.base().to_string(),
            status: self.state.status(),
            battery_level: self.state.battery_level(),
            device_count: self.state.devices().len(),
            macro_count: self.state.macros().len(),
            devices: self.state.devices().to_vec(),
            macros: self.state.macros().to_vec(),
            command_keys: device_commands.keys().cloned().collect(),
            device_commands,
            subscriptions: SubscriptionCounts {
                global: self.registry.global_count(),
                devices: self.registry.entity_count(Pool::Devices),
                macros: self.registry.entity_count(Pool::Macros),
            },
            routed_topics: self.registry.route_count(),
            timers: TimerStatus {
                battery_poll: self.timers.battery_poll_running(),
                ring_light_armed: self.timers.ring_light_armed(),
            },
            tracked: TrackedNames {
                active_devices: self.devices.active_names(),
                pending_devices: self.devices.pending_names(),
                active_macros: self.macros.active_names(),
                pending_macros: self.macros.pending_names(),
            },
        }
    }
}

fn usable_names(entries: &[ListEntry]) -> BTreeSet<String> {
    entries
        .iter()
        .filter_map(ListEntry::usable_name)
        .map(str::to_string)
        .collect()
}
