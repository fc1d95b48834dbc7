// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Handle to a running remote.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;

use crate::error::{Error, Result};
use crate::event::{EventBus, KeyPress, RemoteEvent};
use crate::protocol::Transport;
use crate::state::{RemoteState, StateChange};
use crate::subscription::{CallbackRegistry, Subscribable, SubscriptionId};
use crate::types::{BatteryLevel, RemoteStatus, SwitchState};

use super::config::RemoteConfig;
use super::diagnostics::{Diagnostics, RefreshReport};
use super::engine::{self, Request, Target};

/// A running RS90 remote.
///
/// `Remote` is a cheap handle to the engine task that mirrors one remote:
/// clones share the same engine. The engine stops on [`shutdown`] or once
/// every handle is dropped.
///
/// State can be read three ways:
///
/// - [`state`](Self::state) returns a snapshot,
/// - [`watch_state`](Self::watch_state) follows the latest snapshot,
/// - [`subscribe`](Self::subscribe) and the [`Subscribable`] callbacks
///   deliver every change and every key press.
///
/// [`shutdown`]: Self::shutdown
///
/// # Examples
///
/// ```
/// use rs90_lib::types::SwitchState;
/// use rs90_lib::{MemoryBus, Remote, RemoteConfig};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> rs90_lib::Result<()> {
/// let bus = MemoryBus::new();
/// let remote = Remote::start(bus.clone(), RemoteConfig::new("abc123")).await?;
///
/// remote.trigger_macro("Movie", SwitchState::On).await?;
/// assert_eq!(remote.state().macro_state("Movie"), Some(SwitchState::On));
/// assert_eq!(bus.retained("Haptique/abc123/macro/Movie/trigger").as_deref(), Some("on"));
///
/// remote.shutdown().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Remote {
    inner: Arc<RemoteInner>,
}

struct RemoteInner {
    remote_id: String,
    requests: mpsc::Sender<Request>,
    state_rx: watch::Receiver<RemoteState>,
    events: EventBus,
    callbacks: Arc<CallbackRegistry>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Remote {
    /// Starts mirroring a remote over `transport`.
    ///
    /// Subscribes the status, list, battery, key and test status topics,
    /// requests a battery reading and starts the battery poll. A global
    /// subscription the bus refuses is logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns `Error::Value` if the configuration is invalid.
    pub async fn start<T>(transport: T, config: RemoteConfig) -> Result<Self>
    where
        T: Transport + Clone,
    {
        config.validate()?;
        let remote_id = config.remote_id.clone();
        let launched = engine::launch(transport, config).await;

        Ok(Self {
            inner: Arc::new(RemoteInner {
                remote_id,
                requests: launched.requests,
                state_rx: launched.state_rx,
                events: launched.events,
                callbacks: launched.callbacks,
                task: Mutex::new(Some(launched.task)),
            }),
        })
    }

    /// Returns the remote id.
    #[must_use]
    pub fn remote_id(&self) -> &str {
        &self.inner.remote_id
    }

    /// Returns a snapshot of the current state.
    #[must_use]
    pub fn state(&self) -> RemoteState {
        self.inner.state_rx.borrow().clone()
    }

    /// Returns a receiver that always holds the latest state.
    #[must_use]
    pub fn watch_state(&self) -> watch::Receiver<RemoteState> {
        self.inner.state_rx.clone()
    }

    /// Subscribes to state changes and key presses.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<RemoteEvent> {
        self.inner.events.subscribe()
    }

    /// Returns `true` until the engine has stopped.
    #[must_use]
    pub fn is_running(&self) -> bool {
        !self.inner.requests.is_closed()
    }

    // =========================================================================
    // Commands
    // =========================================================================

    /// Switches a macro on or off.
    ///
    /// The trigger is published retained so the remote picks it up after a
    /// reconnect. The macro state is written right away, without waiting for
    /// the remote to confirm it.
    ///
    /// # Errors
    ///
    /// Returns `Error::Value` for an empty name, `Error::Protocol` if the
    /// publish failed (the state is left untouched) and `Error::NotRunning`
    /// after shutdown.
    pub async fn trigger_macro(&self, name: impl Into<String>, state: SwitchState) -> Result<()> {
        let target = Target::Name(name.into());
        self.request(|reply| Request::TriggerMacro {
            target,
            state,
            reply,
        })
        .await?
    }

    /// Switches a macro on or off by its id in the current macro list.
    ///
    /// # Errors
    ///
    /// Returns `Error::MacroNotFound` if no named macro has this id, plus
    /// the errors of [`trigger_macro`](Self::trigger_macro).
    pub async fn trigger_macro_by_id(&self, id: impl Into<String>, state: SwitchState) -> Result<()> {
        let target = Target::Id(id.into());
        self.request(|reply| Request::TriggerMacro {
            target,
            state,
            reply,
        })
        .await?
    }

    /// Sends a command to a device.
    ///
    /// # Errors
    ///
    /// Returns `Error::Value` for an empty device or command name,
    /// `Error::Protocol` if the publish failed and `Error::NotRunning` after
    /// shutdown.
    pub async fn trigger_device_command(
        &self,
        device: impl Into<String>,
        command: impl Into<String>,
    ) -> Result<()> {
        let target = Target::Name(device.into());
        let command = command.into();
        self.request(|reply| Request::TriggerDeviceCommand {
            target,
            command,
            reply,
        })
        .await?
    }

    /// Sends a command to a device by its id in the current device list.
    ///
    /// # Errors
    ///
    /// Returns `Error::DeviceNotFound` if no named device has this id, plus
    /// the errors of [`trigger_device_command`](Self::trigger_device_command).
    pub async fn trigger_device_command_by_id(
        &self,
        device_id: impl Into<String>,
        command: impl Into<String>,
    ) -> Result<()> {
        let target = Target::Id(device_id.into());
        let command = command.into();
        self.request(|reply| Request::TriggerDeviceCommand {
            target,
            command,
            reply,
        })
        .await?
    }

    /// Switches the ring light.
    ///
    /// `On` publishes the duration (clamped to 1-10 s, the configured
    /// default when `None`) and arms a local auto-off. `Off` only cancels
    /// the auto-off and updates the state; the remote turns the light off
    /// by itself.
    ///
    /// # Errors
    ///
    /// Returns `Error::Protocol` if the publish failed and
    /// `Error::NotRunning` after shutdown.
    pub async fn control_ring_light(&self, state: SwitchState, duration: Option<i64>) -> Result<()> {
        self.request(|reply| Request::RingLight {
            state,
            duration,
            reply,
        })
        .await?
    }

    /// Turns the ring light on for `seconds` (clamped to 1-10).
    ///
    /// # Errors
    ///
    /// See [`control_ring_light`](Self::control_ring_light).
    pub async fn ring_light_on(&self, seconds: i64) -> Result<()> {
        self.control_ring_light(SwitchState::On, Some(seconds)).await
    }

    /// Turns the ring light off locally.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotRunning` after shutdown.
    pub async fn ring_light_off(&self) -> Result<()> {
        self.control_ring_light(SwitchState::Off, None).await
    }

    // =========================================================================
    // Maintenance
    // =========================================================================

    /// Subscribes every listed device and macro that has no subscription
    /// and requests a battery reading.
    ///
    /// The remote cannot be asked to publish its lists again; this only
    /// walks the lists already received.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotRunning` after shutdown.
    pub async fn force_refresh_lists(&self) -> Result<RefreshReport> {
        self.request(|reply| Request::ForceRefresh { reply }).await
    }

    /// Returns a snapshot of the state and subscriptions.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotRunning` after shutdown.
    pub async fn diagnostics(&self) -> Result<Diagnostics> {
        self.request(|reply| Request::Diagnostics { reply }).await
    }

    /// Stops the engine: cancels both timers and releases every
    /// subscription.
    ///
    /// Calling it again, or from another clone, is a no-op.
    ///
    /// # Errors
    ///
    /// Currently always succeeds.
    pub async fn shutdown(&self) -> Result<()> {
        let (reply, done) = oneshot::channel();
        if self.inner.requests.send(Request::Shutdown { reply }).await.is_ok() {
            let _ = done.await;
        }

        let task = self.inner.task.lock().take();
        if let Some(task) = task
            && let Err(e) = task.await
        {
            tracing::warn!(remote = %self.inner.remote_id, error = %e, "Engine task ended abnormally");
        }
        Ok(())
    }

    async fn request<R>(&self, build: impl FnOnce(oneshot::Sender<R>) -> Request) -> Result<R> {
        let (reply, response) = oneshot::channel();
        self.inner
            .requests
            .send(build(reply))
            .await
            .map_err(|_| Error::NotRunning)?;
        response.await.map_err(|_| Error::NotRunning)
    }
}

impl Subscribable for Remote {
    fn on_state_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&StateChange) + Send + Sync + 'static,
    {
        self.inner.callbacks.on_state_changed(callback)
    }

    fn on_status_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(RemoteStatus) + Send + Sync + 'static,
    {
        self.inner.callbacks.on_status_changed(callback)
    }

    fn on_battery_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(BatteryLevel) + Send + Sync + 'static,
    {
        self.inner.callbacks.on_battery_changed(callback)
    }

    fn on_macro_state_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&str, Option<SwitchState>) + Send + Sync + 'static,
    {
        self.inner.callbacks.on_macro_state_changed(callback)
    }

    fn on_ring_light_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(SwitchState, u8) + Send + Sync + 'static,
    {
        self.inner.callbacks.on_ring_light_changed(callback)
    }

    fn on_lists_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&RemoteState) + Send + Sync + 'static,
    {
        self.inner.callbacks.on_lists_changed(callback)
    }

    fn on_key_pressed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&KeyPress) + Send + Sync + 'static,
    {
        self.inner.callbacks.on_key_pressed(callback)
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.callbacks.unsubscribe(id)
    }
}

impl std::fmt::Debug for Remote {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Remote")
            .field("remote_id", &self.inner.remote_id)
            .field("running", &self.is_running())
            .field("callbacks", &self.inner.callbacks.callback_count())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::MemoryBus;

    async fn remote(bus: &MemoryBus) -> Remote {
        Remote::start(bus.clone(), RemoteConfig::new("r1"))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn start_rejects_invalid_config() {
        let bus = MemoryBus::new();
        let result = Remote::start(bus.clone(), RemoteConfig::new("")).await;
        assert!(matches!(result, Err(Error::Value(_))));
        assert_eq!(bus.total_active_subscriptions(), 0);
    }

    #[tokio::test]
    async fn start_subscribes_globals_and_requests_battery() {
        let bus = MemoryBus::new();
        let remote = remote(&bus).await;

        assert_eq!(bus.total_active_subscriptions(), 6);
        assert_eq!(bus.published_to("Haptique/r1/battery/status").len(), 1);
        assert_eq!(remote.remote_id(), "r1");
        assert!(remote.is_running());

        remote.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn shutdown_is_idempotent() {
        let bus = MemoryBus::new();
        let remote = remote(&bus).await;
        let clone = remote.clone();

        remote.shutdown().await.unwrap();
        clone.shutdown().await.unwrap();

        assert!(!remote.is_running());
        assert_eq!(bus.total_active_subscriptions(), 0);
        assert!(matches!(
            remote.trigger_macro("Movie", SwitchState::On).await,
            Err(Error::NotRunning)
        ));
        assert!(matches!(remote.diagnostics().await, Err(Error::NotRunning)));
    }

    #[tokio::test]
    async fn dropping_every_handle_stops_the_engine() {
        let bus = MemoryBus::new();
        let remote = remote(&bus).await;
        let task = remote.inner.task.lock().take().unwrap();

        drop(remote);
        task.await.unwrap();
        assert_eq!(bus.total_active_subscriptions(), 0);
    }

    #[tokio::test]
    async fn callbacks_are_delegated() {
        let bus = MemoryBus::new();
        let remote = remote(&bus).await;

        let id = remote.on_key_pressed(|_| {});
        assert!(remote.unsubscribe(id));
        assert!(!remote.unsubscribe(id));

        remote.shutdown().await.unwrap();
    }
}
