// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Local timers of a remote.
//!
//! Neither timer waits for the remote: the battery poll fires on a fixed
//! period and the ring light auto-off fires after the duration it was
//! switched on with. Both only post an [`Internal`] message to the engine;
//! the engine does the actual work on its own task.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use super::engine::Internal;

/// Owns the battery poll task and the ring light auto-off task.
#[derive(Debug)]
pub(crate) struct TimerScheduler {
    internal_tx: mpsc::Sender<Internal>,
    battery_poll: Option<JoinHandle<()>>,
    ring_light: Option<JoinHandle<()>>,
    ring_light_generation: u64,
}

impl TimerScheduler {
    pub fn new(internal_tx: mpsc::Sender<Internal>) -> Self {
        Self {
            internal_tx,
            battery_poll: None,
            ring_light: None,
            ring_light_generation: 0,
        }
    }

    /// Starts the periodic battery poll; the first tick is one period away.
    pub fn start_battery_poll(&mut self, period: Duration) {
        if let Some(task) = self.battery_poll.take() {
            task.abort();
        }
        let tx = self.internal_tx.clone();
        self.battery_poll = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if tx.send(Internal::BatteryPollDue).await.is_err() {
                    break;
                }
            }
        }));
        tracing::debug!(period_secs = period.as_secs(), "Battery poll started");
    }

    /// Arms the ring light auto-off, replacing any pending one.
    ///
    /// Returns the generation the expiry message will carry.
    pub fn arm_ring_light(&mut self, after: Duration) -> u64 {
        self.cancel_ring_light();
        let generation = self.ring_light_generation;
        let tx = self.internal_tx.clone();
        self.ring_light = Some(tokio::spawn(async move {
            tokio::time::sleep(after).await;
            let _ = tx.send(Internal::RingLightExpired { generation }).await;
        }));
        generation
    }

    /// Cancels a pending auto-off.
    ///
    /// An expiry message already queued becomes outdated as well.
    pub fn cancel_ring_light(&mut self) {
        if let Some(task) = self.ring_light.take() {
            task.abort();
        }
        self.ring_light_generation += 1;
    }

    /// Returns `true` if an expiry with this generation is the armed one.
    pub fn is_current_ring_light(&self, generation: u64) -> bool {
        self.ring_light.is_some() && generation == self.ring_light_generation
    }

    /// Marks the armed auto-off as fired.
    pub fn ring_light_fired(&mut self) {
        self.ring_light = None;
        self.ring_light_generation += 1;
    }

    pub fn ring_light_armed(&self) -> bool {
        self.ring_light.is_some()
    }

    pub fn battery_poll_running(&self) -> bool {
        self.battery_poll.is_some()
    }

    /// Stops both timers.
    pub fn shutdown(&mut self) {
        if let Some(task) = self.battery_poll.take() {
            task.abort();
        }
        self.cancel_ring_light();
    }
}

impl Drop for TimerScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}
