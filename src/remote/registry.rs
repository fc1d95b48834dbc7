// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Live subscriptions of one remote.

use std::collections::HashMap;
use std::fmt;

use crate::protocol::{Route, SubscriptionHandle, TopicRouter};

/// Per-entity subscription pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Pool {
    /// One `device/{name}/commands` subscription per device.
    Devices,
    /// One `macro/{name}/trigger` subscription per macro.
    Macros,
}

impl fmt::Display for Pool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Devices => "device",
            Self::Macros => "macro",
        })
    }
}

/// Owns every subscription handle of a remote together with the routing
/// table of its inbox.
///
/// Global subscriptions live until shutdown; entity subscriptions are keyed
/// by name and can be released one by one.
#[derive(Debug, Default)]
pub(crate) struct SubscriptionRegistry {
    global: Vec<SubscriptionHandle>,
    devices: HashMap<String, SubscriptionHandle>,
    macros: HashMap<String, SubscriptionHandle>,
    router: TopicRouter,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keeps a global subscription and routes its topic.
    pub fn subscribe_global(&mut self, route: Route, handle: SubscriptionHandle) {
        self.router.register(handle.topic(), route);
        self.global.push(handle);
    }

    /// Routes an entity topic ahead of its subscription.
    pub fn route_entity(&mut self, topic: impl Into<String>, route: Route) {
        self.router.register(topic, route);
    }

    /// Keeps an entity subscription. A previous handle for the same name is
    /// cancelled.
    pub fn insert_entity(&mut self, pool: Pool, name: &str, handle: SubscriptionHandle) {
        if let Some(previous) = self.pool_mut(pool).insert(name.to_string(), handle) {
            tracing::debug!(pool = %pool, name = %name, "Replacing entity subscription");
            previous.cancel();
        }
    }

    /// Unroutes an entity topic and cancels its subscription.
    ///
    /// Returns `true` if a live subscription was cancelled.
    pub fn unsubscribe_entity(&mut self, pool: Pool, name: &str, topic: &str) -> bool {
        self.router.unregister(topic);
        match self.pool_mut(pool).remove(name) {
            Some(handle) => {
                handle.cancel();
                true
            }
            None => false,
        }
    }

    /// Unroutes an entity topic without touching subscriptions.
    pub fn unroute(&mut self, topic: &str) {
        self.router.unregister(topic);
    }

    pub fn route_count(&self) -> usize {
        self.router.len()
    }

    pub fn route(&self, topic: &str) -> Option<&Route> {
        self.router.lookup(topic)
    }

    /// Cancels every subscription and clears the routing table.
    ///
    /// Calling it again is a no-op.
    pub fn shutdown(&mut self) {
        let released = self.global.len() + self.devices.len() + self.macros.len();
        for handle in self.global.drain(..) {
            handle.cancel();
        }
        for (_, handle) in self.devices.drain() {
            handle.cancel();
        }
        for (_, handle) in self.macros.drain() {
            handle.cancel();
        }
        self.router.clear();
        if released > 0 {
            tracing::debug!(released, "Released all subscriptions");
        }
    }

    pub fn global_count(&self) -> usize {
        self.global.len()
    }

    pub fn entity_count(&self, pool: Pool) -> usize {
        match pool {
            Pool::Devices => self.devices.len(),
            Pool::Macros => self.macros.len(),
        }
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.global.is_empty() && self.devices.is_empty() && self.macros.is_empty()
    }

    fn pool_mut(&mut self, pool: Pool) -> &mut HashMap<String, SubscriptionHandle> {
        match pool {
            Pool::Devices => &mut self.devices,
            Pool::Macros => &mut self.macros,
        }
    }
}
