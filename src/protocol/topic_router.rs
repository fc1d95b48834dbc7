// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Topic to handler routing.
//!
//! All subscriptions of one remote deliver into the same inbox, so the
//! engine needs to know which handler a message belongs to. The
//! [`TopicRouter`] is that table: one [`Route`] per exact topic.
//!
//! # Architecture
//!
//! ```text
//! Bus message: Haptique/abc/macro/Movie/trigger → on
//!                     ↓
//!             TopicRouter.lookup()
//!                     ↓
//!         Route::MacroTrigger("Movie")
//!                     ↓
//!     engine applies MacroState { Movie, On }
//! ```

use std::collections::HashMap;

/// What a message on a topic means.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Route {
    /// Remote availability.
    Status,
    /// Device list snapshot.
    DeviceList,
    /// Macro list snapshot.
    MacroList,
    /// Battery reading.
    BatteryLevel,
    /// Key press.
    Keys,
    /// Running macro text.
    TestStatus,
    /// Command list of the named device.
    DeviceCommands(String),
    /// State of the named macro.
    MacroTrigger(String),
}

/// Maps exact topics to routes.
#[derive(Debug, Default)]
pub struct TopicRouter {
    routes: HashMap<String, Route>,
}

impl TopicRouter {
    /// Creates an empty router.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a route, replacing any previous one for the topic.
    pub fn register(&mut self, topic: impl Into<String>, route: Route) {
        let topic = topic.into();
        tracing::trace!(topic = %topic, ?route, "Registering route");
        self.routes.insert(topic, route);
    }

    /// Removes the route of a topic.
    ///
    /// Returns `true` if the topic was registered.
    pub fn unregister(&mut self, topic: &str) -> bool {
        tracing::trace!(topic = %topic, "Unregistering route");
        self.routes.remove(topic).is_some()
    }

    /// Returns the route of a topic.
    #[must_use]
    pub fn lookup(&self, topic: &str) -> Option<&Route> {
        self.routes.get(topic)
    }

    /// Returns the number of registered topics.
    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Returns `true` if no topic is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Removes every route.
    pub fn clear(&mut self) {
        self.routes.clear();
    }
}
