// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Topic layout of one remote.

/// Builds the topics of one remote, all under `{prefix}/{remote_id}`.
///
/// # Examples
///
/// ```
/// use rs90_lib::protocol::RemoteTopics;
///
/// let topics = RemoteTopics::new("Haptique/abc123");
/// assert_eq!(topics.device_list(), "Haptique/abc123/device/list");
/// assert_eq!(topics.macro_trigger("Movie"), "Haptique/abc123/macro/Movie/trigger");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteTopics {
    base: String,
}

impl RemoteTopics {
    /// Creates the layout for a base topic such as `Haptique/abc123`.
    #[must_use]
    pub fn new(base: impl Into<String>) -> Self {
        Self { base: base.into() }
    }

    /// Returns the base topic.
    #[must_use]
    pub fn base(&self) -> &str {
        &self.base
    }

    fn join(&self, suffix: &str) -> String {
        format!("{}/{suffix}", self.base)
    }

    /// `status`: online/offline.
    #[must_use]
    pub fn status(&self) -> String {
        self.join("status")
    }

    /// `device/list`: retained device snapshot.
    #[must_use]
    pub fn device_list(&self) -> String {
        self.join("device/list")
    }

    /// `macro/list`: retained macro snapshot.
    #[must_use]
    pub fn macro_list(&self) -> String {
        self.join("macro/list")
    }

    /// `battery/status`: battery reading request.
    #[must_use]
    pub fn battery_request(&self) -> String {
        self.join("battery/status")
    }

    /// `battery_level`: battery reading.
    #[must_use]
    pub fn battery_level(&self) -> String {
        self.join("battery_level")
    }

    /// `keys`: key presses.
    #[must_use]
    pub fn keys(&self) -> String {
        self.join("keys")
    }

    /// `test/status`: free text about the running macro.
    #[must_use]
    pub fn test_status(&self) -> String {
        self.join("test/status")
    }

    /// `ledlight/on`: ring light request.
    #[must_use]
    pub fn ring_light_on(&self) -> String {
        self.join("ledlight/on")
    }

    /// `device/{name}/detail`: command list request.
    #[must_use]
    pub fn device_detail(&self, device: &str) -> String {
        format!("{}/device/{device}/detail", self.base)
    }

    /// `device/{name}/commands`: retained command list.
    #[must_use]
    pub fn device_commands(&self, device: &str) -> String {
        format!("{}/device/{device}/commands", self.base)
    }

    /// `device/{name}/trigger`: command trigger.
    #[must_use]
    pub fn device_trigger(&self, device: &str) -> String {
        format!("{}/device/{device}/trigger", self.base)
    }

    /// `macro/{name}/trigger`: macro state, both directions.
    #[must_use]
    pub fn macro_trigger(&self, name: &str) -> String {
        format!("{}/macro/{name}/trigger", self.base)
    }
}
