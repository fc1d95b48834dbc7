// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Configuration of one remote.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, ValueError};
use crate::types::LedDuration;

/// Topic prefix the RS90 firmware publishes under.
pub const DEFAULT_TOPIC_PREFIX: &str = "Haptique";

/// Interval between two battery requests.
pub const DEFAULT_BATTERY_POLL_INTERVAL: Duration = Duration::from_secs(3600);

const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Configuration of one remote.
///
/// # Examples
///
/// ```
/// use rs90_lib::RemoteConfig;
/// use std::time::Duration;
///
/// let config = RemoteConfig::new("abc123")
///     .with_name("Living room")
///     .with_battery_poll_interval(Duration::from_secs(600));
/// assert_eq!(config.base_topic(), "Haptique/abc123");
///
/// let config = RemoteConfig::from_json(r#"{"remote_id": "abc123", "topic_prefix": "Lab"}"#).unwrap();
/// assert_eq!(config.base_topic(), "Lab/abc123");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Id of the remote, the second topic level.
    pub remote_id: String,
    /// Optional display name.
    pub name: Option<String>,
    /// First topic level.
    pub topic_prefix: String,
    /// Seconds between two battery requests.
    pub battery_poll_interval_secs: u64,
    /// Ring light duration used when none is given, in seconds (1-10).
    pub default_ring_light_duration: u8,
    /// Buffer size of the event broadcast channel.
    pub event_capacity: usize,
    /// Buffer size of the inbound message channel.
    pub inbound_capacity: usize,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            remote_id: String::new(),
            name: None,
            topic_prefix: DEFAULT_TOPIC_PREFIX.to_string(),
            battery_poll_interval_secs: DEFAULT_BATTERY_POLL_INTERVAL.as_secs(),
            default_ring_light_duration: LedDuration::DEFAULT.seconds(),
            event_capacity: DEFAULT_CHANNEL_CAPACITY,
            inbound_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

impl RemoteConfig {
    /// Creates a configuration with defaults for the given remote id.
    #[must_use]
    pub fn new(remote_id: impl Into<String>) -> Self {
        Self {
            remote_id: remote_id.into(),
            ..Self::default()
        }
    }

    /// Parses a configuration from JSON; missing fields take their default.
    ///
    /// # Errors
    ///
    /// Returns `ParseError::Json` for malformed JSON and
    /// `ValueError::InvalidConfiguration` if validation fails.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        let config: Self = serde_json::from_str(json).map_err(crate::error::ParseError::from)?;
        config.validate()?;
        Ok(config)
    }

    /// Sets a display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the topic prefix.
    #[must_use]
    pub fn with_topic_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.topic_prefix = prefix.into();
        self
    }

    /// Sets the battery poll interval (whole seconds).
    #[must_use]
    pub fn with_battery_poll_interval(mut self, interval: Duration) -> Self {
        self.battery_poll_interval_secs = interval.as_secs();
        self
    }

    /// Sets the default ring light duration.
    #[must_use]
    pub fn with_default_ring_light_duration(mut self, duration: LedDuration) -> Self {
        self.default_ring_light_duration = duration.seconds();
        self
    }

    /// Sets the event channel capacity.
    #[must_use]
    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }

    /// Sets the inbound message channel capacity.
    #[must_use]
    pub fn with_inbound_capacity(mut self, capacity: usize) -> Self {
        self.inbound_capacity = capacity;
        self
    }

    /// Returns `{topic_prefix}/{remote_id}`.
    #[must_use]
    pub fn base_topic(&self) -> String {
        format!("{}/{}", self.topic_prefix, self.remote_id)
    }

    /// Returns the battery poll interval.
    #[must_use]
    pub fn battery_poll_interval(&self) -> Duration {
        Duration::from_secs(self.battery_poll_interval_secs)
    }

    /// Returns the default ring light duration, clamped to 1-10 seconds.
    #[must_use]
    pub fn default_ring_light(&self) -> LedDuration {
        LedDuration::clamped(i64::from(self.default_ring_light_duration))
    }

    /// Checks the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::InvalidConfiguration` if the remote id or prefix
    /// is empty or contains MQTT wildcards, the poll interval is zero, or a
    /// channel capacity is zero.
    pub fn validate(&self) -> Result<(), ValueError> {
        let invalid = |message: &str| Err(ValueError::InvalidConfiguration(message.to_string()));

        if self.remote_id.trim().is_empty() {
            return invalid("remote_id must not be empty");
        }
        if self.topic_prefix.trim().is_empty() {
            return invalid("topic_prefix must not be empty");
        }
        if [&self.remote_id, &self.topic_prefix]
            .iter()
            .any(|level| level.contains(['+', '#', '/']))
        {
            return invalid("remote_id and topic_prefix must be single topic levels");
        }
        if self.battery_poll_interval_secs == 0 {
            return invalid("battery_poll_interval_secs must be positive");
        }
        if self.event_capacity == 0 || self.inbound_capacity == 0 {
            return invalid("channel capacities must be positive");
        }
        Ok(())
    }
}
