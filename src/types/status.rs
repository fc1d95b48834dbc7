// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Availability of the remote as published on its `status` topic.

use std::fmt;
use std::str::FromStr;

use crate::error::ValueError;

/// Online/offline availability of the remote.
///
/// A freshly started engine reports [`RemoteStatus::Offline`] until the
/// remote publishes `online`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum RemoteStatus {
    /// The remote is connected to the broker.
    Online,
    /// The remote is not connected, or has not reported yet.
    #[default]
    Offline,
}

impl RemoteStatus {
    /// Returns the payload string used on the bus.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Offline => "offline",
        }
    }

    /// Returns `true` if the remote is online.
    #[must_use]
    pub const fn is_online(&self) -> bool {
        matches!(self, Self::Online)
    }
}

impl fmt::Display for RemoteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RemoteStatus {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "online" => Ok(Self::Online),
            "offline" => Ok(Self::Offline),
            _ => Err(ValueError::InvalidStatus(s.to_string())),
        }
    }
}
