// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! On/off state shared by macros and the ring light.

use std::fmt;
use std::str::FromStr;

use crate::error::ValueError;

/// On/off state of a macro or of the ring light.
///
/// Parsing only accepts the literals `on` and `off`, ignoring case and
/// surrounding whitespace. Anything else the remote publishes on a macro
/// trigger topic is rejected.
///
/// # Examples
///
/// ```
/// use rs90_lib::types::SwitchState;
///
/// assert_eq!(" ON ".parse::<SwitchState>().unwrap(), SwitchState::On);
/// assert_eq!(SwitchState::Off.as_str(), "off");
/// assert!("toggle".parse::<SwitchState>().is_err());
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum SwitchState {
    /// Switched on.
    On,
    /// Switched off.
    #[default]
    Off,
}

impl SwitchState {
    /// Returns the payload string used on the bus.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::On => "on",
            Self::Off => "off",
        }
    }

    /// Returns `true` if the state is [`SwitchState::On`].
    #[must_use]
    pub const fn is_on(&self) -> bool {
        matches!(self, Self::On)
    }
}

impl fmt::Display for SwitchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SwitchState {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "on" => Ok(Self::On),
            "off" => Ok(Self::Off),
            _ => Err(ValueError::InvalidSwitchState(s.to_string())),
        }
    }
}

impl From<bool> for SwitchState {
    fn from(value: bool) -> Self {
        if value { Self::On } else { Self::Off }
    }
}
