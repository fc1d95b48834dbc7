// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Parsers for the payloads an RS90 remote publishes.
//!
//! The remote's payload contract is irregular: lists use two or three
//! spellings of the id field, battery readings come as bare digits, with a
//! percent sign, or embedded in free text, and key presses are prefixed
//! with `button:`. Each parser here accepts exactly those shapes and returns
//! a [`ParseError`](crate::error::ParseError) for anything else. The engine
//! logs parse errors and keeps the previous state.
//!
//! # Examples
//!
//! ```
//! use rs90_lib::payload::{parse_battery_level, parse_device_list, parse_key};
//!
//! let devices = parse_device_list(r#"[{"Id": 1, "name": "TV"}]"#).unwrap();
//! assert_eq!(devices[0].id.as_deref(), Some("1"));
//!
//! assert_eq!(parse_battery_level("85%").unwrap().value(), 85);
//! assert_eq!(parse_key("button:5").unwrap().as_str(), "5");
//! ```

mod battery;
mod key;
mod list;

pub use battery::parse_battery_level;
pub use key::parse_key;
pub use list::{parse_command_list, parse_device_list, parse_macro_list};

use crate::error::ValueError;
use crate::types::{RemoteStatus, SwitchState};

/// Parses a `status` payload.
///
/// # Errors
///
/// Returns `ValueError::InvalidStatus` for anything but `online`/`offline`.
pub fn parse_status(payload: &str) -> Result<RemoteStatus, ValueError> {
    payload.parse()
}

/// Parses a `macro/{name}/trigger` payload.
///
/// # Errors
///
/// Returns `ValueError::InvalidSwitchState` for anything but `on`/`off`.
pub fn parse_macro_state(payload: &str) -> Result<SwitchState, ValueError> {
    payload.parse()
}

/// Interprets a `test/status` payload: empty clears, anything else is kept
/// verbatim.
#[must_use]
pub fn parse_test_status(payload: &str) -> Option<String> {
    if payload.is_empty() {
        None
    } else {
        Some(payload.to_string())
    }
}
