// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Parser for `battery_level` payloads.

use crate::error::ParseError;
use crate::types::BatteryLevel;

/// Parses a battery reading.
///
/// Accepted shapes are bare digits (`"85"`), digits with a percent sign
/// (`"85%"`) and free text containing digits (`"Level: 73 percent"`, first
/// run of digits wins). A `-` directly in front of the digits makes the value
/// negative. The result is clamped to 0-100.
///
/// # Errors
///
/// Returns `ParseError::InvalidValue` if the payload contains no digits.
///
/// # Examples
///
/// ```
/// use rs90_lib::payload::parse_battery_level;
///
/// assert_eq!(parse_battery_level("Level: 73 percent").unwrap().value(), 73);
/// assert_eq!(parse_battery_level("150").unwrap().value(), 100);
/// assert!(parse_battery_level("none").is_err());
/// ```
pub fn parse_battery_level(payload: &str) -> Result<BatteryLevel, ParseError> {
    let bytes = payload.as_bytes();
    let start = bytes
        .iter()
        .position(u8::is_ascii_digit)
        .ok_or_else(|| ParseError::InvalidValue {
            field: "battery_level".to_string(),
            message: format!("no digits in {payload:?}"),
        })?;
    let negative = start > 0 && bytes[start - 1] == b'-';

    let magnitude = bytes[start..]
        .iter()
        .take_while(|b| b.is_ascii_digit())
        .fold(0_i64, |acc, b| {
            acc.saturating_mul(10).saturating_add(i64::from(b - b'0'))
        });

    let value = if negative { -magnitude } else { magnitude };
    Ok(BatteryLevel::clamped(value))
}
