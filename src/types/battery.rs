// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Battery level type.

use std::fmt;

use crate::error::ValueError;

/// Battery charge as a percentage (0-100).
///
/// # Examples
///
/// ```
/// use rs90_lib::types::BatteryLevel;
///
/// let level = BatteryLevel::new(85).unwrap();
/// assert_eq!(level.value(), 85);
///
/// // Out-of-range readings are clamped
/// assert_eq!(BatteryLevel::clamped(150).value(), 100);
/// assert_eq!(BatteryLevel::clamped(-5).value(), 0);
///
/// assert!(BatteryLevel::new(101).is_err());
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct BatteryLevel(u8);

impl BatteryLevel {
    /// Empty battery.
    pub const EMPTY: Self = Self(0);

    /// Full battery.
    pub const FULL: Self = Self(100);

    /// Creates a battery level.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::OutOfRange` if value exceeds 100.
    pub fn new(value: u8) -> Result<Self, ValueError> {
        if value > 100 {
            return Err(ValueError::OutOfRange {
                min: 0,
                max: 100,
                actual: i64::from(value),
            });
        }
        Ok(Self(value))
    }

    /// Creates a battery level, clamping any reading to [0, 100].
    #[must_use]
    pub fn clamped(value: i64) -> Self {
        // Safe: clamped into 0..=100
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let value = value.clamp(0, 100) as u8;
        Self(value)
    }

    /// Returns the percentage value.
    #[must_use]
    pub const fn value(&self) -> u8 {
        self.0
    }
}

impl fmt::Display for BatteryLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}
