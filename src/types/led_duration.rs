// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Ring light duration type.

use std::fmt;
use std::time::Duration;

use crate::error::ValueError;

/// How long the ring light stays lit, in seconds (1-10).
///
/// The remote switches the light off on its own once the duration elapses,
/// so this value also drives the local auto-off timer.
///
/// # Examples
///
/// ```
/// use rs90_lib::types::LedDuration;
///
/// assert_eq!(LedDuration::clamped(0).seconds(), 1);
/// assert_eq!(LedDuration::clamped(15).seconds(), 10);
/// assert_eq!(LedDuration::default().seconds(), 5);
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct LedDuration(u8);

impl LedDuration {
    /// Shortest duration in seconds.
    pub const MIN: u8 = 1;

    /// Longest duration in seconds.
    pub const MAX: u8 = 10;

    /// Duration used when none is given.
    pub const DEFAULT: Self = Self(5);

    /// Creates a duration.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::OutOfRange` if value is outside [1, 10].
    pub fn new(seconds: u8) -> Result<Self, ValueError> {
        if !(Self::MIN..=Self::MAX).contains(&seconds) {
            return Err(ValueError::OutOfRange {
                min: i64::from(Self::MIN),
                max: i64::from(Self::MAX),
                actual: i64::from(seconds),
            });
        }
        Ok(Self(seconds))
    }

    /// Creates a duration, clamping to [1, 10].
    #[must_use]
    pub fn clamped(seconds: i64) -> Self {
        // Safe: clamped into 1..=10
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let seconds = seconds.clamp(i64::from(Self::MIN), i64::from(Self::MAX)) as u8;
        Self(seconds)
    }

    /// Returns the duration in whole seconds.
    #[must_use]
    pub const fn seconds(&self) -> u8 {
        self.0
    }

    /// Returns the duration as a [`Duration`].
    #[must_use]
    pub fn as_duration(&self) -> Duration {
        Duration::from_secs(u64::from(self.0))
    }
}

impl Default for LedDuration {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for LedDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
