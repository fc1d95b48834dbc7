// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Remote event types.

use chrono::{DateTime, Utc};

use crate::state::{RemoteState, StateChange};
use crate::types::ButtonId;

/// One key press on the remote.
///
/// Two presses of the same button are two distinct values: `sequence` grows
/// by one per press and `timestamp` is strictly increasing for one remote.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct KeyPress {
    /// Id of the remote the key was pressed on.
    pub remote_id: String,
    /// The pressed button.
    pub button: ButtonId,
    /// When the press was received.
    pub timestamp: DateTime<Utc>,
    /// Press counter of the remote, starting at 1.
    pub sequence: u64,
}

impl KeyPress {
    /// Creates a key press stamped with the current time.
    #[must_use]
    pub fn new(remote_id: impl Into<String>, button: ButtonId, sequence: u64) -> Self {
        Self {
            remote_id: remote_id.into(),
            button,
            timestamp: Utc::now(),
            sequence,
        }
    }
}

/// Events emitted by a running remote.
#[derive(Debug, Clone, serde::Serialize)]
pub enum RemoteEvent {
    /// Remote state changed.
    StateChanged {
        /// The change that was applied.
        change: StateChange,
        /// The complete state after the change.
        new_state: RemoteState,
    },

    /// A key was pressed.
    KeyPressed(KeyPress),
}

impl RemoteEvent {
    /// Returns `true` if this is a state change event.
    #[must_use]
    pub fn is_state_change(&self) -> bool {
        matches!(self, Self::StateChanged { .. })
    }

    /// Returns `true` if this is a key press event.
    #[must_use]
    pub fn is_key_press(&self) -> bool {
        matches!(self, Self::KeyPressed(_))
    }

    /// Returns the state change, if any.
    #[must_use]
    pub fn change(&self) -> Option<&StateChange> {
        match self {
            Self::StateChanged { change, .. } => Some(change),
            Self::KeyPressed(_) => None,
        }
    }

    /// Returns the key press, if any.
    #[must_use]
    pub fn key_press(&self) -> Option<&KeyPress> {
        match self {
            Self::KeyPressed(press) => Some(press),
            Self::StateChanged { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RemoteStatus;

    #[test]
    fn accessors() {
        let event = RemoteEvent::StateChanged {
            change: StateChange::Status(RemoteStatus::Online),
            new_state: RemoteState::new(),
        };
        assert!(event.is_state_change());
        assert!(event.key_press().is_none());
        assert_eq!(event.change(), Some(&StateChange::Status(RemoteStatus::Online)));

        let event = RemoteEvent::KeyPressed(KeyPress::new("r1", ButtonId::new("5"), 3));
        assert!(event.is_key_press());
        assert_eq!(event.key_press().map(|k| k.sequence), Some(3));
    }
}
