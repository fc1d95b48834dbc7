// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Entries of the device, macro and command lists.

use serde::{Deserialize, Serialize};

/// One normalized entry of a list published by the remote.
///
/// Both fields are optional: a malformed upstream entry is kept in the list
/// (lists mirror the snapshot verbatim) but an entry without a name is never
/// subscribed to.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ListEntry {
    /// Identifier assigned by the remote.
    pub id: Option<String>,
    /// Display name, also used to build per-entry topics.
    pub name: Option<String>,
}

impl ListEntry {
    /// Creates an entry with both fields set.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            name: Some(name.into()),
        }
    }

    /// Returns the name if it is present and non-empty.
    #[must_use]
    pub fn usable_name(&self) -> Option<&str> {
        self.name.as_deref().filter(|name| !name.is_empty())
    }
}

/// An entry of the `device/list` snapshot.
pub type Device = ListEntry;

/// An entry of the `macro/list` snapshot.
pub type Macro = ListEntry;

/// An entry of a `device/{name}/commands` list.
pub type DeviceCommand = ListEntry;
