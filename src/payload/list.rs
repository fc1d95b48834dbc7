// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Parser for the device, macro and command lists.

use serde_json::{Map, Value};

use crate::error::ParseError;
use crate::state::{Device, DeviceCommand, ListEntry, Macro};

/// Id spellings used by `device/list` and `macro/list`.
const LIST_ID_KEYS: &[&str] = &["id", "Id"];

/// Id spellings used by `device/{name}/commands`.
const COMMAND_ID_KEYS: &[&str] = &["id", "Id", "ID"];

/// Parses a `device/list` snapshot.
///
/// # Errors
///
/// Returns `ParseError::Json` if the payload is not a JSON array of objects.
pub fn parse_device_list(payload: &str) -> Result<Vec<Device>, ParseError> {
    parse_entries(payload, LIST_ID_KEYS)
}

/// Parses a `macro/list` snapshot.
///
/// # Errors
///
/// Returns `ParseError::Json` if the payload is not a JSON array of objects.
pub fn parse_macro_list(payload: &str) -> Result<Vec<Macro>, ParseError> {
    parse_entries(payload, LIST_ID_KEYS)
}

/// Parses a `device/{name}/commands` payload.
///
/// An empty (or whitespace-only) payload is the remote's way of saying the
/// device has no commands and yields an empty list.
///
/// # Errors
///
/// Returns `ParseError::Json` if a non-empty payload is not a JSON array of
/// objects.
pub fn parse_command_list(payload: &str) -> Result<Vec<DeviceCommand>, ParseError> {
    if payload.trim().is_empty() {
        return Ok(Vec::new());
    }
    parse_entries(payload, COMMAND_ID_KEYS)
}

fn parse_entries(payload: &str, id_keys: &[&str]) -> Result<Vec<ListEntry>, ParseError> {
    let raw: Vec<Map<String, Value>> = serde_json::from_str(payload)?;
    Ok(raw.iter().map(|object| normalize(object, id_keys)).collect())
}

/// The first id spelling holding a usable value wins.
fn normalize(object: &Map<String, Value>, id_keys: &[&str]) -> ListEntry {
    let id = id_keys
        .iter()
        .filter_map(|key| object.get(*key))
        .find_map(scalar_to_string);
    let name = object.get("name").and_then(scalar_to_string);
    ListEntry { id, name }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
