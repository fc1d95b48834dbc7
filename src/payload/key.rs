// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Parser for `keys` payloads.

use crate::error::ParseError;
use crate::types::ButtonId;

const MARKER: &str = "button:";

/// Parses a key press payload of the form `button:<n>`.
///
/// The button is the trimmed text after the first `button:` marker, up to a
/// second marker if the remote ever packs two.
///
/// # Errors
///
/// Returns `ParseError::UnexpectedFormat` if the marker is missing or
/// nothing follows it.
pub fn parse_key(payload: &str) -> Result<ButtonId, ParseError> {
    let (_, rest) = payload
        .split_once(MARKER)
        .ok_or_else(|| ParseError::UnexpectedFormat(format!("key payload {payload:?}")))?;
    let button = rest.split(MARKER).next().unwrap_or_default().trim();
    if button.is_empty() {
        return Err(ParseError::UnexpectedFormat(format!(
            "key payload {payload:?} has no button"
        )));
    }
    Ok(ButtonId::new(button))
}
