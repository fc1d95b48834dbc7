// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the `rs90_lib` library.
//!
//! Failures fall into three families:
//!
//! - transport failures ([`ProtocolError`]): subscribe or publish calls that
//!   the bus rejected,
//! - payload failures ([`ParseError`]): messages from the remote that could
//!   not be understood. The engine logs these and keeps the previous state,
//!   they never reach a caller,
//! - lookup and validation failures on the command surface ([`ValueError`],
//!   [`Error::MacroNotFound`], [`Error::DeviceNotFound`]).

use thiserror::Error;

/// The main error type for this library.
#[derive(Debug, Error)]
pub enum Error {
    /// Error occurred during value validation.
    #[error("value error: {0}")]
    Value(#[from] ValueError),

    /// Error occurred during bus communication.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Error occurred while parsing a payload.
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// No macro with this id is present in the current macro list.
    #[error("macro not found: {id}")]
    MacroNotFound {
        /// The id that was looked up.
        id: String,
    },

    /// No device with this id is present in the current device list.
    #[error("device not found: {id}")]
    DeviceNotFound {
        /// The id that was looked up.
        id: String,
    },

    /// The remote engine has been shut down.
    #[error("remote is not running")]
    NotRunning,
}

/// Errors related to value validation and constraints.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValueError {
    /// A numeric value is outside the allowed range.
    #[error("value {actual} is out of range [{min}, {max}]")]
    OutOfRange {
        /// Minimum allowed value.
        min: i64,
        /// Maximum allowed value.
        max: i64,
        /// The actual value that was provided.
        actual: i64,
    },

    /// An on/off state string was not recognised.
    #[error("invalid switch state: {0}")]
    InvalidSwitchState(String),

    /// A remote status string was not recognised.
    #[error("invalid remote status: {0}")]
    InvalidStatus(String),

    /// A name used to build a topic was empty.
    #[error("{0} name must not be empty")]
    EmptyName(&'static str),

    /// The configuration is invalid.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
}

/// Errors related to bus communication.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// MQTT client request failed.
    #[error("MQTT error: {0}")]
    Mqtt(#[from] rumqttc::ClientError),

    /// Connection to the broker failed.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Invalid broker address.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// The bus refused a subscription.
    #[error("subscription to {topic} rejected")]
    SubscriptionRejected {
        /// Topic that could not be subscribed.
        topic: String,
    },
}

/// Errors related to parsing remote payloads.
#[derive(Debug, Error)]
pub enum ParseError {
    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// Unexpected payload format.
    #[error("unexpected payload format: {0}")]
    UnexpectedFormat(String),

    /// Failed to parse a specific value.
    #[error("failed to parse {field}: {message}")]
    InvalidValue {
        /// The field that failed to parse.
        field: String,
        /// Description of the parsing failure.
        message: String,
    },
}

/// A specialized Result type for this library.
pub type Result<T> = std::result::Result<T, Error>;
