// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the climate controller.
//!
//! Classification failures, bus failures and rejected control requests each
//! have their own enum; [`Error`] wraps them for callers that do not care
//! which layer failed.

use thiserror::Error;

/// The main error type for this crate.
#[derive(Debug, Error)]
pub enum Error {
    /// A value handed to the control surface was rejected.
    #[error("value error: {0}")]
    Value(#[from] ValueError),

    /// Error occurred while talking to the message bus.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// A bus message could not be turned into a device record.
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// The named zone does not exist in the catalog.
    #[error("zone not found: {0}")]
    ZoneNotFound(String),
}

/// Errors related to value validation and constraints.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValueError {
    /// An invalid power state string was provided.
    #[error("invalid power state: {0}")]
    InvalidPowerState(String),

    /// An invalid manual lock state string was provided.
    #[error("invalid lock state: {0}")]
    InvalidLockState(String),

    /// Two zones were configured with the same id.
    #[error("duplicate zone id: {0}")]
    DuplicateZone(String),

    /// A stored sensor reading that cannot be used for a decision.
    #[error("unusable reading from {sensor}: {reason}")]
    InvalidReading {
        /// The sensor id.
        sensor: String,
        /// What is wrong with the reading.
        reason: String,
    },

    /// A zone target temperature below its floor temperature.
    #[error("target temperature {target}°F is below floor temperature {floor}°F")]
    TargetBelowFloor {
        /// The requested target temperature.
        target: i32,
        /// The zone's floor temperature.
        floor: i32,
    },
}

/// Errors related to the publish/subscribe transport.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// MQTT connection or communication failed.
    #[cfg(feature = "mqtt")]
    #[error("MQTT error: {0}")]
    Mqtt(#[from] rumqttc::ClientError),

    /// Connection to the broker failed.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Invalid broker address.
    #[error("invalid address: {0}")]
    InvalidAddress(String),
}

/// Errors raised while classifying a bus message.
///
/// Distinct from an unrecognized topic, which is not an error at all.
#[derive(Debug, Error)]
pub enum ParseError {
    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// Expected field is missing from the payload.
    #[error("missing field in payload: {0}")]
    MissingField(String),

    /// Failed to parse a specific value.
    #[error("failed to parse {field}: {message}")]
    InvalidValue {
        /// The field that failed to parse.
        field: String,
        /// Description of the parsing failure.
        message: String,
    },
}

/// A specialized Result type for this crate.
pub type Result<T> = std::result::Result<T, Error>;
