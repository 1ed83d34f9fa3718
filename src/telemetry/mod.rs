// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Classification of raw bus messages into device records.
//!
//! The [`Classifier`] maps a topic and payload to exactly one of: a
//! [`DeviceRecord`], [`Classification::Unrecognized`], or a [`ParseError`]
//! when the topic is known but the payload is malformed. It touches no
//! shared state.
//!
//! Topics are tried in a fixed order (see [`TopicScheme::match_topic`]):
//!
//! - `<ns>/tele/<outlet>/SENSOR` - energy meter reading
//! - `<ns>/tele/<outlet>/STATE` - controller health
//! - `<sensor_prefix>/<name>` - zigbee temperature sensor
//! - `<ns>/stat/<outlet>/POWER` and `<ns>/cmnd/<outlet>/Power` - relay state
//!
//! # Examples
//!
//! ```
//! use brigid::telemetry::{Classification, Classifier};
//! use chrono::Utc;
//!
//! let classifier = Classifier::default();
//!
//! let msg = classifier
//!     .classify("outlet/stat/tasmota_of/POWER", b"ON", Utc::now())
//!     .unwrap();
//! match msg {
//!     Classification::Record(record) => assert_eq!(record.device_id(), "tasmota_of"),
//!     Classification::Unrecognized => unreachable!(),
//! }
//!
//! let other = classifier.classify("homeassistant/status", b"online", Utc::now()).unwrap();
//! assert!(other.is_unrecognized());
//! ```

mod sensor_parser;
mod state_parser;
mod topic;
mod zigbee;

pub use topic::{DEFAULT_NAMESPACE, DEFAULT_SENSOR_PREFIX, TopicKind, TopicScheme};
pub use zigbee::SENSOR_ID_PREFIX;

use chrono::{DateTime, Utc};

use crate::error::ParseError;
use crate::state::{DeviceRecord, OutletPower};
use crate::types::PowerState;

/// Outcome of classifying a message whose payload parsed.
#[derive(Debug, Clone, PartialEq)]
pub enum Classification {
    /// The message produced a device record.
    Record(DeviceRecord),
    /// The topic is not one the controller handles.
    Unrecognized,
}

impl Classification {
    /// Returns true for [`Classification::Unrecognized`].
    #[must_use]
    pub const fn is_unrecognized(&self) -> bool {
        matches!(self, Self::Unrecognized)
    }

    /// Returns the record, if any.
    #[must_use]
    pub fn into_record(self) -> Option<DeviceRecord> {
        match self {
            Self::Record(record) => Some(record),
            Self::Unrecognized => None,
        }
    }
}

/// Pure topic/payload → record mapping.
#[derive(Debug, Clone, Default)]
pub struct Classifier {
    scheme: TopicScheme,
}

impl Classifier {
    /// Creates a classifier for the given topic layout.
    #[must_use]
    pub fn new(scheme: TopicScheme) -> Self {
        Self { scheme }
    }

    /// Returns the topic layout.
    #[must_use]
    pub fn scheme(&self) -> &TopicScheme {
        &self.scheme
    }

    /// Classifies one message.
    ///
    /// `received_at` stamps records whose payload carries no usable time.
    ///
    /// # Errors
    ///
    /// Returns `ParseError` if the topic is recognized but the payload is
    /// malformed: invalid JSON, missing required fields, or values of the
    /// wrong shape.
    pub fn classify(
        &self,
        topic: &str,
        payload: &[u8],
        received_at: DateTime<Utc>,
    ) -> Result<Classification, ParseError> {
        let Some(kind) = self.scheme.match_topic(topic) else {
            return Ok(Classification::Unrecognized);
        };

        let record = match kind {
            TopicKind::Energy(device) => DeviceRecord::Energy(sensor_parser::parse_energy(
                device,
                payload,
                received_at,
            )?),
            TopicKind::Health(device) => DeviceRecord::Health(state_parser::parse_health(
                device,
                payload,
                received_at,
            )?),
            TopicKind::Temperature(name) => DeviceRecord::Temperature(
                zigbee::parse_temperature(name, payload, received_at)?,
            ),
            TopicKind::PowerStatus(device) => {
                let state = parse_power_payload(payload)?;
                let Some(is_on) = state.as_bool() else {
                    return Err(ParseError::InvalidValue {
                        field: "POWER".to_string(),
                        message: "status reports must be ON or OFF".to_string(),
                    });
                };
                power_record(device, is_on, received_at)
            }
            TopicKind::PowerEcho(device) => match parse_power_payload(payload)?.as_bool() {
                Some(is_on) => power_record(device, is_on, received_at),
                // A toggle says nothing about the resulting state
                None => return Ok(Classification::Unrecognized),
            },
        };

        Ok(Classification::Record(record))
    }
}

fn power_record(device: &str, is_on: bool, received_at: DateTime<Utc>) -> DeviceRecord {
    DeviceRecord::Power(OutletPower {
        device_id: device.to_string(),
        is_on,
        observed_at: received_at,
    })
}

/// Parses a plain-text power payload (`ON`, `OFF`, `toggle`, `1`, `0`).
fn parse_power_payload(payload: &[u8]) -> Result<PowerState, ParseError> {
    let text = std::str::from_utf8(payload).map_err(|e| ParseError::InvalidValue {
        field: "POWER".to_string(),
        message: e.to_string(),
    })?;
    text.parse::<PowerState>()
        .map_err(|e| ParseError::InvalidValue {
            field: "POWER".to_string(),
            message: e.to_string(),
        })
}
