// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Parser for zigbee2mqtt temperature/humidity sensor messages.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

use crate::error::ParseError;
use crate::state::TemperatureReading;
use crate::types::DeviceDateTime;

/// Prefix prepended to the sensor's friendly name to form its device id.
pub const SENSOR_ID_PREFIX: &str = "temp_";

#[derive(Debug, Clone, Default, Deserialize)]
struct SensorPayload {
    #[serde(default)]
    temperature: Option<f64>,
    #[serde(default)]
    humidity: Option<f64>,
    #[serde(default)]
    battery: Option<f64>,
    #[serde(default)]
    linkquality: Option<f64>,
    #[serde(default)]
    pressure: Option<f64>,
    #[serde(default)]
    voltage: Option<u32>,
    #[serde(default)]
    last_seen: Option<Value>,
    #[serde(default)]
    device: Option<DeviceInfo>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct DeviceInfo {
    #[serde(rename = "friendlyName", default)]
    friendly_name: Option<String>,
}

/// Converts a 0-255 wire value to `u8`, clamping out-of-range values.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn clamp_u8(value: f64) -> u8 {
    // Safe: clamped to 0..=255 before the cast
    value.round().clamp(0.0, 255.0) as u8
}

fn parse_last_seen(value: &Value) -> Result<DateTime<Utc>, ParseError> {
    let invalid = |message: String| ParseError::InvalidValue {
        field: "last_seen".to_string(),
        message,
    };

    match value {
        Value::String(raw) => raw
            .parse::<DeviceDateTime>()
            .map(|dt| dt.to_utc())
            .map_err(|e| invalid(e.to_string())),
        Value::Number(n) => n
            .as_i64()
            .and_then(DeviceDateTime::from_epoch_millis)
            .map(|dt| dt.to_utc())
            .ok_or_else(|| invalid(format!("{n} is not an epoch in milliseconds"))),
        other => Err(invalid(format!("unexpected value {other}"))),
    }
}

/// Parses a sensor payload published on `<prefix>/<topic_name>`.
///
/// The device id is `temp_` followed by the last segment of the payload's
/// `device.friendlyName`, or of the topic when the payload has none. A
/// missing `last_seen` falls back to `received_at`.
pub(crate) fn parse_temperature(
    topic_name: &str,
    payload: &[u8],
    received_at: DateTime<Utc>,
) -> Result<TemperatureReading, ParseError> {
    let parsed: SensorPayload = serde_json::from_slice(payload)?;

    let temperature = parsed
        .temperature
        .ok_or_else(|| ParseError::MissingField("temperature".to_string()))?;
    if !temperature.is_finite() {
        return Err(ParseError::InvalidValue {
            field: "temperature".to_string(),
            message: format!("{temperature} is not a finite number"),
        });
    }

    let name = parsed
        .device
        .and_then(|device| device.friendly_name)
        .and_then(|friendly| friendly.rsplit('/').next().map(str::to_string))
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| topic_name.to_string());

    let last_seen = parsed
        .last_seen
        .as_ref()
        .filter(|value| !value.is_null())
        .map(parse_last_seen)
        .transpose()?
        .unwrap_or(received_at);

    let mut reading =
        TemperatureReading::new(format!("{SENSOR_ID_PREFIX}{name}"), temperature, last_seen);
    reading.humidity_pct = parsed.humidity;
    reading.battery_pct = parsed.battery.map(clamp_u8);
    reading.link_quality = parsed.linkquality.map(clamp_u8);
    reading.pressure_hpa = parsed.pressure;
    reading.voltage_mv = parsed.voltage;
    Ok(reading)
}
