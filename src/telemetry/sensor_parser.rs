// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Parser for Tasmota SENSOR telemetry (energy meter readings).

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::ParseError;
use crate::state::EnergyReading;
use crate::types::DeviceDateTime;

/// Payload of a `tele/<outlet>/SENSOR` message.
#[derive(Debug, Clone, Default, Deserialize)]
struct SensorPayload {
    #[serde(rename = "Time", default)]
    time: Option<String>,

    #[serde(rename = "ENERGY", default)]
    energy: Option<EnergyPayload>,
}

/// The `ENERGY` object; all fields are optional on the wire.
#[derive(Debug, Clone, Default, Deserialize)]
struct EnergyPayload {
    #[serde(rename = "Total", default)]
    total: Option<f64>,

    #[serde(rename = "Yesterday", default)]
    yesterday: Option<f64>,

    #[serde(rename = "Today", default)]
    today: Option<f64>,

    #[serde(rename = "Power", default)]
    power: Option<f64>,

    #[serde(rename = "ApparentPower", default)]
    apparent_power: Option<f64>,

    #[serde(rename = "ReactivePower", default)]
    reactive_power: Option<f64>,

    #[serde(rename = "Factor", default)]
    factor: Option<f64>,

    #[serde(rename = "Voltage", default)]
    voltage: Option<f64>,

    #[serde(rename = "Current", default)]
    current: Option<f64>,
}

fn required(value: Option<f64>, field: &str) -> Result<f64, ParseError> {
    value.ok_or_else(|| ParseError::MissingField(format!("ENERGY.{field}")))
}

/// Parses the device-local `Time` field, if present.
pub(super) fn parse_device_time(
    time: Option<&str>,
) -> Result<Option<chrono::NaiveDateTime>, ParseError> {
    time.map(|raw| {
        raw.parse::<DeviceDateTime>()
            .map(|dt| dt.naive())
            .map_err(|e| ParseError::InvalidValue {
                field: "Time".to_string(),
                message: e.to_string(),
            })
    })
    .transpose()
}

/// Parses an energy telemetry payload for `device_id`.
pub(crate) fn parse_energy(
    device_id: &str,
    payload: &[u8],
    received_at: DateTime<Utc>,
) -> Result<EnergyReading, ParseError> {
    let parsed: SensorPayload = serde_json::from_slice(payload)?;
    let energy = parsed
        .energy
        .ok_or_else(|| ParseError::MissingField("ENERGY".to_string()))?;

    Ok(EnergyReading {
        device_id: device_id.to_string(),
        total_kwh: required(energy.total, "Total")?,
        today_kwh: required(energy.today, "Today")?,
        yesterday_kwh: energy.yesterday,
        power_w: required(energy.power, "Power")?,
        apparent_power_va: energy.apparent_power,
        reactive_power_var: energy.reactive_power,
        power_factor: energy.factor,
        voltage_v: required(energy.voltage, "Voltage")?,
        current_a: required(energy.current, "Current")?,
        device_time: parse_device_time(parsed.time.as_deref())?,
        observed_at: received_at,
    })
}
