// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Parser for Tasmota STATE telemetry (controller housekeeping).

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::ParseError;
use crate::state::ControllerHealth;
use crate::types::PowerState;

use super::sensor_parser::parse_device_time;

/// Payload of a `tele/<outlet>/STATE` message.
///
/// Fields not listed (`Uptime`, `SleepMode`, `Sleep`, ...) are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
struct StatePayload {
    #[serde(rename = "Time", default)]
    time: Option<String>,

    #[serde(rename = "UptimeSec", default)]
    uptime_sec: Option<u64>,

    #[serde(rename = "Heap", default)]
    heap: Option<u32>,

    #[serde(rename = "LoadAvg", default)]
    load_avg: Option<u32>,

    #[serde(rename = "MqttCount", default)]
    mqtt_count: Option<u32>,

    #[serde(rename = "POWER", default)]
    power: Option<String>,

    #[serde(rename = "Wifi", default)]
    wifi: Option<WifiPayload>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct WifiPayload {
    #[serde(rename = "Signal", default)]
    signal: Option<i32>,
}

/// Parses a STATE telemetry payload for `device_id`.
pub(crate) fn parse_health(
    device_id: &str,
    payload: &[u8],
    received_at: DateTime<Utc>,
) -> Result<ControllerHealth, ParseError> {
    let parsed: StatePayload = serde_json::from_slice(payload)?;

    let power_on = parsed
        .power
        .as_deref()
        .map(|raw| {
            raw.parse::<PowerState>()
                .ok()
                .and_then(|state| state.as_bool())
                .ok_or_else(|| ParseError::InvalidValue {
                    field: "POWER".to_string(),
                    message: format!("expected ON or OFF, got {raw:?}"),
                })
        })
        .transpose()?;

    Ok(ControllerHealth {
        device_id: device_id.to_string(),
        uptime_s: parsed
            .uptime_sec
            .ok_or_else(|| ParseError::MissingField("UptimeSec".to_string()))?,
        free_heap: parsed
            .heap
            .ok_or_else(|| ParseError::MissingField("Heap".to_string()))?,
        load_avg: parsed.load_avg,
        mqtt_count: parsed.mqtt_count,
        power_on,
        wifi_rssi: parsed.wifi.and_then(|wifi| wifi.signal),
        device_time: parse_device_time(parsed.time.as_deref())?,
        observed_at: received_at,
    })
}
