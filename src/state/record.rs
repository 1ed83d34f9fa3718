// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Typed device records produced by the classifier.

use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;

/// The class of device a record describes.
///
/// The store keeps one id→record table per kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceKind {
    /// Wireless temperature/humidity sensor.
    Temperature,
    /// Outlet relay state.
    Power,
    /// Outlet energy meter.
    Energy,
    /// Outlet controller housekeeping (uptime, heap).
    Health,
}

impl DeviceKind {
    /// Returns the lowercase name of the kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Temperature => "temperature",
            Self::Power => "power",
            Self::Energy => "energy",
            Self::Health => "health",
        }
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Latest known state of one device.
///
/// Records are immutable once built; a newer record of the same kind and id
/// replaces the older one wholesale.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DeviceRecord {
    /// A temperature sensor reading.
    Temperature(TemperatureReading),
    /// An outlet power report.
    Power(OutletPower),
    /// An outlet energy meter reading.
    Energy(EnergyReading),
    /// An outlet controller health report.
    Health(ControllerHealth),
}

impl DeviceRecord {
    /// Returns the device class of this record.
    #[must_use]
    pub const fn kind(&self) -> DeviceKind {
        match self {
            Self::Temperature(_) => DeviceKind::Temperature,
            Self::Power(_) => DeviceKind::Power,
            Self::Energy(_) => DeviceKind::Energy,
            Self::Health(_) => DeviceKind::Health,
        }
    }

    /// Returns the device id the record is keyed by.
    #[must_use]
    pub fn device_id(&self) -> &str {
        match self {
            Self::Temperature(r) => &r.device_id,
            Self::Power(r) => &r.device_id,
            Self::Energy(r) => &r.device_id,
            Self::Health(r) => &r.device_id,
        }
    }

    /// Returns the timestamp the record describes.
    ///
    /// For sensors this is the sensor's own `last_seen`; for outlet records it
    /// is when the message was received.
    #[must_use]
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::Temperature(r) => r.last_seen,
            Self::Power(r) => r.observed_at,
            Self::Energy(r) => r.observed_at,
            Self::Health(r) => r.observed_at,
        }
    }

    /// Returns the temperature reading, if this is one.
    #[must_use]
    pub fn as_temperature(&self) -> Option<&TemperatureReading> {
        match self {
            Self::Temperature(r) => Some(r),
            _ => None,
        }
    }

    /// Returns the power report, if this is one.
    #[must_use]
    pub fn as_power(&self) -> Option<&OutletPower> {
        match self {
            Self::Power(r) => Some(r),
            _ => None,
        }
    }
}

/// A reading from a zigbee temperature/humidity sensor.
///
/// # Examples
///
/// ```
/// use brigid::state::TemperatureReading;
/// use chrono::Utc;
///
/// let reading = TemperatureReading::new("temp_Office", 26.67, Utc::now());
/// assert_eq!(reading.temperature_fahrenheit(), 80.01);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemperatureReading {
    /// Sensor id, e.g. `temp_Office`.
    pub device_id: String,
    temperature_celsius: f64,
    /// Relative humidity in percent.
    pub humidity_pct: Option<f64>,
    /// Battery level in percent.
    pub battery_pct: Option<u8>,
    /// Zigbee link quality (0-255).
    pub link_quality: Option<u8>,
    /// Atmospheric pressure in hPa.
    pub pressure_hpa: Option<f64>,
    /// Battery voltage in millivolts.
    pub voltage_mv: Option<u32>,
    /// When the coordinator last heard from the sensor.
    pub last_seen: DateTime<Utc>,
    temperature_fahrenheit: f64,
}

impl TemperatureReading {
    /// Creates a reading, computing the Fahrenheit value once.
    #[must_use]
    pub fn new(
        device_id: impl Into<String>,
        temperature_celsius: f64,
        last_seen: DateTime<Utc>,
    ) -> Self {
        Self {
            device_id: device_id.into(),
            temperature_celsius,
            humidity_pct: None,
            battery_pct: None,
            link_quality: None,
            pressure_hpa: None,
            voltage_mv: None,
            last_seen,
            temperature_fahrenheit: celsius_to_fahrenheit(temperature_celsius),
        }
    }

    /// Sets the humidity.
    #[must_use]
    pub fn with_humidity(mut self, humidity_pct: f64) -> Self {
        self.humidity_pct = Some(humidity_pct);
        self
    }

    /// Sets the battery level.
    #[must_use]
    pub fn with_battery(mut self, battery_pct: u8) -> Self {
        self.battery_pct = Some(battery_pct);
        self
    }

    /// Sets the link quality.
    #[must_use]
    pub fn with_link_quality(mut self, link_quality: u8) -> Self {
        self.link_quality = Some(link_quality);
        self
    }

    /// Temperature in degrees Celsius.
    #[must_use]
    pub const fn temperature_celsius(&self) -> f64 {
        self.temperature_celsius
    }

    /// Temperature in degrees Fahrenheit, rounded to two decimals.
    #[must_use]
    pub const fn temperature_fahrenheit(&self) -> f64 {
        self.temperature_fahrenheit
    }
}

/// Converts Celsius to Fahrenheit rounded to two decimal places.
#[must_use]
pub fn celsius_to_fahrenheit(celsius: f64) -> f64 {
    ((celsius * 9.0 / 5.0 + 32.0) * 100.0).round() / 100.0
}

/// Relay state of an outlet, from a status report or a command echo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutletPower {
    /// Outlet id, e.g. `tasmota_of`.
    pub device_id: String,
    /// Whether the relay is on.
    pub is_on: bool,
    /// When the message was received.
    pub observed_at: DateTime<Utc>,
}

/// Energy meter reading from a `tele/<outlet>/SENSOR` message.
///
/// Informational only; reconciliation never reads it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnergyReading {
    /// Outlet id.
    pub device_id: String,
    /// Total energy consumed (kWh).
    pub total_kwh: f64,
    /// Energy consumed today (kWh).
    pub today_kwh: f64,
    /// Energy consumed yesterday (kWh).
    pub yesterday_kwh: Option<f64>,
    /// Active power (W).
    pub power_w: f64,
    /// Apparent power (VA).
    pub apparent_power_va: Option<f64>,
    /// Reactive power (`VAr`).
    pub reactive_power_var: Option<f64>,
    /// Power factor (0-1).
    pub power_factor: Option<f64>,
    /// Voltage (V).
    pub voltage_v: f64,
    /// Current (A).
    pub current_a: f64,
    /// Device-reported local time of the reading.
    pub device_time: Option<NaiveDateTime>,
    /// When the message was received.
    pub observed_at: DateTime<Utc>,
}

/// Housekeeping report from a `tele/<outlet>/STATE` message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ControllerHealth {
    /// Outlet id.
    pub device_id: String,
    /// Seconds since the outlet booted.
    pub uptime_s: u64,
    /// Free heap in kB.
    pub free_heap: u32,
    /// Load average.
    pub load_avg: Option<u32>,
    /// Number of MQTT reconnections.
    pub mqtt_count: Option<u32>,
    /// Relay state embedded in the report.
    pub power_on: Option<bool>,
    /// Wi-Fi signal strength (dBm).
    pub wifi_rssi: Option<i32>,
    /// Device-reported local time.
    pub device_time: Option<NaiveDateTime>,
    /// When the message was received.
    pub observed_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fahrenheit_is_rounded_to_two_decimals() {
        assert!((celsius_to_fahrenheit(0.0) - 32.0).abs() < f64::EPSILON);
        assert!((celsius_to_fahrenheit(21.37) - 70.47).abs() < 1e-9);
        assert!((celsius_to_fahrenheit(-40.0) + 40.0).abs() < f64::EPSILON);
    }

    #[test]
    fn reading_builder_keeps_derived_value() {
        let reading = TemperatureReading::new("temp_Office", 25.0, Utc::now())
            .with_humidity(41.5)
            .with_battery(97)
            .with_link_quality(120);
        assert!((reading.temperature_celsius() - 25.0).abs() < f64::EPSILON);
        assert!((reading.temperature_fahrenheit() - 77.0).abs() < f64::EPSILON);
        assert_eq!(reading.battery_pct, Some(97));
    }

    #[test]
    fn record_kind_and_id() {
        let record = DeviceRecord::Power(OutletPower {
            device_id: "tasmota_of".to_string(),
            is_on: true,
            observed_at: Utc::now(),
        });
        assert_eq!(record.kind(), DeviceKind::Power);
        assert_eq!(record.device_id(), "tasmota_of");
        assert!(record.as_temperature().is_none());
        assert!(record.as_power().unwrap().is_on);
    }

    #[test]
    fn record_serializes_with_kind_tag() {
        let record = DeviceRecord::Temperature(TemperatureReading::new(
            "temp_Office",
            20.0,
            DateTime::UNIX_EPOCH,
        ));
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["kind"], "temperature");
        assert_eq!(json["device_id"], "temp_Office");
        assert_eq!(json["temperature_celsius"], 20.0);
        assert_eq!(json["temperature_fahrenheit"], 68.0);
    }
}
