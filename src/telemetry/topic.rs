// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Topic shapes recognized by the classifier.
//!
//! ```text
//! <ns>/tele/<outlet>/SENSOR      → energy telemetry
//! <ns>/tele/<outlet>/STATE       → controller health
//! <sensor_prefix>/<name>         → zigbee temperature sensor
//! <ns>/stat/<outlet>/POWER       → power status
//! <ns>/cmnd/<outlet>/Power       → power command echo
//! ```

use serde::{Deserialize, Serialize};

/// Default namespace of the Tasmota topics.
pub const DEFAULT_NAMESPACE: &str = "outlet";

/// Default prefix of the zigbee2mqtt temperature sensor topics.
pub const DEFAULT_SENSOR_PREFIX: &str = "zigbee2mqtt/sensors/WSDCGQ11LM";

/// A recognized topic, borrowing the device segment from the topic string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopicKind<'a> {
    /// Energy telemetry of an outlet.
    Energy(&'a str),
    /// Housekeeping telemetry of an outlet.
    Health(&'a str),
    /// A zigbee sensor, by the last topic segment.
    Temperature(&'a str),
    /// Relay status reported by the outlet.
    PowerStatus(&'a str),
    /// A power command seen on the bus.
    PowerEcho(&'a str),
}

/// Topic layout: the Tasmota namespace and the sensor prefix.
///
/// # Examples
///
/// ```
/// use brigid::telemetry::{TopicKind, TopicScheme};
///
/// let scheme = TopicScheme::default();
/// assert_eq!(
///     scheme.match_topic("outlet/stat/tasmota_of/POWER"),
///     Some(TopicKind::PowerStatus("tasmota_of"))
/// );
/// assert_eq!(scheme.command_topic("tasmota_of"), "outlet/cmnd/tasmota_of/Power");
/// assert_eq!(scheme.match_topic("homeassistant/status"), None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicScheme {
    namespace: String,
    sensor_prefix: String,
}

impl Default for TopicScheme {
    fn default() -> Self {
        Self::new(DEFAULT_NAMESPACE, DEFAULT_SENSOR_PREFIX)
    }
}

impl TopicScheme {
    /// Creates a scheme. Trailing slashes are ignored.
    #[must_use]
    pub fn new(namespace: impl Into<String>, sensor_prefix: impl Into<String>) -> Self {
        let trim = |s: String| s.trim_end_matches('/').to_string();
        Self {
            namespace: trim(namespace.into()),
            sensor_prefix: trim(sensor_prefix.into()),
        }
    }

    /// Returns the Tasmota namespace.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Returns the sensor topic prefix.
    #[must_use]
    pub fn sensor_prefix(&self) -> &str {
        &self.sensor_prefix
    }

    /// Topic a power command for `outlet_id` is published on.
    #[must_use]
    pub fn command_topic(&self, outlet_id: &str) -> String {
        format!("{}/cmnd/{outlet_id}/Power", self.namespace)
    }

    /// Topic filters covering every recognized shape.
    #[must_use]
    pub fn subscriptions(&self) -> Vec<String> {
        let ns = &self.namespace;
        vec![
            format!("{ns}/tele/+/SENSOR"),
            format!("{ns}/tele/+/STATE"),
            format!("{}/+", self.sensor_prefix),
            format!("{ns}/stat/+/POWER"),
            format!("{ns}/cmnd/+/Power"),
        ]
    }

    /// Matches `topic` against the known shapes.
    ///
    /// Shapes are tried in a fixed order: energy, health, temperature, power.
    #[must_use]
    pub fn match_topic<'a>(&self, topic: &'a str) -> Option<TopicKind<'a>> {
        if let Some(device) = self.tasmota_device(topic, "tele", "SENSOR") {
            return Some(TopicKind::Energy(device));
        }
        if let Some(device) = self.tasmota_device(topic, "tele", "STATE") {
            return Some(TopicKind::Health(device));
        }
        if let Some(name) = self.sensor_name(topic) {
            return Some(TopicKind::Temperature(name));
        }
        if let Some(device) = self.tasmota_device(topic, "stat", "POWER") {
            return Some(TopicKind::PowerStatus(device));
        }
        self.tasmota_device(topic, "cmnd", "Power")
            .map(TopicKind::PowerEcho)
    }

    /// Matches `<ns>/<prefix>/<device>/<suffix>` and returns the device.
    fn tasmota_device<'a>(&self, topic: &'a str, prefix: &str, suffix: &str) -> Option<&'a str> {
        let rest = topic.strip_prefix(self.namespace.as_str())?.strip_prefix('/')?;
        let rest = rest.strip_prefix(prefix)?.strip_prefix('/')?;
        let device = rest.strip_suffix(suffix)?.strip_suffix('/')?;
        is_device_segment(device).then_some(device)
    }

    fn sensor_name<'a>(&self, topic: &'a str) -> Option<&'a str> {
        let name = topic
            .strip_prefix(self.sensor_prefix.as_str())?
            .strip_prefix('/')?;
        is_device_segment(name).then_some(name)
    }
}

/// A single, non-empty topic level made of ASCII letters, digits, `_` or `-`.
fn is_device_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}
