// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::collections::BTreeMap;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::error::{Error, ValueError};

/// A named area with its own temperature band.
///
/// Outlets in a zone are switched on when the zone is too hot and off when
/// it is in range or too cold.
///
/// # Examples
///
/// ```
/// use brigid::zone::Zone;
///
/// let office = Zone::new("office", 78, 72)
///     .with_display_name("Office")
///     .with_sensor("temp_Office")
///     .with_outlet("tasmota_of");
///
/// assert_eq!(office.default_temp_f(), 78);
/// assert!(office.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Zone {
    /// Zone id, e.g. `office`.
    pub id: String,
    /// Human readable name.
    #[serde(default)]
    pub display_name: String,
    /// Sensor ids read for this zone, in order.
    #[serde(default)]
    pub sensor_ids: Vec<String>,
    /// Outlet ids driven by this zone, in order.
    #[serde(default)]
    pub outlet_ids: Vec<String>,
    /// Readings above this are too hot.
    pub target_temp_f: i32,
    /// Readings below this are too cold.
    pub floor_temp_f: i32,
    /// Configured target, restored by a reset. Defaults to the initial target.
    #[serde(default)]
    default_temp_f: Option<i32>,
}

impl Zone {
    /// Creates a zone with no sensors or outlets.
    #[must_use]
    pub fn new(id: impl Into<String>, target_temp_f: i32, floor_temp_f: i32) -> Self {
        let id = id.into();
        Self {
            display_name: id.clone(),
            id,
            sensor_ids: Vec::new(),
            outlet_ids: Vec::new(),
            target_temp_f,
            floor_temp_f,
            default_temp_f: Some(target_temp_f),
        }
    }

    /// Sets the display name.
    #[must_use]
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = name.into();
        self
    }

    /// Appends a sensor id.
    #[must_use]
    pub fn with_sensor(mut self, sensor_id: impl Into<String>) -> Self {
        self.sensor_ids.push(sensor_id.into());
        self
    }

    /// Appends an outlet id.
    #[must_use]
    pub fn with_outlet(mut self, outlet_id: impl Into<String>) -> Self {
        self.outlet_ids.push(outlet_id.into());
        self
    }

    /// Returns the configured default target.
    #[must_use]
    pub fn default_temp_f(&self) -> i32 {
        self.default_temp_f.unwrap_or(self.target_temp_f)
    }

    /// Checks that neither the target nor the default is below the floor.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::TargetBelowFloor` otherwise.
    pub fn validate(&self) -> Result<(), ValueError> {
        if self.target_temp_f < self.floor_temp_f {
            return Err(ValueError::TargetBelowFloor {
                target: self.target_temp_f,
                floor: self.floor_temp_f,
            });
        }
        if let Some(default) = self.default_temp_f
            && default < self.floor_temp_f
        {
            return Err(ValueError::TargetBelowFloor {
                target: default,
                floor: self.floor_temp_f,
            });
        }
        Ok(())
    }
}

/// The set of configured zones, keyed by id.
///
/// Only the target temperature is mutable after construction.
#[derive(Debug, Default)]
pub struct ZoneCatalog {
    zones: RwLock<BTreeMap<String, Zone>>,
}

impl ZoneCatalog {
    /// Builds a catalog from `zones`.
    ///
    /// A zone without an explicit default target gets its current target.
    ///
    /// # Errors
    ///
    /// Returns `ValueError` for a duplicate zone id or a zone whose target or
    /// default target is below its floor.
    pub fn new(zones: impl IntoIterator<Item = Zone>) -> Result<Self, ValueError> {
        let mut by_id = BTreeMap::new();
        for mut zone in zones {
            zone.validate()?;
            zone.default_temp_f.get_or_insert(zone.target_temp_f);
            if by_id.contains_key(&zone.id) {
                return Err(ValueError::DuplicateZone(zone.id));
            }
            by_id.insert(zone.id.clone(), zone);
        }
        Ok(Self {
            zones: RwLock::new(by_id),
        })
    }

    /// Returns a copy of every zone, ordered by id.
    #[must_use]
    pub fn zones(&self) -> Vec<Zone> {
        self.zones.read().values().cloned().collect()
    }

    /// Returns a copy of one zone.
    #[must_use]
    pub fn get(&self, zone_id: &str) -> Option<Zone> {
        self.zones.read().get(zone_id).cloned()
    }

    /// Number of zones.
    #[must_use]
    pub fn len(&self) -> usize {
        self.zones.read().len()
    }

    /// Returns true if there are no zones.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.zones.read().is_empty()
    }

    /// Sets a zone's target temperature, returning the previous target.
    ///
    /// # Errors
    ///
    /// Returns `Error::ZoneNotFound` for an unknown zone and
    /// `ValueError::TargetBelowFloor` if `target_temp_f` is below the floor.
    pub fn set_target(&self, zone_id: &str, target_temp_f: i32) -> Result<i32, Error> {
        let mut zones = self.zones.write();
        let zone = zones
            .get_mut(zone_id)
            .ok_or_else(|| Error::ZoneNotFound(zone_id.to_string()))?;

        if target_temp_f < zone.floor_temp_f {
            return Err(ValueError::TargetBelowFloor {
                target: target_temp_f,
                floor: zone.floor_temp_f,
            }
            .into());
        }

        let previous = std::mem::replace(&mut zone.target_temp_f, target_temp_f);
        tracing::info!(
            zone = %zone_id,
            previous,
            target = target_temp_f,
            "Zone target temperature changed"
        );
        Ok(previous)
    }

    /// Restores a zone's target to its configured default.
    ///
    /// # Errors
    ///
    /// Returns `Error::ZoneNotFound` for an unknown zone.
    pub fn reset_target(&self, zone_id: &str) -> Result<i32, Error> {
        let default = self
            .get(zone_id)
            .ok_or_else(|| Error::ZoneNotFound(zone_id.to_string()))?
            .default_temp_f();
        self.set_target(zone_id, default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn office() -> Zone {
        Zone::new("office", 78, 72)
            .with_sensor("temp_Office")
            .with_outlet("tasmota_of")
    }

    #[test]
    fn zones_are_ordered_by_id() {
        let catalog = ZoneCatalog::new([office(), Zone::new("den", 70, 65)]).unwrap();
        let ids: Vec<String> = catalog.zones().into_iter().map(|z| z.id).collect();
        assert_eq!(ids, ["den", "office"]);
        assert_eq!(catalog.len(), 2);
    }

    #[test]
    fn rejects_duplicates_and_inverted_bands() {
        assert_eq!(
            ZoneCatalog::new([office(), office()]).unwrap_err(),
            ValueError::DuplicateZone("office".to_string())
        );
        assert!(matches!(
            ZoneCatalog::new([Zone::new("bad", 60, 70)]),
            Err(ValueError::TargetBelowFloor { target: 60, floor: 70 })
        ));
    }

    #[test]
    fn set_and_reset_target() {
        let catalog = ZoneCatalog::new([office()]).unwrap();

        assert_eq!(catalog.set_target("office", 80).unwrap(), 78);
        assert_eq!(catalog.get("office").unwrap().target_temp_f, 80);
        assert_eq!(catalog.get("office").unwrap().default_temp_f(), 78);

        assert_eq!(catalog.reset_target("office").unwrap(), 80);
        assert_eq!(catalog.get("office").unwrap().target_temp_f, 78);
    }

    #[test]
    fn set_target_errors() {
        let catalog = ZoneCatalog::new([office()]).unwrap();
        assert!(matches!(
            catalog.set_target("attic", 70),
            Err(Error::ZoneNotFound(_))
        ));
        assert!(matches!(
            catalog.set_target("office", 71),
            Err(Error::Value(ValueError::TargetBelowFloor { .. }))
        ));
        assert_eq!(catalog.get("office").unwrap().target_temp_f, 78);
    }

    #[test]
    fn deserializes_from_json() {
        let json = r#"{
            "id": "office",
            "display_name": "Office",
            "sensor_ids": ["temp_Office"],
            "outlet_ids": ["tasmota_of"],
            "target_temp_f": 78,
            "floor_temp_f": 72
        }"#;
        let zone: Zone = serde_json::from_str(json).unwrap();
        let catalog = ZoneCatalog::new([zone]).unwrap();
        let zone = catalog.get("office").unwrap();
        assert_eq!(zone.default_temp_f(), 78);
        assert_eq!(zone.outlet_ids, ["tasmota_of"]);
    }

    #[test]
    fn rejects_default_below_floor() {
        let json = r#"{
            "id": "office",
            "target_temp_f": 78,
            "floor_temp_f": 72,
            "default_temp_f": 60
        }"#;
        let zone: Zone = serde_json::from_str(json).unwrap();
        assert!(matches!(
            ZoneCatalog::new([zone]),
            Err(ValueError::TargetBelowFloor { target: 60, floor: 72 })
        ));
    }
}
