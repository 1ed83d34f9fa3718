// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Latest-record-per-device store.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use super::heartbeat::Heartbeats;
use super::record::{DeviceKind, DeviceRecord};

/// How `put` treats a record arriving for a key that already has one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WritePolicy {
    /// The most recently received record wins, whatever its timestamp.
    #[default]
    ArrivalOrder,
    /// A record older than the stored one (by [`DeviceRecord::timestamp`])
    /// is dropped.
    NewestObserved,
}

type Table = HashMap<String, Arc<DeviceRecord>>;

/// Process-wide registry of the latest record per (kind, device id).
///
/// Records are stored behind `Arc` and replaced wholesale, so readers never
/// see a half-written record. Lock hold times are a single map operation.
///
/// # Examples
///
/// ```
/// use brigid::state::{DeviceKind, DeviceRecord, DeviceStateStore, TemperatureReading};
/// use chrono::Utc;
///
/// let store = DeviceStateStore::new();
/// let reading = TemperatureReading::new("temp_Office", 26.67, Utc::now());
/// store.put(DeviceRecord::Temperature(reading));
///
/// let latest = store.get_latest(DeviceKind::Temperature, "temp_Office").unwrap();
/// let fahrenheit = latest.as_temperature().unwrap().temperature_fahrenheit();
/// assert!((fahrenheit - 80.01).abs() < 1e-9);
/// ```
#[derive(Debug, Default)]
pub struct DeviceStateStore {
    tables: RwLock<HashMap<DeviceKind, Table>>,
    policy: WritePolicy,
    heartbeats: Heartbeats,
}

impl DeviceStateStore {
    /// Creates an empty store with arrival-order writes.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty store with the given write policy.
    #[must_use]
    pub fn with_policy(policy: WritePolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    /// Returns the write policy.
    #[must_use]
    pub const fn policy(&self) -> WritePolicy {
        self.policy
    }

    /// Stores `record` under its own kind and device id.
    ///
    /// Returns `false` only when the [`WritePolicy::NewestObserved`] policy
    /// rejected it as older than the stored record.
    pub fn put(&self, record: DeviceRecord) -> bool {
        let kind = record.kind();
        let record = Arc::new(record);
        let mut tables = self.tables.write();
        let table = tables.entry(kind).or_default();

        if self.policy == WritePolicy::NewestObserved
            && let Some(existing) = table.get(record.device_id())
            && existing.timestamp() > record.timestamp()
        {
            tracing::debug!(
                kind = %kind,
                device = %record.device_id(),
                "Dropping record older than stored one"
            );
            return false;
        }

        table.insert(record.device_id().to_string(), record);
        true
    }

    /// Returns the latest record for (kind, id), if any.
    #[must_use]
    pub fn get_latest(&self, kind: DeviceKind, device_id: &str) -> Option<Arc<DeviceRecord>> {
        self.tables
            .read()
            .get(&kind)
            .and_then(|table| table.get(device_id))
            .cloned()
    }

    /// Returns a point-in-time copy of every record of `kind`.
    #[must_use]
    pub fn snapshot(&self, kind: DeviceKind) -> Snapshot {
        let records = self
            .tables
            .read()
            .get(&kind)
            .cloned()
            .unwrap_or_default();
        Snapshot { kind, records }
    }

    /// Returns the number of records of `kind`.
    #[must_use]
    pub fn len(&self, kind: DeviceKind) -> usize {
        self.tables.read().get(&kind).map_or(0, HashMap::len)
    }

    /// Returns the heartbeat timestamps.
    #[must_use]
    pub fn heartbeats(&self) -> &Heartbeats {
        &self.heartbeats
    }
}

/// Immutable copy of one kind's table.
///
/// Later writes to the store are not visible through a snapshot.
#[derive(Debug, Clone)]
pub struct Snapshot {
    kind: DeviceKind,
    records: Table,
}

impl Snapshot {
    /// The kind this snapshot was taken of.
    #[must_use]
    pub const fn kind(&self) -> DeviceKind {
        self.kind
    }

    /// Returns the record for `device_id`.
    #[must_use]
    pub fn get(&self, device_id: &str) -> Option<&DeviceRecord> {
        self.records.get(device_id).map(AsRef::as_ref)
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if there are no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Iterates over `(device_id, record)` pairs in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &DeviceRecord)> {
        self.records
            .iter()
            .map(|(id, record)| (id.as_str(), record.as_ref()))
    }
}
