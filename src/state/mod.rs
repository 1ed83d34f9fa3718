// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device state: typed records, the shared store and liveness heartbeats.
//!
//! The [`DeviceStateStore`] keeps the latest [`DeviceRecord`] per device
//! class and id. Ingestion writes to it; reconciliation reads
//! [`Snapshot`]s of it.
//!
//! # Examples
//!
//! ```
//! use brigid::state::{DeviceKind, DeviceRecord, DeviceStateStore, OutletPower};
//! use chrono::Utc;
//!
//! let store = DeviceStateStore::new();
//! store.put(DeviceRecord::Power(OutletPower {
//!     device_id: "tasmota_of".to_string(),
//!     is_on: true,
//!     observed_at: Utc::now(),
//! }));
//!
//! let snapshot = store.snapshot(DeviceKind::Power);
//! assert_eq!(snapshot.len(), 1);
//! ```

mod heartbeat;
mod record;
mod store;

pub use heartbeat::{DEFAULT_HEALTH_THRESHOLD, HealthReport, Heartbeat, Heartbeats};
pub use record::{
    ControllerHealth, DeviceKind, DeviceRecord, EnergyReading, OutletPower, TemperatureReading,
    celsius_to_fahrenheit,
};
pub use store::{DeviceStateStore, Snapshot, WritePolicy};
