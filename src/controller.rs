// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The controller context shared by the ingestion and reconciliation loops.
//!
//! A [`Controller`] owns the device state store, the zone catalog, the
//! manual lock registry and the outlet commander. It starts both loops with
//! [`Controller::spawn`] and exposes the control and status operations a UI
//! needs.
//!
//! # Examples
//!
//! ```
//! use brigid::protocol::{BusMessage, RecordingPublisher};
//! use brigid::zone::{Zone, ZoneCatalog};
//! use brigid::{Controller, ControllerConfig};
//! use chrono::Utc;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> brigid::Result<()> {
//! let zones = ZoneCatalog::new([Zone::new("office", 78, 72)
//!     .with_sensor("temp_Office")
//!     .with_outlet("tasmota_of")])?;
//! let controller = Controller::new(ControllerConfig::default(), zones, RecordingPublisher::new());
//!
//! controller.ingestor().handle(
//!     &BusMessage::new("zigbee2mqtt/sensors/WSDCGQ11LM/Office", r#"{"temperature":26.67}"#),
//!     Utc::now(),
//! );
//! let report = controller.reconciler().run_cycle(Utc::now()).await;
//! assert_eq!(report.published.len(), 1);
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::command::OutletCommander;
use crate::config::ControllerConfig;
use crate::error::{Error, Result};
use crate::ingest::Ingestor;
use crate::protocol::{BusMessage, CommandPublisher};
use crate::reconcile::Reconciler;
use crate::state::{DeviceKind, DeviceStateStore, HealthReport};
use crate::telemetry::Classifier;
use crate::types::{LockState, PowerState};
use crate::zone::{ManualLockRegistry, ZoneCatalog};

/// Display fields of one zone, as a status page renders them.
///
/// Outlet and sensor fields describe the zone's first outlet and first
/// sensor. Values not known yet are `None`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ZoneStatus {
    /// Zone id.
    pub zone_id: String,
    /// Display name.
    pub name: String,
    /// Current target temperature in °F.
    pub target_temp_f: i32,
    /// Configured default target in °F.
    pub default_temp_f: i32,
    /// Floor temperature in °F.
    pub floor_temp_f: i32,
    /// First outlet of the zone.
    pub outlet_id: Option<String>,
    /// Last reported relay state of that outlet.
    pub power_on: Option<bool>,
    /// Manual lock of that outlet.
    pub lock: Option<LockState>,
    /// First sensor of the zone.
    pub sensor_id: Option<String>,
    /// Last temperature of that sensor in °F.
    pub temperature_f: Option<f64>,
    /// Last relative humidity of that sensor.
    pub humidity_pct: Option<f64>,
    /// When that sensor was last seen.
    pub last_seen: Option<DateTime<Utc>>,
}

/// The controller context.
#[derive(Debug)]
pub struct Controller<P> {
    config: ControllerConfig,
    store: Arc<DeviceStateStore>,
    zones: Arc<ZoneCatalog>,
    locks: Arc<ManualLockRegistry>,
    commander: Arc<OutletCommander<P>>,
}

impl<P: CommandPublisher + 'static> Controller<P> {
    /// Creates a controller publishing commands through `publisher`.
    #[must_use]
    pub fn new(config: ControllerConfig, zones: ZoneCatalog, publisher: P) -> Self {
        let commander = OutletCommander::new(publisher, config.scheme().clone());
        Self {
            store: Arc::new(DeviceStateStore::with_policy(config.write_policy())),
            zones: Arc::new(zones),
            locks: Arc::new(ManualLockRegistry::new()),
            commander: Arc::new(commander),
            config,
        }
    }

    /// The configuration.
    #[must_use]
    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// The device state store.
    #[must_use]
    pub fn store(&self) -> &Arc<DeviceStateStore> {
        &self.store
    }

    /// The zone catalog.
    #[must_use]
    pub fn zones(&self) -> &Arc<ZoneCatalog> {
        &self.zones
    }

    /// The manual lock registry.
    #[must_use]
    pub fn locks(&self) -> &Arc<ManualLockRegistry> {
        &self.locks
    }

    /// The outlet commander.
    #[must_use]
    pub fn commander(&self) -> &OutletCommander<P> {
        &self.commander
    }

    /// Creates an ingestor writing into this controller's store.
    #[must_use]
    pub fn ingestor(&self) -> Ingestor {
        Ingestor::new(
            Classifier::new(self.config.scheme().clone()),
            Arc::clone(&self.store),
            self.config.heartbeat_interval(),
        )
    }

    /// Creates a reconciler over this controller's state.
    #[must_use]
    pub fn reconciler(&self) -> Reconciler<P> {
        Reconciler::new(
            Arc::clone(&self.store),
            Arc::clone(&self.zones),
            Arc::clone(&self.locks),
            Arc::clone(&self.commander),
            self.config.reconcile_interval(),
        )
    }

    /// Starts the ingestion and reconciliation loops.
    ///
    /// Both run until [`ControllerHandle::shutdown`] is called.
    pub fn spawn(&self, messages: mpsc::Receiver<BusMessage>) -> ControllerHandle {
        let (shutdown, shutdown_rx) = watch::channel(false);

        let ingestor = self.ingestor();
        let ingest_shutdown = shutdown_rx.clone();
        let ingest = tokio::spawn(async move { ingestor.run(messages, ingest_shutdown).await });

        let reconciler = self.reconciler();
        let reconcile = tokio::spawn(async move { reconciler.run(shutdown_rx).await });

        tracing::info!(zones = self.zones.len(), "Controller started");
        ControllerHandle {
            shutdown,
            tasks: vec![ingest, reconcile],
        }
    }

    /// Engages or disengages the manual lock of an outlet.
    ///
    /// Returns the previous state.
    pub fn set_manual_lock(&self, outlet_id: &str, state: LockState) -> LockState {
        self.locks.set(outlet_id, state)
    }

    /// Returns the manual lock state of an outlet.
    #[must_use]
    pub fn manual_lock(&self, outlet_id: &str) -> LockState {
        self.locks.get(outlet_id)
    }

    /// Sets a zone's target temperature, returning the previous one.
    ///
    /// # Errors
    ///
    /// Returns `Error::ZoneNotFound` for an unknown zone and a
    /// `ValueError` for a target below the zone floor.
    pub fn set_zone_target(&self, zone_id: &str, target_temp_f: i32) -> Result<i32> {
        self.zones.set_target(zone_id, target_temp_f)
    }

    /// Restores a zone's target to its configured default.
    ///
    /// # Errors
    ///
    /// Returns `Error::ZoneNotFound` for an unknown zone.
    pub fn reset_zone_target(&self, zone_id: &str) -> Result<i32> {
        self.zones.reset_target(zone_id)
    }

    /// Flips an outlet now, regardless of its manual lock.
    ///
    /// # Errors
    ///
    /// Returns `Error::Protocol` if the command cannot be published.
    pub async fn toggle_outlet(&self, outlet_id: &str) -> Result<()> {
        self.commander
            .toggle_power(outlet_id)
            .await
            .map_err(Error::from)
    }

    /// Sets an outlet now, regardless of its manual lock.
    ///
    /// # Errors
    ///
    /// Returns `Error::Protocol` if the command cannot be published.
    pub async fn set_outlet_power(&self, outlet_id: &str, state: PowerState) -> Result<()> {
        self.commander
            .set_power(outlet_id, state)
            .await
            .map_err(Error::from)
    }

    /// Status of every zone, ordered by id.
    #[must_use]
    pub fn zone_status(&self) -> Vec<ZoneStatus> {
        self.zones
            .zones()
            .into_iter()
            .map(|zone| {
                let outlet_id = zone.outlet_ids.first().cloned();
                let sensor_id = zone.sensor_ids.first().cloned();

                let power = outlet_id
                    .as_deref()
                    .and_then(|id| self.store.get_latest(DeviceKind::Power, id));
                let reading = sensor_id
                    .as_deref()
                    .and_then(|id| self.store.get_latest(DeviceKind::Temperature, id));
                let temperature = reading.as_deref().and_then(|r| r.as_temperature());

                ZoneStatus {
                    name: zone.display_name.clone(),
                    target_temp_f: zone.target_temp_f,
                    default_temp_f: zone.default_temp_f(),
                    floor_temp_f: zone.floor_temp_f,
                    power_on: power.as_deref().and_then(|r| r.as_power()).map(|p| p.is_on),
                    lock: outlet_id.as_deref().map(|id| self.locks.get(id)),
                    temperature_f: temperature.map(|t| t.temperature_fahrenheit()),
                    humidity_pct: temperature.and_then(|t| t.humidity_pct),
                    last_seen: temperature.map(|t| t.last_seen),
                    zone_id: zone.id,
                    outlet_id,
                    sensor_id,
                }
            })
            .collect()
    }

    /// Evaluates the three heartbeats against the configured threshold.
    #[must_use]
    pub fn health(&self, now: DateTime<Utc>) -> HealthReport {
        self.store
            .heartbeats()
            .health(now, self.config.health_threshold())
    }
}

/// Handle to the loops started by [`Controller::spawn`].
#[derive(Debug)]
pub struct ControllerHandle {
    shutdown: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl ControllerHandle {
    /// Signals both loops to stop and waits for them.
    pub async fn shutdown(self) {
        self.shutdown.send_replace(true);
        for task in self.tasks {
            if let Err(e) = task.await {
                tracing::error!(error = %e, "Controller task failed");
            }
        }
        tracing::info!("Controller stopped");
    }
}
