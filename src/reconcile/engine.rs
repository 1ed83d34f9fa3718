// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use crate::command::OutletCommander;
use crate::error::ValueError;
use crate::protocol::CommandPublisher;
use crate::reconcile::directive::{OutletDirective, resolve, zone_directives};
use crate::state::{DeviceKind, DeviceRecord, DeviceStateStore, Heartbeat, Snapshot};
use crate::types::PowerState;
use crate::zone::{ManualLockRegistry, Zone, ZoneCatalog};

/// Directives grouped by outlet id, in the order zones emitted them.
pub type DirectivePlan = BTreeMap<String, Vec<OutletDirective>>;

/// A power command sent during a cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssuedCommand {
    /// The outlet commanded.
    pub outlet_id: String,
    /// The state requested.
    pub state: PowerState,
}

/// What a reconciliation cycle did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    /// True if the cycle was skipped because no temperature was known.
    pub skipped: bool,
    /// Commands handed to the publisher.
    pub published: Vec<IssuedCommand>,
    /// Outlets with a decision that were left alone because of a manual lock.
    pub locked: Vec<String>,
    /// Outlets whose command could not be published.
    pub failed: Vec<String>,
    /// Zones that contributed no directive this cycle.
    pub idle_zones: Vec<String>,
}

impl CycleReport {
    fn skipped() -> Self {
        Self {
            skipped: true,
            ..Self::default()
        }
    }

    /// Returns the state published to `outlet_id`, if any.
    #[must_use]
    pub fn published_to(&self, outlet_id: &str) -> Option<PowerState> {
        self.published
            .iter()
            .find(|c| c.outlet_id == outlet_id)
            .map(|c| c.state)
    }
}

/// Fahrenheit readings of a zone's sensors present in `temperatures`.
///
/// Sensors without a record are skipped.
///
/// # Errors
///
/// Returns `ValueError::InvalidReading` if a sensor's record is not a
/// temperature or holds a non-finite value.
pub fn zone_readings(zone: &Zone, temperatures: &Snapshot) -> Result<Vec<f64>, ValueError> {
    let mut readings = Vec::with_capacity(zone.sensor_ids.len());
    for sensor_id in &zone.sensor_ids {
        let Some(record) = temperatures.get(sensor_id) else {
            tracing::trace!(zone = %zone.id, sensor = %sensor_id, "No reading yet");
            continue;
        };
        let fahrenheit = match record {
            DeviceRecord::Temperature(reading) => reading.temperature_fahrenheit(),
            DeviceRecord::Power(_) | DeviceRecord::Energy(_) | DeviceRecord::Health(_) => {
                return Err(ValueError::InvalidReading {
                    sensor: sensor_id.clone(),
                    reason: format!("expected a temperature record, found {}", record.kind()),
                });
            }
        };
        if !fahrenheit.is_finite() {
            return Err(ValueError::InvalidReading {
                sensor: sensor_id.clone(),
                reason: format!("{fahrenheit} is not a finite temperature"),
            });
        }
        readings.push(fahrenheit);
    }
    Ok(readings)
}

/// First phase: groups every zone's directives by outlet.
///
/// Zones without usable readings contribute nothing; their ids are
/// returned alongside the plan.
#[must_use]
pub fn collect_directives(zones: &[Zone], temperatures: &Snapshot) -> (DirectivePlan, Vec<String>) {
    let mut plan = DirectivePlan::new();
    let mut idle = Vec::new();

    for zone in zones {
        let readings = match zone_readings(zone, temperatures) {
            Ok(readings) => readings,
            Err(e) => {
                tracing::error!(zone = %zone.id, error = %e, "Skipping zone");
                idle.push(zone.id.clone());
                continue;
            }
        };
        if readings.is_empty() {
            tracing::warn!(zone = %zone.id, "No sensor readings for zone, skipping");
            idle.push(zone.id.clone());
            continue;
        }

        let directives = zone_directives(&readings, zone.target_temp_f, zone.floor_temp_f);
        tracing::debug!(
            zone = %zone.id,
            ?readings,
            target = zone.target_temp_f,
            floor = zone.floor_temp_f,
            ?directives,
            "Zone classified"
        );
        for outlet_id in &zone.outlet_ids {
            plan.entry(outlet_id.clone())
                .or_default()
                .extend_from_slice(&directives);
        }
    }

    (plan, idle)
}

/// Second phase: reduces each outlet's directives to a power state.
#[must_use]
pub fn resolve_all(plan: &DirectivePlan) -> BTreeMap<String, PowerState> {
    plan.iter()
        .filter_map(|(outlet_id, directives)| {
            resolve(directives).map(|state| (outlet_id.clone(), state))
        })
        .collect()
}

/// The periodic reconciliation task.
///
/// Cloning is cheap; clones share the store, catalog, locks and commander.
#[derive(Debug)]
pub struct Reconciler<P> {
    store: Arc<DeviceStateStore>,
    zones: Arc<ZoneCatalog>,
    locks: Arc<ManualLockRegistry>,
    commander: Arc<OutletCommander<P>>,
    interval: Duration,
}

impl<P> Clone for Reconciler<P> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            zones: Arc::clone(&self.zones),
            locks: Arc::clone(&self.locks),
            commander: Arc::clone(&self.commander),
            interval: self.interval,
        }
    }
}

impl<P: CommandPublisher> Reconciler<P> {
    /// Creates a reconciler running every `interval`.
    #[must_use]
    pub fn new(
        store: Arc<DeviceStateStore>,
        zones: Arc<ZoneCatalog>,
        locks: Arc<ManualLockRegistry>,
        commander: Arc<OutletCommander<P>>,
        interval: Duration,
    ) -> Self {
        Self {
            store,
            zones,
            locks,
            commander,
            interval,
        }
    }

    /// The period between cycles.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Runs one reconciliation cycle.
    ///
    /// Skips everything, including the heartbeat, when no temperature has
    /// been recorded yet. Publish failures are logged and reported; the
    /// next cycle sends the command again.
    pub async fn run_cycle(&self, now: DateTime<Utc>) -> CycleReport {
        let temperatures = self.store.snapshot(DeviceKind::Temperature);
        if temperatures.is_empty() {
            tracing::warn!("No temperature readings yet, skipping reconciliation cycle");
            return CycleReport::skipped();
        }

        let zones = self.zones.zones();
        let (plan, idle_zones) = collect_directives(&zones, &temperatures);
        let decisions = resolve_all(&plan);

        let mut report = CycleReport {
            idle_zones,
            ..CycleReport::default()
        };

        for (outlet_id, state) in decisions {
            if self.locks.is_engaged(&outlet_id) {
                tracing::info!(
                    outlet = %outlet_id,
                    decision = %state,
                    "Manual lock engaged, leaving outlet alone"
                );
                report.locked.push(outlet_id);
                continue;
            }

            match self.commander.set_power(&outlet_id, state).await {
                Ok(()) => report.published.push(IssuedCommand { outlet_id, state }),
                Err(e) => {
                    tracing::error!(outlet = %outlet_id, error = %e, "Failed to publish power command");
                    report.failed.push(outlet_id);
                }
            }
        }

        self.store.heartbeats().beat(Heartbeat::Reconciliation, now);
        report
    }

    /// Runs cycles every interval until `shutdown` turns true.
    ///
    /// The first cycle runs immediately.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(interval_s = self.interval.as_secs(), "Reconciliation loop started");
        loop {
            if *shutdown.borrow() {
                break;
            }
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    let report = self.run_cycle(Utc::now()).await;
                    tracing::debug!(
                        skipped = report.skipped,
                        published = report.published.len(),
                        locked = report.locked.len(),
                        "Reconciliation cycle finished"
                    );
                }
            }
        }
        tracing::info!("Reconciliation loop stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::RecordingPublisher;
    use crate::state::TemperatureReading;
    use crate::telemetry::TopicScheme;
    use crate::types::LockState;

    use OutletDirective::{InRange, TooCold, TooHot};

    fn celsius(fahrenheit: f64) -> f64 {
        (fahrenheit - 32.0) * 5.0 / 9.0
    }

    fn put_temp(store: &DeviceStateStore, sensor: &str, fahrenheit: f64) {
        store.put(DeviceRecord::Temperature(TemperatureReading::new(
            sensor,
            celsius(fahrenheit),
            Utc::now(),
        )));
    }

    fn office() -> Zone {
        Zone::new("office", 78, 72)
            .with_sensor("temp_Office")
            .with_outlet("tasmota_of")
    }

    struct Fixture {
        store: Arc<DeviceStateStore>,
        locks: Arc<ManualLockRegistry>,
        reconciler: Reconciler<RecordingPublisher>,
    }

    impl Fixture {
        fn new(zones: Vec<Zone>) -> Self {
            let store = Arc::new(DeviceStateStore::new());
            let locks = Arc::new(ManualLockRegistry::new());
            let commander = Arc::new(OutletCommander::new(
                RecordingPublisher::new(),
                TopicScheme::default(),
            ));
            let reconciler = Reconciler::new(
                Arc::clone(&store),
                Arc::new(ZoneCatalog::new(zones).unwrap()),
                Arc::clone(&locks),
                commander,
                Duration::from_secs(5),
            );
            Self {
                store,
                locks,
                reconciler,
            }
        }

        fn sent(&self) -> Vec<(String, String)> {
            self.reconciler
                .commander
                .publisher()
                .take()
                .into_iter()
                .map(|m| (m.topic, m.payload))
                .collect()
        }
    }

    #[test]
    fn collect_skips_missing_sensors() {
        let store = DeviceStateStore::new();
        put_temp(&store, "temp_A", 80.0);
        let zone = Zone::new("z", 78, 72)
            .with_sensor("temp_missing")
            .with_sensor("temp_A")
            .with_outlet("o");

        let (plan, idle) = collect_directives(&[zone], &store.snapshot(DeviceKind::Temperature));
        assert_eq!(plan["o"], [TooHot]);
        assert!(idle.is_empty());
    }

    #[test]
    fn zone_without_readings_is_idle() {
        let store = DeviceStateStore::new();
        put_temp(&store, "temp_Other", 80.0);

        let (plan, idle) =
            collect_directives(&[office()], &store.snapshot(DeviceKind::Temperature));
        assert!(plan.is_empty());
        assert_eq!(idle, ["office"]);
    }

    #[test]
    fn non_finite_reading_skips_only_that_zone() {
        let store = DeviceStateStore::new();
        put_temp(&store, "temp_Office", f64::NAN);
        put_temp(&store, "temp_Den", 70.0);
        let den = Zone::new("den", 75, 68).with_sensor("temp_Den").with_outlet("tasmota_den");

        let snapshot = store.snapshot(DeviceKind::Temperature);
        assert!(matches!(
            zone_readings(&office(), &snapshot),
            Err(ValueError::InvalidReading { .. })
        ));

        let (plan, idle) = collect_directives(&[office(), den], &snapshot);
        assert_eq!(idle, ["office"]);
        assert_eq!(plan["tasmota_den"], [InRange]);
    }

    #[test]
    fn shared_outlet_gathers_directives_from_every_zone() {
        let store = DeviceStateStore::new();
        put_temp(&store, "temp_A", 80.0);
        put_temp(&store, "temp_B", 60.0);
        let a = Zone::new("a", 78, 72).with_sensor("temp_A").with_outlet("shared");
        let b = Zone::new("b", 78, 72)
            .with_sensor("temp_B")
            .with_outlet("shared")
            .with_outlet("b_only");

        let (plan, _) = collect_directives(&[a, b], &store.snapshot(DeviceKind::Temperature));
        assert_eq!(plan["shared"], [TooHot, TooCold]);
        assert_eq!(plan["b_only"], [TooCold]);

        let decisions = resolve_all(&plan);
        assert_eq!(decisions["shared"], PowerState::Off);
        assert_eq!(decisions["b_only"], PowerState::Off);
    }

    #[test]
    fn in_range_zone_turns_its_outlets_off() {
        let store = DeviceStateStore::new();
        put_temp(&store, "temp_A", 73.0);
        put_temp(&store, "temp_B", 77.5);
        let zone = Zone::new("z", 78, 72)
            .with_sensor("temp_A")
            .with_sensor("temp_B")
            .with_outlet("o1")
            .with_outlet("o2");

        let (plan, _) = collect_directives(&[zone], &store.snapshot(DeviceKind::Temperature));
        let decisions = resolve_all(&plan);
        assert_eq!(decisions.len(), 2);
        assert!(decisions.values().all(|s| *s == PowerState::Off));
    }

    #[test]
    fn hot_without_cold_turns_on() {
        let store = DeviceStateStore::new();
        put_temp(&store, "temp_A", 75.0);
        put_temp(&store, "temp_B", 79.0);
        let zone = Zone::new("z", 78, 72)
            .with_sensor("temp_A")
            .with_sensor("temp_B")
            .with_outlet("o");

        let (plan, _) = collect_directives(&[zone], &store.snapshot(DeviceKind::Temperature));
        assert_eq!(resolve_all(&plan)["o"], PowerState::On);
    }

    #[tokio::test]
    async fn empty_snapshot_skips_cycle() {
        let fixture = Fixture::new(vec![office()]);

        let report = fixture.reconciler.run_cycle(Utc::now()).await;

        assert!(report.skipped);
        assert!(fixture.sent().is_empty());
        assert!(
            fixture
                .store
                .heartbeats()
                .get(Heartbeat::Reconciliation)
                .is_none()
        );
    }

    #[tokio::test]
    async fn cycle_publishes_and_beats() {
        let fixture = Fixture::new(vec![office()]);
        put_temp(&fixture.store, "temp_Office", 80.0);
        let now = Utc::now();

        let report = fixture.reconciler.run_cycle(now).await;

        assert_eq!(report.published_to("tasmota_of"), Some(PowerState::On));
        assert_eq!(
            fixture.sent(),
            [("outlet/cmnd/tasmota_of/Power".to_string(), "ON".to_string())]
        );
        assert_eq!(
            fixture.store.heartbeats().get(Heartbeat::Reconciliation),
            Some(now)
        );
    }

    #[tokio::test]
    async fn locked_outlet_is_not_published() {
        let fixture = Fixture::new(vec![office()]);
        put_temp(&fixture.store, "temp_Office", 80.0);
        fixture.locks.set("tasmota_of", LockState::Engaged);

        let report = fixture.reconciler.run_cycle(Utc::now()).await;
        assert_eq!(report.locked, ["tasmota_of"]);
        assert!(report.published.is_empty());
        assert!(fixture.sent().is_empty());

        fixture.locks.set("tasmota_of", LockState::Disengaged);
        let report = fixture.reconciler.run_cycle(Utc::now()).await;
        assert_eq!(report.published_to("tasmota_of"), Some(PowerState::On));
    }

    #[tokio::test]
    async fn zone_missing_data_does_not_block_others() {
        let den = Zone::new("den", 75, 68).with_sensor("temp_Den").with_outlet("tasmota_den");
        let fixture = Fixture::new(vec![office(), den]);
        put_temp(&fixture.store, "temp_Den", 60.0);

        let report = fixture.reconciler.run_cycle(Utc::now()).await;
        assert_eq!(report.idle_zones, ["office"]);
        assert_eq!(report.published_to("tasmota_den"), Some(PowerState::Off));
        assert_eq!(report.published_to("tasmota_of"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn run_ticks_until_shutdown() {
        let fixture = Fixture::new(vec![office()]);
        put_temp(&fixture.store, "temp_Office", 70.0);
        let (tx, rx) = watch::channel(false);

        let reconciler = fixture.reconciler.clone();
        let task = tokio::spawn(async move { reconciler.run(rx).await });

        // Immediate tick plus two more
        tokio::time::sleep(Duration::from_millis(10_100)).await;
        tx.send(true).unwrap();
        task.await.unwrap();

        let sent = fixture.sent();
        assert_eq!(sent.len(), 3);
        assert!(sent.iter().all(|(_, payload)| payload == "OFF"));
    }
}
