// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Liveness timestamps and the health check computed from them.

use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;

/// Default staleness threshold for the health check.
pub const DEFAULT_HEALTH_THRESHOLD: Duration = Duration::from_secs(600);

/// One of the three liveness signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Heartbeat {
    /// Written by the ingestion loop on every tick.
    Ingestion,
    /// Written by the ingestion loop whenever a recognized message arrives.
    LastMessage,
    /// Written by the reconciliation loop at the end of every cycle.
    Reconciliation,
}

/// The three heartbeat timestamps, each written by exactly one loop.
#[derive(Debug, Default)]
pub struct Heartbeats {
    ingestion: RwLock<Option<DateTime<Utc>>>,
    last_message: RwLock<Option<DateTime<Utc>>>,
    reconciliation: RwLock<Option<DateTime<Utc>>>,
}

impl Heartbeats {
    /// Creates heartbeats that have never been written.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, which: Heartbeat) -> &RwLock<Option<DateTime<Utc>>> {
        match which {
            Heartbeat::Ingestion => &self.ingestion,
            Heartbeat::LastMessage => &self.last_message,
            Heartbeat::Reconciliation => &self.reconciliation,
        }
    }

    /// Records a beat of `which` at `at`.
    pub fn beat(&self, which: Heartbeat, at: DateTime<Utc>) {
        tracing::trace!(heartbeat = ?which, at = %at, "Heartbeat");
        *self.slot(which).write() = Some(at);
    }

    /// Returns the last beat of `which`, if any.
    #[must_use]
    pub fn get(&self, which: Heartbeat) -> Option<DateTime<Utc>> {
        *self.slot(which).read()
    }

    /// Evaluates health against `threshold` at time `now`.
    #[must_use]
    pub fn health(&self, now: DateTime<Utc>, threshold: Duration) -> HealthReport {
        HealthReport::evaluate(
            [
                self.get(Heartbeat::Ingestion),
                self.get(Heartbeat::LastMessage),
                self.get(Heartbeat::Reconciliation),
            ],
            now,
            threshold,
        )
    }
}

/// Result of the health check.
///
/// Healthy iff every signal has beaten and the oldest is younger than the
/// threshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    /// Whether every signal is fresh.
    pub healthy: bool,
    /// Age of the ingestion heartbeat.
    pub ingestion_age: Option<Duration>,
    /// Age of the last received message.
    pub last_message_age: Option<Duration>,
    /// Age of the reconciliation heartbeat.
    pub reconciliation_age: Option<Duration>,
}

impl HealthReport {
    /// Computes the report from `[ingestion, last_message, reconciliation]`.
    ///
    /// A timestamp in the future counts as age zero.
    #[must_use]
    pub fn evaluate(
        beats: [Option<DateTime<Utc>>; 3],
        now: DateTime<Utc>,
        threshold: Duration,
    ) -> Self {
        let [ingestion_age, last_message_age, reconciliation_age] =
            beats.map(|beat| beat.map(|at| (now - at).to_std().unwrap_or(Duration::ZERO)));

        let ages = [ingestion_age, last_message_age, reconciliation_age];
        let healthy = ages
            .iter()
            .all(|age| age.is_some_and(|age| age < threshold));

        Self {
            healthy,
            ingestion_age,
            last_message_age,
            reconciliation_age,
        }
    }

    /// Returns the oldest of the three ages, or `None` if any signal never beat.
    #[must_use]
    pub fn max_age(&self) -> Option<Duration> {
        [
            self.ingestion_age?,
            self.last_message_age?,
            self.reconciliation_age?,
        ]
        .into_iter()
        .max()
    }
}
