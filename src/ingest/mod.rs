// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The ingestion loop: bus messages in, device records out.
//!
//! Every message is classified and, if it yields a record, written to the
//! [`DeviceStateStore`]. Unrecognized topics are logged at debug level and
//! malformed payloads at error level; neither stops the loop.
//!
//! The loop also beats [`Heartbeat::Ingestion`] on its own ticker, so a
//! quiet bus does not look like a dead loop.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;

use crate::protocol::BusMessage;
use crate::state::{DeviceKind, DeviceStateStore, Heartbeat};
use crate::telemetry::{Classification, Classifier};

/// What happened to one message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    /// A record was written to the store.
    Stored(DeviceKind),
    /// A record was produced but the write policy kept the stored one.
    Superseded(DeviceKind),
    /// The topic is not one the controller handles.
    Unrecognized,
    /// The topic is known but the payload was malformed.
    Rejected,
}

/// Feeds bus messages into the store.
#[derive(Debug, Clone)]
pub struct Ingestor {
    classifier: Classifier,
    store: Arc<DeviceStateStore>,
    heartbeat_interval: Duration,
}

impl Ingestor {
    /// Creates an ingestor writing into `store`.
    #[must_use]
    pub fn new(
        classifier: Classifier,
        store: Arc<DeviceStateStore>,
        heartbeat_interval: Duration,
    ) -> Self {
        Self {
            classifier,
            store,
            heartbeat_interval,
        }
    }

    /// Classifies and stores one message received at `now`.
    pub fn handle(&self, message: &BusMessage, now: DateTime<Utc>) -> IngestOutcome {
        let classification = match self.classifier.classify(&message.topic, &message.payload, now)
        {
            Ok(classification) => classification,
            Err(e) => {
                tracing::error!(
                    topic = %message.topic,
                    error = %e,
                    "Discarding malformed message"
                );
                return IngestOutcome::Rejected;
            }
        };

        let Classification::Record(record) = classification else {
            tracing::debug!(topic = %message.topic, "Ignoring unrecognized message");
            return IngestOutcome::Unrecognized;
        };

        self.store.heartbeats().beat(Heartbeat::LastMessage, now);

        let kind = record.kind();
        tracing::debug!(
            topic = %message.topic,
            kind = %kind,
            device = %record.device_id(),
            "Record ingested"
        );
        if self.store.put(record) {
            IngestOutcome::Stored(kind)
        } else {
            IngestOutcome::Superseded(kind)
        }
    }

    /// Consumes `messages` until shutdown or until the channel closes.
    pub async fn run(
        &self,
        mut messages: mpsc::Receiver<BusMessage>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let mut ticker = tokio::time::interval(self.heartbeat_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!("Ingestion loop started");
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
                    self.store.heartbeats().beat(Heartbeat::Ingestion, Utc::now());
                }
                message = messages.recv() => {
                    let Some(message) = message else {
                        tracing::warn!("Message channel closed, stopping ingestion");
                        break;
                    };
                    self.handle(&message, Utc::now());
                }
            }
        }
        tracing::info!("Ingestion loop stopped");
    }
}
