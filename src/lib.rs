// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Brigid - a home-climate controller for Tasmota outlets and zigbee
//! temperature sensors.
//!
//! The controller listens to an MQTT bus, keeps the latest state of every
//! device, and every few seconds decides for each outlet whether it should
//! be on or off according to per-zone temperature bands.
//!
//! # Components
//!
//! - [`telemetry`]: classifies raw bus messages into typed device records
//! - [`state`]: the shared device state store and liveness heartbeats
//! - [`zone`]: the zone catalog and the per-outlet manual locks
//! - [`ingest`]: the loop feeding bus messages into the store
//! - [`reconcile`]: the loop turning zone policy into outlet commands
//! - [`command`] and [`protocol`]: outlet commands and the bus transport
//!
//! # Decision rule
//!
//! Each zone classifies its readings as too hot (above target), too cold
//! (below floor) or in range. An outlet is switched **on** only when some
//! zone says it is too hot and no zone says it is too cold. Outlets with an
//! engaged manual lock are never switched by the controller.
//!
//! # Quick Start
//!
//! ```no_run
//! use brigid::protocol::MqttBus;
//! use brigid::zone::{Zone, ZoneCatalog};
//! use brigid::{Controller, ControllerConfig};
//!
//! #[tokio::main]
//! async fn main() -> brigid::Result<()> {
//!     let config = ControllerConfig::default();
//!     let zones = ZoneCatalog::new([Zone::new("office", 78, 72)
//!         .with_display_name("Office")
//!         .with_sensor("temp_Office")
//!         .with_outlet("tasmota_of")])?;
//!
//!     let (bus, messages) = MqttBus::builder()
//!         .host("192.168.1.50")
//!         .topics(config.subscriptions())
//!         .build()
//!         .await?;
//!
//!     let controller = Controller::new(config, zones, bus.clone());
//!     let handle = controller.spawn(messages);
//!
//!     tokio::time::sleep(std::time::Duration::from_secs(3600)).await;
//!     handle.shutdown().await;
//!     bus.disconnect().await?;
//!     Ok(())
//! }
//! ```

pub mod command;
mod config;
mod controller;
pub mod error;
pub mod ingest;
pub mod protocol;
pub mod reconcile;
pub mod state;
pub mod telemetry;
pub mod types;
pub mod zone;

pub use command::{Command, OutletCommander, PowerCommand};
pub use config::ControllerConfig;
pub use controller::{Controller, ControllerHandle, ZoneStatus};
pub use error::{Error, ParseError, ProtocolError, Result, ValueError};
#[cfg(feature = "mqtt")]
pub use protocol::{MqttBus, MqttBusBuilder};
pub use protocol::{BusMessage, CommandPublisher, RecordingPublisher};
pub use state::{DeviceKind, DeviceRecord, DeviceStateStore, HealthReport, WritePolicy};
pub use types::{LockState, PowerState};
