// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! End-to-end tests: bus messages in, outlet commands out.

use std::sync::Arc;

use brigid::protocol::{BusMessage, PublishedMessage, RecordingPublisher};
use brigid::zone::{Zone, ZoneCatalog};
use brigid::{Controller, ControllerConfig, LockState};
use chrono::Utc;

const OFFICE_SENSOR_TOPIC: &str = "zigbee2mqtt/sensors/WSDCGQ11LM/Office";
const OFFICE_COMMAND_TOPIC: &str = "outlet/cmnd/tasmota_of/Power";

fn office_controller() -> Controller<Arc<RecordingPublisher>> {
    let zones = ZoneCatalog::new([Zone::new("office", 78, 72)
        .with_display_name("Office")
        .with_sensor("temp_Office")
        .with_outlet("tasmota_of")])
    .unwrap();
    Controller::new(
        ControllerConfig::default(),
        zones,
        Arc::new(RecordingPublisher::new()),
    )
}

fn celsius(fahrenheit: f64) -> f64 {
    (fahrenheit - 32.0) * 5.0 / 9.0
}

/// Feeds an office sensor reading of `fahrenheit` through the classifier.
fn report_office(controller: &Controller<Arc<RecordingPublisher>>, fahrenheit: f64) {
    let payload = format!(
        r#"{{"temperature":{},"humidity":40,"device":{{"friendlyName":"sensors/WSDCGQ11LM/Office"}}}}"#,
        celsius(fahrenheit)
    );
    controller
        .ingestor()
        .handle(&BusMessage::new(OFFICE_SENSOR_TOPIC, payload), Utc::now());
}

async fn cycle(controller: &Controller<Arc<RecordingPublisher>>) -> Vec<PublishedMessage> {
    controller.reconciler().run_cycle(Utc::now()).await;
    controller.commander().publisher().take()
}

fn command(payload: &str) -> PublishedMessage {
    PublishedMessage {
        topic: OFFICE_COMMAND_TOPIC.to_string(),
        payload: payload.to_string(),
    }
}

// ============================================================================
// Office scenarios
// ============================================================================

mod office {
    use super::*;

    #[tokio::test]
    async fn too_hot_turns_outlet_on() {
        let controller = office_controller();
        report_office(&controller, 80.0);
        assert_eq!(cycle(&controller).await, [command("ON")]);
    }

    #[tokio::test]
    async fn too_cold_turns_outlet_off() {
        let controller = office_controller();
        report_office(&controller, 70.0);
        assert_eq!(cycle(&controller).await, [command("OFF")]);
    }

    #[tokio::test]
    async fn in_range_turns_outlet_off() {
        let controller = office_controller();
        report_office(&controller, 75.0);
        assert_eq!(cycle(&controller).await, [command("OFF")]);
    }

    #[tokio::test]
    async fn manual_lock_suppresses_every_decision() {
        let controller = office_controller();
        controller.set_manual_lock("tasmota_of", LockState::Engaged);

        for fahrenheit in [80.0, 70.0, 75.0] {
            report_office(&controller, fahrenheit);
            assert!(cycle(&controller).await.is_empty());
        }

        controller.set_manual_lock("tasmota_of", LockState::Disengaged);
        report_office(&controller, 80.0);
        assert_eq!(cycle(&controller).await, [command("ON")]);
    }

    #[tokio::test]
    async fn no_readings_no_commands() {
        let controller = office_controller();
        controller.ingestor().handle(
            &BusMessage::new("outlet/stat/tasmota_of/POWER", "ON"),
            Utc::now(),
        );
        assert!(cycle(&controller).await.is_empty());
    }

    #[tokio::test]
    async fn raising_the_target_changes_the_decision() {
        let controller = office_controller();
        report_office(&controller, 80.0);
        assert_eq!(cycle(&controller).await, [command("ON")]);

        controller.set_zone_target("office", 82).unwrap();
        assert_eq!(cycle(&controller).await, [command("OFF")]);

        controller.reset_zone_target("office").unwrap();
        assert_eq!(cycle(&controller).await, [command("ON")]);
    }
}

// ============================================================================
// Multi-zone scenarios
// ============================================================================

mod shared_outlets {
    use super::*;

    fn controller() -> Controller<Arc<RecordingPublisher>> {
        let zones = ZoneCatalog::new([
            Zone::new("living", 76, 70)
                .with_sensor("temp_Living")
                .with_outlet("tasmota_fan"),
            Zone::new("nursery", 74, 68)
                .with_sensor("temp_Nursery")
                .with_outlet("tasmota_fan")
                .with_outlet("tasmota_nursery"),
        ])
        .unwrap();
        Controller::new(
            ControllerConfig::default(),
            zones,
            Arc::new(RecordingPublisher::new()),
        )
    }

    fn report(controller: &Controller<Arc<RecordingPublisher>>, name: &str, fahrenheit: f64) {
        let payload = format!(r#"{{"temperature":{}}}"#, celsius(fahrenheit));
        controller.ingestor().handle(
            &BusMessage::new(format!("zigbee2mqtt/sensors/WSDCGQ11LM/{name}"), payload),
            Utc::now(),
        );
    }

    #[tokio::test]
    async fn cold_zone_wins_over_hot_zone() {
        let controller = controller();
        report(&controller, "Living", 80.0);
        report(&controller, "Nursery", 65.0);

        let report = controller.reconciler().run_cycle(Utc::now()).await;

        assert_eq!(report.published_to("tasmota_fan"), Some(brigid::PowerState::Off));
        assert_eq!(
            report.published_to("tasmota_nursery"),
            Some(brigid::PowerState::Off)
        );
    }

    #[tokio::test]
    async fn hot_zone_wins_over_in_range_zone() {
        let controller = controller();
        report(&controller, "Living", 80.0);
        report(&controller, "Nursery", 70.0);

        let report = controller.reconciler().run_cycle(Utc::now()).await;

        assert_eq!(report.published_to("tasmota_fan"), Some(brigid::PowerState::On));
        assert_eq!(
            report.published_to("tasmota_nursery"),
            Some(brigid::PowerState::Off)
        );
    }

    #[tokio::test]
    async fn one_command_per_outlet_per_cycle() {
        let controller = controller();
        report(&controller, "Living", 80.0);
        report(&controller, "Nursery", 80.0);

        let sent = cycle(&controller).await;
        let fan: Vec<_> = sent
            .iter()
            .filter(|m| m.topic == "outlet/cmnd/tasmota_fan/Power")
            .collect();
        assert_eq!(fan.len(), 1);
        assert_eq!(sent.len(), 2);
    }
}
