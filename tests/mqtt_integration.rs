// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Integration tests for the MQTT bus using mockforge-mqtt.

#![cfg(feature = "mqtt")]

use std::sync::Arc;
use std::time::Duration;

use brigid::protocol::{CommandPublisher, MqttBus};
use brigid::zone::{Zone, ZoneCatalog};
use brigid::{Controller, ControllerConfig, OutletCommander, PowerState, ProtocolError};
use mockforge_mqtt::broker::MqttConfig;
use mockforge_mqtt::{
    MqttMetrics, SessionManager, start_mqtt_server, start_mqtt_server_with_session_manager,
};
use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS};
use tokio::sync::{mpsc, oneshot};
use tokio::time::{sleep, timeout};

const OFFICE_SENSOR_TOPIC: &str = "zigbee2mqtt/sensors/WSDCGQ11LM/Office";
const OFFICE_COMMAND_TOPIC: &str = "outlet/cmnd/tasmota_of/Power";

/// Helper to find an available port for testing.
fn get_test_port() -> u16 {
    use std::sync::atomic::{AtomicU16, Ordering};
    static PORT_COUNTER: AtomicU16 = AtomicU16::new(18850);
    PORT_COUNTER.fetch_add(1, Ordering::SeqCst)
}

/// Starts a mock MQTT broker on the given port.
async fn start_mock_broker(port: u16) {
    let config = MqttConfig {
        port,
        host: "127.0.0.1".to_string(),
        ..Default::default()
    };

    tokio::spawn(async move {
        let _ = start_mqtt_server(config).await;
    });

    // Give the broker time to start, bind to port, and be ready to accept connections
    sleep(Duration::from_millis(500)).await;
}

/// Starts a mock MQTT broker whose sessions the test can inspect.
async fn start_inspectable_broker(port: u16) -> Arc<SessionManager> {
    let config = MqttConfig {
        port,
        host: "127.0.0.1".to_string(),
        ..Default::default()
    };
    let sessions = Arc::new(SessionManager::new(config.max_connections, None));

    let broker_sessions = sessions.clone();
    tokio::spawn(async move {
        let metrics = Arc::new(MqttMetrics::new());
        let _ = start_mqtt_server_with_session_manager(broker_sessions, metrics, config).await;
    });

    sleep(Duration::from_millis(500)).await;
    sessions
}

/// Connects a plain client standing in for the field devices.
///
/// Returns once the broker has acknowledged the connection and, when
/// `filter` is given, the subscription. Received publishes arrive on the
/// returned channel as `(topic, payload)`.
async fn field_client(
    port: u16,
    client_id: &str,
    filter: Option<&str>,
) -> (AsyncClient, mpsc::UnboundedReceiver<(String, String)>) {
    let (client, mut event_loop) =
        AsyncClient::new(MqttOptions::new(client_id, "127.0.0.1", port), 10);
    if let Some(filter) = filter {
        client.subscribe(filter, QoS::AtMostOnce).await.unwrap();
    }
    let wait_for_suback = filter.is_some();

    let (ready_tx, ready_rx) = oneshot::channel();
    let (publish_tx, publish_rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        let mut ready_tx = Some(ready_tx);
        while let Ok(event) = event_loop.poll().await {
            match event {
                Event::Incoming(Packet::ConnAck(_)) if !wait_for_suback => {
                    if let Some(tx) = ready_tx.take() {
                        let _ = tx.send(());
                    }
                }
                Event::Incoming(Packet::SubAck(_)) => {
                    if let Some(tx) = ready_tx.take() {
                        let _ = tx.send(());
                    }
                }
                Event::Incoming(Packet::Publish(publish)) => {
                    let payload = String::from_utf8_lossy(&publish.payload).into_owned();
                    let _ = publish_tx.send((publish.topic, payload));
                }
                _ => {}
            }
        }
    });

    timeout(Duration::from_secs(5), ready_rx)
        .await
        .expect("field client did not connect")
        .unwrap();
    (client, publish_rx)
}

/// Waits for the next publish on `topic`.
async fn next_on_topic(
    publishes: &mut mpsc::UnboundedReceiver<(String, String)>,
    topic: &str,
) -> Option<String> {
    timeout(Duration::from_secs(5), async {
        while let Some((received, payload)) = publishes.recv().await {
            if received == topic {
                return Some(payload);
            }
        }
        None
    })
    .await
    .ok()
    .flatten()
}

/// Waits until the broker holds `expected` subscriptions for `client_id`.
async fn wait_for_subscriptions(sessions: &SessionManager, client_id: &str, expected: usize) {
    timeout(Duration::from_secs(5), async {
        while sessions.get_client_subscriptions(client_id).await.len() < expected {
            sleep(Duration::from_millis(50)).await;
        }
    })
    .await
    .expect("subscriptions never reached the broker");
}

fn office_zones() -> ZoneCatalog {
    ZoneCatalog::new([Zone::new("office", 78, 72)
        .with_sensor("temp_Office")
        .with_outlet("tasmota_of")])
    .unwrap()
}

// ============================================================================
// Connection Tests
// ============================================================================

mod bus_connection {
    use super::*;

    #[tokio::test]
    async fn connect_to_broker() {
        let port = get_test_port();
        start_mock_broker(port).await;

        let result = MqttBus::builder()
            .host("127.0.0.1")
            .port(port)
            .client_id("brigid_connect")
            .topics(ControllerConfig::default().subscriptions())
            .build()
            .await;

        assert!(result.is_ok(), "Failed to connect: {:?}", result.err());

        let (bus, _messages) = result.unwrap();
        assert!(bus.is_connected());
        assert_eq!(bus.host(), "127.0.0.1");
        assert_eq!(bus.port(), port);
        assert_eq!(bus.topics().len(), 5);
    }

    #[tokio::test]
    async fn missing_host_fails() {
        let result = MqttBus::builder().port(1883).build().await;
        assert!(matches!(result, Err(ProtocolError::InvalidAddress(_))));
    }

    #[tokio::test]
    async fn unreachable_broker_times_out() {
        // Nothing listens on this port
        let port = get_test_port();

        let result = MqttBus::builder()
            .host("127.0.0.1")
            .port(port)
            .connection_timeout(Duration::from_secs(1))
            .reconnect_delay(Duration::from_millis(100))
            .build()
            .await;

        assert!(matches!(result, Err(ProtocolError::ConnectionFailed(_))));
    }

    #[tokio::test]
    async fn disconnect_closes_message_channel() {
        let port = get_test_port();
        start_mock_broker(port).await;

        let (bus, mut messages) = MqttBus::builder()
            .host("127.0.0.1")
            .port(port)
            .client_id("brigid_disconnect")
            .build()
            .await
            .unwrap();

        bus.disconnect().await.unwrap();
        assert!(!bus.is_connected());

        let closed = tokio::time::timeout(Duration::from_secs(2), messages.recv()).await;
        assert!(matches!(closed, Ok(None)));
    }

    #[tokio::test]
    async fn resubscribes_after_session_takeover() {
        let port = get_test_port();
        let sessions = start_inspectable_broker(port).await;

        let topics = ControllerConfig::default().subscriptions();
        let (bus, mut messages) = MqttBus::builder()
            .host("127.0.0.1")
            .port(port)
            .client_id("brigid_takeover")
            .topics(topics.clone())
            .reconnect_delay(Duration::from_millis(500))
            .build()
            .await
            .unwrap();
        wait_for_subscriptions(&sessions, "brigid_takeover", topics.len()).await;

        // Same client id: the broker drops the bus connection
        let (intruder, _) = field_client(port, "brigid_takeover", None).await;
        intruder.disconnect().await.unwrap();

        // The bus comes back on a fresh session
        wait_for_subscriptions(&sessions, "brigid_takeover", topics.len()).await;
        assert!(bus.is_connected());

        let (field, _) = field_client(port, "field_takeover", None).await;
        field
            .publish(OFFICE_SENSOR_TOPIC, QoS::AtMostOnce, false, r#"{"temperature":26.67}"#)
            .await
            .unwrap();

        let message = timeout(Duration::from_secs(5), messages.recv())
            .await
            .expect("no message after reconnect")
            .unwrap();
        assert_eq!(message.topic, OFFICE_SENSOR_TOPIC);
        assert_eq!(message.payload, br#"{"temperature":26.67}"#);

        bus.disconnect().await.unwrap();
    }
}

// ============================================================================
// Publishing Tests
// ============================================================================

mod bus_publishing {
    use super::*;

    #[tokio::test]
    async fn publish_raw_message() {
        let port = get_test_port();
        start_mock_broker(port).await;

        let (bus, _messages) = MqttBus::builder()
            .host("127.0.0.1")
            .port(port)
            .client_id("brigid_publish")
            .build()
            .await
            .unwrap();

        let result = bus.publish("outlet/cmnd/tasmota_of/Power", "ON").await;
        assert!(result.is_ok(), "Publish failed: {:?}", result.err());
    }

    #[tokio::test]
    async fn commander_over_bus() {
        let port = get_test_port();
        start_mock_broker(port).await;

        let (bus, _messages) = MqttBus::builder()
            .host("127.0.0.1")
            .port(port)
            .client_id("brigid_commander")
            .build()
            .await
            .unwrap();

        let commander = OutletCommander::new(bus, ControllerConfig::default().scheme().clone());
        assert!(commander.set_power("tasmota_of", PowerState::Off).await.is_ok());
        assert!(commander.toggle_power("tasmota_of").await.is_ok());
    }

    #[tokio::test]
    async fn controller_runs_on_bus() {
        let port = get_test_port();
        start_mock_broker(port).await;

        let config = ControllerConfig::default()
            .with_reconcile_interval(Duration::from_millis(100))
            .with_heartbeat_interval(Duration::from_millis(100));
        let (bus, messages) = MqttBus::builder()
            .host("127.0.0.1")
            .port(port)
            .client_id("brigid_controller")
            .topics(config.subscriptions())
            .build()
            .await
            .unwrap();

        let controller = Controller::new(config, office_zones(), bus.clone());
        let handle = controller.spawn(messages);

        sleep(Duration::from_millis(350)).await;
        handle.shutdown().await;

        let health = controller.health(chrono::Utc::now());
        assert!(health.ingestion_age.is_some());
        // No temperature has arrived, so every cycle was skipped
        assert!(health.reconciliation_age.is_none());

        bus.disconnect().await.unwrap();
    }
}

// ============================================================================
// Delivery Tests
// ============================================================================

mod bus_delivery {
    use super::*;

    #[tokio::test]
    async fn sensor_report_drives_outlet_command() {
        let port = get_test_port();
        let sessions = start_inspectable_broker(port).await;

        let config =
            ControllerConfig::default().with_reconcile_interval(Duration::from_millis(200));
        let topics = config.subscriptions();
        let (bus, messages) = MqttBus::builder()
            .host("127.0.0.1")
            .port(port)
            .client_id("brigid_delivery")
            .topics(topics.clone())
            .build()
            .await
            .unwrap();
        wait_for_subscriptions(&sessions, "brigid_delivery", topics.len()).await;

        let (field, mut commands) =
            field_client(port, "field_delivery", Some("outlet/cmnd/+/Power")).await;

        let controller = Controller::new(config, office_zones(), bus.clone());
        let handle = controller.spawn(messages);

        // 26.67 °C is 80.01 °F, above the office target of 78 °F
        field
            .publish(OFFICE_SENSOR_TOPIC, QoS::AtMostOnce, false, r#"{"temperature":26.67}"#)
            .await
            .unwrap();

        let command = next_on_topic(&mut commands, OFFICE_COMMAND_TOPIC).await;
        assert_eq!(command.as_deref(), Some("ON"));

        handle.shutdown().await;

        let status = controller.zone_status();
        assert_eq!(status[0].temperature_f, Some(80.01));
        assert!(controller.health(chrono::Utc::now()).reconciliation_age.is_some());

        bus.disconnect().await.unwrap();
    }
}
