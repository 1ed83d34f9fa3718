// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! MQTT connection carrying both telemetry and outlet commands.
//!
//! The bus owns a background task that polls the rumqttc event loop. Each
//! time the broker acknowledges a connection it spawns a task that
//! subscribes to every configured topic filter, so subscriptions survive
//! reconnects. The event loop task forwards every incoming publish to the
//! receiver returned by [`MqttBusBuilder::build`].
//!
//! # Examples
//!
//! ```no_run
//! use brigid::protocol::MqttBus;
//! use brigid::ControllerConfig;
//!
//! # async fn example() -> brigid::Result<()> {
//! let config = ControllerConfig::default();
//! let (bus, messages) = MqttBus::builder()
//!     .host("192.168.1.50")
//!     .credentials("user", "password")
//!     .topics(config.subscriptions())
//!     .build()
//!     .await?;
//!
//! assert!(bus.is_connected());
//! # drop(messages);
//! bus.disconnect().await?;
//! # Ok(())
//! # }
//! ```

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use rumqttc::{AsyncClient, EventLoop, MqttOptions, QoS};
use tokio::sync::{mpsc, oneshot, watch};

use crate::error::ProtocolError;
use crate::protocol::{BusMessage, CommandPublisher};

/// Capacity of the inbound message channel.
const MESSAGE_CHANNEL_CAPACITY: usize = 256;

/// Configuration for an MQTT bus connection.
#[derive(Debug, Clone)]
pub struct MqttBusConfig {
    host: String,
    port: u16,
    credentials: Option<(String, String)>,
    keep_alive: Duration,
    connection_timeout: Duration,
    reconnect_delay: Duration,
    client_id: String,
    topics: Vec<String>,
}

impl Default for MqttBusConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: 1883,
            credentials: None,
            keep_alive: Duration::from_secs(30),
            connection_timeout: Duration::from_secs(10),
            reconnect_delay: Duration::from_secs(5),
            client_id: "brigid".to_string(),
            topics: Vec::new(),
        }
    }
}

/// A live MQTT connection.
///
/// `MqttBus` is cheaply cloneable (via `Arc`); clones share the connection.
#[derive(Clone)]
pub struct MqttBus {
    inner: Arc<MqttBusInner>,
}

struct MqttBusInner {
    client: AsyncClient,
    config: MqttBusConfig,
    connected: AtomicBool,
    shutdown: watch::Sender<bool>,
}

impl MqttBus {
    /// Creates a new builder for configuring the connection.
    #[must_use]
    pub fn builder() -> MqttBusBuilder {
        MqttBusBuilder::default()
    }

    /// Returns whether the broker connection is currently up.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.inner.connected.load(Ordering::Acquire)
    }

    /// Returns the host address of the broker.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.inner.config.host
    }

    /// Returns the port of the broker.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.inner.config.port
    }

    /// Returns the topic filters subscribed on every connect.
    #[must_use]
    pub fn topics(&self) -> &[String] {
        &self.inner.config.topics
    }

    /// Stops the event loop task and disconnects from the broker.
    ///
    /// The message receiver sees the channel close once the task exits.
    ///
    /// # Errors
    ///
    /// Returns error if the disconnect request cannot be queued.
    pub async fn disconnect(&self) -> Result<(), ProtocolError> {
        tracing::info!(
            host = %self.inner.config.host,
            port = %self.inner.config.port,
            "Disconnecting from MQTT broker"
        );

        let result = self
            .inner
            .client
            .disconnect()
            .await
            .map_err(ProtocolError::Mqtt);
        self.inner.shutdown.send_replace(true);
        self.inner.connected.store(false, Ordering::Release);
        result
    }

    /// Queues a subscribe for every topic filter from a separate task.
    ///
    /// The event loop task drains the request queue, so it must never wait
    /// on it.
    fn subscribe_all(&self) {
        tokio::spawn(resubscribe(
            self.inner.client.clone(),
            self.inner.config.topics.clone(),
        ));
    }
}

/// Subscribes to every filter, waiting for room in the request queue.
async fn resubscribe(client: AsyncClient, topics: Vec<String>) {
    for topic in topics {
        match client.subscribe(topic.as_str(), QoS::AtMostOnce).await {
            Ok(()) => tracing::debug!(topic = %topic, "Subscribing"),
            Err(e) => {
                tracing::error!(topic = %topic, error = %e, "Failed to subscribe");
                return;
            }
        }
    }
}

impl CommandPublisher for MqttBus {
    fn publish(
        &self,
        topic: &str,
        payload: &str,
    ) -> impl Future<Output = Result<(), ProtocolError>> + Send {
        let client = self.inner.client.clone();
        let topic = topic.to_string();
        let payload = payload.to_string();
        async move {
            client
                .publish(topic, QoS::AtMostOnce, false, payload)
                .await
                .map_err(ProtocolError::Mqtt)
        }
    }
}

impl std::fmt::Debug for MqttBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MqttBus")
            .field("host", &self.inner.config.host)
            .field("port", &self.inner.config.port)
            .field("connected", &self.is_connected())
            .finish()
    }
}

/// Builder for an [`MqttBus`].
///
/// # Examples
///
/// ```no_run
/// use brigid::protocol::MqttBus;
/// use std::time::Duration;
///
/// # async fn example() -> brigid::Result<()> {
/// let (bus, messages) = MqttBus::builder()
///     .host("192.168.1.50")
///     .port(1883)
///     .client_id("brigid-test")
///     .topic("outlet/stat/+/POWER")
///     .keep_alive(Duration::from_secs(60))
///     .reconnect_delay(Duration::from_secs(1))
///     .build()
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct MqttBusBuilder {
    config: MqttBusConfig,
}

impl MqttBusBuilder {
    /// Sets the broker host address.
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    /// Sets the broker port (default: 1883).
    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Sets authentication credentials.
    #[must_use]
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.config.credentials = Some((username.into(), password.into()));
        self
    }

    /// Sets the keep-alive interval (default: 30 seconds).
    #[must_use]
    pub fn keep_alive(mut self, duration: Duration) -> Self {
        self.config.keep_alive = duration;
        self
    }

    /// Sets the connection timeout (default: 10 seconds).
    #[must_use]
    pub fn connection_timeout(mut self, duration: Duration) -> Self {
        self.config.connection_timeout = duration;
        self
    }

    /// Sets the pause after a transport error before polling again
    /// (default: 5 seconds).
    #[must_use]
    pub fn reconnect_delay(mut self, duration: Duration) -> Self {
        self.config.reconnect_delay = duration;
        self
    }

    /// Sets the MQTT client id (default: `brigid`).
    #[must_use]
    pub fn client_id(mut self, id: impl Into<String>) -> Self {
        self.config.client_id = id.into();
        self
    }

    /// Adds one topic filter to subscribe to.
    #[must_use]
    pub fn topic(mut self, filter: impl Into<String>) -> Self {
        self.config.topics.push(filter.into());
        self
    }

    /// Replaces the topic filters to subscribe to.
    #[must_use]
    pub fn topics<I, S>(mut self, filters: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.topics = filters.into_iter().map(Into::into).collect();
        self
    }

    /// Connects to the broker and starts the event loop task.
    ///
    /// Returns the bus and the receiver of incoming messages.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Host is not set
    /// - Connection fails
    /// - Connection times out
    pub async fn build(self) -> Result<(MqttBus, mpsc::Receiver<BusMessage>), ProtocolError> {
        if self.config.host.is_empty() {
            return Err(ProtocolError::InvalidAddress(
                "MQTT broker host is required".to_string(),
            ));
        }

        let mut mqtt_options =
            MqttOptions::new(&self.config.client_id, &self.config.host, self.config.port);
        mqtt_options.set_keep_alive(self.config.keep_alive);
        mqtt_options.set_clean_session(true);

        if let Some((ref username, ref password)) = self.config.credentials {
            mqtt_options.set_credentials(username, password);
        }

        let (client, event_loop) = AsyncClient::new(mqtt_options, 10);
        let (shutdown, shutdown_rx) = watch::channel(false);

        let bus = MqttBus {
            inner: Arc::new(MqttBusInner {
                client,
                config: self.config.clone(),
                connected: AtomicBool::new(false),
                shutdown,
            }),
        };

        let (message_tx, message_rx) = mpsc::channel(MESSAGE_CHANNEL_CAPACITY);
        let (connack_tx, connack_rx) = oneshot::channel();

        let bus_clone = bus.clone();
        tokio::spawn(async move {
            handle_bus_events(event_loop, bus_clone, message_tx, shutdown_rx, connack_tx).await;
        });

        let timeout = self.config.connection_timeout;
        match tokio::time::timeout(timeout, connack_rx).await {
            Ok(Ok(())) => {
                tracing::info!(
                    host = %self.config.host,
                    port = %self.config.port,
                    topics = self.config.topics.len(),
                    "Connected to MQTT broker"
                );
                Ok((bus, message_rx))
            }
            Ok(Err(_)) => {
                bus.inner.shutdown.send_replace(true);
                Err(ProtocolError::ConnectionFailed(
                    "MQTT event loop terminated unexpectedly".to_string(),
                ))
            }
            Err(_) => {
                bus.inner.shutdown.send_replace(true);
                Err(ProtocolError::ConnectionFailed(format!(
                    "MQTT connection timeout after {}s",
                    timeout.as_secs()
                )))
            }
        }
    }
}

/// Polls the event loop until shutdown or until the receiver is dropped.
///
/// Transport errors are logged and followed by a pause; the next poll
/// reconnects.
async fn handle_bus_events(
    mut event_loop: EventLoop,
    bus: MqttBus,
    message_tx: mpsc::Sender<BusMessage>,
    mut shutdown: watch::Receiver<bool>,
    connack_tx: oneshot::Sender<()>,
) {
    use rumqttc::{Event, Packet};

    let mut connack_tx = Some(connack_tx);
    let reconnect_delay = bus.inner.config.reconnect_delay;

    loop {
        let event = tokio::select! {
            _ = shutdown.changed() => break,
            event = event_loop.poll() => event,
        };

        match event {
            Ok(Event::Incoming(Packet::ConnAck(connack))) => {
                tracing::debug!(?connack, "MQTT broker connected");
                bus.inner.connected.store(true, Ordering::Release);
                bus.subscribe_all();
                if let Some(tx) = connack_tx.take() {
                    let _ = tx.send(());
                }
            }
            Ok(Event::Incoming(Packet::SubAck(suback))) => {
                tracing::debug!(?suback, "MQTT subscription acknowledged");
            }
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                tracing::trace!(
                    topic = %publish.topic,
                    bytes = publish.payload.len(),
                    "MQTT message received"
                );
                let message = BusMessage::new(publish.topic, publish.payload.to_vec());
                if message_tx.send(message).await.is_err() {
                    tracing::debug!("Message receiver dropped, stopping MQTT event loop");
                    break;
                }
            }
            Ok(Event::Incoming(Packet::Disconnect)) => {
                tracing::warn!("MQTT broker sent disconnect");
                bus.inner.connected.store(false, Ordering::Release);
            }
            Ok(_) => {}
            Err(e) => {
                bus.inner.connected.store(false, Ordering::Release);
                if *shutdown.borrow() {
                    break;
                }
                tracing::error!(
                    error = %e,
                    retry_in_s = reconnect_delay.as_secs(),
                    "MQTT event loop error"
                );
                tokio::select! {
                    _ = shutdown.changed() => break,
                    () = tokio::time::sleep(reconnect_delay) => {}
                }
            }
        }
    }

    bus.inner.connected.store(false, Ordering::Release);
    tracing::debug!("MQTT event loop stopped");
}
