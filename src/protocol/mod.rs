// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Message bus plumbing.
//!
//! Inbound traffic arrives as [`BusMessage`]s on a tokio `mpsc` channel;
//! outbound commands go through a [`CommandPublisher`].
//!
//! # Transports
//!
//! - [`MqttBus`]: MQTT connection (requires the `mqtt` feature)
//! - [`RecordingPublisher`]: in-memory publisher for dry runs and tests

#[cfg(feature = "mqtt")]
mod mqtt_bus;
mod recording;

#[cfg(feature = "mqtt")]
pub use mqtt_bus::{MqttBus, MqttBusBuilder};
pub use recording::{PublishedMessage, RecordingPublisher};

use std::future::Future;
use std::sync::Arc;

use crate::error::ProtocolError;

/// A raw message received from the bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusMessage {
    /// The topic the message was published on.
    pub topic: String,
    /// The raw payload bytes.
    pub payload: Vec<u8>,
}

impl BusMessage {
    /// Creates a message.
    #[must_use]
    pub fn new(topic: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
        }
    }
}

/// Something that can publish a payload on a topic.
///
/// Publishing is fire-and-forget: a successful return means the message was
/// handed to the transport, not that any device acted on it.
pub trait CommandPublisher: Send + Sync {
    /// Publishes `payload` on `topic`.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError` if the transport rejects the message.
    fn publish(
        &self,
        topic: &str,
        payload: &str,
    ) -> impl Future<Output = Result<(), ProtocolError>> + Send;
}

impl<P: CommandPublisher> CommandPublisher for Arc<P> {
    fn publish(
        &self,
        topic: &str,
        payload: &str,
    ) -> impl Future<Output = Result<(), ProtocolError>> + Send {
        P::publish(self, topic, payload)
    }
}
