// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::command::{Command, PowerCommand};
use crate::error::ProtocolError;
use crate::protocol::CommandPublisher;
use crate::telemetry::TopicScheme;
use crate::types::PowerState;

/// Issues power commands to outlets over a [`CommandPublisher`].
///
/// The commander does not wait for, or check, the outlet's resulting state.
#[derive(Debug)]
pub struct OutletCommander<P> {
    publisher: P,
    scheme: TopicScheme,
}

impl<P: CommandPublisher> OutletCommander<P> {
    /// Creates a commander publishing through `publisher`.
    #[must_use]
    pub fn new(publisher: P, scheme: TopicScheme) -> Self {
        Self { publisher, scheme }
    }

    /// Returns the underlying publisher.
    #[must_use]
    pub fn publisher(&self) -> &P {
        &self.publisher
    }

    /// Sends any command.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError` if the publisher rejects the message.
    pub async fn send<C: Command + Sync>(&self, command: &C) -> Result<(), ProtocolError> {
        let topic = command.topic(&self.scheme);
        let payload = command.payload();
        self.publisher.publish(&topic, payload).await?;
        tracing::info!(topic = %topic, payload, "Command published");
        Ok(())
    }

    /// Sets an outlet's relay to `state`.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError` if the publisher rejects the message.
    pub async fn set_power(&self, outlet_id: &str, state: PowerState) -> Result<(), ProtocolError> {
        self.send(&PowerCommand::set(outlet_id, state)).await
    }

    /// Flips an outlet's relay.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError` if the publisher rejects the message.
    pub async fn toggle_power(&self, outlet_id: &str) -> Result<(), ProtocolError> {
        self.send(&PowerCommand::toggle(outlet_id)).await
    }
}
