// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::future::Future;

use parking_lot::Mutex;

use crate::error::ProtocolError;
use crate::protocol::CommandPublisher;

/// A message captured by [`RecordingPublisher`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedMessage {
    /// Topic the message was published on.
    pub topic: String,
    /// Payload text.
    pub payload: String,
}

/// Publisher that keeps every message in memory instead of sending it.
///
/// Useful as a dry-run transport, and for asserting on issued commands.
///
/// # Examples
///
/// ```
/// use brigid::protocol::{CommandPublisher, RecordingPublisher};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let recorder = RecordingPublisher::new();
/// recorder.publish("outlet/cmnd/tasmota_of/Power", "ON").await.unwrap();
///
/// let sent = recorder.take();
/// assert_eq!(sent[0].payload, "ON");
/// assert!(recorder.published().is_empty());
/// # }
/// ```
#[derive(Debug, Default)]
pub struct RecordingPublisher {
    messages: Mutex<Vec<PublishedMessage>>,
}

impl RecordingPublisher {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of everything published so far.
    #[must_use]
    pub fn published(&self) -> Vec<PublishedMessage> {
        self.messages.lock().clone()
    }

    /// Removes and returns everything published so far.
    pub fn take(&self) -> Vec<PublishedMessage> {
        std::mem::take(&mut *self.messages.lock())
    }
}

impl CommandPublisher for RecordingPublisher {
    fn publish(
        &self,
        topic: &str,
        payload: &str,
    ) -> impl Future<Output = Result<(), ProtocolError>> + Send {
        tracing::debug!(topic = %topic, payload = %payload, "Recorded publish");
        self.messages.lock().push(PublishedMessage {
            topic: topic.to_string(),
            payload: payload.to_string(),
        });
        std::future::ready(Ok(()))
    }
}
