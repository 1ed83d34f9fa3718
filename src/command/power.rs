// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Power control commands.

use crate::command::Command;
use crate::telemetry::TopicScheme;
use crate::types::PowerState;

/// Command to switch an outlet's relay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PowerCommand {
    outlet_id: String,
    state: PowerState,
}

impl PowerCommand {
    /// Creates a command setting `outlet_id` to `state`.
    #[must_use]
    pub fn set(outlet_id: impl Into<String>, state: PowerState) -> Self {
        Self {
            outlet_id: outlet_id.into(),
            state,
        }
    }

    /// Creates a command turning `outlet_id` on.
    #[must_use]
    pub fn on(outlet_id: impl Into<String>) -> Self {
        Self::set(outlet_id, PowerState::On)
    }

    /// Creates a command turning `outlet_id` off.
    #[must_use]
    pub fn off(outlet_id: impl Into<String>) -> Self {
        Self::set(outlet_id, PowerState::Off)
    }

    /// Creates a command flipping `outlet_id`.
    #[must_use]
    pub fn toggle(outlet_id: impl Into<String>) -> Self {
        Self::set(outlet_id, PowerState::Toggle)
    }

    /// The target outlet.
    #[must_use]
    pub fn outlet_id(&self) -> &str {
        &self.outlet_id
    }

    /// The requested state.
    #[must_use]
    pub const fn state(&self) -> PowerState {
        self.state
    }
}

impl Command for PowerCommand {
    fn topic(&self, scheme: &TopicScheme) -> String {
        scheme.command_topic(&self.outlet_id)
    }

    fn payload(&self) -> &'static str {
        self.state.as_str()
    }
}
