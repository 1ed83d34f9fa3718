// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Outlet command definitions.
//!
//! A command knows which topic it goes to (relative to a [`TopicScheme`])
//! and what payload it carries. Commands are fire-and-forget: nothing waits
//! for the outlet to acknowledge them.
//!
//! # Examples
//!
//! ```
//! use brigid::command::{Command, PowerCommand};
//! use brigid::telemetry::TopicScheme;
//! use brigid::types::PowerState;
//!
//! let scheme = TopicScheme::default();
//!
//! let on = PowerCommand::set("tasmota_of", PowerState::On);
//! assert_eq!(on.topic(&scheme), "outlet/cmnd/tasmota_of/Power");
//! assert_eq!(on.payload(), "ON");
//!
//! let toggle = PowerCommand::toggle("tasmota_of");
//! assert_eq!(toggle.payload(), "toggle");
//! ```

mod commander;
mod power;

pub use commander::OutletCommander;
pub use power::PowerCommand;

use crate::telemetry::TopicScheme;

/// A command that can be published to an outlet.
pub trait Command {
    /// Returns the topic the command is published on.
    fn topic(&self, scheme: &TopicScheme) -> String;

    /// Returns the literal payload.
    fn payload(&self) -> &'static str;
}
