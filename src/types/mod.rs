// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Value types shared by the classifier, the store and the control surface.
//!
//! # Types
//!
//! - [`PowerState`] - ON/OFF/toggle payloads for outlet commands
//! - [`LockState`] - Manual override flag for an outlet
//! - [`DeviceDateTime`] - Timestamps reported by devices in their payloads

mod datetime;
mod lock;
mod power;

pub use datetime::{DateTimeParseError, DeviceDateTime};
pub use lock::LockState;
pub use power::PowerState;
