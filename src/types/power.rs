// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Power states understood by Tasmota outlets.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::ValueError;

/// Power payload sent to, or reported by, an outlet.
///
/// # Examples
///
/// ```
/// use brigid::types::PowerState;
///
/// assert_eq!(PowerState::On.as_str(), "ON");
/// assert_eq!(PowerState::Off.as_str(), "OFF");
/// assert_eq!(PowerState::Toggle.as_str(), "toggle");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum PowerState {
    /// Power is off.
    Off,
    /// Power is on.
    On,
    /// Flip the current power state, whatever it is.
    Toggle,
}

impl PowerState {
    /// Returns the literal bus payload for this state.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Off => "OFF",
            Self::On => "ON",
            Self::Toggle => "toggle",
        }
    }

    /// Returns `Some(true)` for on, `Some(false)` for off and `None` for toggle.
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Off => Some(false),
            Self::On => Some(true),
            Self::Toggle => None,
        }
    }
}

impl fmt::Display for PowerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PowerState {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "OFF" | "0" | "FALSE" => Ok(Self::Off),
            "ON" | "1" | "TRUE" => Ok(Self::On),
            "TOGGLE" | "2" => Ok(Self::Toggle),
            _ => Err(ValueError::InvalidPowerState(s.to_string())),
        }
    }
}

impl From<bool> for PowerState {
    fn from(value: bool) -> Self {
        if value { Self::On } else { Self::Off }
    }
}
