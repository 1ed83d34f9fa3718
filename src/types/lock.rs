// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValueError;

/// Manual override flag for a single outlet.
///
/// While a lock is engaged, reconciliation computes a decision for the outlet
/// but never publishes it.
///
/// The control surface historically used `ON`/`OFF` for engaged/disengaged,
/// so both vocabularies parse.
///
/// ```
/// use brigid::types::LockState;
///
/// assert_eq!("engaged".parse::<LockState>().unwrap(), LockState::Engaged);
/// assert_eq!("OFF".parse::<LockState>().unwrap(), LockState::Disengaged);
/// assert_eq!(LockState::default(), LockState::Disengaged);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LockState {
    /// Automatic control is suspended for the outlet.
    Engaged,
    /// Automatic control is active.
    #[default]
    Disengaged,
}

impl LockState {
    /// Returns `true` when the lock is engaged.
    #[must_use]
    pub const fn is_engaged(self) -> bool {
        matches!(self, Self::Engaged)
    }

    /// Returns the lowercase name of the state.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Engaged => "engaged",
            Self::Disengaged => "disengaged",
        }
    }
}

impl fmt::Display for LockState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LockState {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "engaged" | "on" | "true" | "1" => Ok(Self::Engaged),
            "disengaged" | "off" | "false" | "0" => Ok(Self::Disengaged),
            _ => Err(ValueError::InvalidLockState(s.to_string())),
        }
    }
}
