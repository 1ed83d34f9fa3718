// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Per-zone classification of readings and per-outlet resolution.

use std::fmt;

use serde::Serialize;

use crate::types::PowerState;

/// A zone's verdict for one outlet in one cycle.
///
/// The discriminants are severities: the lowest one present for an outlet
/// wins, so cold always beats heat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum OutletDirective {
    /// A reading is below the zone floor.
    TooCold = 1,
    /// A reading is within `[floor, target]`.
    InRange = 2,
    /// A reading is above the zone target.
    TooHot = 3,
}

impl OutletDirective {
    /// Classifies a single Fahrenheit reading against a zone's band.
    #[must_use]
    pub fn classify(reading_f: f64, target_temp_f: i32, floor_temp_f: i32) -> Self {
        if reading_f > f64::from(target_temp_f) {
            Self::TooHot
        } else if reading_f < f64::from(floor_temp_f) {
            Self::TooCold
        } else {
            Self::InRange
        }
    }

    /// Numeric severity (1 = too cold, 2 = in range, 3 = too hot).
    #[must_use]
    pub const fn severity(self) -> u8 {
        self as u8
    }

    /// Power state an outlet should take when this directive wins.
    #[must_use]
    pub const fn power_state(self) -> PowerState {
        match self {
            Self::TooHot => PowerState::On,
            Self::TooCold | Self::InRange => PowerState::Off,
        }
    }
}

impl fmt::Display for OutletDirective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::TooCold => "TOO_COLD",
            Self::InRange => "IN_RANGE",
            Self::TooHot => "TOO_HOT",
        })
    }
}

/// Directives a zone emits for each of its outlets, given its readings.
///
/// Each condition is emitted at most once, in the order too hot, too cold,
/// in range. Sensors that disagree yield several directives.
#[must_use]
pub fn zone_directives(
    readings_f: &[f64],
    target_temp_f: i32,
    floor_temp_f: i32,
) -> Vec<OutletDirective> {
    let present: Vec<OutletDirective> = readings_f
        .iter()
        .map(|&r| OutletDirective::classify(r, target_temp_f, floor_temp_f))
        .collect();

    [
        OutletDirective::TooHot,
        OutletDirective::TooCold,
        OutletDirective::InRange,
    ]
    .into_iter()
    .filter(|d| present.contains(d))
    .collect()
}

/// Reduces an outlet's directives to one power state.
///
/// Returns `None` if there are no directives.
///
/// # Examples
///
/// ```
/// use brigid::reconcile::{OutletDirective, resolve};
/// use brigid::types::PowerState;
///
/// let mixed = [OutletDirective::TooHot, OutletDirective::TooCold];
/// assert_eq!(resolve(&mixed), Some(PowerState::Off));
/// assert_eq!(resolve(&[OutletDirective::TooHot]), Some(PowerState::On));
/// assert_eq!(resolve(&[]), None);
/// ```
#[must_use]
pub fn resolve(directives: &[OutletDirective]) -> Option<PowerState> {
    directives
        .iter()
        .min()
        .map(|directive| directive.power_state())
}
