// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Periodic reconciliation of zone policy against device state.
//!
//! Each cycle is a two-phase fold over the zone catalog:
//!
//! 1. [`collect_directives`]: every zone with readings classifies itself
//!    (too hot, too cold, in range) and appends its directives to each of
//!    its outlets.
//! 2. [`resolve_all`]: each outlet's directives reduce to one power state;
//!    the lowest severity wins, so any too-cold zone turns an outlet off.
//!
//! [`Reconciler::run_cycle`] then publishes a command to every outlet that
//! is not manually locked.
//!
//! | Directive | Severity | Power |
//! |-----------|----------|-------|
//! | `TOO_COLD` | 1 | `OFF` |
//! | `IN_RANGE` | 2 | `OFF` |
//! | `TOO_HOT` | 3 | `ON` |

mod directive;
mod engine;

pub use directive::{OutletDirective, resolve, zone_directives};
pub use engine::{
    CycleReport, DirectivePlan, IssuedCommand, Reconciler, collect_directives, resolve_all,
    zone_readings,
};
