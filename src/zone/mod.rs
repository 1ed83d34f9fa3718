// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Zones, the zone catalog and manual outlet locks.
//!
//! A [`Zone`] ties temperature sensors to the outlets that heat or cool it,
//! along with the temperature band it should stay in. Zones may share
//! sensors and outlets.

mod catalog;
mod lock;

pub use catalog::{Zone, ZoneCatalog};
pub use lock::ManualLockRegistry;
