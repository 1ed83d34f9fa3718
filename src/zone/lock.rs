// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::types::LockState;

/// Per-outlet manual override flags.
///
/// Outlets never set are [`LockState::Disengaged`].
///
/// # Examples
///
/// ```
/// use brigid::types::LockState;
/// use brigid::zone::ManualLockRegistry;
///
/// let locks = ManualLockRegistry::new();
/// assert!(!locks.is_engaged("tasmota_of"));
///
/// locks.set("tasmota_of", LockState::Engaged);
/// assert!(locks.is_engaged("tasmota_of"));
/// ```
#[derive(Debug, Default)]
pub struct ManualLockRegistry {
    locks: RwLock<HashMap<String, LockState>>,
}

impl ManualLockRegistry {
    /// Creates a registry with every outlet disengaged.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the lock state of `outlet_id`, returning the previous state.
    pub fn set(&self, outlet_id: impl Into<String>, state: LockState) -> LockState {
        let outlet_id = outlet_id.into();
        tracing::info!(outlet = %outlet_id, lock = %state, "Manual lock changed");
        self.locks
            .write()
            .insert(outlet_id, state)
            .unwrap_or_default()
    }

    /// Returns the lock state of `outlet_id`.
    #[must_use]
    pub fn get(&self, outlet_id: &str) -> LockState {
        self.locks
            .read()
            .get(outlet_id)
            .copied()
            .unwrap_or_default()
    }

    /// Returns true if `outlet_id` is locked.
    #[must_use]
    pub fn is_engaged(&self, outlet_id: &str) -> bool {
        self.get(outlet_id).is_engaged()
    }
}
