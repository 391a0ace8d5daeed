// Resource slots
//
// When a driver hands a resource to the kernel (an irq number, a private data
// pointer) the model remembers it under a slot name, and callbacks later check
// they were given back the same value.

use std::collections::BTreeMap;

use envmodel_error::{PropertyId, ViolationKind};
use tracing::debug;

use crate::state::ModelState;

/// Values stored per slot name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceSlots {
    values: BTreeMap<&'static str, u64>,
}

impl ResourceSlots {
    pub fn get(&self, slot: &str) -> Option<u64> {
        self.values.get(slot).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl ModelState {
    /// Remember `value` under `slot`, replacing any earlier value.
    pub fn store_resource(&mut self, slot: &'static str, value: u64) {
        debug!(slot, value, "resource stored");
        self.slots.values.insert(slot, value);
    }

    /// Check that a callback received the value stored under `slot`.
    pub fn check_resource(&mut self, slot: &'static str, value: u64) -> bool {
        match self.slots.get(slot) {
            Some(stored) if stored == value => true,
            Some(stored) => {
                self.raise(
                    ViolationKind::ContractViolation,
                    PropertyId::slot(slot, "mismatch"),
                    format!("slot `{}` holds {:#x}, callback got {:#x}", slot, stored, value),
                );
                false
            }
            None => {
                self.raise(
                    ViolationKind::ContractViolation,
                    PropertyId::slot(slot, "unset"),
                    format!("slot `{}` checked before anything was stored", slot),
                );
                false
            }
        }
    }
}
