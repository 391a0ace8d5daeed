// Run state
//
// Everything one simulated module load owns. A fresh `ModelState` is built
// per explored path and threaded by exclusive borrow through every transition.

use std::collections::BTreeMap;

use envmodel_error::{PropertyId, ViolationKind};

use crate::cell::{ResourceCell, ResourceClass, ResourceId, ResourceState};
use crate::channel::{AssertionChannel, Signal};
use crate::guard::CallbackGuard;
use crate::slots::ResourceSlots;

/// State of one simulated run
#[derive(Debug, Clone, Default)]
pub struct ModelState {
    pub(crate) cells: BTreeMap<ResourceId, ResourceCell>,
    pub(crate) guards: BTreeMap<&'static str, CallbackGuard>,
    pub(crate) slots: ResourceSlots,
    pub(crate) channel: AssertionChannel,
    pub(crate) finalized: bool,
}

impl ModelState {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cell for `class`/`instance`, created at rest on first use.
    pub(crate) fn cell_mut(&mut self, class: &ResourceClass, instance: Option<u64>) -> &mut ResourceCell {
        let id = class.id(instance);
        self.cells
            .entry(id)
            .or_insert_with(|| ResourceCell::new(id, class.discipline))
    }

    pub fn cell(&self, id: &ResourceId) -> Option<&ResourceCell> {
        self.cells.get(id)
    }

    pub fn cells(&self) -> impl Iterator<Item = &ResourceCell> {
        self.cells.values()
    }

    /// Current state of a cell; untouched cells read as their rest value.
    pub fn read(&self, class: &ResourceClass, instance: Option<u64>) -> ResourceState {
        self.cells
            .get(&class.id(instance))
            .map(ResourceCell::read)
            .unwrap_or_else(|| class.rest_state())
    }

    /// Outstanding acquisitions of a cell.
    pub fn count(&self, class: &ResourceClass, instance: Option<u64>) -> u32 {
        self.read(class, instance).outstanding()
    }

    pub fn channel(&self) -> &AssertionChannel {
        &self.channel
    }

    pub fn channel_mut(&mut self) -> &mut AssertionChannel {
        &mut self.channel
    }

    pub fn slots(&self) -> &ResourceSlots {
        &self.slots
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// Shorthand for `channel_mut().assert_named(..)`.
    pub fn assert_named(&mut self, id: PropertyId, condition: bool) -> bool {
        self.channel.assert_named(id, condition)
    }

    pub fn raise(&mut self, kind: ViolationKind, id: PropertyId, message: impl Into<String>) {
        self.channel.raise(kind, id, message)
    }

    pub fn signals(&self) -> &[Signal] {
        self.channel.signals()
    }

    /// Tear the run down, keeping only what it reported.
    pub fn into_signals(self) -> Vec<Signal> {
        self.channel.into_signals()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REFS: ResourceClass = ResourceClass::stacking("refs");

    #[test]
    fn untouched_cells_read_at_rest() {
        let state = ModelState::new();
        assert_eq!(state.read(&REFS, Some(7)), ResourceState::Count(0));
        assert_eq!(state.count(&REFS, None), 0);
        assert_eq!(state.cells().count(), 0);
        assert!(!state.is_finalized());
    }

    #[test]
    fn cells_are_created_per_instance() {
        let mut state = ModelState::new();
        state.cell_mut(&REFS, Some(1)).advance();
        state.cell_mut(&REFS, Some(2));

        assert_eq!(state.count(&REFS, Some(1)), 1);
        assert_eq!(state.count(&REFS, Some(2)), 0);
        assert_eq!(state.cells().count(), 2);
        assert!(state.cell(&REFS.id(Some(2))).is_some_and(ResourceCell::is_rest));
    }
}
