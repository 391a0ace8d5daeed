// Finalization check
//
// Runs once at simulated module unload and re-validates that every cell and
// every callback guard is back at rest.

use envmodel_error::{ensure, ModelError, ModelResult, PropertyId, ViolationKind};
use serde::Serialize;
use tracing::{debug, warn};

use crate::cell::{ResourceId, ResourceState};
use crate::guard::{GuardEdge, GuardState};
use crate::state::ModelState;
use crate::transition::ResourceProperty;

/// What the final sweep found dirty
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FinalizationReport {
    pub leaked: Vec<(ResourceId, ResourceState)>,
    pub open_guards: Vec<(&'static str, GuardState)>,
}

impl FinalizationReport {
    pub fn is_clean(&self) -> bool {
        self.leaked.is_empty() && self.open_guards.is_empty()
    }
}

impl ModelState {
    /// Sweep every cell and guard, raising one `LeakAtFinalization` per dirty
    /// item. May only run once per state.
    ///
    /// Leak ids are per class (`resource:<class>:leak`), so keyed instances of
    /// one class share an id. The instance is named in each signal's message
    /// and listed in [`FinalizationReport::leaked`].
    pub fn check_final_state(&mut self) -> ModelResult<FinalizationReport> {
        ensure!(!self.finalized, ModelError::AlreadyFinalized);
        self.finalized = true;

        let leaked: Vec<(ResourceId, ResourceState)> = self
            .cells
            .values()
            .filter(|cell| !cell.is_rest())
            .map(|cell| (cell.id(), cell.read()))
            .collect();

        let open_guards: Vec<(&'static str, GuardState)> = self
            .guards
            .iter()
            .filter(|(_, guard)| guard.state() != GuardState::Unregistered)
            .map(|(name, guard)| (*name, guard.state()))
            .collect();

        for (id, state) in &leaked {
            self.raise(
                ViolationKind::LeakAtFinalization,
                PropertyId::resource(id.class, ResourceProperty::Leak.as_str()),
                format!("{} is {} at exit", id, state),
            );
        }

        for (guard, state) in &open_guards {
            self.raise(
                ViolationKind::LeakAtFinalization,
                GuardEdge::RegisteredAtExit.id(guard),
                format!("guard `{}` is {} at exit", guard, state),
            );
        }

        let report = FinalizationReport { leaked, open_guards };
        if report.is_clean() {
            debug!("final state clean");
        } else {
            warn!(
                leaked = report.leaked.len(),
                open_guards = report.open_guards.len(),
                "final state dirty"
            );
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::ResourceClass;
    use crate::guard::CallbackRole;

    const LOCK: ResourceClass = ResourceClass::exclusive("lock");

    #[test]
    fn clean_run_reports_nothing() {
        let mut state = ModelState::new();
        state.acquire_unconditionally(&LOCK, None);
        state.release(&LOCK, None);

        let report = state.check_final_state().unwrap();
        assert!(report.is_clean());
        assert!(state.channel().is_clean());
    }

    #[test]
    fn fires_once_per_dirty_cell() {
        let mut state = ModelState::new();
        state.acquire_unconditionally(&LOCK, Some(1));
        state.acquire_unconditionally(&LOCK, Some(2));
        state.acquire_unconditionally(&LOCK, Some(3));
        state.release(&LOCK, Some(2));
        state.callback("netdev", CallbackRole::Register);

        let report = state.check_final_state().unwrap();
        assert_eq!(report.leaked.len(), 2);
        assert_eq!(report.open_guards, vec![("netdev", GuardState::Registered)]);
        assert_eq!(state.channel().count(&PropertyId::resource("lock", "leak")), 2);
        assert!(state
            .channel()
            .fired(&PropertyId::callback("netdev", "registered-at-exit")));
        assert_eq!(
            state.channel().of_kind(ViolationKind::LeakAtFinalization).count(),
            3
        );
    }

    #[test]
    fn keyed_leaks_share_the_class_id() {
        let mut state = ModelState::new();
        state.acquire_unconditionally(&LOCK, Some(0x10));
        state.acquire_unconditionally(&LOCK, Some(0x20));

        let report = state.check_final_state().unwrap();
        assert_eq!(
            report.leaked,
            vec![
                (LOCK.id(Some(0x10)), ResourceState::Held),
                (LOCK.id(Some(0x20)), ResourceState::Held),
            ]
        );

        let leak = ResourceProperty::Leak.id(&LOCK);
        let messages: Vec<&str> = state
            .channel()
            .signals()
            .iter()
            .filter(|signal| signal.id() == &leak)
            .map(|signal| signal.violation.message.as_str())
            .collect();
        assert_eq!(messages, vec!["lock@0x10 is held at exit", "lock@0x20 is held at exit"]);
    }

    #[test]
    fn second_check_is_misuse() {
        let mut state = ModelState::new();
        state.check_final_state().unwrap();
        assert_eq!(state.check_final_state(), Err(ModelError::AlreadyFinalized));
        assert!(state.is_finalized());
    }
}
