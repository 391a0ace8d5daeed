// Transition operations
//
// The only code that mutates resource cells. Every precondition is asserted
// through the channel under a stable property identifier, and the run goes on
// after a violation so later assertions stay reachable.

use std::fmt;

use envmodel_error::{ensure, ModelError, ModelResult, PropertyId};
use serde::Serialize;
use tracing::debug;

use crate::cell::{CellFault, Discipline, NullRelease, ResourceClass};
use crate::oracle::{assume, Handle, Pointer, ValueOracle};
use crate::state::ModelState;
use crate::Step;

/// Named properties checked on every resource class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceProperty {
    DoubleAcquire,
    DoubleRelease,
    NullRelease,
    LimitExceeded,
    RetainUnheld,
    Unbalanced,
    Leak,
}

impl ResourceProperty {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceProperty::DoubleAcquire => "double-acquire",
            ResourceProperty::DoubleRelease => "double-release",
            ResourceProperty::NullRelease => "null-release",
            ResourceProperty::LimitExceeded => "limit-exceeded",
            ResourceProperty::RetainUnheld => "retain-unheld",
            ResourceProperty::Unbalanced => "unbalanced",
            ResourceProperty::Leak => "leak",
        }
    }

    pub fn id(&self, class: &ResourceClass) -> PropertyId {
        PropertyId::resource(class.name, self.as_str())
    }
}

impl fmt::Display for ResourceProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How an acquisition interprets the pointer the oracle hands back
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum AcquirePolicy {
    /// Null means failure (`kmalloc`-style)
    MayFail,
    /// The caller's flags guarantee success (`GFP_KERNEL` and friends)
    NeverFails,
    /// Never null; failure is reported with an error pointer (`ERR_PTR`)
    ErrorPointer,
}

impl ModelState {
    /// Acquire through the oracle.
    ///
    /// The acquire precondition is asserted before the oracle is consulted.
    /// On success the cell advances and a handle is returned; on failure the
    /// cell is unchanged and `None` is returned. Oracle answers that the
    /// policy rules out prune the path.
    pub fn acquire(
        &mut self,
        class: &ResourceClass,
        instance: Option<u64>,
        oracle: &mut dyn ValueOracle,
        policy: AcquirePolicy,
    ) -> Step<Option<Handle>> {
        self.check_acquire(class, instance);

        let pointer = oracle.arbitrary_ptr();
        match policy {
            AcquirePolicy::MayFail => assume(!pointer.is_err())?,
            AcquirePolicy::NeverFails => assume(pointer.is_valid())?,
            AcquirePolicy::ErrorPointer => assume(!pointer.is_null())?,
        }

        let handle = Handle::from_pointer(pointer);
        match handle {
            Some(handle) => {
                self.cell_mut(class, instance).advance();
                debug!(resource = %class.id(instance), %pointer, "acquired");
                Ok(Some(handle))
            }
            None => {
                debug!(resource = %class.id(instance), %pointer, ?policy, "acquisition failed");
                Ok(None)
            }
        }
    }

    /// Acquire a resource that cannot fail (locks). Returns whether the
    /// precondition held.
    pub fn acquire_unconditionally(&mut self, class: &ResourceClass, instance: Option<u64>) -> bool {
        let ok = self.check_acquire(class, instance);
        self.cell_mut(class, instance).advance();
        debug!(resource = %class.id(instance), "acquired");
        ok
    }

    /// Trylock-style acquisition: the precondition is asserted, then the
    /// oracle decides whether the resource was available. A nonzero answer
    /// means it was and the cell advances.
    pub fn try_acquire(
        &mut self,
        class: &ResourceClass,
        instance: Option<u64>,
        oracle: &mut dyn ValueOracle,
    ) -> bool {
        self.check_acquire(class, instance);

        if oracle.arbitrary_int() != 0 {
            self.cell_mut(class, instance).advance();
            debug!(resource = %class.id(instance), "try-acquire succeeded");
            true
        } else {
            debug!(resource = %class.id(instance), "try-acquire failed");
            false
        }
    }

    /// Take another reference on a stacking resource that must already be
    /// held (`usb_get_urb`, `kref_get`). A reference on an unheld resource is
    /// reported and the count still advances.
    pub fn retain(&mut self, class: &ResourceClass, instance: Option<u64>) -> ModelResult<()> {
        ensure!(
            matches!(
                class.discipline,
                Discipline::Stacking { .. } | Discipline::Counting { .. }
            ),
            ModelError::unsupported(class.name, "retain")
        );

        let held = !self.cell_mut(class, instance).is_rest();
        self.assert_named(ResourceProperty::RetainUnheld.id(class), held);
        self.check_acquire(class, instance);
        self.cell_mut(class, instance).advance();
        debug!(resource = %class.id(instance), count = self.count(class, instance), "retained");
        Ok(())
    }

    /// Release one acquisition. Releasing a resource at rest is a double
    /// release and leaves the cell unchanged.
    pub fn release(&mut self, class: &ResourceClass, instance: Option<u64>) -> bool {
        let cell = self.cell_mut(class, instance);
        match cell.can_release() {
            Ok(()) => {
                cell.retreat();
                debug!(resource = %class.id(instance), "released");
                true
            }
            Err(_) => {
                self.assert_named(ResourceProperty::DoubleRelease.id(class), false);
                false
            }
        }
    }

    /// Release through a handle the driver passes back. Null follows the
    /// class's null-release rule; error pointers are never releasable.
    pub fn release_handle(&mut self, class: &ResourceClass, instance: Option<u64>, pointer: Pointer) -> bool {
        if pointer.is_null() {
            return match class.null_release {
                NullRelease::NoOp => {
                    debug!(resource = %class.id(instance), "null release ignored");
                    true
                }
                NullRelease::Violation => self.assert_named(ResourceProperty::NullRelease.id(class), false),
            };
        }
        if pointer.is_err() {
            return self.assert_named(ResourceProperty::NullRelease.id(class), false);
        }
        self.release(class, instance)
    }

    /// Assert a resource is at rest at this point of the run.
    pub fn check_balanced(&mut self, class: &ResourceClass, instance: Option<u64>) -> bool {
        let at_rest = self.read(class, instance).is_rest();
        self.assert_named(ResourceProperty::Unbalanced.id(class), at_rest)
    }

    fn check_acquire(&mut self, class: &ResourceClass, instance: Option<u64>) -> bool {
        match self.cell_mut(class, instance).can_acquire() {
            Ok(()) => true,
            Err(CellFault::LimitReached(_)) => {
                self.assert_named(ResourceProperty::LimitExceeded.id(class), false)
            }
            Err(_) => self.assert_named(ResourceProperty::DoubleAcquire.id(class), false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::ResourceState;
    use crate::oracle::MockValueOracle;
    use crate::Halt;

    const REQUEST: ResourceClass = ResourceClass::exclusive("request");
    const URB: ResourceClass = ResourceClass::stacking("urb").allowing_null_release();
    const PAGES: ResourceClass = ResourceClass::stacking("pages").with_limit(1);

    fn oracle_returning(pointer: Pointer) -> MockValueOracle {
        let mut oracle = MockValueOracle::new();
        oracle.expect_arbitrary_ptr().times(1).return_const(pointer);
        oracle
    }

    #[test]
    fn acquire_success_advances_and_returns_handle() {
        let mut state = ModelState::new();
        let mut oracle = oracle_returning(Pointer::Addr(0x40));

        let handle = state
            .acquire(&REQUEST, None, &mut oracle, AcquirePolicy::MayFail)
            .unwrap();
        assert_eq!(handle.map(|h| h.address()), Some(0x40));
        assert_eq!(state.read(&REQUEST, None), ResourceState::Held);
        assert!(state.channel().is_clean());
    }

    #[test]
    fn acquire_failure_leaves_state_unchanged() {
        let mut state = ModelState::new();
        let mut oracle = oracle_returning(Pointer::Null);

        let handle = state
            .acquire(&REQUEST, None, &mut oracle, AcquirePolicy::MayFail)
            .unwrap();
        assert!(handle.is_none());
        assert_eq!(state.read(&REQUEST, None), ResourceState::Free);
    }

    #[test]
    fn never_fails_prunes_null_answers() {
        let mut state = ModelState::new();
        let mut oracle = oracle_returning(Pointer::Null);

        let outcome = state.acquire(&REQUEST, None, &mut oracle, AcquirePolicy::NeverFails);
        assert_eq!(outcome, Err(Halt::Infeasible));
        assert_eq!(state.read(&REQUEST, None), ResourceState::Free);
    }

    #[test]
    fn error_pointer_policy_reports_failure_without_null() {
        let mut state = ModelState::new();
        let mut oracle = oracle_returning(Pointer::err(12));
        let outcome = state.acquire(&REQUEST, None, &mut oracle, AcquirePolicy::ErrorPointer);
        assert_eq!(outcome, Ok(None));

        let mut oracle = oracle_returning(Pointer::Null);
        let outcome = state.acquire(&REQUEST, None, &mut oracle, AcquirePolicy::ErrorPointer);
        assert_eq!(outcome, Err(Halt::Infeasible));
    }

    #[test]
    fn retain_requires_a_held_stacking_resource() {
        let mut state = ModelState::new();
        state.retain(&URB, None).unwrap();
        assert!(state.channel().fired(&ResourceProperty::RetainUnheld.id(&URB)));
        assert_eq!(state.count(&URB, None), 1);

        let err = state.retain(&REQUEST, None).unwrap_err();
        assert_eq!(err, ModelError::unsupported("request", "retain"));
    }

    #[test]
    fn bounded_counter_reports_limit() {
        let mut state = ModelState::new();
        assert!(state.acquire_unconditionally(&PAGES, None));
        assert!(!state.acquire_unconditionally(&PAGES, None));
        assert!(state.channel().fired(&ResourceProperty::LimitExceeded.id(&PAGES)));
        assert_eq!(state.count(&PAGES, None), 1);
    }

    #[test]
    fn counting_class_reports_the_limit_and_keeps_counting() {
        const MAPPINGS: ResourceClass = ResourceClass::counting("mappings", 1);
        let mut state = ModelState::new();
        assert!(state.acquire_unconditionally(&MAPPINGS, None));
        assert!(!state.acquire_unconditionally(&MAPPINGS, None));
        assert!(state.channel().fired(&ResourceProperty::LimitExceeded.id(&MAPPINGS)));
        assert_eq!(state.count(&MAPPINGS, None), 2);

        assert!(state.release(&MAPPINGS, None));
        assert!(!state.check_balanced(&MAPPINGS, None));
    }

    #[test]
    fn null_release_follows_class_rule() {
        let mut state = ModelState::new();
        assert!(state.release_handle(&URB, None, Pointer::Null));
        assert!(state.channel().is_clean());

        assert!(!state.release_handle(&REQUEST, None, Pointer::Null));
        assert!(state.channel().fired(&ResourceProperty::NullRelease.id(&REQUEST)));
    }

    #[test]
    fn try_acquire_uses_oracle_decision() {
        let mut state = ModelState::new();
        let mut oracle = MockValueOracle::new();
        let mut answers = vec![1, 0].into_iter();
        oracle
            .expect_arbitrary_int()
            .times(2)
            .returning(move || answers.next().unwrap_or(0));

        assert!(state.try_acquire(&REQUEST, Some(1), &mut oracle));
        assert!(!state.try_acquire(&REQUEST, Some(1), &mut oracle));
        // the second attempt found the lock already held by this path
        assert!(state.channel().fired(&ResourceProperty::DoubleAcquire.id(&REQUEST)));
    }

    #[test]
    fn check_balanced_flags_held_resources() {
        let mut state = ModelState::new();
        assert!(state.check_balanced(&REQUEST, None));
        state.acquire_unconditionally(&REQUEST, None);
        assert!(!state.check_balanced(&REQUEST, None));
        assert!(state.channel().fired(&ResourceProperty::Unbalanced.id(&REQUEST)));
    }
}
