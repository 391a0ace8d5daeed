// USB request block model
//
// Allocated urbs are tracked by a single counter; every allocation and extra
// reference must be matched by a free before exit.

use crate::cell::ResourceClass;
use crate::env::Environment;
use crate::oracle::Pointer;
use crate::transition::AcquirePolicy;
use crate::Step;

pub const URB: ResourceClass = ResourceClass::stacking("linux:usb:urb").allowing_null_release();

/// `usb_alloc_urb`: a new urb, or null when memory is not available.
pub fn alloc_urb(env: &mut Environment<'_>) -> Step<Pointer> {
    let handle = env.acquire(&URB, None, AcquirePolicy::MayFail)?;
    Ok(handle.map_or(Pointer::Null, |handle| handle.pointer()))
}

/// `usb_get_urb`: take another reference on an allocated urb.
pub fn get_urb(env: &mut Environment<'_>, urb: Pointer) -> Step<Pointer> {
    if !urb.is_null() {
        env.retain(&URB, None)?;
    }
    Ok(urb)
}

/// `usb_free_urb`: drop one reference; null is ignored.
pub fn free_urb(env: &mut Environment<'_>, urb: Pointer) -> bool {
    env.release_handle(&URB, None, urb)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::{Scripted, ScriptedOracle};
    use crate::state::ModelState;
    use crate::transition::ResourceProperty;

    #[test]
    fn references_stack_and_drain() {
        let mut state = ModelState::new();
        let mut oracle = ScriptedOracle::default();
        let mut env = Environment::new(&mut state, &mut oracle);

        let urb = alloc_urb(&mut env).unwrap();
        get_urb(&mut env, urb).unwrap();
        assert_eq!(env.count(&URB, None), 2);
        assert!(free_urb(&mut env, urb));
        assert!(free_urb(&mut env, urb));
        assert!(free_urb(&mut env, Pointer::Null));

        assert!(state.check_final_state().unwrap().is_clean());
        assert!(state.channel().is_clean());
    }

    #[test]
    fn failed_allocation_is_not_counted() {
        let mut state = ModelState::new();
        let mut oracle = ScriptedOracle::new([Scripted::Ptr(Pointer::Null)]);
        let mut env = Environment::new(&mut state, &mut oracle);

        let urb = alloc_urb(&mut env).unwrap();
        assert!(urb.is_null());
        get_urb(&mut env, urb).unwrap();
        assert_eq!(env.count(&URB, None), 0);
    }

    #[test]
    fn get_without_allocation_is_reported() {
        let mut state = ModelState::new();
        let mut oracle = ScriptedOracle::default();
        let mut env = Environment::new(&mut state, &mut oracle);

        get_urb(&mut env, Pointer::Addr(0x100)).unwrap();
        assert!(state
            .channel()
            .fired(&ResourceProperty::RetainUnheld.id(&URB)));
    }
}
