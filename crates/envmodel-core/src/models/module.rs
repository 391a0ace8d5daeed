// Module reference count model
//
// Collapses every module instance into one counter; null module pointers
// are ignored the way the kernel ignores them.

use crate::cell::ResourceClass;
use crate::env::Environment;
use crate::oracle::Pointer;

pub const MODULE_REFCOUNT: ResourceClass = ResourceClass::stacking("linux:module:refcount").allowing_null_release();

/// `__module_get`
pub fn module_get(env: &mut Environment<'_>, module: Pointer) {
    if !module.is_null() {
        env.acquire_unconditionally(&MODULE_REFCOUNT, None);
    }
}

/// `try_module_get`: nonzero on success.
pub fn try_module_get(env: &mut Environment<'_>, module: Pointer) -> i32 {
    if module.is_null() {
        return 1;
    }
    i32::from(env.try_acquire(&MODULE_REFCOUNT, None))
}

/// `module_put`
pub fn module_put(env: &mut Environment<'_>, module: Pointer) -> bool {
    env.release_handle(&MODULE_REFCOUNT, None, module)
}

/// `module_refcount`
pub fn module_refcount(env: &Environment<'_>, _module: Pointer) -> u32 {
    env.count(&MODULE_REFCOUNT, None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::{Scripted, ScriptedOracle};
    use crate::state::ModelState;

    #[test]
    fn gets_and_puts_on_two_modules_balance() {
        let mut state = ModelState::new();
        let mut oracle = ScriptedOracle::default();
        let mut env = Environment::new(&mut state, &mut oracle);
        let (first, second) = (Pointer::Addr(0x10), Pointer::Addr(0x20));

        module_get(&mut env, first);
        module_get(&mut env, second);
        assert_eq!(module_refcount(&env, first), 2);
        module_put(&mut env, first);
        module_put(&mut env, second);

        assert!(state.check_final_state().unwrap().is_clean());
    }

    #[test]
    fn failed_try_get_takes_nothing() {
        let mut state = ModelState::new();
        let mut oracle = ScriptedOracle::new([Scripted::Int(0)]);
        let mut env = Environment::new(&mut state, &mut oracle);

        assert_eq!(try_module_get(&mut env, Pointer::Addr(0x10)), 0);
        assert_eq!(try_module_get(&mut env, Pointer::Null), 1);
        assert_eq!(module_refcount(&env, Pointer::Null), 0);
    }
}
