// Lock models
//
// One exclusive cell per lock address. Taking a lock already held on the same
// path is a double lock; unlocking a free lock is a double unlock.

use crate::cell::ResourceClass;
use crate::env::Environment;

pub const SPINLOCK: ResourceClass = ResourceClass::exclusive("linux:kernel:locking:spinlock");
pub const MUTEX: ResourceClass = ResourceClass::exclusive("linux:kernel:locking:mutex");

pub fn spin_lock(env: &mut Environment<'_>, lock: u64) -> bool {
    env.acquire_unconditionally(&SPINLOCK, Some(lock))
}

/// Nonzero when the lock was taken.
pub fn spin_trylock(env: &mut Environment<'_>, lock: u64) -> i32 {
    i32::from(env.try_acquire(&SPINLOCK, Some(lock)))
}

pub fn spin_unlock(env: &mut Environment<'_>, lock: u64) -> bool {
    env.release(&SPINLOCK, Some(lock))
}

pub fn spin_is_locked(env: &Environment<'_>, lock: u64) -> bool {
    !env.read(&SPINLOCK, Some(lock)).is_rest()
}

pub fn mutex_lock(env: &mut Environment<'_>, lock: u64) -> bool {
    env.acquire_unconditionally(&MUTEX, Some(lock))
}

/// `mutex_lock_interruptible`: 0 when the lock was taken, a negative errno
/// when the wait was interrupted.
pub fn mutex_lock_interruptible(env: &mut Environment<'_>, lock: u64) -> i64 {
    if env.arbitrary_bool() {
        env.acquire_unconditionally(&MUTEX, Some(lock));
        0
    } else {
        env.arbitrary_negative_int()
    }
}

/// Nonzero when the lock was taken.
pub fn mutex_trylock(env: &mut Environment<'_>, lock: u64) -> i32 {
    i32::from(env.try_acquire(&MUTEX, Some(lock)))
}

pub fn mutex_unlock(env: &mut Environment<'_>, lock: u64) -> bool {
    env.release(&MUTEX, Some(lock))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::{Scripted, ScriptedOracle};
    use crate::state::ModelState;
    use crate::transition::ResourceProperty;

    #[test]
    fn locks_are_tracked_per_address() {
        let mut state = ModelState::new();
        let mut oracle = ScriptedOracle::default();
        let mut env = Environment::new(&mut state, &mut oracle);

        assert!(spin_lock(&mut env, 1));
        assert!(spin_lock(&mut env, 2));
        assert!(spin_is_locked(&env, 1));
        assert!(spin_unlock(&mut env, 1));
        assert!(spin_unlock(&mut env, 2));
        assert!(state.channel().is_clean());
    }

    #[test]
    fn double_lock_then_double_unlock() {
        let mut state = ModelState::new();
        let mut oracle = ScriptedOracle::default();
        let mut env = Environment::new(&mut state, &mut oracle);

        spin_lock(&mut env, 1);
        assert!(!spin_lock(&mut env, 1));
        spin_unlock(&mut env, 1);
        assert!(!spin_unlock(&mut env, 1));

        let channel = state.channel();
        assert_eq!(channel.count(&ResourceProperty::DoubleAcquire.id(&SPINLOCK)), 1);
        assert_eq!(channel.count(&ResourceProperty::DoubleRelease.id(&SPINLOCK)), 1);
    }

    #[test]
    fn interrupted_mutex_wait_holds_nothing() {
        let mut state = ModelState::new();
        let mut oracle = ScriptedOracle::new([Scripted::Int(0), Scripted::Int(-4)]);
        let mut env = Environment::new(&mut state, &mut oracle);

        assert_eq!(mutex_lock_interruptible(&mut env, 7), -4);
        assert!(env.read(&MUTEX, Some(7)).is_rest());
        assert_eq!(mutex_trylock(&mut env, 7), 0);
    }
}
