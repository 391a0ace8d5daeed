// Environment
//
// The handle modeled driver code is written against: the run's state and the
// oracle that resolves its nondeterminism, borrowed together for one step.

use envmodel_error::PropertyId;

use crate::cell::{ResourceClass, ResourceState};
use crate::guard::{CallbackRole, GuardState};
use crate::oracle::{self, Handle, Pointer, ValueOracle};
use crate::state::ModelState;
use crate::transition::AcquirePolicy;
use crate::{Halt, Step};

/// Label used by [`Environment::invoke_reached`].
pub const REACHED: &str = "reached";

/// Exclusive view of one run's state plus its oracle
pub struct Environment<'a> {
    state: &'a mut ModelState,
    oracle: &'a mut dyn ValueOracle,
}

impl<'a> Environment<'a> {
    pub fn new(state: &'a mut ModelState, oracle: &'a mut dyn ValueOracle) -> Self {
        Self { state, oracle }
    }

    pub fn state(&self) -> &ModelState {
        self.state
    }

    pub fn state_mut(&mut self) -> &mut ModelState {
        self.state
    }

    pub fn oracle(&mut self) -> &mut dyn ValueOracle {
        &mut *self.oracle
    }

    // Oracle

    pub fn arbitrary_int(&mut self) -> i64 {
        self.oracle.arbitrary_int()
    }

    pub fn arbitrary_ulong(&mut self) -> u64 {
        self.oracle.arbitrary_ulong()
    }

    pub fn arbitrary_negative_int(&mut self) -> i64 {
        self.oracle.arbitrary_negative_int()
    }

    pub fn arbitrary_nonpositive_int(&mut self) -> i64 {
        self.oracle.arbitrary_nonpositive_int()
    }

    pub fn arbitrary_ptr(&mut self) -> Pointer {
        self.oracle.arbitrary_ptr()
    }

    pub fn arbitrary_bool(&mut self) -> bool {
        self.oracle.arbitrary_int() != 0
    }

    pub fn assume(&mut self, condition: bool) -> Step<()> {
        oracle::assume(condition)
    }

    // Transitions

    pub fn acquire(&mut self, class: &ResourceClass, instance: Option<u64>, policy: AcquirePolicy) -> Step<Option<Handle>> {
        self.state.acquire(class, instance, &mut *self.oracle, policy)
    }

    pub fn acquire_unconditionally(&mut self, class: &ResourceClass, instance: Option<u64>) -> bool {
        self.state.acquire_unconditionally(class, instance)
    }

    pub fn try_acquire(&mut self, class: &ResourceClass, instance: Option<u64>) -> bool {
        self.state.try_acquire(class, instance, &mut *self.oracle)
    }

    pub fn retain(&mut self, class: &ResourceClass, instance: Option<u64>) -> Step<()> {
        self.state.retain(class, instance).map_err(Halt::from)
    }

    pub fn release(&mut self, class: &ResourceClass, instance: Option<u64>) -> bool {
        self.state.release(class, instance)
    }

    pub fn release_handle(&mut self, class: &ResourceClass, instance: Option<u64>, pointer: Pointer) -> bool {
        self.state.release_handle(class, instance, pointer)
    }

    pub fn check_balanced(&mut self, class: &ResourceClass, instance: Option<u64>) -> bool {
        self.state.check_balanced(class, instance)
    }

    pub fn read(&self, class: &ResourceClass, instance: Option<u64>) -> ResourceState {
        self.state.read(class, instance)
    }

    pub fn count(&self, class: &ResourceClass, instance: Option<u64>) -> u32 {
        self.state.count(class, instance)
    }

    // Callback ordering

    pub fn register(&mut self, guard: &'static str) -> bool {
        self.state.callback(guard, CallbackRole::Register)
    }

    pub fn start(&mut self, guard: &'static str) -> bool {
        self.state.callback(guard, CallbackRole::Start)
    }

    pub fn stop(&mut self, guard: &'static str) -> bool {
        self.state.callback(guard, CallbackRole::Stop)
    }

    pub fn deregister(&mut self, guard: &'static str) -> bool {
        self.state.callback(guard, CallbackRole::Deregister)
    }

    pub fn invoke_callback(&mut self, guard: &'static str) -> bool {
        self.state.callback(guard, CallbackRole::Invoke)
    }

    pub fn invoke_middle_callback(&mut self, guard: &'static str) -> bool {
        self.state.callback(guard, CallbackRole::InvokeMiddle)
    }

    pub fn guard_state(&self, guard: &str) -> GuardState {
        self.state.guard_state(guard)
    }

    // Slots

    pub fn store_resource(&mut self, slot: &'static str, value: u64) {
        self.state.store_resource(slot, value)
    }

    pub fn check_resource(&mut self, slot: &'static str, value: u64) -> bool {
        self.state.check_resource(slot, value)
    }

    // Assertions and markers

    pub fn assert_named(&mut self, id: PropertyId, condition: bool) -> bool {
        self.state.assert_named(id, condition)
    }

    pub fn expected_error(&mut self, label: &str) {
        self.state.channel_mut().expected_error(label)
    }

    pub fn unexpected_error(&mut self, label: &str) {
        self.state.channel_mut().unexpected_error(label)
    }

    /// Mark that a callback body was reached.
    pub fn invoke_reached(&mut self) {
        self.expected_error(REACHED)
    }

    /// Dereference a null pointer: raises a memory fault and returns the
    /// halt the caller must propagate.
    pub fn null_dereference(&mut self, expected: bool) -> Halt {
        let channel = self.state.channel_mut();
        if expected {
            channel.expected_memory_fault("null-dereference")
        } else {
            channel.unexpected_memory_fault("null-dereference")
        }
    }

    /// Dereference `pointer`, faulting when it is null or an error pointer.
    pub fn dereference(&mut self, pointer: Pointer, expected: bool) -> Step<u64> {
        match Handle::from_pointer(pointer) {
            Some(handle) => Ok(handle.address()),
            None => Err(self.null_dereference(expected)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::{Scripted, ScriptedOracle};

    const BUFFER: ResourceClass = ResourceClass::exclusive("buffer");

    #[test]
    fn environment_threads_state_and_oracle() {
        let mut state = ModelState::new();
        let mut oracle = ScriptedOracle::new([Scripted::Ptr(Pointer::Addr(9)), Scripted::Int(1)]);
        {
            let mut env = Environment::new(&mut state, &mut oracle);
            let handle = env.acquire(&BUFFER, None, AcquirePolicy::MayFail).unwrap();
            assert_eq!(handle.map(|h| h.address()), Some(9));
            assert!(env.arbitrary_bool());
            assert!(env.release(&BUFFER, None));
            env.invoke_reached();
        }
        assert_eq!(oracle.consumed(), 2);
        assert!(state.channel().fired(&"test:expected-error:reached".into()));
    }

    #[test]
    fn dereferencing_null_halts() {
        let mut state = ModelState::new();
        let mut oracle = ScriptedOracle::default();
        let mut env = Environment::new(&mut state, &mut oracle);

        assert_eq!(env.dereference(Pointer::Addr(5), false), Ok(5));
        let halt = env.dereference(Pointer::Null, true).unwrap_err();
        assert_eq!(
            halt,
            Halt::Fault("test:expected-memory-fault:null-dereference".into())
        );
    }

    #[test]
    fn misuse_surfaces_as_halt() {
        let mut state = ModelState::new();
        let mut oracle = ScriptedOracle::default();
        let mut env = Environment::new(&mut state, &mut oracle);
        assert!(matches!(env.retain(&BUFFER, None), Err(Halt::Misuse(_))));
    }
}
