//! Scenarios
//!
//! A scenario is a driver-shaped module (init, optional exit, logical threads
//! standing in for the kernel's callback invocations) plus an explicit
//! statement of which properties it is expected to violate.

use std::collections::BTreeSet;
use std::fmt;

use envmodel_core::{Environment, Step};
use envmodel_error::PropertyId;
use serde::{Deserialize, Serialize};

//-----------------------------------------------------------------------------
// Expectation
//-----------------------------------------------------------------------------

/// What a scenario declares about its own correctness
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Expectation {
    /// No property may fire on any path
    Safe,
    /// Every listed property fires on some path and nothing else fires
    Unsafe(BTreeSet<PropertyId>),
}

impl Expectation {
    pub fn unsafe_with<I, P>(ids: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PropertyId>,
    {
        Expectation::Unsafe(ids.into_iter().map(Into::into).collect())
    }

    /// Properties that must fire.
    pub fn expected(&self) -> BTreeSet<PropertyId> {
        match self {
            Expectation::Safe => BTreeSet::new(),
            Expectation::Unsafe(ids) => ids.clone(),
        }
    }
}

impl fmt::Display for Expectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expectation::Safe => write!(f, "safe"),
            Expectation::Unsafe(ids) => {
                let ids: Vec<&str> = ids.iter().map(PropertyId::as_str).collect();
                write!(f, "unsafe [{}]", ids.join(", "))
            }
        }
    }
}

//-----------------------------------------------------------------------------
// Module and Thread Traits
//-----------------------------------------------------------------------------

/// One logical thread of modeled code, run one atomic step at a time.
pub trait LogicalThread {
    fn name(&self) -> &str;

    /// Run the next step. Returns whether the thread has more steps.
    fn step(&mut self, env: &mut Environment<'_>) -> Step<bool>;
}

/// A simulated kernel module.
pub trait Module {
    /// Module init; nonzero means loading failed and nothing else runs.
    fn init(&mut self, env: &mut Environment<'_>) -> Step<i32>;

    fn has_exit(&self) -> bool {
        false
    }

    /// Module exit, run after every thread finished.
    fn exit(&mut self, _env: &mut Environment<'_>) -> Step<()> {
        Ok(())
    }

    /// Threads interleaved between a successful init and exit.
    fn threads(&mut self) -> Vec<Box<dyn LogicalThread>> {
        Vec::new()
    }
}

/// A named, self-describing module factory.
pub trait Scenario: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    fn expectation(&self) -> Expectation;

    /// Fresh module for one path.
    fn load(&self) -> Box<dyn Module>;
}

//-----------------------------------------------------------------------------
// Closure-Based Helpers
//-----------------------------------------------------------------------------

type StepFn = Box<dyn FnMut(&mut Environment<'_>) -> Step<()>>;
type InitFn = Box<dyn FnMut(&mut Environment<'_>) -> Step<i32>>;

/// A thread built from a list of atomic steps.
pub struct StepThread {
    name: String,
    steps: Vec<StepFn>,
    next: usize,
}

impl StepThread {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            steps: Vec::new(),
            next: 0,
        }
    }

    pub fn step(mut self, step: impl FnMut(&mut Environment<'_>) -> Step<()> + 'static) -> Self {
        self.steps.push(Box::new(step));
        self
    }

    pub fn boxed(self) -> Box<dyn LogicalThread> {
        Box::new(self)
    }
}

impl LogicalThread for StepThread {
    fn name(&self) -> &str {
        &self.name
    }

    fn step(&mut self, env: &mut Environment<'_>) -> Step<bool> {
        if let Some(step) = self.steps.get_mut(self.next) {
            step(env)?;
            self.next += 1;
        }
        Ok(self.next < self.steps.len())
    }
}

/// A module whose init and exit are plain closures.
pub struct FnModule {
    init: InitFn,
    exit: Option<StepFn>,
}

impl FnModule {
    pub fn new(init: impl FnMut(&mut Environment<'_>) -> Step<i32> + 'static) -> Self {
        Self {
            init: Box::new(init),
            exit: None,
        }
    }

    pub fn with_exit(mut self, exit: impl FnMut(&mut Environment<'_>) -> Step<()> + 'static) -> Self {
        self.exit = Some(Box::new(exit));
        self
    }
}

impl Module for FnModule {
    fn init(&mut self, env: &mut Environment<'_>) -> Step<i32> {
        (self.init)(env)
    }

    fn has_exit(&self) -> bool {
        self.exit.is_some()
    }

    fn exit(&mut self, env: &mut Environment<'_>) -> Step<()> {
        match self.exit.as_mut() {
            Some(exit) => exit(env),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use envmodel_core::{ModelState, ScriptedOracle};

    #[test]
    fn step_thread_reports_remaining_steps() {
        let mut state = ModelState::new();
        let mut oracle = ScriptedOracle::default();
        let mut env = Environment::new(&mut state, &mut oracle);

        let mut thread = StepThread::new("worker")
            .step(|env| {
                env.expected_error("first");
                Ok(())
            })
            .step(|env| {
                env.expected_error("second");
                Ok(())
            });
        assert!(LogicalThread::step(&mut thread, &mut env).unwrap());
        assert!(!LogicalThread::step(&mut thread, &mut env).unwrap());
        assert!(!LogicalThread::step(&mut thread, &mut env).unwrap());
        assert_eq!(state.signals().len(), 2);
    }

    #[test]
    fn fn_module_exit_is_optional() {
        let module = FnModule::new(|_| Ok(0));
        assert!(!module.has_exit());
        let module = module.with_exit(|_| Ok(()));
        assert!(module.has_exit());
    }

    #[test]
    fn expectation_display_lists_properties() {
        let expectation = Expectation::unsafe_with(["resource:a:leak", "resource:a:double-release"]);
        assert_eq!(
            expectation.to_string(),
            "unsafe [resource:a:double-release, resource:a:leak]"
        );
        assert!(Expectation::Safe.expected().is_empty());
    }
}
