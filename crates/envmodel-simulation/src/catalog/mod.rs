//! Built-in Scenario Catalog
//!
//! Small driver-shaped programs exercising each model and each kind of
//! violation, every one with an explicit expectation.

use std::sync::Arc;

use crate::error::{SimulationError, SimulationResult};
use crate::scenario::{Expectation, Module, Scenario};

mod callbacks;
mod concurrency;
mod resources;

/// A catalog entry: static metadata plus a module constructor
#[derive(Debug, Clone, Copy)]
pub struct BuiltinScenario {
    pub name: &'static str,
    pub description: &'static str,
    /// Properties that must fire; empty means the scenario is safe
    pub expected: &'static [&'static str],
    pub load: fn() -> Box<dyn Module>,
}

impl Scenario for BuiltinScenario {
    fn name(&self) -> &str {
        self.name
    }

    fn description(&self) -> &str {
        self.description
    }

    fn expectation(&self) -> Expectation {
        if self.expected.is_empty() {
            Expectation::Safe
        } else {
            Expectation::unsafe_with(self.expected.iter().copied())
        }
    }

    fn load(&self) -> Box<dyn Module> {
        (self.load)()
    }
}

/// Every built-in scenario, in a stable order.
pub fn catalog() -> Vec<BuiltinScenario> {
    let mut scenarios = Vec::new();
    scenarios.extend_from_slice(resources::SCENARIOS);
    scenarios.extend_from_slice(callbacks::SCENARIOS);
    scenarios.extend_from_slice(concurrency::SCENARIOS);
    scenarios
}

pub fn find(name: &str) -> SimulationResult<BuiltinScenario> {
    catalog()
        .into_iter()
        .find(|scenario| scenario.name == name)
        .ok_or_else(|| SimulationError::UnknownScenario(name.to_string()))
}

/// Catalog entries ready for the async suite runner.
pub fn shared(scenarios: Vec<BuiltinScenario>) -> Vec<Arc<dyn Scenario>> {
    scenarios
        .into_iter()
        .map(|scenario| Arc::new(scenario) as Arc<dyn Scenario>)
        .collect()
}
