//! Environment Model Simulation
//!
//! Exploration harness for the resource lifecycle and callback ordering
//! models in `envmodel-core`. Scenarios are small driver-shaped modules; the
//! runner resolves every oracle query and every scheduling decision through
//! a choice source and reports which properties fired on which paths.
//!
//! ## Core Components
//!
//! - **ScenarioRunner**: exhaustive, random and replay exploration of a scenario
//! - **DomainOracle**: oracle values drawn from a configurable [`ValueDomain`]
//! - **ChoiceTrail**: depth-first enumeration of choice points
//! - **Verdict**: fired properties judged against a scenario's [`Expectation`]
//! - **catalog**: built-in scenarios for every model and violation kind
//!
//! ## Getting Started
//!
//! ```rust,no_run
//! use envmodel_simulation::{catalog, ScenarioRunner, SimulationConfig};
//!
//! let runner = ScenarioRunner::new(SimulationConfig::default()).unwrap();
//! let scenario = catalog::find("urb-leak").unwrap();
//! let report = runner.run(&scenario).unwrap();
//! assert!(report.verdict.is_pass());
//! ```

pub mod catalog;
pub mod cli;
pub mod config;
pub mod error;
pub mod explorer;
pub mod oracle;
pub mod randomness;
pub mod report;
pub mod runner;
pub mod scenario;

pub use catalog::BuiltinScenario;
pub use config::{SimulationConfig, Strategy, ValueDomain};
pub use error::{SimulationError, SimulationResult};
pub use explorer::{ChoiceSource, ChoiceTrail, RandomChoices, ReplayChoices};
pub use oracle::DomainOracle;
pub use randomness::SeededRng;
pub use report::{PathOutcome, PathReport, PropertyWitness, ScenarioReport, SuiteReport, Verdict};
pub use runner::ScenarioRunner;
pub use scenario::{Expectation, FnModule, LogicalThread, Module, Scenario, StepThread};
