//! Scenario Runner
//!
//! Drives a scenario over many paths. Each path gets a fresh module and a
//! fresh `ModelState`: init, then the module's logical threads interleaved
//! through scheduling choice points, then exit, then the final-state check.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use envmodel_core::{Environment, Halt, ModelState, Step};
use tokio::task::JoinSet;
use tracing::{debug, info, info_span, warn};

use crate::config::{SimulationConfig, Strategy};
use crate::error::{SimulationError, SimulationResult};
use crate::explorer::{ChoiceSource, ChoiceTrail, RandomChoices, ReplayChoices};
use crate::oracle::DomainOracle;
use crate::randomness::SeededRng;
use crate::report::{PathOutcome, PathReport, ScenarioReport, ScenarioReportBuilder, SuiteReport};
use crate::scenario::{Module, Scenario};

/// Runs scenarios under one configuration.
#[derive(Debug, Clone, Default)]
pub struct ScenarioRunner {
    config: SimulationConfig,
    keep_paths: bool,
}

impl ScenarioRunner {
    pub fn new(config: SimulationConfig) -> SimulationResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            keep_paths: false,
        })
    }

    /// Include every path report in scenario reports.
    pub fn keep_paths(mut self, keep: bool) -> Self {
        self.keep_paths = keep;
        self
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Run a scenario with the configured strategy.
    pub fn run(&self, scenario: &dyn Scenario) -> SimulationResult<ScenarioReport> {
        let span = info_span!("scenario", name = scenario.name());
        let _guard = span.enter();

        let report = match self.config.strategy {
            Strategy::Exhaustive => self.explore(scenario)?,
            Strategy::Random => self.sample(scenario, SeededRng::from_optional_seed(self.config.seed))?,
        };

        info!(
            verdict = %report.verdict,
            paths = report.paths,
            fired = report.fired.len(),
            truncated = report.truncated,
            "scenario finished"
        );
        Ok(report)
    }

    /// Depth-first search over every choice point, bounded by `max_paths`
    /// and `max_depth`.
    pub fn explore(&self, scenario: &dyn Scenario) -> SimulationResult<ScenarioReport> {
        let started = Instant::now();
        let mut builder = self.builder(scenario, Strategy::Exhaustive);
        let mut trail = ChoiceTrail::new(self.config.max_depth);
        let mut exhausted = false;

        loop {
            let path = self.run_path(scenario, &mut trail, builder.paths())?;
            builder.record(path);

            if !trail.advance() {
                exhausted = true;
                break;
            }
            if builder.paths() >= self.config.max_paths {
                warn!(max_paths = self.config.max_paths, "path limit reached");
                builder.mark_truncated();
                break;
            }
        }

        Ok(builder.finish(exhausted, elapsed_ms(started)))
    }

    /// Sample `random_runs` paths with independent seeded choices.
    pub fn sample(&self, scenario: &dyn Scenario, mut rng: SeededRng) -> SimulationResult<ScenarioReport> {
        let started = Instant::now();
        let mut builder = self
            .builder(scenario, Strategy::Random)
            .with_seed(rng.get_seed());

        for index in 0..self.config.random_runs {
            let mut choices = RandomChoices::new(rng.fork(), self.config.max_depth);
            let path = self.run_path(scenario, &mut choices, index)?;
            builder.record(path);
        }

        Ok(builder.finish(false, elapsed_ms(started)))
    }

    /// Re-run the single path a witness trail describes.
    pub fn replay(&self, scenario: &dyn Scenario, choices: Vec<usize>) -> SimulationResult<PathReport> {
        let mut replay = ReplayChoices::new(choices);
        let path = self.run_path(scenario, &mut replay, 0)?;
        replay.finish()?;
        Ok(path)
    }

    fn builder(&self, scenario: &dyn Scenario, strategy: Strategy) -> ScenarioReportBuilder {
        ScenarioReportBuilder::new(
            scenario.name(),
            scenario.description(),
            scenario.expectation(),
            strategy,
        )
        .keep_paths(self.keep_paths)
    }

    fn run_path<C: ChoiceSource>(
        &self,
        scenario: &dyn Scenario,
        source: &mut C,
        index: usize,
    ) -> SimulationResult<PathReport> {
        let mut module = scenario.load();
        let mut state = ModelState::new();

        let halted = {
            let mut oracle = DomainOracle::new(&mut *source, &self.config.domain);
            drive(module.as_mut(), &mut state, &mut oracle)
        };

        let outcome = match halted {
            Ok(()) => {
                state.check_final_state().map_err(|err| SimulationError::Model {
                    scenario: scenario.name().to_string(),
                    source: err,
                })?;
                PathOutcome::Completed
            }
            Err(Halt::Fault(id)) => PathOutcome::Faulted(id),
            Err(Halt::Infeasible) => PathOutcome::Pruned,
            Err(Halt::Misuse(err)) => {
                return Err(SimulationError::Model {
                    scenario: scenario.name().to_string(),
                    source: err,
                })
            }
        };

        let path = PathReport {
            index,
            choices: source.taken(),
            outcome,
            truncated: source.truncated(),
            signals: state.into_signals(),
        };
        debug!(
            path = index,
            choices = ?path.choices,
            outcome = ?path.outcome,
            signals = path.signals.len(),
            "path finished"
        );
        Ok(path)
    }

    /// Run several scenarios concurrently, one blocking task each.
    pub async fn run_suite(&self, scenarios: Vec<Arc<dyn Scenario>>) -> SimulationResult<SuiteReport> {
        let started_at = Utc::now();
        let mut tasks = JoinSet::new();

        for scenario in scenarios {
            let runner = self.clone();
            tasks.spawn_blocking(move || runner.run(scenario.as_ref()));
        }

        let mut reports = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            let report = joined.map_err(|err| SimulationError::Task(err.to_string()))??;
            reports.push(report);
        }

        Ok(SuiteReport::new(started_at, reports))
    }
}

/// One path: init, interleaved threads, exit.
fn drive<C: ChoiceSource>(
    module: &mut dyn Module,
    state: &mut ModelState,
    oracle: &mut DomainOracle<'_, C>,
) -> Step<()> {
    let status = module.init(&mut Environment::new(&mut *state, &mut *oracle))?;
    if status != 0 {
        debug!(status, "init failed, module not loaded");
        return Ok(());
    }

    let mut threads = module.threads();
    let mut runnable: Vec<usize> = (0..threads.len()).collect();
    while !runnable.is_empty() {
        let pick = oracle.schedule(runnable.len());
        let index = runnable[pick];
        let thread = &mut threads[index];

        let more = thread.step(&mut Environment::new(&mut *state, &mut *oracle))?;
        if !more {
            debug!(thread = thread.name(), "thread finished");
            runnable.remove(pick);
        }
    }

    if module.has_exit() {
        module.exit(&mut Environment::new(&mut *state, &mut *oracle))?;
    }
    Ok(())
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
