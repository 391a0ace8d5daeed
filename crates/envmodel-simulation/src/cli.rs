// Purpose: Command-line interface for exploring the built-in scenarios.

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use envmodel_error::ErrorMessage;
use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};

use crate::catalog::{self, BuiltinScenario};
use crate::config::{SimulationConfig, Strategy};
use crate::report::{PathOutcome, PathReport, SuiteReport};
use crate::runner::ScenarioRunner;
use crate::scenario::Scenario;

/// Environment model explorer
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
pub struct Cli {
    /// TOML configuration file
    #[clap(long, env = "ENVMODEL_CONFIG")]
    config: Option<PathBuf>,

    #[command(flatten)]
    overrides: ConfigOverrides,

    /// Output format
    #[clap(long, value_enum, default_value_t = OutputFormat::Summary, global = true)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the built-in scenarios
    List,

    /// Explore scenarios and judge them against their expectations
    Run(RunArgs),

    /// Re-run one recorded path of a scenario
    Replay(ReplayArgs),

    /// Print the effective configuration
    ShowConfig(ShowConfigArgs),
}

/// Command-line values taking precedence over the configuration file
#[derive(Args, Debug, Default)]
struct ConfigOverrides {
    /// Search strategy
    #[clap(long, value_enum, global = true)]
    strategy: Option<Strategy>,

    /// Upper bound on explored paths per scenario
    #[clap(long, global = true)]
    max_paths: Option<usize>,

    /// Upper bound on choice points per path
    #[clap(long, global = true)]
    max_depth: Option<usize>,

    /// Paths sampled per scenario by the random strategy
    #[clap(long, global = true)]
    random_runs: Option<usize>,

    /// Seed for the random strategy
    #[clap(long, env = "ENVMODEL_SEED", global = true)]
    seed: Option<u64>,
}

impl ConfigOverrides {
    fn apply(&self, config: &mut SimulationConfig) {
        if let Some(strategy) = self.strategy {
            config.strategy = strategy;
        }
        if let Some(max_paths) = self.max_paths {
            config.max_paths = max_paths;
        }
        if let Some(max_depth) = self.max_depth {
            config.max_depth = max_depth;
        }
        if let Some(random_runs) = self.random_runs {
            config.random_runs = random_runs;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
    }
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Scenario names; every built-in scenario when empty
    scenarios: Vec<String>,

    /// Include every explored path in the report
    #[clap(long)]
    all_paths: bool,
}

#[derive(Args, Debug)]
struct ReplayArgs {
    /// Scenario name
    #[clap(required = true)]
    scenario: String,

    /// Comma-separated choice trail, as printed in a witness
    #[clap(long, value_delimiter = ',')]
    choices: Vec<usize>,
}

#[derive(Args, Debug)]
struct ShowConfigArgs {
    /// Also write the configuration to this file
    #[clap(long)]
    write: Option<PathBuf>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// One line per scenario
    Summary,
    /// Pretty-printed JSON
    Pretty,
    /// Compact JSON
    Compact,
}

/// Run the CLI
pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    match cli.command {
        Command::List => list_scenarios(cli.format),
        Command::Run(args) => run_scenarios(config, cli.format, args).await,
        Command::Replay(args) => replay_path(config, cli.format, args),
        Command::ShowConfig(args) => show_config(&config, args),
    }
}

fn load_config(cli: &Cli) -> Result<SimulationConfig> {
    let mut config = match &cli.config {
        Some(path) => SimulationConfig::from_toml_file(path)
            .with_context(|| format!("Failed to load configuration: {}", path.display()))?,
        None => SimulationConfig::default(),
    };
    cli.overrides.apply(&mut config);
    config.validate()?;
    Ok(config)
}

fn print_json<T: Serialize>(value: &T, format: OutputFormat) -> Result<()> {
    let text = match format {
        OutputFormat::Compact => serde_json::to_string(value)?,
        _ => serde_json::to_string_pretty(value)?,
    };
    println!("{}", text);
    Ok(())
}

#[derive(Serialize)]
struct ScenarioListing<'a> {
    name: &'a str,
    description: &'a str,
    expectation: String,
}

fn list_scenarios(format: OutputFormat) -> Result<()> {
    let scenarios = catalog::catalog();
    if format == OutputFormat::Summary {
        for scenario in &scenarios {
            println!("{:<28} {}", scenario.name, scenario.expectation());
        }
        return Ok(());
    }

    let listing: Vec<ScenarioListing<'_>> = scenarios
        .iter()
        .map(|scenario| ScenarioListing {
            name: scenario.name,
            description: scenario.description,
            expectation: scenario.expectation().to_string(),
        })
        .collect();
    print_json(&listing, format)
}

fn select(names: &[String]) -> Result<Vec<BuiltinScenario>> {
    if names.is_empty() {
        return Ok(catalog::catalog());
    }
    names
        .iter()
        .map(|name| catalog::find(name).map_err(Into::into))
        .collect()
}

async fn run_scenarios(config: SimulationConfig, format: OutputFormat, args: RunArgs) -> Result<()> {
    let scenarios = select(&args.scenarios)?;
    info!(
        scenarios = scenarios.len(),
        strategy = ?config.strategy,
        "running scenarios"
    );

    let runner = ScenarioRunner::new(config)?.keep_paths(args.all_paths);
    let suite = runner.run_suite(catalog::shared(scenarios)).await?;

    match format {
        OutputFormat::Summary => print_summary(&suite),
        _ => print_json(&suite, format)?,
    }

    if suite.all_passed() {
        Ok(())
    } else {
        Err(anyhow!(
            "{} failed, {} inconclusive",
            suite.failed,
            suite.inconclusive
        ))
    }
}

fn print_summary(suite: &SuiteReport) {
    for report in &suite.scenarios {
        println!("{}", report.summary());
        for witness in &report.fired {
            let choices: Vec<String> = witness.witness.iter().map(ToString::to_string).collect();
            println!("    {:<56} paths={:<4} witness={}", witness.id.as_str(), witness.paths, choices.join(","));
        }
    }
    println!(
        "passed={} failed={} inconclusive={}",
        suite.passed, suite.failed, suite.inconclusive
    );
}

fn replay_path(config: SimulationConfig, format: OutputFormat, args: ReplayArgs) -> Result<()> {
    let scenario = catalog::find(&args.scenario)?;
    let runner = ScenarioRunner::new(config)?;
    let path = match runner.replay(&scenario, args.choices.clone()) {
        Ok(path) => path,
        Err(err) => {
            if format != OutputFormat::Summary {
                let message = ErrorMessage::from_error(&err).with_details(json!({
                    "scenario": scenario.name,
                    "choices": args.choices,
                }));
                print_json(&message, format)?;
            }
            return Err(err.into());
        }
    };

    if format == OutputFormat::Summary {
        print_path(&path);
        Ok(())
    } else {
        print_json(&path, format)
    }
}

fn print_path(path: &PathReport) {
    match &path.outcome {
        PathOutcome::Completed => println!("completed"),
        PathOutcome::Faulted(id) => println!("faulted: {}", id),
        PathOutcome::Pruned => println!("pruned"),
    }
    if path.truncated {
        warn!("path ran past the depth bound");
    }
    for signal in &path.signals {
        println!("  #{:<3} {}", signal.sequence, signal.violation);
    }
}

fn show_config(config: &SimulationConfig, args: ShowConfigArgs) -> Result<()> {
    let text = toml::to_string_pretty(config)?;
    print!("{}", text);
    if let Some(path) = args.write {
        config
            .to_toml_file(&path)
            .with_context(|| format!("Failed to write configuration: {}", path.display()))?;
        info!(path = %path.display(), "configuration written");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn overrides_take_precedence() {
        let cli = Cli::parse_from([
            "envmodel-sim",
            "--strategy",
            "random",
            "--seed",
            "7",
            "run",
            "--max-paths",
            "10",
            "urb-leak",
        ]);
        let config = load_config(&cli).unwrap();
        assert_eq!(config.strategy, Strategy::Random);
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.max_paths, 10);
        assert!(matches!(cli.command, Command::Run(ref args) if args.scenarios == ["urb-leak"]));
    }

    #[test]
    fn replay_parses_choice_trails() {
        let cli = Cli::parse_from(["envmodel-sim", "replay", "null-dereference", "--choices", "1"]);
        match cli.command {
            Command::Replay(args) => assert_eq!(args.choices, vec![1]),
            other => panic!("unexpected command {:?}", other),
        }
    }
}
