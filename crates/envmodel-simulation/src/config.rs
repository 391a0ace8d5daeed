//! Configuration for Simulation
//!
//! Search strategy, bounds and the finite value domains the oracle explores.
//! Loaded from TOML and overridden from the command line.

use std::fs;
use std::path::Path;

use envmodel_error::ensure;
use serde::{Deserialize, Serialize};

use crate::error::{SimulationError, SimulationResult};

//-----------------------------------------------------------------------------
// Configuration Structures
//-----------------------------------------------------------------------------

/// How a scenario's paths are enumerated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// Depth-first over every choice point
    #[default]
    Exhaustive,
    /// Seeded random sampling of paths
    Random,
}

/// Representative values each oracle query ranges over
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValueDomain {
    pub ints: Vec<i64>,
    pub ulongs: Vec<u64>,
    pub negative_ints: Vec<i64>,
    pub nonpositive_ints: Vec<i64>,
    /// Offer error pointers as a third pointer outcome
    pub error_pointers: bool,
}

impl Default for ValueDomain {
    fn default() -> Self {
        Self {
            ints: vec![0, 1, -1],
            ulongs: vec![0, 1],
            negative_ints: vec![-1],
            nonpositive_ints: vec![0, -1],
            error_pointers: true,
        }
    }
}

/// Simulation configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub strategy: Strategy,
    /// Stop enumerating after this many paths
    pub max_paths: usize,
    /// Choice points per path before the path is cut short
    pub max_depth: usize,
    /// Paths sampled by the random strategy
    pub random_runs: usize,
    /// Seed for the random strategy; drawn from entropy when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    pub domain: ValueDomain,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::Exhaustive,
            max_paths: 10_000,
            max_depth: 256,
            random_runs: 200,
            seed: None,
            domain: ValueDomain::default(),
        }
    }
}

impl SimulationConfig {
    /// Load configuration from a TOML file
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> SimulationResult<Self> {
        let content = fs::read_to_string(path)?;
        let config: SimulationConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn to_toml_file<P: AsRef<Path>>(&self, path: P) -> SimulationResult<()> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> SimulationResult<()> {
        ensure!(
            self.max_paths > 0,
            SimulationError::Configuration("max_paths must be positive".to_string())
        );
        ensure!(
            self.max_depth > 0,
            SimulationError::Configuration("max_depth must be positive".to_string())
        );
        ensure!(
            self.strategy != Strategy::Random || self.random_runs > 0,
            SimulationError::Configuration("random strategy needs random_runs > 0".to_string())
        );

        let domain = &self.domain;
        ensure!(
            !domain.ints.is_empty() && !domain.ulongs.is_empty(),
            SimulationError::Configuration("integer domains must not be empty".to_string())
        );
        ensure!(
            !domain.negative_ints.is_empty() && domain.negative_ints.iter().all(|v| *v < 0),
            SimulationError::Configuration("negative_ints must be non-empty and strictly negative".to_string())
        );
        ensure!(
            !domain.nonpositive_ints.is_empty() && domain.nonpositive_ints.iter().all(|v| *v <= 0),
            SimulationError::Configuration("nonpositive_ints must be non-empty and <= 0".to_string())
        );
        // Integer answers stand in for C `int` results such as init statuses
        ensure!(
            domain
                .ints
                .iter()
                .chain(&domain.negative_ints)
                .chain(&domain.nonpositive_ints)
                .all(|v| i32::try_from(*v).is_ok()),
            SimulationError::Configuration("integer domains must fit in a 32-bit int".to_string())
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(SimulationConfig::default().validate().is_ok());
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config: SimulationConfig = toml::from_str(
            r#"
            strategy = "random"
            seed = 7

            [domain]
            ints = [0, 5]
            "#,
        )
        .unwrap();

        assert_eq!(config.strategy, Strategy::Random);
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.domain.ints, vec![0, 5]);
        assert_eq!(config.domain.negative_ints, vec![-1]);
        assert_eq!(config.max_paths, 10_000);
    }

    #[test]
    fn rejects_bad_domains() {
        let mut config = SimulationConfig::default();
        config.domain.negative_ints = vec![-2, 0];
        assert!(matches!(config.validate(), Err(SimulationError::Configuration(_))));

        let mut config = SimulationConfig::default();
        config.max_paths = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_integers_outside_int_range() {
        let mut config = SimulationConfig::default();
        config.domain.nonpositive_ints = vec![0, -4_294_967_296];
        assert!(matches!(config.validate(), Err(SimulationError::Configuration(_))));

        let mut config = SimulationConfig::default();
        config.domain.negative_ints = vec![i64::from(i32::MIN) - 1];
        assert!(config.validate().is_err());

        let mut config = SimulationConfig::default();
        config.domain.ints = vec![0, i64::from(i32::MAX) + 1];
        assert!(config.validate().is_err());

        let mut config = SimulationConfig::default();
        config.domain.negative_ints = vec![i64::from(i32::MIN)];
        config.domain.ulongs = vec![0, u64::MAX];
        assert!(config.validate().is_ok());
    }
}
