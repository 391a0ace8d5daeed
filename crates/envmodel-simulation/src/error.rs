//! Error types for Simulation
//!
//! This module defines the error types used throughout the simulation crate.
//! Contract violations found by a scenario are results, not errors; these are
//! failures of the harness itself.

//-----------------------------------------------------------------------------
// Error Types
//-----------------------------------------------------------------------------

use envmodel_error::{EnvModelError, ErrorCode, ErrorDomain, ModelError};
use thiserror::Error;

/// Harness error codes
pub mod codes {
    use envmodel_error::ErrorCode;

    // Harness error codes start with 3000
    pub const CONFIGURATION: ErrorCode = ErrorCode(3001);
    pub const UNKNOWN_SCENARIO: ErrorCode = ErrorCode(3002);
    pub const REPLAY_DIVERGED: ErrorCode = ErrorCode(3003);
    pub const MODEL_MISUSE: ErrorCode = ErrorCode(3004);
    pub const FILE_IO: ErrorCode = ErrorCode(3005);
    pub const SERIALIZATION: ErrorCode = ErrorCode(3006);
    pub const TASK: ErrorCode = ErrorCode(3007);
}

/// Main error type for the simulation crate.
#[derive(Error, Debug)]
pub enum SimulationError {
    /// Invalid or unreadable simulation configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// No scenario with this name is in the catalog.
    #[error("Unknown scenario: {0}")]
    UnknownScenario(String),

    /// A recorded choice trail does not fit the scenario it is replayed on.
    #[error("Replay diverged at choice {index}: {reason}")]
    ReplayDiverged { index: usize, reason: String },

    /// Scenario code drove the model incorrectly.
    #[error("Model misuse in scenario `{scenario}`: {source}")]
    Model {
        scenario: String,
        #[source]
        source: ModelError,
    },

    /// Represents a file I/O error.
    #[error("File I/O error: {0}")]
    FileIo(#[from] std::io::Error),

    /// Represents a serialization/deserialization error.
    #[error("Serialization/Deserialization error: {0}")]
    Serialization(String),

    /// A background scenario task failed to complete.
    #[error("Scenario task failed: {0}")]
    Task(String),
}

impl EnvModelError for SimulationError {
    fn code(&self) -> ErrorCode {
        use codes::*;
        match self {
            SimulationError::Configuration(_) => CONFIGURATION,
            SimulationError::UnknownScenario(_) => UNKNOWN_SCENARIO,
            SimulationError::ReplayDiverged { .. } => REPLAY_DIVERGED,
            SimulationError::Model { .. } => MODEL_MISUSE,
            SimulationError::FileIo(_) => FILE_IO,
            SimulationError::Serialization(_) => SERIALIZATION,
            SimulationError::Task(_) => TASK,
        }
    }

    fn domain(&self) -> ErrorDomain {
        match self {
            SimulationError::Configuration(_) => ErrorDomain::Config,
            SimulationError::Model { .. } => ErrorDomain::Model,
            SimulationError::FileIo(_) | SimulationError::Task(_) => ErrorDomain::External,
            _ => ErrorDomain::Harness,
        }
    }
}

impl From<toml::de::Error> for SimulationError {
    fn from(err: toml::de::Error) -> Self {
        SimulationError::Configuration(err.to_string())
    }
}

impl From<toml::ser::Error> for SimulationError {
    fn from(err: toml::ser::Error) -> Self {
        SimulationError::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for SimulationError {
    fn from(err: serde_json::Error) -> Self {
        SimulationError::Serialization(err.to_string())
    }
}

/// Result type alias for simulation operations.
pub type SimulationResult<T> = Result<T, SimulationError>;

#[cfg(test)]
mod tests {
    use super::*;
    use envmodel_error::ErrorMessage;

    #[test]
    fn codes_and_domains() {
        let err = SimulationError::UnknownScenario("nope".to_string());
        assert_eq!(err.code(), codes::UNKNOWN_SCENARIO);
        assert_eq!(err.domain(), ErrorDomain::Harness);

        let message = ErrorMessage::from_error(&err);
        assert_eq!(message.to_string(), "[harness-3002] Unknown scenario: nope");
    }

    #[test]
    fn toml_errors_become_configuration_errors() {
        let err: SimulationError = toml::from_str::<toml::Value>("= nope").unwrap_err().into();
        assert!(matches!(err, SimulationError::Configuration(_)));
        assert_eq!(err.domain(), ErrorDomain::Config);
    }
}
