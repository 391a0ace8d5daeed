// Model-specific error types
// Misuse of the model by scenario code, as opposed to contract violations of the modeled API

use thiserror::Error;

use crate::{EnvModelError, ErrorCode, ErrorDomain};

/// Model error codes
pub mod codes {
    use crate::ErrorCode;

    // Model error codes start with 2000
    pub const ALREADY_FINALIZED: ErrorCode = ErrorCode(2001);
    pub const UNSUPPORTED_DISCIPLINE: ErrorCode = ErrorCode(2002);
}

/// Errors raised when scenario code drives the model incorrectly
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    /// The final-state check may run only once per simulated run
    #[error("final state was already checked for this run")]
    AlreadyFinalized,

    /// An operation was applied to a resource class whose discipline does not support it
    #[error("operation `{operation}` is not supported by resource class `{class}`")]
    UnsupportedDiscipline { class: String, operation: &'static str },
}

impl EnvModelError for ModelError {
    fn code(&self) -> ErrorCode {
        use codes::*;
        match self {
            ModelError::AlreadyFinalized => ALREADY_FINALIZED,
            ModelError::UnsupportedDiscipline { .. } => UNSUPPORTED_DISCIPLINE,
        }
    }

    fn domain(&self) -> ErrorDomain {
        ErrorDomain::Model
    }
}

/// Convenient Result type for model operations
pub type ModelResult<T> = Result<T, ModelError>;

// Helper methods for creating model errors
impl ModelError {
    pub fn unsupported(class: impl Into<String>, operation: &'static str) -> Self {
        ModelError::UnsupportedDiscipline { class: class.into(), operation }
    }
}
