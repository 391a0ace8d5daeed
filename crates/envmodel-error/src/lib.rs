// Envmodel Error Handling Framework
// Central location for the violation taxonomy, property identifiers and error codes

use std::fmt;

// Re-export thiserror so dependants derive against the same version
pub use thiserror;

// Module structure
mod macros;
mod model;
mod property;
mod violation;

// Public exports
pub use model::{ModelError, ModelResult};
pub use property::PropertyId;
pub use violation::{Violation, ViolationKind};

/// Error domains representing different components of the workspace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ErrorDomain {
    Model, Harness, Config, External,
}
impl fmt::Display for ErrorDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorDomain::Model => write!(f, "model"),
            ErrorDomain::Harness => write!(f, "harness"),
            ErrorDomain::Config => write!(f, "config"),
            ErrorDomain::External => write!(f, "external"),
        }
    }
}

/// Error code structure for categorizing errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub struct ErrorCode(pub u32);
impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}", self.0)
    }
}

/// Standard error message format for serialization
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ErrorMessage {
    pub code: ErrorCode,
    pub domain: ErrorDomain,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorMessage {
    /// Capture any workspace error in its serializable form.
    pub fn from_error<E: EnvModelError + ?Sized>(err: &E) -> Self {
        Self {
            code: err.code(),
            domain: err.domain(),
            message: err.to_string(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

impl fmt::Display for ErrorMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}-{}] {}", self.domain, self.code, self.message)
    }
}

/// Base trait for all errors in the envmodel workspace.
pub trait EnvModelError: std::error::Error + fmt::Debug + Send + Sync + 'static {
    /// Returns the numeric code for this error.
    fn code(&self) -> ErrorCode;

    /// Returns the component this error originates from.
    fn domain(&self) -> ErrorDomain;
}
