// Violation taxonomy
// The four kinds of fault the model can report, and the violation record itself

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{EnvModelError, ErrorCode, ErrorDomain, PropertyId};

/// Violation error codes
pub mod codes {
    use crate::ErrorCode;

    // Violation codes start with 1000
    pub const CONTRACT_VIOLATION: ErrorCode = ErrorCode(1001);
    pub const LEAK_AT_FINALIZATION: ErrorCode = ErrorCode(1002);
    pub const ORDERING_VIOLATION: ErrorCode = ErrorCode(1003);
    pub const INJECTED_MEMORY_FAULT: ErrorCode = ErrorCode(1004);
}

/// Kind of fault reported through the assertion channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ViolationKind {
    /// A resource transition broke its contract
    ContractViolation,
    /// A resource or guard was not at rest when finalization ran
    LeakAtFinalization,
    /// A callback ordering guard edge was violated
    OrderingViolation,
    /// A deliberately triggered invalid dereference
    InjectedMemoryFault,
}

impl ViolationKind {
    pub fn code(&self) -> ErrorCode {
        use codes::*;
        match self {
            ViolationKind::ContractViolation => CONTRACT_VIOLATION,
            ViolationKind::LeakAtFinalization => LEAK_AT_FINALIZATION,
            ViolationKind::OrderingViolation => ORDERING_VIOLATION,
            ViolationKind::InjectedMemoryFault => INJECTED_MEMORY_FAULT,
        }
    }

    /// Memory faults end the simulated run; everything else lets it continue
    /// so later assertions stay reachable.
    pub fn terminates_run(&self) -> bool {
        matches!(self, ViolationKind::InjectedMemoryFault)
    }
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViolationKind::ContractViolation => write!(f, "contract violation"),
            ViolationKind::LeakAtFinalization => write!(f, "leak at finalization"),
            ViolationKind::OrderingViolation => write!(f, "ordering violation"),
            ViolationKind::InjectedMemoryFault => write!(f, "injected memory fault"),
        }
    }
}

/// A single reported violation
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{kind} [{id}]: {message}")]
pub struct Violation {
    pub id: PropertyId,
    pub kind: ViolationKind,
    pub message: String,
}

impl Violation {
    pub fn new(kind: ViolationKind, id: PropertyId, message: impl Into<String>) -> Self {
        Self { id, kind, message: message.into() }
    }
}

impl EnvModelError for Violation {
    fn code(&self) -> ErrorCode {
        self.kind.code()
    }

    fn domain(&self) -> ErrorDomain {
        ErrorDomain::Model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_memory_faults_terminate() {
        assert!(ViolationKind::InjectedMemoryFault.terminates_run());
        assert!(!ViolationKind::ContractViolation.terminates_run());
        assert!(!ViolationKind::LeakAtFinalization.terminates_run());
        assert!(!ViolationKind::OrderingViolation.terminates_run());
    }

    #[test]
    fn violation_display_names_kind_and_property() {
        let violation = Violation::new(
            ViolationKind::ContractViolation,
            PropertyId::resource("spinlock", "double-acquire"),
            "spinlock acquired twice",
        );
        assert_eq!(
            violation.to_string(),
            "contract violation [resource:spinlock:double-acquire]: spinlock acquired twice"
        );
        assert_eq!(violation.code(), codes::CONTRACT_VIOLATION);
    }

    #[test]
    fn kinds_serialize_kebab_case() {
        let json = serde_json::to_string(&ViolationKind::LeakAtFinalization).unwrap();
        assert_eq!(json, "\"leak-at-finalization\"");
    }
}
