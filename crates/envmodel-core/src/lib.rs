// Resource lifecycle and assertion model
//
// This crate provides the reusable core of the driver environment model:
// per-resource state cells, the transitions that mutate them, the assertion
// channel that records violations, the callback ordering guard and the
// final-state sweep run at simulated module unload.

use envmodel_error::{ModelError, PropertyId};
use thiserror::Error;

// Module declarations
pub mod cell;
pub mod channel;
pub mod env;
pub mod finalize;
pub mod guard;
pub mod oracle;
pub mod slots;
pub mod state;
pub mod transition;

#[cfg(feature = "models")]
pub mod models;

pub use cell::{Discipline, NullRelease, ResourceCell, ResourceClass, ResourceId, ResourceState};
pub use channel::{AssertionChannel, Signal};
pub use env::Environment;
pub use finalize::FinalizationReport;
pub use guard::{CallbackGuard, CallbackRole, GuardEdge, GuardState};
pub use oracle::{assume, Handle, Pointer, Scripted, ScriptedOracle, ValueOracle, ENOMEM, PTR_MAX};
pub use slots::ResourceSlots;
pub use state::ModelState;
pub use transition::{AcquirePolicy, ResourceProperty};

/// Why a simulated path stopped early
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Halt {
    /// An `assume` did not hold; the path is not a real execution
    #[error("path is infeasible")]
    Infeasible,

    /// A terminating fault was raised through the channel
    #[error("path terminated by {0}")]
    Fault(PropertyId),

    /// Scenario code drove the model incorrectly
    #[error(transparent)]
    Misuse(#[from] ModelError),
}

impl Halt {
    pub fn is_infeasible(&self) -> bool {
        matches!(self, Halt::Infeasible)
    }
}

/// Result of one step of modeled driver code
pub type Step<T> = Result<T, Halt>;
