// Callback ordering guard
//
// A four-state machine asserting that a driver's callbacks are invoked in
// registration order: register, start (probe), stop (release), deregister.

use std::fmt;

use envmodel_error::{PropertyId, ViolationKind};
use serde::Serialize;
use tracing::debug;

use crate::state::ModelState;

/// Lifecycle state of a callback guard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum GuardState {
    #[default]
    Unregistered,
    Registered,
    Started,
    Stopped,
}

impl GuardState {
    /// Registered but not started; the states deregistration is legal from.
    pub fn is_pre_start(&self) -> bool {
        matches!(self, GuardState::Registered | GuardState::Stopped)
    }
}

impl fmt::Display for GuardState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GuardState::Unregistered => write!(f, "unregistered"),
            GuardState::Registered => write!(f, "registered"),
            GuardState::Started => write!(f, "started"),
            GuardState::Stopped => write!(f, "stopped"),
        }
    }
}

/// Callback roles the harness dispatches through a guard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CallbackRole {
    Register,
    /// `probe_up`
    Start,
    /// `release_down`
    Stop,
    Deregister,
    /// Any callback that needs the driver registered
    Invoke,
    /// A callback that is only legal between start and stop
    InvokeMiddle,
}

/// Violated guard edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum GuardEdge {
    AlreadyRegistered,
    NotRegistered,
    AlreadyStarted,
    NotStarted,
    DeregisterWhileStarted,
    InvokedUnregistered,
    MiddleNotStarted,
    RegisteredAtExit,
}

impl GuardEdge {
    pub fn as_str(&self) -> &'static str {
        match self {
            GuardEdge::AlreadyRegistered => "already-registered",
            GuardEdge::NotRegistered => "not-registered",
            GuardEdge::AlreadyStarted => "already-started",
            GuardEdge::NotStarted => "not-started",
            GuardEdge::DeregisterWhileStarted => "deregister-while-started",
            GuardEdge::InvokedUnregistered => "invoked-unregistered",
            GuardEdge::MiddleNotStarted => "middle-not-started",
            GuardEdge::RegisteredAtExit => "registered-at-exit",
        }
    }

    pub fn id(&self, guard: &str) -> PropertyId {
        PropertyId::callback(guard, self.as_str())
    }
}

impl fmt::Display for GuardEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// State machine for one guarded callback table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CallbackGuard {
    state: GuardState,
}

impl CallbackGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> GuardState {
        self.state
    }

    /// Apply a role. On an illegal edge the state is left unchanged and the
    /// violated edge is returned.
    pub fn apply(&mut self, role: CallbackRole) -> Result<GuardState, GuardEdge> {
        use GuardState::*;

        let next = match (role, self.state) {
            (CallbackRole::Register, Unregistered) => Registered,
            (CallbackRole::Register, _) => return Err(GuardEdge::AlreadyRegistered),

            (CallbackRole::Start, Registered | Stopped) => Started,
            (CallbackRole::Start, Unregistered) => return Err(GuardEdge::NotRegistered),
            (CallbackRole::Start, Started) => return Err(GuardEdge::AlreadyStarted),

            (CallbackRole::Stop, Started) => Stopped,
            (CallbackRole::Stop, Unregistered) => return Err(GuardEdge::NotRegistered),
            (CallbackRole::Stop, _) => return Err(GuardEdge::NotStarted),

            (CallbackRole::Deregister, Registered | Stopped) => Unregistered,
            (CallbackRole::Deregister, Started) => return Err(GuardEdge::DeregisterWhileStarted),
            (CallbackRole::Deregister, Unregistered) => return Err(GuardEdge::NotRegistered),

            (CallbackRole::Invoke, Unregistered) => return Err(GuardEdge::InvokedUnregistered),
            (CallbackRole::Invoke, state) => state,

            (CallbackRole::InvokeMiddle, Started) => Started,
            (CallbackRole::InvokeMiddle, _) => return Err(GuardEdge::MiddleNotStarted),
        };

        self.state = next;
        Ok(next)
    }
}

impl ModelState {
    /// Drive the named guard through `role`, raising an ordering violation on
    /// an illegal edge. Returns whether the edge was legal.
    pub fn callback(&mut self, guard: &'static str, role: CallbackRole) -> bool {
        let (outcome, before) = {
            let entry = self.guards.entry(guard).or_default();
            let before = entry.state();
            (entry.apply(role), before)
        };

        match outcome {
            Ok(after) => {
                debug!(guard, ?role, %before, %after, "callback guard advanced");
                true
            }
            Err(edge) => {
                self.channel.raise(
                    ViolationKind::OrderingViolation,
                    edge.id(guard),
                    format!("{:?} on guard `{}` in state {}", role, guard, before),
                );
                false
            }
        }
    }

    pub fn guard_state(&self, guard: &str) -> GuardState {
        self.guards.get(guard).map(CallbackGuard::state).unwrap_or_default()
    }
}
