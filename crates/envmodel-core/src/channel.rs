// Assertion channel
//
// Collects every violation raised during one simulated run. Nothing here
// aborts the run except the memory fault helpers, which hand back the `Halt`
// the caller must propagate.

use envmodel_error::{PropertyId, Violation, ViolationKind};
use serde::Serialize;
use tracing::warn;

use crate::Halt;

/// Marker names used for explicit test assertions
pub mod markers {
    pub const EXPECTED_ERROR: &str = "expected-error";
    pub const UNEXPECTED_ERROR: &str = "unexpected-error";
    pub const EXPECTED_MEMORY_FAULT: &str = "expected-memory-fault";
    pub const UNEXPECTED_MEMORY_FAULT: &str = "unexpected-memory-fault";
}

/// A violation together with its position in the run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Signal {
    pub sequence: usize,
    #[serde(flatten)]
    pub violation: Violation,
}

impl Signal {
    pub fn id(&self) -> &PropertyId {
        &self.violation.id
    }

    pub fn kind(&self) -> ViolationKind {
        self.violation.kind
    }
}

/// Ordered record of the signals raised in one run
#[derive(Debug, Clone, Default)]
pub struct AssertionChannel {
    signals: Vec<Signal>,
}

impl AssertionChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a violation unconditionally.
    pub fn raise(&mut self, kind: ViolationKind, id: PropertyId, message: impl Into<String>) {
        let violation = Violation::new(kind, id, message);
        warn!(code = %violation.kind.code(), "{}", violation);
        self.signals.push(Signal {
            sequence: self.signals.len(),
            violation,
        });
    }

    /// Check a named contract property. Returns `condition`, so callers can
    /// decide whether to go on with the guarded state change.
    pub fn assert_named(&mut self, id: PropertyId, condition: bool) -> bool {
        self.assert_kind(ViolationKind::ContractViolation, id, condition)
    }

    pub fn assert_kind(&mut self, kind: ViolationKind, id: PropertyId, condition: bool) -> bool {
        if !condition {
            let message = format!("assertion `{}` failed", id);
            self.raise(kind, id, message);
        }
        condition
    }

    /// Raise a memory fault and return the halt that ends the path.
    pub fn fail_unconditionally(&mut self, id: PropertyId) -> Halt {
        self.raise(ViolationKind::InjectedMemoryFault, id.clone(), "invalid memory access");
        Halt::Fault(id)
    }

    /// Mark a point the scenario expects to reach.
    pub fn expected_error(&mut self, label: &str) {
        self.raise(
            ViolationKind::ContractViolation,
            PropertyId::marker(markers::EXPECTED_ERROR, label),
            format!("reached expected error `{}`", label),
        );
    }

    /// Mark a point the scenario must never reach.
    pub fn unexpected_error(&mut self, label: &str) {
        self.raise(
            ViolationKind::ContractViolation,
            PropertyId::marker(markers::UNEXPECTED_ERROR, label),
            format!("reached unexpected error `{}`", label),
        );
    }

    pub fn expected_memory_fault(&mut self, label: &str) -> Halt {
        self.fail_unconditionally(PropertyId::marker(markers::EXPECTED_MEMORY_FAULT, label))
    }

    pub fn unexpected_memory_fault(&mut self, label: &str) -> Halt {
        self.fail_unconditionally(PropertyId::marker(markers::UNEXPECTED_MEMORY_FAULT, label))
    }

    pub fn signals(&self) -> &[Signal] {
        &self.signals
    }

    pub fn fired(&self, id: &PropertyId) -> bool {
        self.signals.iter().any(|signal| signal.id() == id)
    }

    pub fn count(&self, id: &PropertyId) -> usize {
        self.signals.iter().filter(|signal| signal.id() == id).count()
    }

    pub fn of_kind(&self, kind: ViolationKind) -> impl Iterator<Item = &Signal> {
        self.signals.iter().filter(move |signal| signal.kind() == kind)
    }

    pub fn is_clean(&self) -> bool {
        self.signals.is_empty()
    }

    pub fn into_signals(self) -> Vec<Signal> {
        self.signals
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assert_named_records_only_failures() {
        let mut channel = AssertionChannel::new();
        let id = PropertyId::resource("lock", "double-acquire");

        assert!(channel.assert_named(id.clone(), true));
        assert!(channel.is_clean());

        assert!(!channel.assert_named(id.clone(), false));
        assert!(!channel.assert_named(id.clone(), false));
        assert_eq!(channel.count(&id), 2);
        assert_eq!(channel.signals()[1].sequence, 1);
        assert_eq!(channel.signals()[0].kind(), ViolationKind::ContractViolation);
    }

    #[test]
    fn markers_use_test_scope() {
        let mut channel = AssertionChannel::new();
        channel.expected_error("reached");
        channel.unexpected_error("open");

        assert!(channel.fired(&"test:expected-error:reached".into()));
        assert!(channel.fired(&"test:unexpected-error:open".into()));
    }

    #[test]
    fn memory_faults_return_a_terminating_halt() {
        let mut channel = AssertionChannel::new();
        let halt = channel.expected_memory_fault("null-deref");

        let id = PropertyId::marker(markers::EXPECTED_MEMORY_FAULT, "null-deref");
        assert_eq!(halt, Halt::Fault(id.clone()));
        assert_eq!(channel.of_kind(ViolationKind::InjectedMemoryFault).count(), 1);
        assert!(channel.signals()[0].kind().terminates_run());
    }

    #[test]
    fn signals_serialize_flat() {
        let mut channel = AssertionChannel::new();
        channel.raise(
            ViolationKind::OrderingViolation,
            PropertyId::callback("tty", "already-registered"),
            "registered twice",
        );
        let json = serde_json::to_value(&channel.signals()[0]).unwrap();
        assert_eq!(json["sequence"], 0);
        assert_eq!(json["id"], "callback:tty:already-registered");
        assert_eq!(json["kind"], "ordering-violation");
    }
}
