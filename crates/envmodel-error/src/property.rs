// Stable property identifiers
// Every assertion in the model carries one of these so a scenario can tell
// which named property fired.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Stable identifier of a checked property, e.g. `resource:linux:block:request:double-acquire`.
///
/// Identifiers have the shape `<scope>:<subject>:<property>`. The subject may
/// itself contain colons (resource class names usually do), so the scope is
/// everything before the first colon and the property everything after the
/// last one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PropertyId(String);

impl PropertyId {
    pub fn new(scope: &str, subject: &str, property: &str) -> Self {
        Self(format!("{}:{}:{}", scope, subject, property))
    }

    /// Property of a tracked resource class.
    pub fn resource(class: &str, property: &str) -> Self {
        Self::new("resource", class, property)
    }

    /// Violated edge of a callback ordering guard.
    pub fn callback(guard: &str, edge: &str) -> Self {
        Self::new("callback", guard, edge)
    }

    /// Property of a stored resource slot.
    pub fn slot(slot: &str, property: &str) -> Self {
        Self::new("slot", slot, property)
    }

    /// Explicit test marker (expected or unexpected error).
    pub fn marker(marker: &str, label: &str) -> Self {
        Self::new("test", marker, label)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The leading segment (`resource`, `callback`, `slot`, `test`, ...).
    pub fn scope(&self) -> &str {
        self.0.split(':').next().unwrap_or_default()
    }

    /// The trailing segment naming the property itself.
    pub fn property(&self) -> &str {
        self.0.rsplit(':').next().unwrap_or_default()
    }
}

impl fmt::Display for PropertyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PropertyId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for PropertyId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl FromStr for PropertyId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segments_survive_colons_in_subject() {
        let id = PropertyId::resource("linux:block:request", "double-acquire");
        assert_eq!(id.as_str(), "resource:linux:block:request:double-acquire");
        assert_eq!(id.scope(), "resource");
        assert_eq!(id.property(), "double-acquire");
    }

    #[test]
    fn parses_and_orders() {
        let a: PropertyId = "callback:tty:already-registered".parse().unwrap();
        let b = PropertyId::callback("tty", "not-registered");
        assert_eq!(a, PropertyId::callback("tty", "already-registered"));
        assert!(a < b);
    }

    #[test]
    fn serializes_as_plain_string() {
        let id = PropertyId::marker("expected-error", "reached");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"test:expected-error:reached\"");
    }
}
