// Value oracle
//
// The model never computes real kernel results. Wherever the modeled API would
// return data it asks an oracle for an arbitrary value instead, and the runner
// behind the oracle decides which alternatives get explored.

use std::collections::VecDeque;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Halt, Step};

/// Pointers above this address encode error values (`ERR_PTR`).
pub const PTR_MAX: u64 = 2012;

/// Out of memory, the errno used for synthesized error pointers.
pub const ENOMEM: u32 = 12;

/// A pointer-like value handed out by the oracle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Pointer {
    /// The null pointer
    Null,
    /// A non-null address; addresses above [`PTR_MAX`] are error pointers
    Addr(u64),
}

impl Pointer {
    /// Encode `errno` as an error pointer.
    pub fn err(errno: u32) -> Self {
        Pointer::Addr(PTR_MAX + u64::from(errno.max(1)))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Pointer::Null)
    }

    pub fn is_err(&self) -> bool {
        matches!(self, Pointer::Addr(addr) if *addr > PTR_MAX)
    }

    /// Non-null and not an error pointer.
    pub fn is_valid(&self) -> bool {
        !self.is_null() && !self.is_err()
    }

    pub fn address(&self) -> Option<u64> {
        match self {
            Pointer::Null => None,
            Pointer::Addr(addr) => Some(*addr),
        }
    }
}

impl fmt::Display for Pointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pointer::Null => write!(f, "NULL"),
            Pointer::Addr(addr) if *addr > PTR_MAX => write!(f, "ERR_PTR(-{})", addr - PTR_MAX),
            Pointer::Addr(addr) => write!(f, "{:#x}", addr),
        }
    }
}

/// Handle returned by a successful acquisition; always a valid pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Handle(u64);

impl Handle {
    pub fn from_pointer(pointer: Pointer) -> Option<Self> {
        if pointer.is_valid() {
            pointer.address().map(Handle)
        } else {
            None
        }
    }

    pub fn address(&self) -> u64 {
        self.0
    }

    pub fn pointer(&self) -> Pointer {
        Pointer::Addr(self.0)
    }
}

/// Source of arbitrary values for the model.
///
/// Implementations decide which concrete value a query yields on the current
/// path: a scripted replay, a seeded random draw, or a choice point that an
/// explorer later revisits with every alternative.
#[cfg_attr(test, mockall::automock)]
pub trait ValueOracle {
    /// Any integer (`ldv_undef_int`).
    fn arbitrary_int(&mut self) -> i64;

    /// Any unsigned long (`ldv_undef_ulong`).
    fn arbitrary_ulong(&mut self) -> u64;

    /// Any strictly negative integer, typically an error code.
    fn arbitrary_negative_int(&mut self) -> i64;

    /// Any integer `<= 0`.
    fn arbitrary_nonpositive_int(&mut self) -> i64;

    /// Any pointer: valid, null, or an error pointer.
    fn arbitrary_ptr(&mut self) -> Pointer;
}

/// Continue only if `condition` holds; otherwise prune the current path.
pub fn assume(condition: bool) -> Step<()> {
    if condition {
        Ok(())
    } else {
        Err(Halt::Infeasible)
    }
}

/// A single scripted oracle answer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scripted {
    Int(i64),
    Ulong(u64),
    Ptr(Pointer),
}

/// Oracle replaying a fixed sequence of answers, for single-path deterministic runs.
///
/// Answers are consumed front to back. A query whose kind does not match the
/// next scripted answer, or any query after the script is exhausted, gets a
/// neutral default (zero, `-1`, or a fresh valid pointer) without consuming.
#[derive(Debug, Clone, Default)]
pub struct ScriptedOracle {
    script: VecDeque<Scripted>,
    next_address: u64,
    consumed: usize,
}

impl ScriptedOracle {
    pub fn new(script: impl IntoIterator<Item = Scripted>) -> Self {
        Self {
            script: script.into_iter().collect(),
            next_address: 0,
            consumed: 0,
        }
    }

    /// Number of scripted answers handed out so far.
    pub fn consumed(&self) -> usize {
        self.consumed
    }

    pub fn remaining(&self) -> usize {
        self.script.len()
    }

    fn next_int(&mut self) -> Option<i64> {
        match self.script.front() {
            Some(Scripted::Int(value)) => {
                let value = *value;
                self.script.pop_front();
                self.consumed += 1;
                Some(value)
            }
            _ => None,
        }
    }

    fn fresh_address(&mut self) -> Pointer {
        self.next_address = self.next_address % PTR_MAX + 1;
        Pointer::Addr(self.next_address)
    }
}

impl ValueOracle for ScriptedOracle {
    fn arbitrary_int(&mut self) -> i64 {
        self.next_int().unwrap_or(0)
    }

    fn arbitrary_ulong(&mut self) -> u64 {
        match self.script.front() {
            Some(Scripted::Ulong(value)) => {
                let value = *value;
                self.script.pop_front();
                self.consumed += 1;
                value
            }
            _ => 0,
        }
    }

    fn arbitrary_negative_int(&mut self) -> i64 {
        self.next_int().map(|value| value.min(-1)).unwrap_or(-1)
    }

    fn arbitrary_nonpositive_int(&mut self) -> i64 {
        self.next_int().map(|value| value.min(0)).unwrap_or(0)
    }

    fn arbitrary_ptr(&mut self) -> Pointer {
        match self.script.front() {
            Some(Scripted::Ptr(pointer)) => {
                let pointer = *pointer;
                self.script.pop_front();
                self.consumed += 1;
                pointer
            }
            _ => self.fresh_address(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_pointers_sit_above_ptr_max() {
        let err = Pointer::err(ENOMEM);
        assert!(err.is_err());
        assert!(!err.is_null());
        assert!(!err.is_valid());
        assert_eq!(err.to_string(), "ERR_PTR(-12)");
        assert!(Pointer::Addr(PTR_MAX).is_valid());
        assert!(Handle::from_pointer(err).is_none());
        assert!(Handle::from_pointer(Pointer::Null).is_none());
    }

    #[test]
    fn scripted_oracle_replays_in_order() {
        let mut oracle = ScriptedOracle::new([
            Scripted::Int(1),
            Scripted::Ptr(Pointer::Null),
            Scripted::Int(5),
        ]);
        assert_eq!(oracle.arbitrary_int(), 1);
        assert_eq!(oracle.arbitrary_ptr(), Pointer::Null);
        // 5 is not negative, so the negative query clamps it
        assert_eq!(oracle.arbitrary_negative_int(), -1);
        assert_eq!(oracle.consumed(), 3);
        assert_eq!(oracle.remaining(), 0);
    }

    #[test]
    fn scripted_oracle_defaults_without_consuming_on_mismatch() {
        let mut oracle = ScriptedOracle::new([Scripted::Ptr(Pointer::Null)]);
        assert_eq!(oracle.arbitrary_int(), 0);
        assert_eq!(oracle.remaining(), 1);
        assert_eq!(oracle.arbitrary_ptr(), Pointer::Null);
        assert!(oracle.arbitrary_ptr().is_valid());
        assert_eq!(oracle.arbitrary_nonpositive_int(), 0);
    }

    #[test]
    fn assume_prunes_false_branches() {
        assert_eq!(assume(true), Ok(()));
        assert_eq!(assume(false), Err(Halt::Infeasible));
    }
}
