//! Domain Oracle
//!
//! Turns every oracle query into a choice point over a small representative
//! domain, so the explorer visits each distinct outcome of a query.

use envmodel_core::{Pointer, ValueOracle, ENOMEM, PTR_MAX};

use crate::config::ValueDomain;
use crate::explorer::ChoiceSource;

/// Pointer outcomes, in the order they are offered
const VALID: usize = 0;
const NULL: usize = 1;

/// Oracle answering from a [`ValueDomain`] through a [`ChoiceSource`].
pub struct DomainOracle<'d, C> {
    source: C,
    domain: &'d ValueDomain,
    next_address: u64,
}

impl<'d, C: ChoiceSource> DomainOracle<'d, C> {
    pub fn new(source: C, domain: &'d ValueDomain) -> Self {
        Self {
            source,
            domain,
            next_address: 0,
        }
    }

    /// Pick which of `runnable` logical threads steps next.
    pub fn schedule(&mut self, runnable: usize) -> usize {
        self.pick(runnable)
    }

    pub fn source(&self) -> &C {
        &self.source
    }

    pub fn into_source(self) -> C {
        self.source
    }

    // Single alternatives are not choice points and leave no trace in the trail.
    fn pick(&mut self, arity: usize) -> usize {
        if arity <= 1 {
            0
        } else {
            self.source.choose(arity)
        }
    }

    fn fresh_address(&mut self) -> u64 {
        self.next_address = self.next_address % PTR_MAX + 1;
        self.next_address
    }
}

impl<'d, C: ChoiceSource> ValueOracle for DomainOracle<'d, C> {
    fn arbitrary_int(&mut self) -> i64 {
        let domain = self.domain;
        let index = self.pick(domain.ints.len());
        domain.ints.get(index).copied().unwrap_or_default()
    }

    fn arbitrary_ulong(&mut self) -> u64 {
        let domain = self.domain;
        let index = self.pick(domain.ulongs.len());
        domain.ulongs.get(index).copied().unwrap_or_default()
    }

    fn arbitrary_negative_int(&mut self) -> i64 {
        let domain = self.domain;
        let index = self.pick(domain.negative_ints.len());
        domain.negative_ints.get(index).copied().unwrap_or(-1)
    }

    fn arbitrary_nonpositive_int(&mut self) -> i64 {
        let domain = self.domain;
        let index = self.pick(domain.nonpositive_ints.len());
        domain.nonpositive_ints.get(index).copied().unwrap_or_default()
    }

    fn arbitrary_ptr(&mut self) -> Pointer {
        let arity = if self.domain.error_pointers { 3 } else { 2 };
        match self.pick(arity) {
            VALID => Pointer::Addr(self.fresh_address()),
            NULL => Pointer::Null,
            _ => Pointer::err(ENOMEM),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::explorer::{ChoiceTrail, ReplayChoices};

    #[test]
    fn queries_become_choice_points() {
        let domain = ValueDomain::default();
        let mut replay = ReplayChoices::new(vec![2, 1, 2]);
        let mut oracle = DomainOracle::new(&mut replay, &domain);

        assert_eq!(oracle.arbitrary_int(), -1);
        assert_eq!(oracle.arbitrary_nonpositive_int(), -1);
        assert!(oracle.arbitrary_ptr().is_err());
        // single-valued domains are not choice points
        assert_eq!(oracle.arbitrary_negative_int(), -1);
        drop(oracle);
        assert!(replay.finish().is_ok());
    }

    #[test]
    fn pointers_without_error_domain_have_two_outcomes() {
        let domain = ValueDomain {
            error_pointers: false,
            ..ValueDomain::default()
        };
        let mut trail = ChoiceTrail::new(4);
        let mut seen = Vec::new();
        loop {
            let mut oracle = DomainOracle::new(&mut trail, &domain);
            seen.push(oracle.arbitrary_ptr());
            drop(oracle);
            if !trail.advance() {
                break;
            }
        }
        assert_eq!(seen, vec![Pointer::Addr(1), Pointer::Null]);
    }

    #[test]
    fn scheduling_one_thread_is_free() {
        let domain = ValueDomain::default();
        let mut oracle = DomainOracle::new(ChoiceTrail::new(4), &domain);
        assert_eq!(oracle.schedule(1), 0);
        assert_eq!(oracle.schedule(2), 0);
        assert_eq!(oracle.source().taken(), vec![0]);
        assert!(oracle.into_source().advance());
    }
}
