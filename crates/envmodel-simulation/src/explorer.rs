//! Choice Sources
//!
//! Every nondeterministic decision of a simulated path (an oracle value or
//! which logical thread runs next) is resolved through a [`ChoiceSource`].
//! Swapping the source switches between exhaustive search, random sampling
//! and replay of a recorded witness.

use crate::error::{SimulationError, SimulationResult};
use crate::randomness::SeededRng;

//-----------------------------------------------------------------------------
// Choice Source Trait
//-----------------------------------------------------------------------------

/// Resolves choice points along one path.
pub trait ChoiceSource {
    /// Pick one of `arity` alternatives; `arity` is at least 2.
    fn choose(&mut self, arity: usize) -> usize;

    /// Alternatives taken so far on the current path.
    fn taken(&self) -> Vec<usize>;

    /// Whether the path ran past the depth bound and was forced down its
    /// first alternative from there on.
    fn truncated(&self) -> bool {
        false
    }
}

impl<T: ChoiceSource + ?Sized> ChoiceSource for &mut T {
    fn choose(&mut self, arity: usize) -> usize {
        (**self).choose(arity)
    }

    fn taken(&self) -> Vec<usize> {
        (**self).taken()
    }

    fn truncated(&self) -> bool {
        (**self).truncated()
    }
}

//-----------------------------------------------------------------------------
// Exhaustive Search
//-----------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Choice {
    taken: usize,
    arity: usize,
}

/// Depth-first enumeration of every combination of choices.
///
/// The trail replays its prefix on the next path and extends it with first
/// alternatives; [`ChoiceTrail::advance`] then bumps the deepest choice that
/// still has an unexplored alternative.
#[derive(Debug, Clone)]
pub struct ChoiceTrail {
    stack: Vec<Choice>,
    cursor: usize,
    max_depth: usize,
    truncated: bool,
}

impl ChoiceTrail {
    pub fn new(max_depth: usize) -> Self {
        Self {
            stack: Vec::new(),
            cursor: 0,
            max_depth,
            truncated: false,
        }
    }

    /// Move to the next unexplored path. Returns false once every
    /// alternative has been visited.
    pub fn advance(&mut self) -> bool {
        self.stack.truncate(self.cursor);
        self.cursor = 0;
        self.truncated = false;

        while let Some(last) = self.stack.last_mut() {
            if last.taken + 1 < last.arity {
                last.taken += 1;
                return true;
            }
            self.stack.pop();
        }
        false
    }
}

impl ChoiceSource for ChoiceTrail {
    fn choose(&mut self, arity: usize) -> usize {
        if let Some(choice) = self.stack.get(self.cursor) {
            self.cursor += 1;
            return choice.taken.min(arity.saturating_sub(1));
        }
        if self.stack.len() >= self.max_depth {
            self.truncated = true;
            return 0;
        }
        self.stack.push(Choice { taken: 0, arity });
        self.cursor += 1;
        0
    }

    fn taken(&self) -> Vec<usize> {
        self.stack[..self.cursor].iter().map(|choice| choice.taken).collect()
    }

    fn truncated(&self) -> bool {
        self.truncated
    }
}

//-----------------------------------------------------------------------------
// Random Sampling
//-----------------------------------------------------------------------------

/// Uniformly random choices from a seeded generator.
#[derive(Debug, Clone)]
pub struct RandomChoices {
    rng: SeededRng,
    taken: Vec<usize>,
    max_depth: usize,
    truncated: bool,
}

impl RandomChoices {
    pub fn new(rng: SeededRng, max_depth: usize) -> Self {
        Self {
            rng,
            taken: Vec::new(),
            max_depth,
            truncated: false,
        }
    }
}

impl ChoiceSource for RandomChoices {
    fn choose(&mut self, arity: usize) -> usize {
        if self.taken.len() >= self.max_depth {
            self.truncated = true;
            return 0;
        }
        let index = self.rng.choose_index(arity);
        self.taken.push(index);
        index
    }

    fn taken(&self) -> Vec<usize> {
        self.taken.clone()
    }

    fn truncated(&self) -> bool {
        self.truncated
    }
}

//-----------------------------------------------------------------------------
// Replay
//-----------------------------------------------------------------------------

/// Follows a recorded trail exactly.
#[derive(Debug, Clone)]
pub struct ReplayChoices {
    choices: Vec<usize>,
    cursor: usize,
    divergence: Option<(usize, String)>,
}

impl ReplayChoices {
    pub fn new(choices: Vec<usize>) -> Self {
        Self {
            choices,
            cursor: 0,
            divergence: None,
        }
    }

    fn diverge(&mut self, reason: String) {
        if self.divergence.is_none() {
            self.divergence = Some((self.cursor, reason));
        }
    }

    /// Fails if the path asked for choices the trail could not answer, or
    /// ended before using all of them.
    pub fn finish(&self) -> SimulationResult<()> {
        if let Some((index, reason)) = &self.divergence {
            return Err(SimulationError::ReplayDiverged {
                index: *index,
                reason: reason.clone(),
            });
        }
        if self.cursor < self.choices.len() {
            return Err(SimulationError::ReplayDiverged {
                index: self.cursor,
                reason: format!("path ended with {} unused choices", self.choices.len() - self.cursor),
            });
        }
        Ok(())
    }
}

impl ChoiceSource for ReplayChoices {
    fn choose(&mut self, arity: usize) -> usize {
        let index = match self.choices.get(self.cursor) {
            Some(choice) if *choice < arity => *choice,
            Some(choice) => {
                let reason = format!("choice {} out of range for {} alternatives", choice, arity);
                self.diverge(reason);
                0
            }
            None => {
                self.diverge("trail exhausted".to_string());
                0
            }
        };
        self.cursor += 1;
        index
    }

    fn taken(&self) -> Vec<usize> {
        self.choices.iter().take(self.cursor).copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Walk a fixed two-level tree: a binary choice, then a ternary one only
    /// on the first branch.
    fn walk(trail: &mut ChoiceTrail) -> Vec<usize> {
        let first = trail.choose(2);
        if first == 0 {
            trail.choose(3);
        }
        trail.taken()
    }

    #[test]
    fn trail_enumerates_every_path_once() {
        let mut trail = ChoiceTrail::new(8);
        let mut paths = Vec::new();
        loop {
            paths.push(walk(&mut trail));
            if !trail.advance() {
                break;
            }
        }
        assert_eq!(
            paths,
            vec![vec![0, 0], vec![0, 1], vec![0, 2], vec![1]]
        );
    }

    #[test]
    fn depth_bound_forces_first_alternative() {
        let mut trail = ChoiceTrail::new(1);
        assert_eq!(walk(&mut trail), vec![0]);
        assert!(trail.truncated());
        assert!(trail.advance());
        assert!(!trail.truncated());
        assert_eq!(walk(&mut trail), vec![1]);
        assert!(!trail.advance());
    }

    #[test]
    fn replay_detects_divergence() {
        let mut replay = ReplayChoices::new(vec![1, 5]);
        assert_eq!(replay.choose(2), 1);
        assert_eq!(replay.choose(3), 0);
        assert!(matches!(
            replay.finish(),
            Err(SimulationError::ReplayDiverged { index: 1, .. })
        ));

        let mut replay = ReplayChoices::new(vec![0, 1]);
        replay.choose(2);
        assert!(replay.finish().is_err());
    }

    #[test]
    fn random_choices_are_recorded() {
        let mut choices = RandomChoices::new(SeededRng::new(1), 4);
        let picks: Vec<_> = (0..6).map(|_| choices.choose(2)).collect();
        assert_eq!(choices.taken(), picks[..4].to_vec());
        assert!(choices.truncated());
    }
}
