//! Deterministic Randomness
//!
//! Provides deterministic random number generation for the random search
//! strategy, so a sampled run can be reproduced from its seed.

//-----------------------------------------------------------------------------
// Imports
//-----------------------------------------------------------------------------

use rand::prelude::{RngCore, SeedableRng, StdRng};
use rand::Rng;

/// A wrapper around a seeded Pseudo-Random Number Generator (PRNG)
/// to ensure deterministic randomness in simulations.
#[derive(Debug, Clone)]
pub struct SeededRng {
    rng: StdRng,
    seed: u64,
}

impl SeededRng {
    /// Creates a new RNG instance seeded with the given 64-bit seed.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            seed,
        }
    }

    /// Creates a new RNG instance from entropy.
    /// The generated seed is kept so the run stays replayable.
    pub fn from_entropy() -> Self {
        let mut entropy_rng = StdRng::from_entropy();
        Self::new(entropy_rng.next_u64())
    }

    /// Seeded when `seed` is given, otherwise from entropy.
    pub fn from_optional_seed(seed: Option<u64>) -> Self {
        seed.map_or_else(Self::from_entropy, Self::new)
    }

    /// Returns the seed used to initialize this RNG.
    pub fn get_seed(&self) -> u64 {
        self.seed
    }

    /// Pick an index in `0..arity`.
    pub fn choose_index(&mut self, arity: usize) -> usize {
        if arity <= 1 {
            0
        } else {
            self.rng.gen_range(0..arity)
        }
    }

    /// Derive an independent generator, e.g. one per sampled path.
    pub fn fork(&mut self) -> SeededRng {
        SeededRng::new(self.rng.next_u64())
    }
}
