//! Backpressure patterns for the sink monitor's readiness signal.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Length of the block generated by [`PauseSequence::random`].
pub const PAUSE_BLOCK_LEN: usize = 256;

/// A cyclically repeated sequence of pause flags, one consumed per cycle.
///
/// `true` means the sink withholds readiness that cycle. The sequence never
/// ends; an empty pattern never pauses.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PauseSequence {
    pattern: Vec<bool>,
    position: usize,
}

impl PauseSequence {
    /// Generates [`PAUSE_BLOCK_LEN`] fair coin flips from `seed`.
    ///
    /// Equal seeds give equal sequences, so a failing run can be replayed.
    pub fn random(seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let pattern = (0..PAUSE_BLOCK_LEN).map(|_| rng.gen::<bool>()).collect();
        Self::from_pattern(pattern)
    }

    /// Cycles through an explicit pattern.
    pub fn from_pattern(pattern: Vec<bool>) -> Self {
        Self {
            pattern,
            position: 0,
        }
    }

    /// Pauses every cycle.
    pub fn always() -> Self {
        Self::from_pattern(vec![true])
    }

    /// Rewinds to the first entry.
    pub fn restart(&mut self) {
        self.position = 0;
    }

    /// Returns the repeated block.
    pub fn pattern(&self) -> &[bool] {
        &self.pattern
    }

    /// Index of the entry the next call to `next` returns.
    pub fn position(&self) -> usize {
        self.position
    }
}

impl Iterator for PauseSequence {
    type Item = bool;

    fn next(&mut self) -> Option<bool> {
        if self.pattern.is_empty() {
            return Some(false);
        }
        let paused = self.pattern[self.position];
        self.position = (self.position + 1) % self.pattern.len();
        Some(paused)
    }
}
