use crate::domain::ports::RandomSource;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;

#[derive(Debug, Clone)]
pub struct StdRandom {
    rng: StdRng,
}

impl StdRandom {
    pub fn from_os_rng() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
        }
    }

    /// Reproducible draws, e.g. for rehearsals.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for StdRandom {
    fn default() -> Self {
        Self::from_os_rng()
    }
}

impl RandomSource for StdRandom {
    fn next_index(&mut self, len: usize) -> usize {
        self.rng.random_range(0..len)
    }
}

/// Replays a fixed list of indices (each taken modulo `len`), then yields 0.
#[derive(Debug, Clone, Default)]
pub struct ScriptedRandom {
    script: VecDeque<usize>,
}

impl ScriptedRandom {
    pub fn new(script: impl IntoIterator<Item = usize>) -> Self {
        Self {
            script: script.into_iter().collect(),
        }
    }
}

impl RandomSource for ScriptedRandom {
    fn next_index(&mut self, len: usize) -> usize {
        self.script.pop_front().map(|index| index % len).unwrap_or(0)
    }
}
