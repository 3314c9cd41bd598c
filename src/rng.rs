//! Random sources for sampling decisions.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::{SystemTime, UNIX_EPOCH};

/// A source of uniformly distributed integers.
pub trait RandomSource {
    /// Yield an integer uniformly distributed in `[0, bound)`. `bound`
    /// is never zero.
    fn below(&mut self, bound: u32) -> u32;
}

impl<'a, R: RandomSource + ?Sized> RandomSource for &'a mut R {
    fn below(&mut self, bound: u32) -> u32 {
        (**self).below(bound)
    }
}

impl<R: RandomSource + ?Sized> RandomSource for Box<R> {
    fn below(&mut self, bound: u32) -> u32 {
        (**self).below(bound)
    }
}

/// The generator shared by every instrumentation decision made in one
/// compiler process.
#[derive(Clone, Debug)]
pub struct ProcessRng {
    seed: u64,
    rng: StdRng,
}

impl ProcessRng {
    pub fn from_seed(seed: u64) -> Self {
        ProcessRng {
            seed,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Seed from the wall clock and the process id, so that many
    /// compilations started within the same second still get distinct
    /// instrumentation patterns.
    pub fn from_time_and_pid() -> Self {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        let seed = now.as_secs() ^ u64::from(now.subsec_micros()) ^ u64::from(std::process::id());
        log::debug!("seeding process rng with {:#x}", seed);
        Self::from_seed(seed)
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }
}

impl RandomSource for ProcessRng {
    fn below(&mut self, bound: u32) -> u32 {
        self.rng.gen_range(0..bound)
    }
}

/// Replays a fixed sequence of draws, wrapping around at the end.
/// Each draw is reduced modulo the requested bound.
#[derive(Clone, Debug)]
pub struct SequenceSource {
    values: Vec<u32>,
    next: usize,
}

impl SequenceSource {
    pub fn new(values: Vec<u32>) -> Self {
        assert!(!values.is_empty(), "SequenceSource needs at least one value");
        SequenceSource { values, next: 0 }
    }

    /// How many draws have been made so far.
    pub fn draws(&self) -> usize {
        self.next
    }
}

impl RandomSource for SequenceSource {
    fn below(&mut self, bound: u32) -> u32 {
        let value = self.values[self.next % self.values.len()];
        self.next += 1;
        value % bound
    }
}
