//! Seeded randomness, one generator per concern.

use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::time::Duration;

/// Deterministic random source for one concern (topology, one topic's
/// assignment, one node's actor).
///
/// Never shared between tasks: reseeding or advancing one concern leaves
/// every other concern's sequence untouched.
#[derive(Debug, Clone)]
pub struct RandomSource {
    seed: u64,
    rng: ChaCha8Rng,
}

impl RandomSource {
    /// Create a source from a seed.
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Create the source for the `offset`-th instance of a concern, e.g. the
    /// actor of node `offset` or the `offset`-th topic.
    pub fn derived(base_seed: u64, offset: u64) -> Self {
        Self::new(base_seed.wrapping_add(offset))
    }

    /// The seed this source started from.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Uniform index in `0..len`.
    ///
    /// # Panics
    ///
    /// Panics if `len` is zero.
    pub fn below(&mut self, len: usize) -> usize {
        self.rng.gen_range(0..len)
    }

    /// Uniform value in `min..=max`.
    ///
    /// # Panics
    ///
    /// Panics if `min > max`.
    pub fn between(&mut self, min: usize, max: usize) -> usize {
        self.rng.gen_range(min..=max)
    }

    /// Uniform float in `[0, 1)`.
    pub fn unit(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }

    /// Fill `buf` with random bytes.
    pub fn fill(&mut self, buf: &mut [u8]) {
        self.rng.fill_bytes(buf);
    }

    /// Uniform duration in `min..=max`, at millisecond granularity.
    /// Durations beyond `u64::MAX` milliseconds saturate.
    pub fn duration_between(&mut self, min: Duration, max: Duration) -> Duration {
        let min_ms = whole_millis(min);
        let max_ms = whole_millis(max).max(min_ms);
        Duration::from_millis(self.rng.gen_range(min_ms..=max_ms))
    }
}

fn whole_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_sequence() {
        let mut a = RandomSource::new(42);
        let mut b = RandomSource::new(42);
        let seq_a: Vec<_> = (0..16).map(|_| a.below(1000)).collect();
        let seq_b: Vec<_> = (0..16).map(|_| b.below(1000)).collect();
        assert_eq!(seq_a, seq_b);
    }

    #[test]
    fn test_derived_sources_are_independent() {
        let mut first = RandomSource::derived(123, 0);
        let mut second = RandomSource::derived(123, 1);
        assert_eq!(second.seed(), 124);

        let seq_a: Vec<_> = (0..16).map(|_| first.below(1 << 20)).collect();
        let seq_b: Vec<_> = (0..16).map(|_| second.below(1 << 20)).collect();
        assert_ne!(seq_a, seq_b);
    }

    #[test]
    fn test_derived_wraps_instead_of_overflowing() {
        assert_eq!(RandomSource::derived(u64::MAX, 2).seed(), 1);
    }

    #[test]
    fn test_between_respects_bounds() {
        let mut rng = RandomSource::new(7);
        for _ in 0..200 {
            let v = rng.between(3, 5);
            assert!((3..=5).contains(&v));
        }
        assert_eq!(rng.between(10, 10), 10);
    }

    #[test]
    fn test_duration_between_respects_bounds() {
        let mut rng = RandomSource::new(7);
        let (min, max) = (Duration::from_millis(100), Duration::from_millis(300));
        for _ in 0..200 {
            let d = rng.duration_between(min, max);
            assert!(d >= min && d <= max);
        }
        assert_eq!(rng.duration_between(max, max), max);
    }

    #[test]
    fn test_unit_in_half_open_interval() {
        let mut rng = RandomSource::new(1);
        for _ in 0..1000 {
            let v = rng.unit();
            assert!((0.0..1.0).contains(&v));
        }
    }

    #[test]
    fn test_duration_between_saturates() {
        let mut rng = RandomSource::new(7);
        let huge = rng.duration_between(Duration::MAX, Duration::MAX);
        assert_eq!(huge, Duration::from_millis(u64::MAX));
    }
}
