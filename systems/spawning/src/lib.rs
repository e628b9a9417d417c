#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic spawning system responsible for sizing each requested wave.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tile_defence_core::{Command, Event, SPAWN_COUNT_MAX, SPAWN_COUNT_MIN};

/// Configuration parameters required to construct the spawning system.
#[derive(Clone, Copy, Debug)]
pub struct Config {
    min_count: u32,
    max_count: u32,
    rng_seed: u64,
}

impl Config {
    /// Creates a configuration drawing wave sizes from `min_count..=max_count`.
    ///
    /// Reversed bounds are swapped.
    #[must_use]
    pub fn new(min_count: u32, max_count: u32, rng_seed: u64) -> Self {
        Self {
            min_count: min_count.min(max_count),
            max_count: min_count.max(max_count),
            rng_seed,
        }
    }

    /// Configuration using the default wave size bounds.
    #[must_use]
    pub fn with_seed(rng_seed: u64) -> Self {
        Self::new(SPAWN_COUNT_MIN, SPAWN_COUNT_MAX, rng_seed)
    }
}

/// Pure system that turns wave requests into sized spawn commands.
#[derive(Debug)]
pub struct Spawning {
    min_count: u32,
    max_count: u32,
    rng: ChaCha8Rng,
}

impl Spawning {
    /// Creates a new spawning system using the supplied configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            min_count: config.min_count,
            max_count: config.max_count,
            rng: ChaCha8Rng::seed_from_u64(config.rng_seed),
        }
    }

    /// Emits one `Command::SpawnWave` per `Event::WaveRequested` in `events`.
    pub fn handle(&mut self, events: &[Event], out: &mut Vec<Command>) {
        for event in events {
            if let Event::WaveRequested { .. } = event {
                let count = self.draw_count();
                out.push(Command::SpawnWave { count });
            }
        }
    }

    fn draw_count(&mut self) -> u32 {
        self.rng.gen_range(self.min_count..=self.max_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draws_stay_within_bounds() {
        let mut spawning = Spawning::new(Config::with_seed(7));
        for _ in 0..500 {
            let count = spawning.draw_count();
            assert!((SPAWN_COUNT_MIN..=SPAWN_COUNT_MAX).contains(&count));
        }
    }

    #[test]
    fn reversed_bounds_are_swapped() {
        let mut spawning = Spawning::new(Config::new(9, 3, 1));
        for _ in 0..100 {
            assert!((3..=9).contains(&spawning.draw_count()));
        }
    }

    #[test]
    fn degenerate_range_always_yields_its_bound() {
        let mut spawning = Spawning::new(Config::new(4, 4, 99));
        assert_eq!(spawning.draw_count(), 4);
    }
}
