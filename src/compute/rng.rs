//! Random number source and sampling scales for particle spawning.

use rand::prelude::*;
use rand_distr::Uniform;

use crate::schema::EngineConfig;

/// Random number generator wrapper for spawning.
pub struct FlowRng {
    rng: StdRng,
}

impl FlowRng {
    /// Create from seed.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Create with random seed.
    pub fn random() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Seeded when `seed` is set, entropy otherwise.
    pub fn from_seed_option(seed: Option<u64>) -> Self {
        seed.map_or_else(Self::random, Self::new)
    }

    /// Uniform draw in [0, 1).
    #[inline]
    pub fn unit(&mut self) -> f64 {
        self.rng.gen_range(0.0..1.0)
    }

    /// Draw from a precomputed distribution.
    #[inline]
    pub fn sample(&mut self, dist: &Uniform<f64>) -> f64 {
        dist.sample(&mut self.rng)
    }
}

/// Linear scales mapping uniform draws to particle attributes.
#[derive(Debug, Clone, Copy)]
pub struct SpawnScales {
    pub speed: Uniform<f64>,
    pub offset: Uniform<f64>,
}

impl SpawnScales {
    /// Expects a validated config (`speed_range >= 0`, `offset_range.0 <= offset_range.1`).
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            speed: Uniform::new_inclusive(config.speed, config.speed + config.speed_range),
            offset: Uniform::new_inclusive(config.offset_range.0, config.offset_range.1),
        }
    }

    /// Same speed scale with a new offset interval. Expects `min <= max`.
    pub fn with_offset_range(self, min: f64, max: f64) -> Self {
        Self {
            offset: Uniform::new_inclusive(min, max),
            ..self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_reproducible() {
        let mut a = FlowRng::new(42);
        let mut b = FlowRng::new(42);
        for _ in 0..16 {
            assert_eq!(a.unit(), b.unit());
        }
    }

    #[test]
    fn test_scales_within_config() {
        let config = EngineConfig::default();
        let scales = SpawnScales::from_config(&config);
        let mut rng = FlowRng::new(7);
        for _ in 0..1000 {
            let speed = rng.sample(&scales.speed);
            assert!(speed >= config.speed && speed <= config.speed + config.speed_range);
            let offset = rng.sample(&scales.offset);
            assert!(offset >= config.offset_range.0 && offset <= config.offset_range.1);
        }
    }

    #[test]
    fn test_with_offset_range() {
        let scales =
            SpawnScales::from_config(&EngineConfig::default()).with_offset_range(-5.0, 2.0);
        let mut rng = FlowRng::new(3);
        for _ in 0..1000 {
            let offset = rng.sample(&scales.offset);
            assert!((-5.0..=2.0).contains(&offset));
            let speed = rng.sample(&scales.speed);
            assert!((0.7..=1.2).contains(&speed));
        }
    }

    #[test]
    fn test_degenerate_ranges() {
        let config = EngineConfig {
            speed_range: 0.0,
            offset_range: (0.0, 0.0),
            ..Default::default()
        };
        let scales = SpawnScales::from_config(&config);
        let mut rng = FlowRng::new(1);
        assert_eq!(rng.sample(&scales.speed), config.speed);
        assert_eq!(rng.sample(&scales.offset), 0.0);
    }
}
