use rand::Rng;

/// Source of the per-request sampling draw.
pub trait Sampler: Send + Sync {
    /// A uniform value in `[0, 1)`.
    fn draw(&self) -> f64;

    /// Sampled iff the draw falls below `rate`.
    fn should_sample(&self, rate: f64) -> bool {
        self.draw() < rate
    }
}

/// Thread-local RNG draws.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomSampler;

impl Sampler for RandomSampler {
    fn draw(&self) -> f64 {
        rand::thread_rng().gen::<f64>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_extremes_are_exact() {
        let sampler = RandomSampler;
        for _ in 0..1_000 {
            assert!(sampler.should_sample(1.0));
            assert!(!sampler.should_sample(0.0));
        }
    }

    #[test]
    fn test_rate_is_roughly_honored() {
        let sampler = RandomSampler;
        let hits = (0..10_000).filter(|_| sampler.should_sample(0.25)).count();
        assert!((2_000..3_000).contains(&hits), "hits = {hits}");
    }
}
