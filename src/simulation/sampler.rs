use rand::rngs::StdRng;
use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SamplerConfig {
    /// Random seed for reproducibility (None = random)
    pub random_seed: Option<u64>,
    /// Mean inconvenience of changing broker
    pub broker_switch_mean: f64,
    /// Spread of the broker-switch inconvenience between customers
    pub broker_switch_std_dev: f64,
    /// Scale applied when the move follows a revocation
    pub forced_switch_multiplier: f64,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            random_seed: None,
            broker_switch_mean: 0.02,
            broker_switch_std_dev: 0.005,
            forced_switch_multiplier: 5.0,
        }
    }
}

impl SamplerConfig {
    pub fn seeded(seed: u64) -> Self {
        Self {
            random_seed: Some(seed),
            ..Default::default()
        }
    }
}

/// Per-segment random source for every draw the evaluator makes.
pub struct SeededSampler {
    config: SamplerConfig,
    rng: StdRng,
    broker_switch: Option<Normal<f64>>,
}

impl SeededSampler {
    pub fn new(config: SamplerConfig) -> Self {
        use rand::SeedableRng;

        let rng = match config.random_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let broker_switch =
            Normal::new(config.broker_switch_mean, config.broker_switch_std_dev).ok();
        Self {
            config,
            rng,
            broker_switch,
        }
    }

    pub fn config(&self) -> &SamplerConfig {
        &self.config
    }

    /// Uniform in [0, 1)
    pub fn uniform(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }

    /// Non-negative broker-switch inconvenience
    pub fn broker_switch_factor(&mut self, forced: bool) -> f64 {
        let base = match &self.broker_switch {
            Some(normal) => normal.sample(&mut self.rng).max(0.0),
            None => self.config.broker_switch_mean.max(0.0),
        };
        if forced {
            base * self.config.forced_switch_multiplier
        } else {
            base
        }
    }
}
