use std::path::Path;

use anyhow::Result;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::evaluator::{CostFactors, InconvenienceFactors, RegulationFactors};

/// Floor applied to negative rationality values.
pub const MIN_RATIONALITY: f64 = 0.01;

/// Tunables of one tariff evaluator. Every field has a default, so a config
/// file only needs to name what it overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluatorConfig {
    /// Target size of allocation chunks for multi-contracting segments.
    pub chunk_size: u32,
    pub max_chunk_count: u32,
    /// Recent tariffs considered per applicable power type.
    pub tariff_eval_depth: usize,
    /// Steady-state probability that a chunk skips re-evaluation.
    pub inertia: f64,
    /// 0 chooses at random, 1 picks the best tariff almost surely.
    pub rationality: f64,
    pub inconvenience_weight: f64,
    pub tariff_switch_factor: f64,
    pub preferred_duration_days: f64,
    /// Hours over which a signup bonus is amortized.
    pub signup_fee_period: f64,
    pub lambda_max: f64,
    pub max_linear_utility: f64,
    pub std_duration_hours: f64,
    /// Supersede links followed before falling back to the default tariff.
    pub max_supersede_depth: usize,
    pub inconvenience: InconvenienceFactors,
    pub cost: CostFactors,
    pub regulation: RegulationFactors,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1,
            max_chunk_count: 200,
            tariff_eval_depth: 5,
            inertia: 0.8,
            rationality: 0.9,
            inconvenience_weight: 0.2,
            tariff_switch_factor: 0.04,
            preferred_duration_days: 6.0,
            signup_fee_period: 6.0,
            lambda_max: 50.0,
            max_linear_utility: 7.0,
            std_duration_hours: 48.0,
            max_supersede_depth: 8,
            inconvenience: InconvenienceFactors::default(),
            cost: CostFactors::default(),
            regulation: RegulationFactors::default(),
        }
    }
}

impl EvaluatorConfig {
    /// Loads defaults, then `path` (if it exists), then `TARIFF_EVAL__*`
    /// environment variables, and sanitizes the result.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let figment = Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed("TARIFF_EVAL__").split("__"));
        let cfg: Self = figment.extract()?;
        Ok(cfg.sanitized())
    }

    /// Replaces out-of-range values with safe ones, logging each correction.
    pub fn sanitized(mut self) -> Self {
        let defaults = Self::default();
        if self.chunk_size == 0 {
            warn!(value = self.chunk_size, "chunk size must be positive");
            self.chunk_size = defaults.chunk_size;
        }
        if self.max_chunk_count == 0 {
            warn!(value = self.max_chunk_count, "max chunk count must be positive");
            self.max_chunk_count = defaults.max_chunk_count;
        }
        self.inertia = clamp_inertia(self.inertia);
        self.rationality = clamp_rationality(self.rationality);
        if !positive(self.preferred_duration_days) {
            warn!(value = self.preferred_duration_days, "preferred duration must be positive");
            self.preferred_duration_days = defaults.preferred_duration_days;
        }
        if !positive(self.signup_fee_period) {
            warn!(value = self.signup_fee_period, "signup fee period must be positive");
            self.signup_fee_period = defaults.signup_fee_period;
        }
        if !(self.lambda_max.is_finite() && self.lambda_max >= 1.0) {
            warn!(value = self.lambda_max, "lambda max must be at least 1");
            self.lambda_max = defaults.lambda_max;
        }
        if !positive(self.max_linear_utility) {
            warn!(value = self.max_linear_utility, "max linear utility must be positive");
            self.max_linear_utility = defaults.max_linear_utility;
        }
        if !positive(self.std_duration_hours) {
            warn!(value = self.std_duration_hours, "standard duration must be positive");
            self.std_duration_hours = defaults.std_duration_hours;
        }
        self.regulation = self.regulation.sanitized("config");
        self
    }
}

fn positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

/// Clamps rationality into `[MIN_RATIONALITY, 1]` for negative input and
/// `1` for input above one.
pub fn clamp_rationality(rationality: f64) -> f64 {
    if rationality.is_nan() {
        warn!("rationality is NaN, using 1.0");
        1.0
    } else if rationality < 0.0 {
        warn!(value = rationality, "rationality below 0.0");
        MIN_RATIONALITY
    } else if rationality > 1.0 {
        warn!(value = rationality, "rationality above 1.0");
        1.0
    } else {
        rationality
    }
}

pub fn clamp_inertia(inertia: f64) -> f64 {
    if inertia.is_nan() {
        warn!("inertia is NaN, using 0.0");
        0.0
    } else if !(0.0..=1.0).contains(&inertia) {
        warn!(value = inertia, "inertia outside [0, 1]");
        inertia.clamp(0.0, 1.0)
    } else {
        inertia
    }
}
