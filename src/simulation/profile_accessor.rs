use std::collections::HashMap;

use crate::accessor::CustomerModelAccessor;
use crate::domain::{CustomerInfo, Tariff, TariffId};

use super::{SamplerConfig, SeededSampler};

/// Customer model accessor backed by fixed capacity profiles.
///
/// Suits customer models whose usage does not react to tariff prices: every
/// tariff sees the same profile unless one is registered for it.
pub struct ProfileAccessor {
    info: CustomerInfo,
    profile: Vec<f64>,
    per_tariff: HashMap<TariffId, Vec<f64>>,
    sampler: SeededSampler,
}

impl ProfileAccessor {
    pub fn new(info: CustomerInfo, profile: Vec<f64>, sampler: SamplerConfig) -> Self {
        Self {
            info,
            profile,
            per_tariff: HashMap::new(),
            sampler: SeededSampler::new(sampler),
        }
    }

    /// Profile used when evaluating `tariff` specifically, e.g. an
    /// interruptible load shaped by the tariff's curtailment.
    pub fn with_tariff_profile(mut self, tariff: TariffId, profile: Vec<f64>) -> Self {
        self.per_tariff.insert(tariff, profile);
        self
    }
}

impl CustomerModelAccessor for ProfileAccessor {
    fn customer_info(&self) -> CustomerInfo {
        self.info.clone()
    }

    fn capacity_profile(&self, tariff: &Tariff) -> Vec<f64> {
        self.per_tariff
            .get(&tariff.id)
            .unwrap_or(&self.profile)
            .clone()
    }

    fn broker_switch_factor(&mut self, forced: bool) -> f64 {
        self.sampler.broker_switch_factor(forced)
    }

    fn inertia_sample(&mut self) -> f64 {
        self.sampler.uniform()
    }

    fn tariff_choice_sample(&mut self) -> f64 {
        self.sampler.uniform()
    }
}
