use serde::{Deserialize, Serialize};

use crate::domain::Tariff;

/// Weights for the rate-structure features a customer finds inconvenient.
///
/// Weights are not normalized; relating them to cost differences is up to
/// the customer model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InconvenienceFactors {
    pub tou: f64,
    pub tiered_rate: f64,
    pub variable_pricing: f64,
    pub interruptibility: f64,
}

impl Default for InconvenienceFactors {
    fn default() -> Self {
        Self {
            tou: 0.2,
            tiered_rate: 0.1,
            variable_pricing: 0.5,
            interruptibility: 0.2,
        }
    }
}

impl InconvenienceFactors {
    pub fn new(tou: f64, tiered_rate: f64, variable_pricing: f64, interruptibility: f64) -> Self {
        Self {
            tou,
            tiered_rate,
            variable_pricing,
            interruptibility,
        }
    }

    /// Sum of the factors whose feature the tariff exhibits.
    pub fn score(&self, tariff: &Tariff) -> f64 {
        let mut result = 0.0;
        if tariff.is_time_of_use() {
            result += self.tou;
        }
        if tariff.is_tiered() {
            result += self.tiered_rate;
        }
        if tariff.is_variable_rate() {
            result += self.variable_pricing;
        }
        if tariff.is_interruptible() {
            result += self.interruptibility;
        }
        result
    }
}
