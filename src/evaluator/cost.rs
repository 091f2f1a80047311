//! Cost of a capacity profile under a tariff.
//!
//! Profile values are energy magnitudes per hour. For consumers the result is
//! what they pay; for producers it is what they are paid, which is why the
//! utility scorer flips the sign for production segments.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::domain::Tariff;

/// Blend of expected, worst-case and realized prices.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CostFactors {
    pub weight_expected: f64,
    pub weight_max: f64,
    pub weight_realized: f64,
    /// Sold volume (kWh) above which a tariff's realized price is trusted.
    pub sold_threshold: f64,
}

impl Default for CostFactors {
    fn default() -> Self {
        Self {
            weight_expected: 1.0,
            weight_max: 0.0,
            weight_realized: 0.0,
            sold_threshold: 10_000.0,
        }
    }
}

/// Per-timeslot regulation energy the customer expects to have exercised,
/// from the customer's viewpoint: curtailment and discharge take energy away
/// (non-positive), down-regulation adds energy (non-negative).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegulationFactors {
    pub expected_curtailment: f64,
    pub expected_discharge: f64,
    pub expected_down_regulation: f64,
}

impl RegulationFactors {
    /// Replaces sign-violating values with zero, logging each one.
    pub fn sanitized(self, customer: &str) -> Self {
        let mut out = self;
        if out.expected_curtailment > 0.0 || out.expected_curtailment.is_nan() {
            warn!(
                customer,
                value = out.expected_curtailment,
                "expected curtailment must be non-positive"
            );
            out.expected_curtailment = 0.0;
        }
        if out.expected_discharge > 0.0 || out.expected_discharge.is_nan() {
            warn!(
                customer,
                value = out.expected_discharge,
                "expected discharge must be non-positive"
            );
            out.expected_discharge = 0.0;
        }
        if out.expected_down_regulation < 0.0 || out.expected_down_regulation.is_nan() {
            warn!(
                customer,
                value = out.expected_down_regulation,
                "expected down-regulation must be non-negative"
            );
            out.expected_down_regulation = 0.0;
        }
        out
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostEstimator {
    pub cost: CostFactors,
    pub regulation: RegulationFactors,
    /// Horizon, in hours, every profile cost is scaled to.
    pub std_duration_hours: f64,
}

impl CostEstimator {
    pub fn new(cost: CostFactors, regulation: RegulationFactors, std_duration_hours: f64) -> Self {
        Self {
            cost,
            regulation,
            std_duration_hours,
        }
    }

    /// Cost of `profile` under `tariff` over the profile's own length.
    pub fn estimate_cost(&self, tariff: &Tariff, profile: &[f64]) -> f64 {
        let rates = &tariff.rates;
        let expected: f64 = profile
            .iter()
            .enumerate()
            .map(|(slot, kwh)| kwh * rates.rate_at(slot))
            .sum();
        let total_energy: f64 = profile.iter().sum();
        let maximum = total_energy * rates.max_rate;
        let realized = match rates.realized_price {
            Some(price) if rates.sold_volume > self.cost.sold_threshold => total_energy * price,
            _ => expected,
        };

        let weight_sum = self.cost.weight_expected + self.cost.weight_max + self.cost.weight_realized;
        let energy_cost = if weight_sum > 0.0 {
            (self.cost.weight_expected * expected
                + self.cost.weight_max * maximum
                + self.cost.weight_realized * realized)
                / weight_sum
        } else {
            expected
        };

        let periodic = rates.periodic_payment * profile.len() as f64 / 24.0;
        energy_cost + periodic + self.regulation_cost(tariff, profile.len())
    }

    /// Profile cost scaled to the standard horizon. NaN for an empty profile.
    pub fn forecast_cost(&self, tariff: &Tariff, profile: &[f64]) -> f64 {
        if profile.is_empty() {
            return f64::NAN;
        }
        let scale = self.std_duration_hours / profile.len() as f64;
        self.estimate_cost(tariff, profile) * scale
    }

    fn regulation_cost(&self, tariff: &Tariff, slots: usize) -> f64 {
        let Some(regulation) = tariff.rates.regulation else {
            return 0.0;
        };
        let up = (self.regulation.expected_curtailment + self.regulation.expected_discharge)
            * regulation.up_regulation;
        let down = self.regulation.expected_down_regulation * regulation.down_regulation;
        (up + down) * slots as f64
    }
}
