//! Scalar utility of a candidate tariff relative to the default tariff.

use crate::domain::{Tariff, TariffId};

use super::EvalData;

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// Constants the utility calculation depends on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UtilityParams {
    pub inconvenience_weight: f64,
    pub tariff_switch_factor: f64,
    pub preferred_duration_days: f64,
    /// Hours over which a negative signup payment is spread.
    pub signup_fee_period: f64,
    pub max_linear_utility: f64,
}

/// The subscription a sub-population is moving away from.
#[derive(Debug, Clone, Copy)]
pub struct SwitchContext<'a> {
    pub current: &'a Tariff,
    /// Migration target of a revoked current tariff; moving there is free.
    pub replacement: Option<TariffId>,
    pub forced: bool,
    /// Early-withdrawal payment owed for leaving the current tariff.
    pub withdraw_penalty: f64,
}

impl SwitchContext<'_> {
    fn is_switch(&self, candidate: &Tariff) -> bool {
        candidate.id != self.current.id && Some(candidate.id) != self.replacement
    }
}

/// Cost, inconvenience and raw utility of one candidate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TariffUtility {
    pub cost: f64,
    pub inconvenience: f64,
    pub utility: f64,
}

/// Compresses utilities above `max_linear` logarithmically, capped at twice
/// `max_linear`, and floors those below `-max_linear`.
///
/// The result lies in `[-max_linear, 2 * max_linear]` and is non-decreasing.
pub fn constrain_utility(utility: f64, max_linear: f64) -> f64 {
    if utility > max_linear {
        let compressed = (1.0 + utility - max_linear).log10();
        (max_linear + compressed).min(max_linear * 2.0)
    } else if utility < -max_linear {
        -max_linear
    } else {
        utility
    }
}

/// Relative saving against the default tariff. Producers earn rather than
/// pay, so a larger "cost" is better for them.
pub fn normalized_difference(cost: f64, default_cost: f64, production: bool) -> f64 {
    let diff = (default_cost - cost) / default_cost;
    if production {
        -diff
    } else {
        diff
    }
}

#[derive(Debug, Clone, Copy)]
pub struct UtilityScorer {
    pub params: UtilityParams,
}

impl UtilityScorer {
    pub fn new(params: UtilityParams) -> Self {
        Self { params }
    }

    /// One-off payments incurred by moving onto `candidate`.
    pub fn switching_cost(&self, candidate: &Tariff, withdraw_penalty: f64) -> f64 {
        let signup = if candidate.signup_payment < 0.0 {
            candidate.signup_payment * self.params.preferred_duration_days * 24.0
                / self.params.signup_fee_period
        } else {
            candidate.signup_payment
        };
        let preferred_millis = self.params.preferred_duration_days * MILLIS_PER_DAY;
        let withdraw_factor =
            (candidate.min_duration.num_milliseconds() as f64 / preferred_millis).min(1.0);
        signup + withdraw_penalty + withdraw_factor * candidate.early_withdraw_payment
    }

    /// Scores `candidate` from `eval`, adding switching costs unless the
    /// candidate is the current tariff or its forced replacement.
    /// `broker_switch` is only drawn when the candidate changes broker.
    pub fn score(
        &self,
        candidate: &Tariff,
        eval: EvalData,
        ctx: &SwitchContext<'_>,
        default_cost: f64,
        production: bool,
        broker_switch: &mut dyn FnMut(bool) -> f64,
    ) -> TariffUtility {
        let mut inconvenience = eval.inconvenience;
        let mut cost = eval.cost_estimate;
        if ctx.is_switch(candidate) {
            inconvenience += self.params.tariff_switch_factor;
            if candidate.broker != ctx.current.broker {
                inconvenience += broker_switch(ctx.forced);
            }
            cost += self.switching_cost(candidate, ctx.withdraw_penalty);
        }
        let utility = normalized_difference(cost, default_cost, production)
            - self.params.inconvenience_weight * inconvenience;
        TariffUtility {
            cost,
            inconvenience,
            utility,
        }
    }

    pub fn constrain(&self, utility: f64) -> f64 {
        constrain_utility(utility, self.params.max_linear_utility)
    }
}
