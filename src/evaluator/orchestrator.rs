use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use serde::Serialize;
use tracing::{error, info, info_span, warn};

use crate::accessor::CustomerModelAccessor;
use crate::config::{clamp_inertia, clamp_rationality, EvaluatorConfig};
use crate::domain::{CustomerInfo, Subscription, Tariff, TariffId};
use crate::error::EvaluationError;
use crate::market::TariffMarket;
use crate::repo::{SubscriptionRepo, TariffRepo};

use super::{
    AllocationLedger, ChoiceEngine, ChunkRequest, CostEstimator, CostFactors, EvalData,
    EvaluationCache, InconvenienceFactors, RegulationFactors, SwitchContext, UtilityParams,
    UtilityScorer,
};

/// What one call to [`TariffEvaluator::evaluate_tariffs`] did.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CycleReport {
    pub cycle: u32,
    pub effective_inertia: f64,
    /// Tariffs scored this cycle besides current subscriptions, including
    /// fallback targets of forced migrations.
    pub candidates: Vec<TariffId>,
    pub subscribed: Vec<(TariffId, u32)>,
    pub unsubscribed: Vec<(TariffId, u32)>,
    /// Customers who skipped re-evaluation because of inertia.
    pub retained: u32,
    pub failed_allocations: u32,
    /// Customers in chunks that could not be placed; they stay where they are.
    pub unallocated: u32,
    /// Tariffs dropped from consideration because their cost or utility was NaN.
    pub excluded: Vec<TariffId>,
    /// Net population change across the ledger; non-zero is a bug.
    pub imbalance: i64,
}

/// Inertia for the given 1-based cycle: zero at first, approaching the
/// configured steady state geometrically.
pub fn effective_inertia(inertia: f64, cycle: u32) -> f64 {
    let exponent = 1 - i32::try_from(cycle).unwrap_or(i32::MAX);
    (inertia * (1.0 - 2f64.powi(exponent))).max(0.0)
}

/// Evaluates tariffs for one customer segment and moves its population
/// between them.
///
/// One instance per segment, called once per tariff publication cycle.
/// Tariff evaluations are cached for the lifetime of the instance.
pub struct TariffEvaluator {
    customer: CustomerInfo,
    accessor: Box<dyn CustomerModelAccessor>,
    tariffs: Arc<dyn TariffRepo>,
    subscriptions: Arc<dyn SubscriptionRepo>,
    market: Arc<dyn TariffMarket>,
    config: EvaluatorConfig,
    cache: EvaluationCache,
    ledger: AllocationLedger,
    evaluation_count: u32,
}

impl TariffEvaluator {
    pub fn new(
        accessor: Box<dyn CustomerModelAccessor>,
        tariffs: Arc<dyn TariffRepo>,
        subscriptions: Arc<dyn SubscriptionRepo>,
        market: Arc<dyn TariffMarket>,
    ) -> Self {
        Self {
            customer: accessor.customer_info(),
            accessor,
            tariffs,
            subscriptions,
            market,
            config: EvaluatorConfig::default(),
            cache: EvaluationCache::new(),
            ledger: AllocationLedger::new(),
            evaluation_count: 0,
        }
    }

    /// Replaces the whole configuration, sanitizing it first.
    pub fn with_config(mut self, config: EvaluatorConfig) -> Self {
        self.config = config.sanitized();
        self
    }

    /// Target size of allocation chunks; zero is rejected.
    pub fn with_chunk_size(mut self, size: u32) -> Self {
        if size > 0 {
            self.config.chunk_size = size;
        } else {
            warn!(customer = %self.customer.name, size, "chunk size must be positive");
        }
        self
    }

    /// Number of recent tariffs per applicable power type to consider.
    pub fn with_tariff_eval_depth(mut self, depth: usize) -> Self {
        self.config.tariff_eval_depth = depth;
        self
    }

    /// Steady-state inertia in [0, 1].
    pub fn with_inertia(mut self, inertia: f64) -> Self {
        self.config.inertia = clamp_inertia(inertia);
        self
    }

    pub fn with_rationality(mut self, rationality: f64) -> Self {
        self.config.rationality = clamp_rationality(rationality);
        self
    }

    pub fn with_inconvenience_weight(mut self, weight: f64) -> Self {
        self.config.inconvenience_weight = weight;
        self
    }

    pub fn with_tariff_switch_factor(mut self, factor: f64) -> Self {
        self.config.tariff_switch_factor = factor;
        self
    }

    /// Preferred maximum contract length, in days. Withdrawal payments are
    /// prorated against it and signup bonuses amortized over it.
    pub fn with_preferred_contract_duration(mut self, days: f64) -> Self {
        if days.is_finite() && days > 0.0 {
            self.config.preferred_duration_days = days;
        } else {
            warn!(customer = %self.customer.name, days, "preferred duration must be positive");
        }
        self
    }

    pub fn initialize_cost_factors(
        &mut self,
        weight_expected: f64,
        weight_max: f64,
        weight_realized: f64,
        sold_threshold: f64,
    ) {
        self.config.cost = CostFactors {
            weight_expected,
            weight_max,
            weight_realized,
            sold_threshold,
        };
    }

    pub fn initialize_inconvenience_factors(
        &mut self,
        tou: f64,
        tiered_rate: f64,
        variable_pricing: f64,
        interruptibility: f64,
    ) {
        self.config.inconvenience =
            InconvenienceFactors::new(tou, tiered_rate, variable_pricing, interruptibility);
    }

    /// Expected per-timeslot regulation energy; curtailment and discharge
    /// must be non-positive, down-regulation non-negative.
    pub fn initialize_regulation_factors(
        &mut self,
        expected_curtailment: f64,
        expected_discharge: f64,
        expected_down_regulation: f64,
    ) {
        self.config.regulation = RegulationFactors {
            expected_curtailment,
            expected_discharge,
            expected_down_regulation,
        }
        .sanitized(&self.customer.name);
    }

    pub fn customer(&self) -> &CustomerInfo {
        &self.customer
    }

    pub fn config(&self) -> &EvaluatorConfig {
        &self.config
    }

    pub fn cache(&self) -> &EvaluationCache {
        &self.cache
    }

    /// Allocations of the most recent cycle.
    pub fn ledger(&self) -> &AllocationLedger {
        &self.ledger
    }

    pub fn evaluation_count(&self) -> u32 {
        self.evaluation_count
    }

    pub fn tou_factor(&self) -> f64 {
        self.config.inconvenience.tou
    }

    pub fn tiered_rate_factor(&self) -> f64 {
        self.config.inconvenience.tiered_rate
    }

    pub fn variable_pricing_factor(&self) -> f64 {
        self.config.inconvenience.variable_pricing
    }

    pub fn interruptibility_factor(&self) -> f64 {
        self.config.inconvenience.interruptibility
    }

    /// Composite rate-structure inconvenience of `tariff`.
    pub fn compute_inconvenience(&self, tariff: &Tariff) -> f64 {
        self.config.inconvenience.score(tariff)
    }

    /// Drops a cached evaluation so the tariff is re-evaluated next cycle.
    pub fn forget_tariff(&mut self, tariff: TariffId) {
        self.cache.forget(tariff);
    }

    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    /// Runs one evaluation cycle and commits the resulting subscription
    /// changes to the market.
    pub fn evaluate_tariffs(&mut self) -> Result<CycleReport, EvaluationError> {
        let span = info_span!("evaluate_tariffs", customer = %self.customer.name);
        let _guard = span.enter();

        self.ledger.clear();
        self.evaluation_count = self.evaluation_count.saturating_add(1);
        let inertia = effective_inertia(self.config.inertia, self.evaluation_count);

        let power_type = self.customer.power_type;
        let default = self.tariffs.default_tariff(power_type).ok_or_else(|| {
            error!(%power_type, "no default tariff, skipping cycle");
            EvaluationError::NoDefaultTariff(power_type)
        })?;
        let default_eval = self.default_eval(&default)?;

        let mut candidates = self.candidate_set(&default);
        let mut report = CycleReport {
            cycle: self.evaluation_count,
            effective_inertia: inertia,
            ..Default::default()
        };
        for tariff in candidates.values() {
            self.ensure_evaluated(tariff);
        }

        let cycle = CycleContext {
            default: &default,
            default_eval,
            inertia,
        };
        for subscription in self
            .subscriptions
            .find_active_subscriptions(self.customer.id)
        {
            let withdraw_cost = subscription.tariff.early_withdraw_payment;
            let committed = subscription.customers_committed;
            let expired = subscription.expired_customer_count;
            if withdraw_cost == 0.0 || expired >= committed {
                self.evaluate_alternatives(&subscription, 0.0, committed, &cycle, &mut candidates, &mut report);
            } else {
                self.evaluate_alternatives(&subscription, 0.0, expired, &cycle, &mut candidates, &mut report);
                self.evaluate_alternatives(
                    &subscription,
                    withdraw_cost,
                    committed - expired,
                    &cycle,
                    &mut candidates,
                    &mut report,
                );
            }
        }

        report.candidates = candidates.keys().copied().collect();
        self.update_subscriptions(&candidates, &mut report);
        info!(
            cycle = report.cycle,
            inertia,
            subscribed = report.subscribed.len(),
            unsubscribed = report.unsubscribed.len(),
            retained = report.retained,
            "evaluation cycle complete"
        );
        Ok(report)
    }

    /// Recent tariffs of every applicable power type, the default tariff,
    /// and the successors of revoked subscriptions.
    fn candidate_set(&self, default: &Tariff) -> BTreeMap<TariffId, Tariff> {
        let mut candidates = BTreeMap::new();
        for power_type in self.customer.power_type.applicable_types() {
            for tariff in self
                .tariffs
                .find_recent_active_tariffs(self.config.tariff_eval_depth, power_type)
                .into_iter()
                .filter(Tariff::is_subscribable)
            {
                candidates.insert(tariff.id, tariff);
            }
        }
        candidates.insert(default.id, default.clone());

        for revoked in self
            .subscriptions
            .find_revoked_subscriptions(self.customer.id)
        {
            if let Some(successor) = self.resolve_successor(&revoked.tariff) {
                candidates.insert(successor.id, successor);
            }
        }
        candidates
    }

    /// Follows supersede links from a revoked tariff to the first
    /// subscribable one. `None` means the default tariff should be used.
    fn resolve_successor(&self, revoked: &Tariff) -> Option<Tariff> {
        let mut visited = HashSet::from([revoked.id]);
        let mut next = revoked.superseded_by;
        while let Some(id) = next {
            if visited.len() > self.config.max_supersede_depth {
                warn!(tariff = %revoked.id, depth = visited.len(), "supersede chain too long");
                return None;
            }
            if !visited.insert(id) {
                warn!(tariff = %revoked.id, at = %id, "supersede chain loops");
                return None;
            }
            let Some(tariff) = self.tariffs.find_tariff(id) else {
                warn!(tariff = %revoked.id, missing = %id, "superseding tariff not found");
                return None;
            };
            if tariff.is_subscribable() {
                return Some(tariff);
            }
            next = tariff.superseded_by;
        }
        None
    }

    /// Evaluation of the default tariff, which every utility is normalized
    /// against. A zero or NaN cost fails the cycle whether or not the tariff
    /// was cached as an ordinary candidate earlier.
    fn default_eval(&mut self, default: &Tariff) -> Result<EvalData, EvaluationError> {
        let cached = self.cache.get(default.id);
        let eval = cached.unwrap_or_else(|| EvalData::new(self.forecast_cost(default), 0.0));
        if eval.cost_estimate.is_nan() || eval.cost_estimate == 0.0 {
            error!(tariff = %default.id, cost = eval.cost_estimate, "unusable default tariff cost");
            return Err(EvaluationError::DegenerateDefaultCost {
                tariff: default.id,
                cost: eval.cost_estimate,
            });
        }
        if cached.is_none() {
            self.cache.insert(default.id, eval);
        }
        Ok(eval)
    }

    /// Cached evaluation of `tariff`, computing it on first encounter.
    /// Degenerate results are returned but not cached.
    fn ensure_evaluated(&mut self, tariff: &Tariff) -> EvalData {
        if let Some(eval) = self.cache.get(tariff.id) {
            return eval;
        }
        let eval = EvalData::new(self.forecast_cost(tariff), self.compute_inconvenience(tariff));
        if eval.is_degenerate() {
            error!(tariff = %tariff.id, cost = eval.cost_estimate, "profile cost is NaN");
        } else {
            info!(
                tariff = %tariff.id,
                cost = eval.cost_estimate,
                inconvenience = eval.inconvenience,
                "evaluated tariff"
            );
            self.cache.insert(tariff.id, eval);
        }
        eval
    }

    fn forecast_cost(&self, tariff: &Tariff) -> f64 {
        let profile = self.accessor.capacity_profile(tariff);
        self.estimator().forecast_cost(tariff, &profile)
    }

    fn estimator(&self) -> CostEstimator {
        CostEstimator::new(
            self.config.cost,
            self.config.regulation,
            self.config.std_duration_hours,
        )
    }

    fn scorer(&self) -> UtilityScorer {
        UtilityScorer::new(UtilityParams {
            inconvenience_weight: self.config.inconvenience_weight,
            tariff_switch_factor: self.config.tariff_switch_factor,
            preferred_duration_days: self.config.preferred_duration_days,
            signup_fee_period: self.config.signup_fee_period,
            max_linear_utility: self.config.max_linear_utility,
        })
    }

    fn choice_engine(&self) -> ChoiceEngine {
        ChoiceEngine::new(
            self.config.lambda_max,
            self.config.rationality,
            self.config.chunk_size,
            self.config.max_chunk_count,
        )
    }

    /// Scores every option for one sub-population of `subscription` and
    /// records where its chunks go.
    fn evaluate_alternatives(
        &mut self,
        subscription: &Subscription,
        withdraw_penalty: f64,
        population: u32,
        cycle: &CycleContext<'_>,
        candidates: &mut BTreeMap<TariffId, Tariff>,
        report: &mut CycleReport,
    ) {
        if population == 0 {
            return;
        }
        let current = &subscription.tariff;
        let forced = current.is_revoked();
        let (replacement, withdraw_penalty) = if forced {
            let successor = self
                .resolve_successor(current)
                .unwrap_or_else(|| cycle.default.clone());
            info!(tariff = %current.id, replacement = %successor.id, "tariff revoked");
            let id = successor.id;
            candidates.entry(id).or_insert(successor);
            (Some(id), 0.0)
        } else {
            (None, withdraw_penalty)
        };

        let mut options: Vec<Tariff> = candidates
            .values()
            .filter(|t| !(forced && t.id == current.id))
            .cloned()
            .collect();
        if !forced && !candidates.contains_key(&current.id) {
            options.push(current.clone());
        }

        let ctx = SwitchContext {
            current,
            replacement,
            forced,
            withdraw_penalty,
        };
        let scorer = self.scorer();
        let production = self.customer.power_type.is_production();
        let mut utilities = Vec::with_capacity(options.len());
        for tariff in &options {
            let eval = self.ensure_evaluated(tariff);
            if eval.is_degenerate() {
                exclude(report, tariff.id);
                continue;
            }
            let accessor = &mut self.accessor;
            let scored = scorer.score(
                tariff,
                eval,
                &ctx,
                cycle.default_eval.cost_estimate,
                production,
                &mut |forced| accessor.broker_switch_factor(forced),
            );
            if scored.cost.is_nan() {
                error!(tariff = %tariff.id, "cost is NaN");
                exclude(report, tariff.id);
                continue;
            }
            if scored.utility.is_nan() {
                error!(tariff = %tariff.id, "utility is NaN");
                exclude(report, tariff.id);
                continue;
            }
            utilities.push((tariff.id, scorer.constrain(scored.utility)));
        }

        let engine = self.choice_engine();
        let ranked = engine.rank(utilities);
        let outcome = engine.allocate(
            &ranked,
            ChunkRequest {
                population,
                multi_contracting: self.customer.multi_contracting,
                inertia: cycle.inertia,
                forced,
            },
            self.accessor.as_mut(),
        );
        report.retained += outcome.retained;
        report.failed_allocations += outcome.failed_chunks;
        report.unallocated += outcome.unallocated;
        for (target, count) in outcome.choices {
            self.ledger.record(current.id, target, count);
        }
    }

    /// Applies the ledger: withdrawals first, then enrollments.
    fn update_subscriptions(
        &mut self,
        candidates: &BTreeMap<TariffId, Tariff>,
        report: &mut CycleReport,
    ) {
        report.imbalance = self.ledger.net();
        if report.imbalance != 0 {
            error!(net = report.imbalance, "subscription updates do not add up");
        }

        let withdrawals: Vec<_> = self.ledger.withdrawals().collect();
        for (tariff, count) in withdrawals {
            let Some(subscription) = self.subscriptions.find_subscription(tariff, self.customer.id)
            else {
                error!(tariff = %tariff, count, "no subscription to withdraw from");
                continue;
            };
            match self.market.unsubscribe(&subscription, count) {
                Ok(()) => {
                    info!(tariff = %tariff, count, "unsubscribed");
                    report.unsubscribed.push((tariff, count));
                }
                Err(e) => error!(tariff = %tariff, count, error = %e, "unsubscribe failed"),
            }
        }

        let enrollments: Vec<_> = self.ledger.enrollments().collect();
        for (tariff_id, count) in enrollments {
            let Some(tariff) = candidates.get(&tariff_id) else {
                error!(tariff = %tariff_id, count, "allocated tariff is not a candidate");
                continue;
            };
            match self.market.subscribe_to_tariff(tariff, &self.customer, count) {
                Ok(()) => {
                    info!(tariff = %tariff_id, count, "subscribed");
                    report.subscribed.push((tariff_id, count));
                }
                Err(e) => error!(tariff = %tariff_id, count, error = %e, "subscribe failed"),
            }
        }
    }
}

/// Cycle-wide inputs shared by every sub-population.
struct CycleContext<'a> {
    default: &'a Tariff,
    default_eval: EvalData,
    inertia: f64,
}

fn exclude(report: &mut CycleReport, tariff: TariffId) {
    if !report.excluded.contains(&tariff) {
        report.excluded.push(tariff);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accessor::MockCustomerModelAccessor;
    use crate::domain::{CustomerId, PowerType, TariffRates};
    use crate::market::MockTariffMarket;
    use crate::repo::{MockSubscriptionRepo, MockTariffRepo};
    use rstest::rstest;

    const CUSTOMER: CustomerId = CustomerId(7);

    fn info(population: u32) -> CustomerInfo {
        CustomerInfo::new(7, "households", PowerType::Consumption, population)
    }

    fn flat(id: u64, broker: u64, rate: f64) -> Tariff {
        Tariff::new(id, broker, PowerType::Consumption).with_rates(TariffRates::flat(rate))
    }

    /// Accessor with a flat 24h profile that never holds anyone back.
    fn eager_accessor(population: u32) -> MockCustomerModelAccessor {
        let mut accessor = MockCustomerModelAccessor::new();
        accessor
            .expect_customer_info()
            .returning(move || info(population));
        accessor
            .expect_capacity_profile()
            .returning(|_| vec![1.0; 24]);
        accessor.expect_broker_switch_factor().returning(|_| 0.0);
        accessor.expect_inertia_sample().returning(|| 0.99);
        accessor.expect_tariff_choice_sample().returning(|| 0.0);
        accessor
    }

    fn tariff_repo(default: Tariff, recent: Vec<Tariff>) -> MockTariffRepo {
        let mut repo = MockTariffRepo::new();
        repo.expect_default_tariff()
            .returning(move |_| Some(default.clone()));
        repo.expect_find_recent_active_tariffs()
            .returning(move |_, pt| {
                if pt == PowerType::Consumption {
                    recent.clone()
                } else {
                    Vec::new()
                }
            });
        repo.expect_find_tariff().returning(|_| None);
        repo
    }

    fn subscription_repo(active: Vec<Subscription>) -> MockSubscriptionRepo {
        let mut repo = MockSubscriptionRepo::new();
        let lookup = active.clone();
        repo.expect_find_active_subscriptions()
            .returning(move |_| active.clone());
        repo.expect_find_revoked_subscriptions()
            .returning(|_| Vec::new());
        repo.expect_find_subscription()
            .returning(move |tariff, _| lookup.iter().find(|s| s.tariff.id == tariff).cloned());
        repo
    }

    fn evaluator(
        accessor: MockCustomerModelAccessor,
        tariffs: MockTariffRepo,
        subscriptions: MockSubscriptionRepo,
        market: MockTariffMarket,
    ) -> TariffEvaluator {
        TariffEvaluator::new(
            Box::new(accessor),
            Arc::new(tariffs),
            Arc::new(subscriptions),
            Arc::new(market),
        )
    }

    #[rstest]
    #[case(1, 0.0)]
    #[case(2, 0.4)]
    #[case(3, 0.6)]
    #[case(4, 0.7)]
    fn test_effective_inertia_ramp(#[case] cycle: u32, #[case] expected: f64) {
        assert!((effective_inertia(0.8, cycle) - expected).abs() < 1e-12);
    }

    #[test]
    fn test_effective_inertia_saturates() {
        assert!((effective_inertia(0.8, u32::MAX) - 0.8).abs() < 1e-12);
        assert_eq!(effective_inertia(-0.5, 3), 0.0);
    }

    #[test]
    fn test_missing_default_skips_cycle() {
        let mut tariffs = MockTariffRepo::new();
        tariffs.expect_default_tariff().returning(|_| None);
        let subscriptions = MockSubscriptionRepo::new();
        let market = MockTariffMarket::new();

        let mut evaluator = evaluator(eager_accessor(10), tariffs, subscriptions, market);
        let err = evaluator.evaluate_tariffs().unwrap_err();

        assert_eq!(err, EvaluationError::NoDefaultTariff(PowerType::Consumption));
        assert_eq!(evaluator.evaluation_count(), 1);
        assert!(evaluator.ledger().is_empty());
    }

    #[test]
    fn test_zero_cost_default_is_rejected() {
        let default = flat(1, 0, 0.0);
        let tariffs = tariff_repo(default, Vec::new());
        let mut evaluator = evaluator(
            eager_accessor(10),
            tariffs,
            MockSubscriptionRepo::new(),
            MockTariffMarket::new(),
        );

        let err = evaluator.evaluate_tariffs().unwrap_err();
        assert!(matches!(err, EvaluationError::DegenerateDefaultCost { tariff, .. } if tariff == TariffId(1)));
        assert!(evaluator.cache().is_empty());
    }

    #[test]
    fn test_sole_default_tariff_makes_no_calls() {
        let default = flat(1, 0, 0.2);
        let current = Subscription::new(CUSTOMER, default.clone(), 1000);
        let mut evaluator = evaluator(
            eager_accessor(1000),
            tariff_repo(default, Vec::new()),
            subscription_repo(vec![current]),
            MockTariffMarket::new(),
        );

        let report = evaluator.evaluate_tariffs().unwrap();

        assert!(evaluator.ledger().is_empty());
        assert!(report.subscribed.is_empty());
        assert!(report.unsubscribed.is_empty());
        assert_eq!(report.candidates, vec![TariffId(1)]);
    }

    #[test]
    fn test_cheaper_tariff_wins_whole_segment() {
        let default = flat(1, 0, 0.2);
        let cheaper = flat(2, 5, 0.1);
        let current = Subscription::new(CUSTOMER, default.clone(), 10);

        let mut market = MockTariffMarket::new();
        let mut seq = mockall::Sequence::new();
        market
            .expect_unsubscribe()
            .withf(|sub, count| sub.tariff.id == TariffId(1) && *count == 10)
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));
        market
            .expect_subscribe_to_tariff()
            .withf(|tariff, customer, count| {
                tariff.id == TariffId(2) && customer.id == CUSTOMER && *count == 10
            })
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _| Ok(()));

        let mut evaluator = evaluator(
            eager_accessor(10),
            tariff_repo(default, vec![cheaper]),
            subscription_repo(vec![current]),
            market,
        )
        .with_rationality(1.0);

        let report = evaluator.evaluate_tariffs().unwrap();

        assert_eq!(evaluator.ledger().get(TariffId(1)), -10);
        assert_eq!(evaluator.ledger().get(TariffId(2)), 10);
        assert_eq!(report.subscribed, vec![(TariffId(2), 10)]);
        assert_eq!(report.unsubscribed, vec![(TariffId(1), 10)]);
        assert_eq!(report.imbalance, 0);
    }

    #[test]
    fn test_market_failure_is_logged_not_fatal() {
        let default = flat(1, 0, 0.2);
        let cheaper = flat(2, 5, 0.1);
        let current = Subscription::new(CUSTOMER, default.clone(), 4);

        let mut market = MockTariffMarket::new();
        market
            .expect_unsubscribe()
            .returning(|sub, count| {
                Err(crate::error::MarketError::InsufficientPopulation {
                    tariff: sub.tariff.id,
                    requested: count,
                    available: 0,
                })
            });
        market
            .expect_subscribe_to_tariff()
            .returning(|_, _, _| Ok(()));

        let mut evaluator = evaluator(
            eager_accessor(4),
            tariff_repo(default, vec![cheaper]),
            subscription_repo(vec![current]),
            market,
        );

        let report = evaluator.evaluate_tariffs().unwrap();
        assert!(report.unsubscribed.is_empty());
        assert_eq!(report.subscribed, vec![(TariffId(2), 4)]);
    }

    #[test]
    fn test_empty_profile_excludes_tariff() {
        let default = flat(1, 0, 0.2);
        let odd = flat(3, 5, 0.1);
        let current = Subscription::new(CUSTOMER, default.clone(), 5);

        let mut accessor = MockCustomerModelAccessor::new();
        accessor.expect_customer_info().returning(|| info(5));
        accessor
            .expect_capacity_profile()
            .returning(|t| if t.id == TariffId(3) { Vec::new() } else { vec![1.0; 24] });
        accessor.expect_broker_switch_factor().returning(|_| 0.0);
        accessor.expect_inertia_sample().returning(|| 0.99);
        accessor.expect_tariff_choice_sample().returning(|| 0.0);

        let mut evaluator = evaluator(
            accessor,
            tariff_repo(default, vec![odd]),
            subscription_repo(vec![current]),
            MockTariffMarket::new(),
        );

        let report = evaluator.evaluate_tariffs().unwrap();
        assert_eq!(report.excluded, vec![TariffId(3)]);
        assert!(evaluator.ledger().is_empty());
        assert!(!evaluator.cache().contains(TariffId(3)));
    }

    #[test]
    fn test_supersede_chain_is_followed() {
        let mut tariffs = MockTariffRepo::new();
        tariffs.expect_find_tariff().returning(|id| match id.0 {
            2 => Some(flat(2, 1, 0.2).revoked(Some(TariffId(3)))),
            3 => Some(flat(3, 1, 0.2)),
            _ => None,
        });
        let evaluator = evaluator(
            eager_accessor(1),
            tariffs,
            MockSubscriptionRepo::new(),
            MockTariffMarket::new(),
        );

        let revoked = flat(1, 1, 0.2).revoked(Some(TariffId(2)));
        let successor = evaluator.resolve_successor(&revoked).unwrap();
        assert_eq!(successor.id, TariffId(3));
    }

    #[test]
    fn test_supersede_loop_gives_up() {
        let mut tariffs = MockTariffRepo::new();
        tariffs.expect_find_tariff().returning(|id| match id.0 {
            2 => Some(flat(2, 1, 0.2).revoked(Some(TariffId(1)))),
            _ => None,
        });
        let evaluator = evaluator(
            eager_accessor(1),
            tariffs,
            MockSubscriptionRepo::new(),
            MockTariffMarket::new(),
        );

        let revoked = flat(1, 1, 0.2).revoked(Some(TariffId(2)));
        assert!(evaluator.resolve_successor(&revoked).is_none());
    }

    #[rstest]
    #[case::at_limit(3, Some(TariffId(4)))]
    #[case::past_limit(4, None)]
    fn test_supersede_depth_limit(#[case] hops: u64, #[case] expected: Option<TariffId>) {
        // 1 -> 2 -> ... -> hops + 1, where only the last tariff is subscribable
        let mut tariffs = MockTariffRepo::new();
        tariffs.expect_find_tariff().returning(move |id| {
            if id.0 == hops + 1 {
                Some(flat(id.0, 1, 0.2))
            } else if id.0 <= hops {
                Some(flat(id.0, 1, 0.2).revoked(Some(TariffId(id.0 + 1))))
            } else {
                None
            }
        });
        let evaluator = evaluator(
            eager_accessor(1),
            tariffs,
            MockSubscriptionRepo::new(),
            MockTariffMarket::new(),
        )
        .with_config(EvaluatorConfig {
            max_supersede_depth: 3,
            ..Default::default()
        });

        let revoked = flat(1, 1, 0.2).revoked(Some(TariffId(2)));
        assert_eq!(evaluator.resolve_successor(&revoked).map(|t| t.id), expected);
    }

    #[test]
    fn test_cached_zero_cost_default_is_rejected() {
        let free = flat(2, 1, 0.0);
        let mut evaluator = evaluator(
            eager_accessor(10),
            tariff_repo(free.clone(), Vec::new()),
            subscription_repo(vec![Subscription::new(CUSTOMER, free.clone(), 10)]),
            MockTariffMarket::new(),
        );
        // seen earlier as an ordinary candidate
        let eval = evaluator.ensure_evaluated(&free);
        assert_eq!(eval.cost_estimate, 0.0);
        assert!(evaluator.cache().contains(TariffId(2)));

        let err = evaluator.evaluate_tariffs().unwrap_err();
        assert_eq!(
            err,
            EvaluationError::DegenerateDefaultCost {
                tariff: TariffId(2),
                cost: 0.0,
            }
        );
        assert!(evaluator.ledger().is_empty());
    }

    #[test]
    fn test_report_lists_migration_targets() {
        let default = flat(1, 0, 0.2);
        let revoked = flat(2, 1, 0.15).revoked(Some(TariffId(3)));
        let mut tariffs = MockTariffRepo::new();
        let fallback = default.clone();
        tariffs
            .expect_default_tariff()
            .returning(move |_| Some(fallback.clone()));
        tariffs
            .expect_find_recent_active_tariffs()
            .returning(|_, _| Vec::new());
        tariffs
            .expect_find_tariff()
            .returning(|id| (id == TariffId(3)).then(|| flat(3, 1, 0.15)));

        let mut market = MockTariffMarket::new();
        market.expect_unsubscribe().times(1).returning(|_, _| Ok(()));
        market
            .expect_subscribe_to_tariff()
            .withf(|tariff, _, count| tariff.id == TariffId(3) && *count == 8)
            .times(1)
            .returning(|_, _, _| Ok(()));

        // the revoked subscription only shows up among the active ones
        let mut evaluator = evaluator(
            eager_accessor(8),
            tariffs,
            subscription_repo(vec![Subscription::new(CUSTOMER, revoked, 8)]),
            market,
        );
        let report = evaluator.evaluate_tariffs().unwrap();

        assert_eq!(report.candidates, vec![TariffId(1), TariffId(3)]);
        assert_eq!(report.subscribed, vec![(TariffId(3), 8)]);
    }

    #[test]
    fn test_fluent_setters_clamp() {
        let evaluator = evaluator(
            eager_accessor(1),
            MockTariffRepo::new(),
            MockSubscriptionRepo::new(),
            MockTariffMarket::new(),
        )
        .with_chunk_size(0)
        .with_inertia(1.5)
        .with_rationality(-3.0)
        .with_preferred_contract_duration(f64::NAN)
        .with_tariff_eval_depth(3);

        let config = evaluator.config();
        assert_eq!(config.chunk_size, EvaluatorConfig::default().chunk_size);
        assert_eq!(config.inertia, 1.0);
        assert_eq!(config.rationality, crate::config::MIN_RATIONALITY);
        assert_eq!(config.preferred_duration_days, 6.0);
        assert_eq!(config.tariff_eval_depth, 3);
    }

    #[test]
    fn test_initializers_update_factors() {
        let mut evaluator = evaluator(
            eager_accessor(1),
            MockTariffRepo::new(),
            MockSubscriptionRepo::new(),
            MockTariffMarket::new(),
        );
        evaluator.initialize_inconvenience_factors(0.3, 0.4, 0.5, 0.6);
        evaluator.initialize_regulation_factors(0.5, -1.0, 2.0);

        assert_eq!(evaluator.tou_factor(), 0.3);
        assert_eq!(evaluator.tiered_rate_factor(), 0.4);
        assert_eq!(evaluator.variable_pricing_factor(), 0.5);
        assert_eq!(evaluator.interruptibility_factor(), 0.6);
        assert_eq!(evaluator.config().regulation.expected_curtailment, 0.0);
        assert_eq!(evaluator.config().regulation.expected_discharge, -1.0);
    }
}
