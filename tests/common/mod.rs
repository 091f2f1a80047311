//! In-memory collaborators shared by the integration tests.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;

use parking_lot::Mutex;
use tariff_evaluator::domain::{
    CustomerId, CustomerInfo, PowerType, Subscription, Tariff, TariffId, TariffRates,
};
use tariff_evaluator::{CustomerModelAccessor, MarketError, SubscriptionRepo, TariffMarket, TariffRepo};

pub fn flat(id: u64, broker: u64, power_type: PowerType, rate: f64) -> Tariff {
    Tariff::new(id, broker, power_type).with_rates(TariffRates::flat(rate))
}

/// Published tariffs, in publication order.
#[derive(Default)]
pub struct InMemoryTariffs {
    published: Mutex<Vec<Tariff>>,
    defaults: Mutex<HashMap<PowerType, TariffId>>,
}

impl InMemoryTariffs {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn publish(&self, tariff: Tariff) {
        let mut published = self.published.lock();
        published.retain(|t| t.id != tariff.id);
        published.push(tariff);
    }

    pub fn publish_default(&self, tariff: Tariff) {
        self.defaults.lock().insert(tariff.power_type, tariff.id);
        self.publish(tariff);
    }

    pub fn get(&self, id: TariffId) -> Option<Tariff> {
        self.published.lock().iter().find(|t| t.id == id).cloned()
    }
}

impl TariffRepo for InMemoryTariffs {
    fn find_recent_active_tariffs(&self, depth: usize, power_type: PowerType) -> Vec<Tariff> {
        self.published
            .lock()
            .iter()
            .rev()
            .filter(|t| t.power_type == power_type && t.is_subscribable())
            .take(depth)
            .cloned()
            .collect()
    }

    fn find_tariff(&self, id: TariffId) -> Option<Tariff> {
        self.get(id)
    }

    fn default_tariff(&self, power_type: PowerType) -> Option<Tariff> {
        let id = {
            let defaults = self.defaults.lock();
            *defaults
                .get(&power_type)
                .or_else(|| defaults.get(&power_type.generic_type()))?
        };
        self.get(id)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MarketCall {
    Subscribe(TariffId, u32),
    Unsubscribe(TariffId, u32),
}

/// Subscription ledger of a single customer segment.
#[derive(Default)]
pub struct InMemoryMarket {
    subscriptions: Mutex<BTreeMap<TariffId, Subscription>>,
    calls: Mutex<Vec<MarketCall>>,
}

impl InMemoryMarket {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn seed(&self, subscription: Subscription) {
        self.subscriptions
            .lock()
            .insert(subscription.tariff.id, subscription);
    }

    /// Refreshes the tariff copy held by existing subscriptions.
    pub fn update_tariff(&self, tariff: &Tariff) {
        if let Some(sub) = self.subscriptions.lock().get_mut(&tariff.id) {
            sub.tariff = tariff.clone();
        }
    }

    pub fn committed(&self, tariff: TariffId) -> u32 {
        self.subscriptions
            .lock()
            .get(&tariff)
            .map_or(0, |s| s.customers_committed)
    }

    pub fn total_committed(&self) -> u32 {
        self.subscriptions
            .lock()
            .values()
            .map(|s| s.customers_committed)
            .sum()
    }

    pub fn calls(&self) -> Vec<MarketCall> {
        self.calls.lock().clone()
    }
}

impl SubscriptionRepo for InMemoryMarket {
    fn find_active_subscriptions(&self, customer: CustomerId) -> Vec<Subscription> {
        self.subscriptions
            .lock()
            .values()
            .filter(|s| s.customer == customer && s.customers_committed > 0)
            .cloned()
            .collect()
    }

    fn find_revoked_subscriptions(&self, customer: CustomerId) -> Vec<Subscription> {
        self.find_active_subscriptions(customer)
            .into_iter()
            .filter(|s| s.tariff.is_revoked())
            .collect()
    }

    fn find_subscription(&self, tariff: TariffId, customer: CustomerId) -> Option<Subscription> {
        self.subscriptions
            .lock()
            .get(&tariff)
            .filter(|s| s.customer == customer)
            .cloned()
    }
}

impl TariffMarket for InMemoryMarket {
    fn subscribe_to_tariff(
        &self,
        tariff: &Tariff,
        customer: &CustomerInfo,
        count: u32,
    ) -> Result<(), MarketError> {
        if !tariff.is_subscribable() {
            return Err(MarketError::NotSubscribable(tariff.id));
        }
        self.calls.lock().push(MarketCall::Subscribe(tariff.id, count));
        self.subscriptions
            .lock()
            .entry(tariff.id)
            .or_insert_with(|| Subscription::new(customer.id, tariff.clone(), 0))
            .customers_committed += count;
        Ok(())
    }

    fn unsubscribe(&self, subscription: &Subscription, count: u32) -> Result<(), MarketError> {
        let tariff = subscription.tariff.id;
        let mut subscriptions = self.subscriptions.lock();
        let Some(current) = subscriptions.get_mut(&tariff) else {
            return Err(MarketError::SubscriptionNotFound {
                tariff,
                customer: subscription.customer,
            });
        };
        if current.customers_committed < count {
            return Err(MarketError::InsufficientPopulation {
                tariff,
                requested: count,
                available: current.customers_committed,
            });
        }
        current.customers_committed -= count;
        current.expired_customer_count = current
            .expired_customer_count
            .min(current.customers_committed);
        if current.customers_committed == 0 {
            subscriptions.remove(&tariff);
        }
        self.calls.lock().push(MarketCall::Unsubscribe(tariff, count));
        Ok(())
    }
}

/// Accessor with a fixed profile and scripted draws. Once a script runs
/// out the fallback value repeats.
pub struct ScriptedAccessor {
    pub info: CustomerInfo,
    pub profile: Vec<f64>,
    pub inertia: VecDeque<f64>,
    pub inertia_fallback: f64,
    pub choice: VecDeque<f64>,
    pub choice_fallback: f64,
    pub broker_switch: f64,
}

impl ScriptedAccessor {
    pub fn new(info: CustomerInfo) -> Self {
        Self {
            info,
            profile: vec![1.0; 24],
            inertia: VecDeque::new(),
            inertia_fallback: 0.0,
            choice: VecDeque::new(),
            choice_fallback: 0.0,
            broker_switch: 0.02,
        }
    }

    pub fn with_inertia_draws(mut self, draws: &[f64], fallback: f64) -> Self {
        self.inertia = draws.iter().copied().collect();
        self.inertia_fallback = fallback;
        self
    }

    pub fn with_choice_draws(mut self, draws: &[f64], fallback: f64) -> Self {
        self.choice = draws.iter().copied().collect();
        self.choice_fallback = fallback;
        self
    }
}

impl CustomerModelAccessor for ScriptedAccessor {
    fn customer_info(&self) -> CustomerInfo {
        self.info.clone()
    }

    fn capacity_profile(&self, _tariff: &Tariff) -> Vec<f64> {
        self.profile.clone()
    }

    fn broker_switch_factor(&mut self, forced: bool) -> f64 {
        if forced {
            self.broker_switch * 5.0
        } else {
            self.broker_switch
        }
    }

    fn inertia_sample(&mut self) -> f64 {
        self.inertia.pop_front().unwrap_or(self.inertia_fallback)
    }

    fn tariff_choice_sample(&mut self) -> f64 {
        self.choice.pop_front().unwrap_or(self.choice_fallback)
    }
}
