//! Read-side collaborators: where tariffs and subscriptions come from.
//!
//! Implementations are injected into the evaluator; nothing here is looked
//! up from process-wide state.

use crate::domain::{CustomerId, PowerType, Subscription, Tariff, TariffId};

#[cfg_attr(test, mockall::automock)]
pub trait TariffRepo: Send + Sync {
    /// The `depth` most recently published subscribable tariffs of exactly
    /// this power type, across all brokers.
    fn find_recent_active_tariffs(&self, depth: usize, power_type: PowerType) -> Vec<Tariff>;

    fn find_tariff(&self, id: TariffId) -> Option<Tariff>;

    /// Default tariff for `power_type`, falling back to its generic type.
    fn default_tariff(&self, power_type: PowerType) -> Option<Tariff>;
}

#[cfg_attr(test, mockall::automock)]
pub trait SubscriptionRepo: Send + Sync {
    fn find_active_subscriptions(&self, customer: CustomerId) -> Vec<Subscription>;

    /// Subscriptions whose tariff has been revoked and still hold customers.
    fn find_revoked_subscriptions(&self, customer: CustomerId) -> Vec<Subscription>;

    fn find_subscription(&self, tariff: TariffId, customer: CustomerId) -> Option<Subscription>;
}
