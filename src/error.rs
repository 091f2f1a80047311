use thiserror::Error;

use crate::domain::{CustomerId, PowerType, TariffId};

/// Reasons an evaluation cycle is skipped without touching the market.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvaluationError {
    #[error("No default tariff available for power type {0}")]
    NoDefaultTariff(PowerType),
    #[error("Default tariff {tariff} has an unusable cost estimate: {cost}")]
    DegenerateDefaultCost { tariff: TariffId, cost: f64 },
}

/// Failures reported by the tariff market when committing allocations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MarketError {
    #[error("No subscription of customer {customer} to tariff {tariff}")]
    SubscriptionNotFound { tariff: TariffId, customer: CustomerId },
    #[error("Tariff {0} is not open for subscription")]
    NotSubscribable(TariffId),
    #[error("Cannot unsubscribe {requested} from tariff {tariff}: only {available} subscribed")]
    InsufficientPopulation {
        tariff: TariffId,
        requested: u32,
        available: u32,
    },
    #[error("Market rejected the request: {0}")]
    Rejected(String),
}
