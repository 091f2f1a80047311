use chrono::Duration;
use serde::{Deserialize, Serialize};

use super::PowerType;

/// Stable tariff identity. Caches and ledgers key on this, never on the
/// tariff value itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TariffId(pub u64);

impl std::fmt::Display for TariffId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BrokerId(pub u64);

/// Tariff lifecycle as published by the tariff market.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TariffState {
    Pending,
    Offered,
    Active,
    Withdrawn,
    /// Revoked by its broker; subscribers must migrate.
    Killed,
    Inactive,
}

impl TariffState {
    pub fn is_subscribable(&self) -> bool {
        matches!(self, Self::Offered | Self::Active)
    }
}

/// Rate-structure indicators that drive the per-tariff inconvenience.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RateShape {
    /// Several rates, at least one with a daily or weekly window.
    pub time_of_use: bool,
    /// At least one rate with a non-zero tier threshold.
    pub tiered: bool,
    /// At least one non-fixed rate.
    pub variable_rate: bool,
    /// Largest fraction of load the broker may curtail.
    pub max_curtailment: f64,
}

/// Balancing-market payments for tariffs carrying regulation rates, per kWh.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RegulationRates {
    pub up_regulation: f64,
    pub down_regulation: f64,
}

/// Just enough of a tariff's prices to estimate the cost of a capacity
/// profile. Prices are per kWh and positive when the customer pays.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TariffRates {
    /// Hour-indexed rates, repeated cyclically over the profile.
    pub hourly: Vec<f64>,
    /// Upper bound of any variable rate.
    pub max_rate: f64,
    /// Mean price actually charged so far, if the broker has reported one.
    pub realized_price: Option<f64>,
    /// Energy sold under this tariff so far, in kWh.
    pub sold_volume: f64,
    /// Fixed payment per day of subscription.
    pub periodic_payment: f64,
    pub regulation: Option<RegulationRates>,
}

impl TariffRates {
    /// A single flat rate.
    pub fn flat(rate: f64) -> Self {
        Self {
            hourly: vec![rate],
            max_rate: rate,
            ..Default::default()
        }
    }

    /// Rate applying to profile slot `slot`; zero when no rates are set.
    pub fn rate_at(&self, slot: usize) -> f64 {
        if self.hourly.is_empty() {
            return 0.0;
        }
        self.hourly[slot % self.hourly.len()]
    }
}

/// A broker's contract offer. Owned by the tariff repository; the evaluator
/// only reads it.
#[derive(Debug, Clone, PartialEq)]
pub struct Tariff {
    pub id: TariffId,
    pub broker: BrokerId,
    pub power_type: PowerType,
    pub state: TariffState,
    /// Set only once the tariff has been revoked.
    pub superseded_by: Option<TariffId>,
    pub min_duration: Duration,
    pub early_withdraw_payment: f64,
    /// Negative values are signup bonuses.
    pub signup_payment: f64,
    pub shape: RateShape,
    pub rates: TariffRates,
}

impl Tariff {
    pub fn new(id: u64, broker: u64, power_type: PowerType) -> Self {
        Self {
            id: TariffId(id),
            broker: BrokerId(broker),
            power_type,
            state: TariffState::Active,
            superseded_by: None,
            min_duration: Duration::zero(),
            early_withdraw_payment: 0.0,
            signup_payment: 0.0,
            shape: RateShape::default(),
            rates: TariffRates::default(),
        }
    }

    pub fn with_rates(mut self, rates: TariffRates) -> Self {
        self.rates = rates;
        self
    }

    pub fn with_shape(mut self, shape: RateShape) -> Self {
        self.shape = shape;
        self
    }

    pub fn with_signup_payment(mut self, payment: f64) -> Self {
        self.signup_payment = payment;
        self
    }

    pub fn with_early_withdrawal(mut self, payment: f64, min_duration: Duration) -> Self {
        self.early_withdraw_payment = payment;
        self.min_duration = min_duration;
        self
    }

    /// Marks the tariff as revoked, optionally naming its successor.
    pub fn revoked(mut self, superseded_by: Option<TariffId>) -> Self {
        self.state = TariffState::Killed;
        self.superseded_by = superseded_by;
        self
    }

    pub fn is_revoked(&self) -> bool {
        self.state == TariffState::Killed
    }

    pub fn is_subscribable(&self) -> bool {
        self.state.is_subscribable()
    }

    pub fn is_time_of_use(&self) -> bool {
        self.shape.time_of_use
    }

    pub fn is_tiered(&self) -> bool {
        self.shape.tiered
    }

    pub fn is_variable_rate(&self) -> bool {
        self.shape.variable_rate
    }

    /// Interruptible tariffs target an interruptible power type and allow
    /// some curtailment.
    pub fn is_interruptible(&self) -> bool {
        self.power_type.is_interruptible() && self.shape.max_curtailment != 0.0
    }
}
