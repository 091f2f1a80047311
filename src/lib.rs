//! Tariff evaluation for simulated retail electricity customers.
//!
//! A [`TariffEvaluator`] is owned by one customer segment. Each cycle it
//! estimates what the segment would pay under every tariff on offer, turns
//! that into utilities, and reallocates the segment's population with a
//! logit choice model tempered by inertia.

pub mod accessor;
pub mod config;
pub mod domain;
pub mod error;
pub mod evaluator;
pub mod market;
pub mod repo;
pub mod simulation;
pub mod telemetry;

pub use accessor::CustomerModelAccessor;
pub use config::EvaluatorConfig;
pub use error::{EvaluationError, MarketError};
pub use evaluator::{CycleReport, TariffEvaluator};
pub use market::TariffMarket;
pub use repo::{SubscriptionRepo, TariffRepo};
