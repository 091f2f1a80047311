use crate::domain::{CustomerInfo, Subscription, Tariff};
use crate::error::MarketError;

/// Write-side collaborator: the subscription ledger of the tariff market.
///
/// Shared between evaluators of many segments, so methods take `&self` and
/// implementations serialize access themselves.
#[cfg_attr(test, mockall::automock)]
pub trait TariffMarket: Send + Sync {
    fn subscribe_to_tariff(
        &self,
        tariff: &Tariff,
        customer: &CustomerInfo,
        count: u32,
    ) -> Result<(), MarketError>;

    fn unsubscribe(&self, subscription: &Subscription, count: u32) -> Result<(), MarketError>;
}
