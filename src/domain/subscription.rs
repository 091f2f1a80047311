use super::{CustomerId, Tariff};

/// Binding of part of a customer segment's population to one tariff.
#[derive(Debug, Clone, PartialEq)]
pub struct Subscription {
    pub customer: CustomerId,
    pub tariff: Tariff,
    pub customers_committed: u32,
    /// Portion of `customers_committed` past the tariff's minimum duration.
    pub expired_customer_count: u32,
}

impl Subscription {
    pub fn new(customer: CustomerId, tariff: Tariff, customers_committed: u32) -> Self {
        Self {
            customer,
            tariff,
            customers_committed,
            expired_customer_count: 0,
        }
    }

    pub fn with_expired(mut self, expired: u32) -> Self {
        self.expired_customer_count = expired.min(self.customers_committed);
        self
    }

    /// Customers still inside their minimum-duration commitment.
    pub fn unexpired_customer_count(&self) -> u32 {
        self.customers_committed
            .saturating_sub(self.expired_customer_count)
    }
}
