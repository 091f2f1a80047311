use std::collections::BTreeMap;

use crate::domain::TariffId;

/// Net population movement per tariff within one evaluation cycle.
///
/// Every recorded move debits one tariff and credits another by the same
/// count, so the entries always sum to zero.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AllocationLedger {
    entries: BTreeMap<TariffId, i64>,
}

impl AllocationLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Moves `count` customers from `from` to `to`. Staying put is not a move
    /// and is not recorded; returns whether anything was recorded.
    pub fn record(&mut self, from: TariffId, to: TariffId, count: u32) -> bool {
        if from == to || count == 0 {
            return false;
        }
        *self.entries.entry(from).or_insert(0) -= i64::from(count);
        *self.entries.entry(to).or_insert(0) += i64::from(count);
        true
    }

    pub fn get(&self, tariff: TariffId) -> i64 {
        self.entries.get(&tariff).copied().unwrap_or(0)
    }

    /// Sum over all entries; anything but zero means population was lost or
    /// created.
    pub fn net(&self) -> i64 {
        self.entries.values().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.values().all(|count| *count == 0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (TariffId, i64)> + '_ {
        self.entries.iter().map(|(tariff, count)| (*tariff, *count))
    }

    /// Tariffs losing customers, with the (positive) number leaving.
    pub fn withdrawals(&self) -> impl Iterator<Item = (TariffId, u32)> + '_ {
        self.iter()
            .filter(|(_, count)| *count < 0)
            .map(|(tariff, count)| (tariff, to_count(-count)))
    }

    /// Tariffs gaining customers, with the number joining.
    pub fn enrollments(&self) -> impl Iterator<Item = (TariffId, u32)> + '_ {
        self.iter()
            .filter(|(_, count)| *count > 0)
            .map(|(tariff, count)| (tariff, to_count(count)))
    }
}

fn to_count(value: i64) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}
