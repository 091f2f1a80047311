use std::collections::HashMap;

use serde::Serialize;

use crate::domain::TariffId;

/// Memoized evaluation of one tariff for one customer segment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EvalData {
    pub cost_estimate: f64,
    pub inconvenience: f64,
}

impl EvalData {
    pub fn new(cost_estimate: f64, inconvenience: f64) -> Self {
        Self {
            cost_estimate,
            inconvenience,
        }
    }

    pub fn is_degenerate(&self) -> bool {
        self.cost_estimate.is_nan() || self.inconvenience.is_nan()
    }
}

/// Per-evaluator cache of tariff evaluations.
///
/// Entries are computed on first encounter and kept for the evaluator's
/// lifetime; tariffs are immutable once published, so nothing expires.
#[derive(Debug, Default)]
pub struct EvaluationCache {
    entries: HashMap<TariffId, EvalData>,
}

impl EvaluationCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, tariff: TariffId) -> Option<EvalData> {
        self.entries.get(&tariff).copied()
    }

    pub fn contains(&self, tariff: TariffId) -> bool {
        self.entries.contains_key(&tariff)
    }

    pub fn insert(&mut self, tariff: TariffId, data: EvalData) {
        self.entries.insert(tariff, data);
    }

    /// Drops one entry so the tariff is re-evaluated on next encounter.
    pub fn forget(&mut self, tariff: TariffId) -> Option<EvalData> {
        self.entries.remove(&tariff)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
