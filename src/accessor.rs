use crate::domain::{CustomerInfo, Tariff};

/// Access from the evaluator back into the customer model that owns it.
///
/// Every stochastic draw goes through here so a model can seed them per
/// segment and keep runs reproducible.
#[cfg_attr(test, mockall::automock)]
pub trait CustomerModelAccessor: Send {
    fn customer_info(&self) -> CustomerInfo;

    /// Expected usage (or production) per hour over the evaluation horizon,
    /// as magnitudes.
    fn capacity_profile(&self, tariff: &Tariff) -> Vec<f64>;

    /// Inconvenience of moving to another broker. `forced` is set when the
    /// move follows a tariff revocation.
    fn broker_switch_factor(&mut self, forced: bool) -> f64;

    /// Uniform draw in [0, 1) compared against the effective inertia.
    fn inertia_sample(&mut self) -> f64;

    /// Uniform draw in [0, 1) used to pick a tariff from the choice distribution.
    fn tariff_choice_sample(&mut self) -> f64;
}
