pub mod customer;
pub mod subscription;
pub mod tariff;

pub use customer::*;
pub use subscription::*;
pub use tariff::*;
