//! # Simulation support
//!
//! Ready-made pieces for customer models that host an evaluator:
//!
//! - **SeededSampler**: reproducible per-segment random draws
//! - **ProfileAccessor**: a `CustomerModelAccessor` with fixed capacity profiles

pub mod profile_accessor;
pub mod sampler;

pub use profile_accessor::ProfileAccessor;
pub use sampler::{SamplerConfig, SeededSampler};
