//! # Tariff evaluation
//!
//! Scores the tariffs on offer for one customer segment and moves chunks of
//! its population between them with a logit choice model.
//!
//! - **cost / inconvenience**: per-tariff evaluation, cached by tariff id
//! - **utility**: switching costs, normalization against the default tariff
//! - **choice**: ranking, probabilities and chunked allocation
//! - **ledger**: net population change per tariff for one cycle
//! - **orchestrator**: the per-cycle driver, [`TariffEvaluator`]

pub mod cache;
pub mod choice;
pub mod cost;
pub mod inconvenience;
pub mod ledger;
pub mod orchestrator;
pub mod utility;

pub use cache::{EvalData, EvaluationCache};
pub use choice::{
    AllocationOutcome, CandidateScore, ChoiceDraws, ChoiceEngine, ChunkRequest,
};
pub use cost::{CostEstimator, CostFactors, RegulationFactors};
pub use inconvenience::InconvenienceFactors;
pub use ledger::AllocationLedger;
pub use orchestrator::{effective_inertia, CycleReport, TariffEvaluator};
pub use utility::{
    constrain_utility, normalized_difference, SwitchContext, TariffUtility, UtilityParams,
    UtilityScorer,
};
