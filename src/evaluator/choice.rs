//! Logit choice over candidate tariffs and chunked stochastic allocation.

use std::cmp::Ordering;

use itertools::Itertools;
use ordered_float::OrderedFloat;
use serde::Serialize;
use tracing::{debug, error};

use crate::accessor::CustomerModelAccessor;
use crate::domain::TariffId;

/// Random draws the choice engine consumes.
pub trait ChoiceDraws {
    fn inertia_sample(&mut self) -> f64;
    fn tariff_choice_sample(&mut self) -> f64;
}

impl<T: CustomerModelAccessor + ?Sized> ChoiceDraws for T {
    fn inertia_sample(&mut self) -> f64 {
        CustomerModelAccessor::inertia_sample(self)
    }

    fn tariff_choice_sample(&mut self) -> f64 {
        CustomerModelAccessor::tariff_choice_sample(self)
    }
}

/// A candidate tariff with its constrained utility and selection probability.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CandidateScore {
    pub tariff: TariffId,
    pub utility: f64,
    pub probability: f64,
}

impl CandidateScore {
    pub fn new(tariff: TariffId, utility: f64) -> Self {
        Self {
            tariff,
            utility,
            probability: 0.0,
        }
    }
}

/// Descending utility, ties broken by descending tariff id.
pub fn ranking(a: &CandidateScore, b: &CandidateScore) -> Ordering {
    OrderedFloat(b.utility)
        .cmp(&OrderedFloat(a.utility))
        .then_with(|| b.tariff.cmp(&a.tariff))
}

/// Logit temperature: 0 at rationality 0 (uniform choice), `lambda_max - 1`
/// at rationality 1.
pub fn logit_lambda(lambda_max: f64, rationality: f64) -> f64 {
    lambda_max.powf(rationality) - 1.0
}

/// Softmax of `lambda * utility` over `scores`, written into `probability`.
pub fn assign_probabilities(scores: &mut [CandidateScore], lambda: f64) {
    if scores.is_empty() {
        return;
    }
    let max_exponent = scores
        .iter()
        .map(|s| lambda * s.utility)
        .fold(f64::NEG_INFINITY, f64::max);
    let weights = scores
        .iter()
        .map(|s| (lambda * s.utility - max_exponent).exp())
        .collect_vec();
    let denominator: f64 = weights.iter().sum();
    for (score, weight) in scores.iter_mut().zip(weights) {
        score.probability = weight / denominator;
        if score.probability.is_nan() {
            error!(
                tariff = %score.tariff,
                utility = score.utility,
                denominator,
                "selection probability is NaN"
            );
            score.probability = 0.0;
        }
    }
}

/// Size of the blocks a population is allocated in. Small populations move
/// whole; large ones are split into at most `max_chunk_count` chunks.
pub fn chunk_size(population: u32, configured: u32, max_chunk_count: u32) -> u32 {
    if population <= configured {
        population
    } else {
        population
            .checked_div(max_chunk_count)
            .unwrap_or(population)
            .max(configured)
    }
}

/// Walks `ranked` subtracting probabilities from `sample` until it is used up.
pub fn pick(ranked: &[CandidateScore], sample: f64) -> Option<TariffId> {
    let mut remaining = sample;
    for candidate in ranked {
        if remaining <= candidate.probability {
            return Some(candidate.tariff);
        }
        remaining -= candidate.probability;
    }
    None
}

/// One sub-population to allocate.
#[derive(Debug, Clone, Copy)]
pub struct ChunkRequest {
    pub population: u32,
    pub multi_contracting: bool,
    pub inertia: f64,
    /// Revoked-tariff migration: inertia does not apply.
    pub forced: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AllocationOutcome {
    /// Chosen tariff and chunk size, in draw order.
    pub choices: Vec<(TariffId, u32)>,
    /// Customers kept in place by inertia.
    pub retained: u32,
    /// Customers whose chunk could not be placed.
    pub unallocated: u32,
    pub failed_chunks: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChoiceEngine {
    pub lambda: f64,
    pub chunk_size: u32,
    pub max_chunk_count: u32,
}

impl ChoiceEngine {
    pub fn new(lambda_max: f64, rationality: f64, chunk_size: u32, max_chunk_count: u32) -> Self {
        Self {
            lambda: logit_lambda(lambda_max, rationality),
            chunk_size,
            max_chunk_count,
        }
    }

    /// Orders the candidates and assigns their choice probabilities.
    pub fn rank<I>(&self, utilities: I) -> Vec<CandidateScore>
    where
        I: IntoIterator<Item = (TariffId, f64)>,
    {
        let mut ranked = utilities
            .into_iter()
            .map(|(tariff, utility)| CandidateScore::new(tariff, utility))
            .sorted_by(ranking)
            .collect_vec();
        assign_probabilities(&mut ranked, self.lambda);
        ranked
    }

    /// Splits the population into chunks and draws a tariff for each chunk
    /// that is not held back by inertia.
    pub fn allocate<D>(
        &self,
        ranked: &[CandidateScore],
        request: ChunkRequest,
        draws: &mut D,
    ) -> AllocationOutcome
    where
        D: ChoiceDraws + ?Sized,
    {
        let mut outcome = AllocationOutcome::default();
        let chunk = if request.multi_contracting {
            chunk_size(request.population, self.chunk_size, self.max_chunk_count)
        } else {
            request.population
        };

        let mut remaining = request.population;
        while remaining > 0 {
            let count = remaining.min(chunk.max(1));
            remaining -= count;

            let inertia_sample = draws.inertia_sample();
            if !request.forced && inertia_sample < request.inertia {
                outcome.retained += count;
                continue;
            }

            let sample = draws.tariff_choice_sample();
            match pick(ranked, sample) {
                Some(tariff) => {
                    debug!(tariff = %tariff, count, "chunk allocated");
                    outcome.choices.push((tariff, count));
                }
                None => {
                    let residual = sample - ranked.iter().map(|c| c.probability).sum::<f64>();
                    error!(residual, count, "failed to allocate chunk");
                    outcome.unallocated += count;
                    outcome.failed_chunks += 1;
                }
            }
        }
        outcome
    }
}
