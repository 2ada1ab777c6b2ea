//! Automatic topic count: every candidate is fitted on a training split and
//! scored on the tokens held out of it.

use super::model::{check_topic_count, fit_tokens, per_token_log_likelihood, CovariateLevels};
use super::{TopicModelConfig, TopicModelError};
use rand::rngs::StdRng;
use rand::seq::index::sample;
use rand::SeedableRng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use tracing::info;

/// Mixed into the run seed so the split does not replay the sampler's draws.
const HOLDOUT_SEED_SALT: u64 = 0x9e37_79b9_7f4a_7c15;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateScore {
    pub topics: usize,
    /// Mean log probability of a held-out token.
    pub held_out_log_likelihood: f64,
    /// Collapsed joint log-likelihood of the training fit.
    pub training_log_likelihood: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicCountSelection {
    pub chosen: usize,
    pub candidates: Vec<CandidateScore>,
    pub holdout_fraction: f64,
    pub held_out_tokens: usize,
}

pub(super) struct HoldoutSplit {
    pub training: Vec<Vec<usize>>,
    pub held_out: Vec<Vec<usize>>,
}

impl HoldoutSplit {
    pub fn held_out_count(&self) -> usize {
        self.held_out.iter().map(Vec::len).sum()
    }
}

/// Withholds `floor(fraction * len)` tokens of every document, always
/// leaving at least one token in training.
pub(super) fn split_tokens(tokens: &[Vec<usize>], fraction: f64, seed: u64) -> HoldoutSplit {
    let mut rng = StdRng::seed_from_u64(seed ^ HOLDOUT_SEED_SALT);
    let mut training = Vec::with_capacity(tokens.len());
    let mut held_out = Vec::with_capacity(tokens.len());
    for document in tokens.iter() {
        let amount = ((document.len() as f64 * fraction).floor() as usize)
            .min(document.len().saturating_sub(1));
        let mut withheld = vec![false; document.len()];
        for position in sample(&mut rng, document.len(), amount).into_iter() {
            withheld[position] = true;
        }
        let (kept, removed): (Vec<_>, Vec<_>) = document
            .iter()
            .zip(withheld.iter())
            .partition(|(_, withheld)| !**withheld);
        training.push(kept.into_iter().map(|(term, _)| *term).collect());
        held_out.push(removed.into_iter().map(|(term, _)| *term).collect());
    }
    HoldoutSplit { training, held_out }
}

/// Best candidate by held-out likelihood, the smallest count on ties.
fn best_candidate(candidates: &[CandidateScore]) -> Option<&CandidateScore> {
    let mut best: Option<&CandidateScore> = None;
    for candidate in candidates.iter() {
        match best {
            Some(current)
                if candidate.held_out_log_likelihood <= current.held_out_log_likelihood => {}
            _ => best = Some(candidate),
        }
    }
    best
}

pub(super) fn select_topic_count(
    tokens: &[Vec<usize>],
    vocabulary_len: usize,
    covariate: &CovariateLevels,
    range: RangeInclusive<usize>,
    holdout_fraction: f64,
    config: &TopicModelConfig,
) -> Result<TopicCountSelection, TopicModelError> {
    if !(holdout_fraction > 0.0 && holdout_fraction < 1.0) {
        return Err(TopicModelError::InvalidHoldout(holdout_fraction));
    }
    let document_count = tokens.len();
    let (min, max) = range.into_inner();
    if min < 2 {
        return Err(TopicModelError::TooFewTopics(min));
    }
    let upper = max.min(document_count.saturating_sub(1));
    if min > upper {
        return Err(TopicModelError::NoCandidates {
            min,
            max,
            documents: document_count,
        });
    }

    let split = split_tokens(tokens, holdout_fraction, config.seed);
    let held_out_tokens = split.held_out_count();
    if held_out_tokens == 0 {
        return Err(TopicModelError::EmptyHoldout);
    }
    info!(
        "Selecting topic count in [{}, {}] on {} held-out tokens",
        min, upper, held_out_tokens
    );

    let candidates: Vec<CandidateScore> = (min..=upper)
        .into_par_iter()
        .map(|topics| {
            let fit = fit_tokens(&split.training, vocabulary_len, covariate, topics, config);
            let held_out_log_likelihood =
                per_token_log_likelihood(&split.held_out, &fit.doc_topic, &fit.term_topic);
            CandidateScore {
                topics,
                held_out_log_likelihood,
                training_log_likelihood: fit.log_likelihood,
            }
        })
        .collect();
    for candidate in candidates.iter() {
        info!(
            "- K={}: held-out {:.4}, training {:.3}",
            candidate.topics, candidate.held_out_log_likelihood, candidate.training_log_likelihood
        );
    }

    let chosen = best_candidate(&candidates)
        .map(|c| c.topics)
        .ok_or(TopicModelError::NoCandidates {
            min,
            max,
            documents: document_count,
        })?;
    check_topic_count(chosen, document_count)?;
    info!("Selected {} topics", chosen);
    Ok(TopicCountSelection {
        chosen,
        candidates,
        holdout_fraction,
        held_out_tokens,
    })
}
