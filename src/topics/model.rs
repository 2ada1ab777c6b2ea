use super::gibbs::{sample, SamplerInput};
use super::selection::{select_topic_count, TopicCountSelection};
use super::TopicModelError;
use crate::corpus::{CovariateField, DocumentId, DocumentMeta};
use crate::dtm::DocumentTermMatrix;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::info;

/// Tolerance for the probability-simplex checks on fitted matrices.
pub const SIMPLEX_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicModelConfig {
    /// Number of Gibbs sweeps.
    pub iterations: usize,
    /// Sweeps before the priors start being optimized.
    pub burn_in: usize,
    /// Sweeps between two prior updates, 0 keeps the priors fixed.
    pub optimize_interval: usize,
    /// Initial symmetric document-topic prior.
    pub alpha: f64,
    /// Symmetric topic-term prior.
    pub beta: f64,
    pub seed: u64,
}

impl Default for TopicModelConfig {
    fn default() -> Self {
        Self {
            iterations: 500,
            burn_in: 100,
            optimize_interval: 25,
            alpha: 0.1,
            beta: 0.01,
            seed: 1234,
        }
    }
}

impl TopicModelConfig {
    pub fn validate(&self) -> Result<(), TopicModelError> {
        if self.iterations == 0 {
            return Err(TopicModelError::InvalidParameter {
                name: "iterations",
                value: 0.0,
            });
        }
        for (name, value) in [("alpha", self.alpha), ("beta", self.beta)] {
            if !(value > 0.0 && value.is_finite()) {
                return Err(TopicModelError::InvalidParameter { name, value });
            }
        }
        Ok(())
    }
}

/// Either a fixed topic count or a held-out search over a range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum TopicCount {
    Fixed(usize),
    Auto {
        min: usize,
        max: usize,
        holdout_fraction: f64,
    },
}

/// Distinct values of the prevalence covariate and the level of every
/// document. Levels are sorted so that indices do not depend on row order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CovariateLevels {
    pub field: CovariateField,
    pub levels: Vec<String>,
    pub assignments: Vec<usize>,
}

impl CovariateLevels {
    pub fn from_metadata(field: CovariateField, metadata: &[DocumentMeta]) -> Self {
        let levels: Vec<String> = metadata
            .iter()
            .map(|meta| field.value(meta).to_string())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let assignments = metadata
            .iter()
            .map(|meta| {
                levels
                    .binary_search_by(|level| level.as_str().cmp(field.value(meta)))
                    .unwrap_or_default()
            })
            .collect();
        Self {
            field,
            levels,
            assignments,
        }
    }

    pub fn level_count(&self) -> usize {
        self.levels.len()
    }

    pub fn level_of(&self, document: usize) -> Option<&str> {
        self.assignments
            .get(document)
            .and_then(|level| self.levels.get(*level))
            .map(String::as_str)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LogLikelihoodPoint {
    pub iteration: usize,
    pub log_likelihood: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedTopicModel {
    pub topic_count: usize,
    /// Row order of `doc_topic`.
    pub document_ids: Vec<DocumentId>,
    /// K rows over the vocabulary, each summing to 1.
    pub term_topic: Vec<Vec<f64>>,
    /// One row per document over the K topics, each summing to 1.
    pub doc_topic: Vec<Vec<f64>>,
    pub covariate: CovariateLevels,
    /// Learned Dirichlet prior of every covariate level, same order as
    /// `covariate.levels`.
    pub alpha: Vec<Vec<f64>>,
    /// Collapsed joint log-likelihood of the final state.
    pub log_likelihood: f64,
    pub log_likelihood_trace: Vec<LogLikelihoodPoint>,
    /// Mean of `log sum_k theta_dk phi_kw` over every token of the corpus.
    pub per_token_log_likelihood: f64,
    pub selection: Option<TopicCountSelection>,
    pub config: TopicModelConfig,
}

impl FittedTopicModel {
    /// Checks both matrices are row-stochastic and shaped for
    /// `vocabulary_len` terms.
    pub fn validate(&self, vocabulary_len: usize) -> Result<(), TopicModelError> {
        if self.doc_topic.len() != self.document_ids.len() {
            return Err(TopicModelError::DocumentCountMismatch {
                expected: self.document_ids.len(),
                actual: self.doc_topic.len(),
            });
        }
        check_simplex("term-topic", &self.term_topic, vocabulary_len)?;
        check_simplex("document-topic", &self.doc_topic, self.topic_count)
    }

    /// Topic with the largest weight in the document, lowest index on ties.
    pub fn dominant_topic(&self, document: usize) -> Option<usize> {
        self.doc_topic.get(document).map(|row| argmax(row))
    }
}

fn check_simplex(
    matrix: &'static str,
    rows: &[Vec<f64>],
    width: usize,
) -> Result<(), TopicModelError> {
    for (row, values) in rows.iter().enumerate() {
        let sum: f64 = values.iter().sum();
        if values.len() != width
            || values.iter().any(|v| *v < 0.0 || !v.is_finite())
            || (sum - 1.0).abs() > SIMPLEX_TOLERANCE
        {
            return Err(TopicModelError::NotASimplex { matrix, row, sum });
        }
    }
    Ok(())
}

pub(crate) fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (index, value) in values.iter().enumerate() {
        if *value > values[best] {
            best = index;
        }
    }
    best
}

pub(super) fn check_topic_count(topics: usize, documents: usize) -> Result<(), TopicModelError> {
    if topics < 2 {
        return Err(TopicModelError::TooFewTopics(topics));
    }
    if topics >= documents {
        return Err(TopicModelError::TooManyTopics { topics, documents });
    }
    Ok(())
}

/// Expands sparse counts into one vocabulary index per token.
pub(super) fn expand_tokens(matrix: &DocumentTermMatrix) -> Vec<Vec<usize>> {
    matrix
        .rows()
        .iter()
        .map(|row| {
            row.iter()
                .flat_map(|(index, count)| std::iter::repeat(index).take(count as usize))
                .collect()
        })
        .collect()
}

/// Mean log probability of `tokens` under the mixture `theta * phi`.
pub(super) fn per_token_log_likelihood(
    tokens: &[Vec<usize>],
    doc_topic: &[Vec<f64>],
    term_topic: &[Vec<f64>],
) -> f64 {
    let mut total = 0.0;
    let mut count = 0usize;
    for (document, terms) in tokens.iter().enumerate() {
        for term in terms.iter() {
            let probability: f64 = doc_topic[document]
                .iter()
                .zip(term_topic.iter())
                .map(|(theta, phi)| theta * phi[*term])
                .sum();
            total += probability.ln();
            count += 1;
        }
    }
    if count == 0 {
        0.0
    } else {
        total / count as f64
    }
}

pub(super) struct TokenFit {
    pub term_topic: Vec<Vec<f64>>,
    pub doc_topic: Vec<Vec<f64>>,
    pub alpha: Vec<Vec<f64>>,
    pub log_likelihood: f64,
    pub log_likelihood_trace: Vec<LogLikelihoodPoint>,
}

pub(super) fn fit_tokens(
    tokens: &[Vec<usize>],
    vocabulary_len: usize,
    covariate: &CovariateLevels,
    topic_count: usize,
    config: &TopicModelConfig,
) -> TokenFit {
    let output = sample(
        SamplerInput {
            tokens,
            vocabulary_len,
            levels: &covariate.assignments,
            level_count: covariate.level_count(),
        },
        topic_count,
        config,
    );
    TokenFit {
        term_topic: output.term_topic,
        doc_topic: output.doc_topic,
        alpha: output.alpha,
        log_likelihood: output.log_likelihood,
        log_likelihood_trace: output.log_likelihood_trace,
    }
}

/// Fits the topic model over a pruned matrix, letting `covariate` shift
/// topic prevalence. With [`TopicCount::Auto`] the count is selected by
/// held-out likelihood first and then refit on every token.
pub fn fit_topic_model(
    matrix: &DocumentTermMatrix,
    covariate: CovariateField,
    count: TopicCount,
    config: &TopicModelConfig,
) -> Result<FittedTopicModel, TopicModelError> {
    config.validate()?;
    if matrix.vocabulary().is_empty() {
        return Err(TopicModelError::EmptyVocabulary);
    }
    if let Some(meta) = matrix
        .rows()
        .iter()
        .zip(matrix.metadata().iter())
        .find_map(|(row, meta)| row.is_empty().then_some(meta))
    {
        return Err(TopicModelError::EmptyDocument(meta.id.clone()));
    }

    let document_count = matrix.document_count();
    let vocabulary_len = matrix.vocabulary().len();
    let covariate = CovariateLevels::from_metadata(covariate, matrix.metadata());
    let tokens = expand_tokens(matrix);

    let (topic_count, selection) = match count {
        TopicCount::Fixed(topics) => {
            check_topic_count(topics, document_count)?;
            (topics, None)
        }
        TopicCount::Auto {
            min,
            max,
            holdout_fraction,
        } => {
            let selection = select_topic_count(
                &tokens,
                vocabulary_len,
                &covariate,
                min..=max,
                holdout_fraction,
                config,
            )?;
            (selection.chosen, Some(selection))
        }
    };

    info!(
        "Fitting {} topics over {} documents, {} terms, {} covariate levels ({})",
        topic_count,
        document_count,
        vocabulary_len,
        covariate.level_count(),
        covariate.field.name()
    );
    let fit = fit_tokens(&tokens, vocabulary_len, &covariate, topic_count, config);
    let per_token = per_token_log_likelihood(&tokens, &fit.doc_topic, &fit.term_topic);
    info!(
        "Fitted {} topics: log-likelihood {:.3}, per-token {:.4}",
        topic_count, fit.log_likelihood, per_token
    );

    let model = FittedTopicModel {
        topic_count,
        document_ids: matrix.document_ids(),
        term_topic: fit.term_topic,
        doc_topic: fit.doc_topic,
        covariate,
        alpha: fit.alpha,
        log_likelihood: fit.log_likelihood,
        log_likelihood_trace: fit.log_likelihood_trace,
        per_token_log_likelihood: per_token,
        selection,
        config: config.clone(),
    };
    model.validate(vocabulary_len)?;
    Ok(model)
}
