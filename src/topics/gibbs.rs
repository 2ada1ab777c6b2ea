//! Collapsed Gibbs sampler where every covariate level owns its own
//! asymmetric Dirichlet prior over topics.

use super::model::{LogLikelihoodPoint, TopicModelConfig};
use super::special::{digamma, ln_gamma};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

const MIN_ALPHA: f64 = 1e-4;
const MAX_ALPHA: f64 = 1e2;
const FIXED_POINT_ITERATIONS: usize = 10;
const TRACE_INTERVAL: usize = 10;

/// Pseudo-document count pulling a level's prior toward the pooled prior.
const LEVEL_SHRINKAGE: f64 = 5.0;

pub(super) struct SamplerInput<'a> {
    /// Vocabulary index of every token, per document.
    pub tokens: &'a [Vec<usize>],
    pub vocabulary_len: usize,
    /// Covariate level of every document.
    pub levels: &'a [usize],
    pub level_count: usize,
}

pub(super) struct SamplerOutput {
    pub term_topic: Vec<Vec<f64>>,
    pub doc_topic: Vec<Vec<f64>>,
    pub alpha: Vec<Vec<f64>>,
    pub log_likelihood: f64,
    pub log_likelihood_trace: Vec<LogLikelihoodPoint>,
}

struct GibbsState<'a> {
    input: SamplerInput<'a>,
    topic_count: usize,
    beta: f64,
    level_documents: Vec<Vec<usize>>,
    assignments: Vec<Vec<usize>>,
    doc_topic_counts: Vec<Vec<u32>>,
    topic_term_counts: Vec<Vec<u32>>,
    topic_counts: Vec<u64>,
    alpha: Vec<Vec<f64>>,
}

impl<'a> GibbsState<'a> {
    fn initialize(
        input: SamplerInput<'a>,
        topic_count: usize,
        config: &TopicModelConfig,
        rng: &mut StdRng,
    ) -> Self {
        let document_count = input.tokens.len();
        let mut level_documents = vec![vec![]; input.level_count];
        for (document, level) in input.levels.iter().enumerate() {
            level_documents[*level].push(document);
        }

        let mut assignments = Vec::with_capacity(document_count);
        let mut doc_topic_counts = vec![vec![0u32; topic_count]; document_count];
        let mut topic_term_counts = vec![vec![0u32; input.vocabulary_len]; topic_count];
        let mut topic_counts = vec![0u64; topic_count];
        for (document, tokens) in input.tokens.iter().enumerate() {
            let mut document_assignments = Vec::with_capacity(tokens.len());
            for term in tokens.iter() {
                let topic = rng.random_range(0..topic_count);
                doc_topic_counts[document][topic] += 1;
                topic_term_counts[topic][*term] += 1;
                topic_counts[topic] += 1;
                document_assignments.push(topic);
            }
            assignments.push(document_assignments);
        }

        let alpha = vec![vec![config.alpha; topic_count]; input.level_count];
        Self {
            input,
            topic_count,
            beta: config.beta,
            level_documents,
            assignments,
            doc_topic_counts,
            topic_term_counts,
            topic_counts,
            alpha,
        }
    }

    fn sweep(&mut self, rng: &mut StdRng, cumulative: &mut [f64]) {
        let beta_sum = self.input.vocabulary_len as f64 * self.beta;
        for (document, tokens) in self.input.tokens.iter().enumerate() {
            let level = self.input.levels[document];
            for (position, term) in tokens.iter().enumerate() {
                let old_topic = self.assignments[document][position];
                self.doc_topic_counts[document][old_topic] -= 1;
                self.topic_term_counts[old_topic][*term] -= 1;
                self.topic_counts[old_topic] -= 1;

                let mut total = 0.0;
                for topic in 0..self.topic_count {
                    total += (self.doc_topic_counts[document][topic] as f64
                        + self.alpha[level][topic])
                        * (self.topic_term_counts[topic][*term] as f64 + self.beta)
                        / (self.topic_counts[topic] as f64 + beta_sum);
                    cumulative[topic] = total;
                }
                let draw = rng.random::<f64>() * total;
                let new_topic = cumulative
                    .iter()
                    .position(|c| draw < *c)
                    .unwrap_or(self.topic_count - 1);

                self.assignments[document][position] = new_topic;
                self.doc_topic_counts[document][new_topic] += 1;
                self.topic_term_counts[new_topic][*term] += 1;
                self.topic_counts[new_topic] += 1;
            }
        }
    }

    /// Minka's fixed-point iteration for the Dirichlet-multinomial prior
    /// shared by `documents`, starting from `start`.
    fn fixed_point(&self, documents: &[usize], start: &[f64]) -> Vec<f64> {
        let mut alpha = start.to_vec();
        for _ in 0..FIXED_POINT_ITERATIONS {
            let alpha_sum: f64 = alpha.iter().sum();
            let denominator: f64 = documents
                .iter()
                .map(|d| {
                    digamma(self.input.tokens[*d].len() as f64 + alpha_sum) - digamma(alpha_sum)
                })
                .sum();
            if denominator <= 0.0 {
                break;
            }
            for topic in 0..self.topic_count {
                let numerator: f64 = documents
                    .iter()
                    .map(|d| {
                        digamma(self.doc_topic_counts[*d][topic] as f64 + alpha[topic])
                            - digamma(alpha[topic])
                    })
                    .sum();
                alpha[topic] = (alpha[topic] * numerator / denominator).clamp(MIN_ALPHA, MAX_ALPHA);
            }
        }
        alpha
    }

    fn optimize_alpha(&mut self) {
        let all_documents: Vec<usize> = (0..self.input.tokens.len()).collect();
        let mut start = vec![0.0; self.topic_count];
        for level_alpha in self.alpha.iter() {
            for (s, a) in start.iter_mut().zip(level_alpha.iter()) {
                *s += a / self.alpha.len() as f64;
            }
        }
        let pooled = self.fixed_point(&all_documents, &start);

        for level in 0..self.input.level_count {
            let documents = &self.level_documents[level];
            let updated = if documents.is_empty() {
                pooled.clone()
            } else {
                let own = self.fixed_point(documents, &self.alpha[level]);
                let weight = documents.len() as f64 / (documents.len() as f64 + LEVEL_SHRINKAGE);
                own.iter()
                    .zip(pooled.iter())
                    .map(|(o, p)| (weight * o.ln() + (1.0 - weight) * p.ln()).exp())
                    .collect()
            };
            self.alpha[level] = updated;
        }
    }

    /// Collapsed joint log-likelihood `log p(w, z | alpha, beta)`.
    fn log_likelihood(&self) -> f64 {
        let vocabulary_len = self.input.vocabulary_len as f64;
        let beta_sum = vocabulary_len * self.beta;
        let ln_gamma_beta = ln_gamma(self.beta);

        let mut total = 0.0;
        for topic in 0..self.topic_count {
            total += ln_gamma(beta_sum) - ln_gamma(self.topic_counts[topic] as f64 + beta_sum);
            for count in self.topic_term_counts[topic].iter().filter(|c| **c > 0) {
                total += ln_gamma(*count as f64 + self.beta) - ln_gamma_beta;
            }
        }

        for (document, tokens) in self.input.tokens.iter().enumerate() {
            let alpha = &self.alpha[self.input.levels[document]];
            let alpha_sum: f64 = alpha.iter().sum();
            total += ln_gamma(alpha_sum) - ln_gamma(tokens.len() as f64 + alpha_sum);
            for (count, a) in self.doc_topic_counts[document].iter().zip(alpha.iter()) {
                if *count > 0 {
                    total += ln_gamma(*count as f64 + a) - ln_gamma(*a);
                }
            }
        }
        total
    }

    fn term_topic(&self) -> Vec<Vec<f64>> {
        let beta_sum = self.input.vocabulary_len as f64 * self.beta;
        self.topic_term_counts
            .iter()
            .zip(self.topic_counts.iter())
            .map(|(counts, total)| {
                let denominator = *total as f64 + beta_sum;
                counts
                    .iter()
                    .map(|c| (*c as f64 + self.beta) / denominator)
                    .collect()
            })
            .collect()
    }

    fn doc_topic(&self) -> Vec<Vec<f64>> {
        self.doc_topic_counts
            .iter()
            .enumerate()
            .map(|(document, counts)| {
                let alpha = &self.alpha[self.input.levels[document]];
                let alpha_sum: f64 = alpha.iter().sum();
                let denominator = self.input.tokens[document].len() as f64 + alpha_sum;
                counts
                    .iter()
                    .zip(alpha.iter())
                    .map(|(c, a)| (*c as f64 + a) / denominator)
                    .collect()
            })
            .collect()
    }
}

/// Runs the sampler with its own generator seeded from `config.seed`, so
/// concurrent runs never share random state.
pub(super) fn sample(
    input: SamplerInput,
    topic_count: usize,
    config: &TopicModelConfig,
) -> SamplerOutput {
    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut state = GibbsState::initialize(input, topic_count, config, &mut rng);
    let mut cumulative = vec![0.0; topic_count];
    let mut trace = vec![];

    for iteration in 1..=config.iterations {
        state.sweep(&mut rng, &mut cumulative);
        if config.optimize_interval > 0
            && iteration > config.burn_in
            && (iteration - config.burn_in) % config.optimize_interval == 0
        {
            state.optimize_alpha();
        }
        if iteration % TRACE_INTERVAL == 0 || iteration == config.iterations {
            let log_likelihood = state.log_likelihood();
            debug!(
                "K={} sweep {}/{}: log-likelihood {:.3}",
                topic_count, iteration, config.iterations, log_likelihood
            );
            trace.push(LogLikelihoodPoint {
                iteration,
                log_likelihood,
            });
        }
    }

    SamplerOutput {
        term_topic: state.term_topic(),
        doc_topic: state.doc_topic(),
        log_likelihood: state.log_likelihood(),
        alpha: state.alpha,
        log_likelihood_trace: trace,
    }
}
