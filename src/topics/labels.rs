//! Topic labels built from the term-topic matrix.

use crate::dtm::Vocabulary;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Weight of exclusivity against frequency in FREX.
pub const FREX_WEIGHT: f64 = 0.5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicLabel {
    pub topic: usize,
    /// Highest-probability terms.
    pub prob: Vec<String>,
    /// Terms both frequent in and exclusive to the topic.
    pub frex: Vec<String>,
    /// Terms most over-represented against their corpus frequency.
    pub lift: Vec<String>,
    pub score: Vec<String>,
}

impl TopicLabel {
    pub fn display(&self) -> String {
        self.prob.join(", ")
    }
}

/// Indices of the `n` largest values, ties broken by the lower index.
fn top_indices(values: &[f64], n: usize) -> Vec<usize> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|a, b| {
        values[*b]
            .partial_cmp(&values[*a])
            .unwrap_or(Ordering::Equal)
            .then(a.cmp(b))
    });
    order.truncate(n);
    order
}

/// Empirical CDF of every value within `values`: the share of values less
/// than or equal to it.
fn ecdf(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    let len = values.len() as f64;
    values
        .iter()
        .map(|v| sorted.partition_point(|s| s <= v) as f64 / len)
        .collect()
}

fn terms_at(vocabulary: &Vocabulary, indices: Vec<usize>) -> Vec<String> {
    indices
        .into_iter()
        .filter_map(|i| vocabulary.term(i).map(str::to_string))
        .collect()
}

/// Labels every topic with its `n` top terms under four rankings.
/// `term_totals` are the corpus counts of each term, used by lift.
pub fn label_topics(
    term_topic: &[Vec<f64>],
    vocabulary: &Vocabulary,
    term_totals: &[u64],
    n: usize,
) -> Vec<TopicLabel> {
    let topic_count = term_topic.len();
    let vocabulary_len = vocabulary.len();
    if topic_count == 0 {
        return vec![];
    }

    let column_sums: Vec<f64> = (0..vocabulary_len)
        .map(|term| term_topic.iter().map(|row| row[term]).sum())
        .collect();
    let mean_log: Vec<f64> = (0..vocabulary_len)
        .map(|term| {
            term_topic.iter().map(|row| row[term].ln()).sum::<f64>() / topic_count as f64
        })
        .collect();
    let corpus_total: u64 = term_totals.iter().sum();
    let corpus_frequency: Vec<f64> = term_totals
        .iter()
        .map(|count| *count as f64 / corpus_total.max(1) as f64)
        .collect();

    term_topic
        .iter()
        .enumerate()
        .map(|(topic, row)| {
            let exclusivity: Vec<f64> = row
                .iter()
                .zip(column_sums.iter())
                .map(|(phi, sum)| if *sum > 0.0 { phi / sum } else { 0.0 })
                .collect();
            let exclusivity_rank = ecdf(&exclusivity);
            let frequency_rank = ecdf(row);
            let frex: Vec<f64> = exclusivity_rank
                .iter()
                .zip(frequency_rank.iter())
                .map(|(e, f)| 1.0 / (FREX_WEIGHT / e + (1.0 - FREX_WEIGHT) / f))
                .collect();
            let lift: Vec<f64> = row
                .iter()
                .zip(corpus_frequency.iter())
                .map(|(phi, freq)| if *freq > 0.0 { phi / freq } else { 0.0 })
                .collect();
            let score: Vec<f64> = row
                .iter()
                .zip(mean_log.iter())
                .map(|(phi, mean)| phi * (phi.ln() - mean))
                .collect();

            TopicLabel {
                topic,
                prob: terms_at(vocabulary, top_indices(row, n)),
                frex: terms_at(vocabulary, top_indices(&frex, n)),
                lift: terms_at(vocabulary, top_indices(&lift, n)),
                score: terms_at(vocabulary, top_indices(&score, n)),
            }
        })
        .collect()
}
