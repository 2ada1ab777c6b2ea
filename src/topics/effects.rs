//! Summaries of a fitted model: topic prevalence per covariate level and
//! the documents that best represent each topic.

use super::model::{argmax, FittedTopicModel};
use crate::corpus::DocumentId;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelPrevalence {
    pub level: String,
    pub documents: usize,
    /// Mean document-topic proportion per topic.
    pub mean: Vec<f64>,
    /// Standard error of the mean, 0 for a single document.
    pub standard_error: Vec<f64>,
}

pub fn prevalence_by_level(model: &FittedTopicModel) -> Vec<LevelPrevalence> {
    let topic_count = model.topic_count;
    let mut members: Vec<Vec<usize>> = vec![vec![]; model.covariate.level_count()];
    for (document, level) in model.covariate.assignments.iter().enumerate() {
        members[*level].push(document);
    }

    model
        .covariate
        .levels
        .iter()
        .zip(members.iter())
        .map(|(level, documents)| {
            let n = documents.len() as f64;
            let mut mean = vec![0.0; topic_count];
            let mut standard_error = vec![0.0; topic_count];
            if !documents.is_empty() {
                for topic in 0..topic_count {
                    let values = documents.iter().map(|d| model.doc_topic[*d][topic]);
                    mean[topic] = values.clone().sum::<f64>() / n;
                    if documents.len() > 1 {
                        let variance = values.map(|v| (v - mean[topic]).powi(2)).sum::<f64>()
                            / (n - 1.0);
                        standard_error[topic] = (variance / n).sqrt();
                    }
                }
            }
            LevelPrevalence {
                level: level.clone(),
                documents: documents.len(),
                mean,
                standard_error,
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepresentativeDocument {
    pub id: DocumentId,
    pub weight: f64,
}

/// The `n` documents with the highest weight on each topic, strongest first.
pub fn representative_documents(
    model: &FittedTopicModel,
    n: usize,
) -> Vec<Vec<RepresentativeDocument>> {
    (0..model.topic_count)
        .map(|topic| {
            let mut order: Vec<usize> = (0..model.doc_topic.len()).collect();
            order.sort_by(|a, b| {
                model.doc_topic[*b][topic]
                    .partial_cmp(&model.doc_topic[*a][topic])
                    .unwrap_or(Ordering::Equal)
                    .then(a.cmp(b))
            });
            order
                .into_iter()
                .take(n)
                .map(|d| RepresentativeDocument {
                    id: model.document_ids[d].clone(),
                    weight: model.doc_topic[d][topic],
                })
                .collect()
        })
        .collect()
}

/// Dominant topic of every document, in document order.
pub fn dominant_topics(model: &FittedTopicModel) -> Vec<usize> {
    model.doc_topic.iter().map(|row| argmax(row)).collect()
}
