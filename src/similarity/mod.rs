//! Document dissimilarity over topic weights and medoid clustering.

mod gower;
mod pam;
mod silhouette;
mod sweep;

pub use gower::{gower, DissimilarityMatrix, FeatureColumn, FeatureTable, FeatureValues};
pub use pam::{pam, Clustering};
pub use silhouette::{silhouette, Silhouette};
pub use sweep::{select_clusters, ClusterCandidate, ClusterCount, ClusterSelection, ClusteringConfig};

use crate::corpus::DocumentMeta;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Clone, PartialEq)]
pub enum Degeneracy {
    NoViableCandidate {
        min: usize,
        max: usize,
        documents: usize,
    },
    SingleViableCandidate {
        clusters: usize,
    },
    AllScoresEqual {
        score: f64,
    },
}

impl std::fmt::Display for Degeneracy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Degeneracy::NoViableCandidate {
                min,
                max,
                documents,
            } => write!(
                f,
                "no cluster count in [{}, {}] is within [2, {}] for {} documents",
                min,
                max,
                documents.saturating_sub(1),
                documents
            ),
            Degeneracy::SingleViableCandidate { clusters } => write!(
                f,
                "only {} clusters is viable, there is nothing to select",
                clusters
            ),
            Degeneracy::AllScoresEqual { score } => {
                write!(f, "every candidate has silhouette {:.6}", score)
            }
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum SimilarityError {
    #[error("Feature {column} has {actual} values for {expected} documents")]
    FeatureLengthMismatch {
        column: String,
        expected: usize,
        actual: usize,
    },

    #[error("No feature to compare documents on")]
    NoFeatures,

    #[error("Cannot partition {documents} documents into {clusters} clusters, the count must be between 2 and the document count minus one")]
    InvalidClusterCount { clusters: usize, documents: usize },

    #[error("Cluster count selection is degenerate: {0}")]
    Degenerate(Degeneracy),
}

/// Which metadata joins the topic weights as similarity features.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtraFeatures {
    pub band: bool,
    pub writer: bool,
    pub year: bool,
}

/// Feature table of the topic weights plus the requested metadata columns.
pub fn build_features(
    doc_topic: &[Vec<f64>],
    metadata: &[DocumentMeta],
    extra: ExtraFeatures,
) -> Result<FeatureTable, SimilarityError> {
    let mut table = FeatureTable::from_topic_weights(doc_topic)?;
    if extra.band {
        table = table.with_categorical(
            "band",
            metadata.iter().map(|m| Some(m.band.clone())).collect(),
        )?;
    }
    if extra.writer {
        table = table.with_categorical(
            "writer",
            metadata.iter().map(|m| Some(m.writer.clone())).collect(),
        )?;
    }
    if extra.year {
        table = table.with_numeric(
            "year",
            metadata.iter().map(|m| m.year.map(f64::from)).collect(),
        )?;
    }
    Ok(table)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityOutput {
    pub dissimilarity: DissimilarityMatrix,
    pub selection: ClusterSelection,
}

/// Gower dissimilarity over the features, then PAM with the configured or
/// selected cluster count.
pub fn cluster_documents(
    features: &FeatureTable,
    config: &ClusteringConfig,
) -> Result<SimilarityOutput, SimilarityError> {
    info!(
        "Computing dissimilarities of {} documents over {} features",
        features.rows(),
        features.columns().len()
    );
    let dissimilarity = gower(features)?;
    let selection = select_clusters(&dissimilarity, config)?;
    Ok(SimilarityOutput {
        dissimilarity,
        selection,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::DocumentId;

    fn make_meta(id: &str, band: &str, year: Option<i32>) -> DocumentMeta {
        DocumentMeta {
            id: DocumentId::from(id),
            band: band.to_string(),
            writer: "w".to_string(),
            album: "a".to_string(),
            year,
        }
    }

    #[test]
    fn test_build_features() {
        let doc_topic = vec![vec![0.9, 0.1], vec![0.2, 0.8]];
        let metadata = vec![make_meta("a", "x", Some(1990)), make_meta("b", "y", None)];
        let table = build_features(
            &doc_topic,
            &metadata,
            ExtraFeatures {
                band: true,
                writer: false,
                year: true,
            },
        )
        .unwrap();
        let names: Vec<&str> = table.columns().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["topic_1", "topic_2", "band", "year"]);
    }

    #[test]
    fn test_cluster_documents_fixed() {
        let doc_topic = vec![
            vec![0.95, 0.05],
            vec![0.9, 0.1],
            vec![0.1, 0.9],
            vec![0.05, 0.95],
            vec![0.08, 0.92],
        ];
        let table = FeatureTable::from_topic_weights(&doc_topic).unwrap();
        let output = cluster_documents(
            &table,
            &ClusteringConfig {
                count: ClusterCount::Fixed(2),
                restarts: 2,
                seed: 7,
            },
        )
        .unwrap();
        let assignments = &output.selection.clustering.assignments;
        assert_eq!(assignments[0], assignments[1]);
        assert_eq!(assignments[2], assignments[3]);
        assert_eq!(assignments[3], assignments[4]);
        assert_ne!(assignments[0], assignments[2]);
        assert_eq!(output.dissimilarity.size(), 5);
    }

    #[test]
    fn test_degenerate_message_names_condition() {
        let error = SimilarityError::Degenerate(Degeneracy::SingleViableCandidate { clusters: 2 });
        assert!(error.to_string().contains("only 2 clusters"));
    }
}
