//! Covariate-conditioned topic model, its labels and summaries.

mod effects;
mod gibbs;
mod labels;
mod model;
mod selection;
pub mod special;

pub use effects::{
    dominant_topics, prevalence_by_level, representative_documents, LevelPrevalence,
    RepresentativeDocument,
};
pub use labels::{label_topics, TopicLabel, FREX_WEIGHT};
pub use model::{
    fit_topic_model, CovariateLevels, FittedTopicModel, LogLikelihoodPoint, TopicCount,
    TopicModelConfig, SIMPLEX_TOLERANCE,
};
pub use selection::{CandidateScore, TopicCountSelection};

use crate::corpus::DocumentId;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum TopicModelError {
    #[error("Topic count must be at least 2, got {0}")]
    TooFewTopics(usize),

    #[error("Topic count {topics} must be smaller than the document count {documents}")]
    TooManyTopics { topics: usize, documents: usize },

    #[error("Document {0} has no terms, it must be removed before fitting")]
    EmptyDocument(DocumentId),

    #[error("Cannot fit a topic model over an empty vocabulary")]
    EmptyVocabulary,

    #[error("No candidate topic count in [{min}, {max}] is below the document count {documents}")]
    NoCandidates {
        min: usize,
        max: usize,
        documents: usize,
    },

    #[error("Held-out fraction must be in (0, 1), got {0}")]
    InvalidHoldout(f64),

    #[error("No token could be held out to select the topic count")]
    EmptyHoldout,

    #[error("Invalid {name}: {value}")]
    InvalidParameter { name: &'static str, value: f64 },

    #[error("Expected {expected} document-topic rows, got {actual}")]
    DocumentCountMismatch { expected: usize, actual: usize },

    #[error("Row {row} of the {matrix} matrix is not a probability distribution (sum {sum})")]
    NotASimplex {
        matrix: &'static str,
        row: usize,
        sum: f64,
    },
}
