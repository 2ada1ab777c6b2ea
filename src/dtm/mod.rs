//! Vocabulary construction and document-term encoding.

mod builder;
mod matrix;
mod prune;

pub use builder::{build_vocabulary, VocabularyBuild};
pub use matrix::{DocumentTermMatrix, TermCounts, Vocabulary};
pub use prune::{min_doc_frequency, prune, prune_by_proportion, PruneOutput};

use crate::corpus::DocumentId;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum DtmError {
    #[error("No document has any term left")]
    NoDocuments,

    #[error("Vocabulary is empty with minimum document frequency {min_doc_frequency}")]
    EmptyVocabulary { min_doc_frequency: usize },

    #[error("Minimum document proportion must be in (0, 1], got {0}")]
    InvalidProportion(f64),

    #[error("{rows} term vectors but {metadata} metadata rows")]
    RowCountMismatch { rows: usize, metadata: usize },

    #[error("Document {document} references term {index} but the vocabulary has {vocabulary_len} terms")]
    IndexOutOfRange {
        document: DocumentId,
        index: usize,
        vocabulary_len: usize,
    },

    #[error("Document {0} has an empty term vector")]
    EmptyRow(DocumentId),
}
