//! Lyrics topic modeling library
//!
//! Normalizes song lyrics, builds and prunes a document-term matrix, fits a
//! covariate-conditioned topic model, labels its topics and clusters the
//! songs by topic similarity.

pub mod config;
pub mod corpus;
pub mod dtm;
pub mod export;
pub mod pipeline;
pub mod similarity;
pub mod text;
pub mod topics;

// Re-export commonly used types for convenience
pub use corpus::{load_corpus, Corpus, CovariateField, Document, DocumentId, DocumentMeta};
pub use pipeline::{Pipeline, PipelineConfig, PipelineError, PipelineOutput, RunReport, Stage};
