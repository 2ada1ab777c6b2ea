mod document;
mod load;

pub use document::{CovariateField, Document, DocumentId, DocumentMeta};
pub use load::{load_corpus, read_rows, Corpus, CorpusBuildResult, Problem as CorpusProblem, SongRow};
