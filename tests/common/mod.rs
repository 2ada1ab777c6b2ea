//! Common test infrastructure
//!
//! Toy corpora and pipeline configurations shared by the end-to-end tests.
//! Tests should only import from this module, not from internal submodules.

mod fixtures;

// Public API - this is what tests import
#[allow(unused_imports)]
pub use fixtures::{
    make_document, themed_corpus, toy_corpus, toy_pipeline_config, write_corpus_csv,
    TOY_SHARED_IDS, TOY_DISJOINT_IDS,
};
