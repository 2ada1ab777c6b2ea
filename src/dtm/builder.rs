//! Builds the global vocabulary and the sparse term counts from cleaned text.

use super::{DocumentTermMatrix, DtmError, TermCounts, Vocabulary};
use crate::corpus::{Document, DocumentId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use tracing::{info, warn};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VocabularyBuild {
    pub matrix: DocumentTermMatrix,
    /// Documents whose cleaned text had no token.
    pub dropped: Vec<DocumentId>,
}

/// Tokenizes the cleaned texts, builds a lexicographically ordered
/// vocabulary and encodes every non-empty document against it.
pub fn build_vocabulary(documents: &[Document]) -> Result<VocabularyBuild, DtmError> {
    let mut dropped = vec![];
    let mut surviving = vec![];
    for doc in documents {
        let tokens: Vec<&str> = doc.cleaned_text.split_whitespace().collect();
        if tokens.is_empty() {
            dropped.push(doc.id().clone());
        } else {
            surviving.push((doc, tokens));
        }
    }

    if !dropped.is_empty() {
        warn!(
            "Dropping {} of {} documents with no tokens left after normalization",
            dropped.len(),
            documents.len()
        );
        for id in dropped.iter() {
            warn!("- {}", id);
        }
    }
    if surviving.is_empty() {
        return Err(DtmError::NoDocuments);
    }

    let terms: BTreeSet<&str> = surviving
        .iter()
        .flat_map(|(_, tokens)| tokens.iter().copied())
        .collect();
    let vocabulary = Vocabulary::new(terms.into_iter().map(str::to_string).collect());
    let index = vocabulary.index_map();

    let mut rows = Vec::with_capacity(surviving.len());
    let mut metadata = Vec::with_capacity(surviving.len());
    for (doc, tokens) in surviving.iter() {
        let mut counts: HashMap<usize, u32> = HashMap::new();
        for token in tokens {
            // Every token is in the vocabulary, it was built from these tokens.
            if let Some(&term_index) = index.get(token) {
                *counts.entry(term_index).or_insert(0) += 1;
            }
        }
        rows.push(TermCounts::from_pairs(counts));
        metadata.push(doc.meta.clone());
    }

    let matrix = DocumentTermMatrix::from_parts(vocabulary, rows, metadata)?;
    info!(
        "Built vocabulary of {} terms over {} documents ({} tokens)",
        matrix.vocabulary().len(),
        matrix.document_count(),
        matrix.token_count()
    );
    Ok(VocabularyBuild { matrix, dropped })
}
