//! Document-frequency pruning of the vocabulary.

use super::{DocumentTermMatrix, DtmError, TermCounts, Vocabulary};
use crate::corpus::DocumentId;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PruneOutput {
    pub matrix: DocumentTermMatrix,
    pub min_doc_frequency: usize,
    pub removed_terms: usize,
    /// Documents left without any term once rare terms were removed.
    pub dropped: Vec<DocumentId>,
}

/// `ceil(proportion * document_count)`, never below 1.
pub fn min_doc_frequency(proportion: f64, document_count: usize) -> Result<usize, DtmError> {
    if !(proportion > 0.0 && proportion <= 1.0) {
        return Err(DtmError::InvalidProportion(proportion));
    }
    let threshold = (proportion * document_count as f64).ceil() as usize;
    Ok(threshold.max(1))
}

/// Keeps the terms found in at least `min_doc_frequency` documents and
/// re-indexes every row against the reduced vocabulary. The input matrix is
/// left untouched.
pub fn prune(
    matrix: &DocumentTermMatrix,
    min_doc_frequency: usize,
) -> Result<PruneOutput, DtmError> {
    let frequencies = matrix.document_frequencies();

    let mut remap: Vec<Option<usize>> = vec![None; frequencies.len()];
    let mut kept_terms = vec![];
    for (old_index, frequency) in frequencies.iter().enumerate() {
        if *frequency >= min_doc_frequency {
            remap[old_index] = Some(kept_terms.len());
            kept_terms.push(matrix.vocabulary().terms()[old_index].clone());
        }
    }
    if kept_terms.is_empty() {
        return Err(DtmError::EmptyVocabulary { min_doc_frequency });
    }
    let removed_terms = frequencies.len() - kept_terms.len();

    let mut rows = vec![];
    let mut metadata = vec![];
    let mut dropped = vec![];
    for (row, meta) in matrix.rows().iter().zip(matrix.metadata().iter()) {
        let remapped = TermCounts::from_pairs(
            row.iter()
                .filter_map(|(index, count)| remap[index].map(|new_index| (new_index, count))),
        );
        if remapped.is_empty() {
            dropped.push(meta.id.clone());
        } else {
            rows.push(remapped);
            metadata.push(meta.clone());
        }
    }

    if !dropped.is_empty() {
        warn!(
            "Pruning dropped {} of {} documents that had only rare terms",
            dropped.len(),
            matrix.document_count()
        );
        for id in dropped.iter() {
            warn!("- {}", id);
        }
    }
    if rows.is_empty() {
        return Err(DtmError::NoDocuments);
    }

    let pruned = DocumentTermMatrix::from_parts(Vocabulary::new(kept_terms), rows, metadata)?;
    info!(
        "Pruned vocabulary with minimum document frequency {}: {} terms kept, {} removed, {} documents left",
        min_doc_frequency,
        pruned.vocabulary().len(),
        removed_terms,
        pruned.document_count()
    );
    Ok(PruneOutput {
        matrix: pruned,
        min_doc_frequency,
        removed_terms,
        dropped,
    })
}

/// Derives the threshold from a proportion of the current document count.
pub fn prune_by_proportion(
    matrix: &DocumentTermMatrix,
    proportion: f64,
) -> Result<PruneOutput, DtmError> {
    let threshold = min_doc_frequency(proportion, matrix.document_count())?;
    prune(matrix, threshold)
}
