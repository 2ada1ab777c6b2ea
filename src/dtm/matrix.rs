use super::DtmError;
use crate::corpus::{DocumentId, DocumentMeta};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Ordered, deduplicated list of terms. A term's index is its position.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Vocabulary {
    terms: Vec<String>,
}

impl Vocabulary {
    pub(super) fn new(terms: Vec<String>) -> Self {
        Self { terms }
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn term(&self, index: usize) -> Option<&str> {
        self.terms.get(index).map(String::as_str)
    }

    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    pub fn index_map(&self) -> HashMap<&str, usize> {
        self.terms
            .iter()
            .enumerate()
            .map(|(i, t)| (t.as_str(), i))
            .collect()
    }
}

/// Sparse term counts of one document: (vocabulary index, count) pairs
/// sorted by index, without zero counts.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TermCounts {
    entries: Vec<(usize, u32)>,
}

impl TermCounts {
    /// Builds from unsorted, possibly repeated (index, count) pairs.
    pub fn from_pairs<I: IntoIterator<Item = (usize, u32)>>(pairs: I) -> Self {
        let mut entries: Vec<(usize, u32)> = pairs.into_iter().filter(|(_, c)| *c > 0).collect();
        entries.sort_unstable_by_key(|(index, _)| *index);
        let mut merged: Vec<(usize, u32)> = Vec::with_capacity(entries.len());
        for (index, count) in entries {
            match merged.last_mut() {
                Some((last_index, last_count)) if *last_index == index => *last_count += count,
                _ => merged.push((index, count)),
            }
        }
        Self { entries: merged }
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, u32)> + '_ {
        self.entries.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total number of tokens in the document.
    pub fn total(&self) -> u64 {
        self.entries.iter().map(|(_, c)| *c as u64).sum()
    }

    pub fn count(&self, index: usize) -> u32 {
        self.entries
            .binary_search_by_key(&index, |(i, _)| *i)
            .map(|pos| self.entries[pos].1)
            .unwrap_or(0)
    }
}

/// Vocabulary, per-document term counts and metadata, always kept together
/// so that row i of the counts belongs to metadata row i and every index is
/// valid for this vocabulary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentTermMatrix {
    vocabulary: Vocabulary,
    rows: Vec<TermCounts>,
    metadata: Vec<DocumentMeta>,
}

impl DocumentTermMatrix {
    /// Assembles a matrix, checking that the parts are aligned.
    pub fn from_parts(
        vocabulary: Vocabulary,
        rows: Vec<TermCounts>,
        metadata: Vec<DocumentMeta>,
    ) -> Result<Self, DtmError> {
        let matrix = Self {
            vocabulary,
            rows,
            metadata,
        };
        matrix.validate()?;
        Ok(matrix)
    }

    pub fn validate(&self) -> Result<(), DtmError> {
        if self.rows.len() != self.metadata.len() {
            return Err(DtmError::RowCountMismatch {
                rows: self.rows.len(),
                metadata: self.metadata.len(),
            });
        }
        for (row, meta) in self.rows.iter().zip(self.metadata.iter()) {
            if row.is_empty() {
                return Err(DtmError::EmptyRow(meta.id.clone()));
            }
            if let Some((index, _)) = row.iter().find(|(i, _)| *i >= self.vocabulary.len()) {
                return Err(DtmError::IndexOutOfRange {
                    document: meta.id.clone(),
                    index,
                    vocabulary_len: self.vocabulary.len(),
                });
            }
        }
        Ok(())
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    pub fn rows(&self) -> &[TermCounts] {
        &self.rows
    }

    pub fn metadata(&self) -> &[DocumentMeta] {
        &self.metadata
    }

    pub fn document_count(&self) -> usize {
        self.rows.len()
    }

    pub fn document_ids(&self) -> Vec<DocumentId> {
        self.metadata.iter().map(|m| m.id.clone()).collect()
    }

    /// Number of documents containing each term.
    pub fn document_frequencies(&self) -> Vec<usize> {
        let mut frequencies = vec![0usize; self.vocabulary.len()];
        for row in self.rows.iter() {
            for (index, _) in row.iter() {
                frequencies[index] += 1;
            }
        }
        frequencies
    }

    /// Total count of each term over the corpus.
    pub fn term_totals(&self) -> Vec<u64> {
        let mut totals = vec![0u64; self.vocabulary.len()];
        for row in self.rows.iter() {
            for (index, count) in row.iter() {
                totals[index] += count as u64;
            }
        }
        totals
    }

    pub fn token_count(&self) -> u64 {
        self.rows.iter().map(TermCounts::total).sum()
    }
}
