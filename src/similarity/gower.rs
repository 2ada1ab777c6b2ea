//! Mixed-type feature table and Gower dissimilarity.

use super::SimilarityError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FeatureValues {
    Numeric(Vec<Option<f64>>),
    Categorical(Vec<Option<String>>),
}

impl FeatureValues {
    fn len(&self) -> usize {
        match self {
            FeatureValues::Numeric(values) => values.len(),
            FeatureValues::Categorical(values) => values.len(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureColumn {
    pub name: String,
    pub values: FeatureValues,
}

/// One row per document, one column per feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureTable {
    rows: usize,
    columns: Vec<FeatureColumn>,
}

impl FeatureTable {
    /// Numeric columns `topic_1..topic_K` from a document-topic matrix.
    pub fn from_topic_weights(doc_topic: &[Vec<f64>]) -> Result<Self, SimilarityError> {
        let topic_count = doc_topic.first().map(Vec::len).unwrap_or(0);
        let mut table = Self {
            rows: doc_topic.len(),
            columns: vec![],
        };
        for topic in 0..topic_count {
            let values = doc_topic
                .iter()
                .map(|row| row.get(topic).copied())
                .collect();
            table.push(format!("topic_{}", topic + 1), FeatureValues::Numeric(values))?;
        }
        Ok(table)
    }

    pub fn with_numeric(
        mut self,
        name: &str,
        values: Vec<Option<f64>>,
    ) -> Result<Self, SimilarityError> {
        self.push(name.to_string(), FeatureValues::Numeric(values))?;
        Ok(self)
    }

    pub fn with_categorical(
        mut self,
        name: &str,
        values: Vec<Option<String>>,
    ) -> Result<Self, SimilarityError> {
        self.push(name.to_string(), FeatureValues::Categorical(values))?;
        Ok(self)
    }

    fn push(&mut self, name: String, values: FeatureValues) -> Result<(), SimilarityError> {
        if values.len() != self.rows {
            return Err(SimilarityError::FeatureLengthMismatch {
                column: name,
                expected: self.rows,
                actual: values.len(),
            });
        }
        self.columns.push(FeatureColumn { name, values });
        Ok(())
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn columns(&self) -> &[FeatureColumn] {
        &self.columns
    }
}

/// Symmetric dissimilarity matrix with a zero diagonal, stored as the
/// condensed upper triangle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DissimilarityMatrix {
    size: usize,
    values: Vec<f64>,
}

impl DissimilarityMatrix {
    pub fn from_fn<F: Fn(usize, usize) -> f64>(size: usize, distance: F) -> Self {
        let mut values = Vec::with_capacity(size * size.saturating_sub(1) / 2);
        for i in 0..size {
            for j in (i + 1)..size {
                values.push(distance(i, j));
            }
        }
        Self { size, values }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    fn offset(&self, i: usize, j: usize) -> usize {
        // Rows before i hold (size - 1) + (size - 2) + ... + (size - i) entries.
        i * self.size - i * (i + 1) / 2 + (j - i - 1)
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        match i.cmp(&j) {
            std::cmp::Ordering::Equal => 0.0,
            std::cmp::Ordering::Less => self.values[self.offset(i, j)],
            std::cmp::Ordering::Greater => self.values[self.offset(j, i)],
        }
    }

    pub fn condensed(&self) -> &[f64] {
        &self.values
    }
}

/// Gower dissimilarity. Numeric features contribute `|x - y| / range`
/// (nothing when the range is 0), categorical ones 1 on mismatch. A feature
/// missing in either document is skipped for that pair, and a pair sharing
/// no feature has dissimilarity 0.
pub fn gower(table: &FeatureTable) -> Result<DissimilarityMatrix, SimilarityError> {
    if table.columns.is_empty() {
        return Err(SimilarityError::NoFeatures);
    }
    let ranges: Vec<Option<f64>> = table
        .columns
        .iter()
        .map(|column| match &column.values {
            FeatureValues::Numeric(values) => {
                let present = values.iter().flatten();
                let min = present.clone().copied().fold(f64::INFINITY, f64::min);
                let max = present.copied().fold(f64::NEG_INFINITY, f64::max);
                Some(if max > min { max - min } else { 0.0 })
            }
            FeatureValues::Categorical(_) => None,
        })
        .collect();

    Ok(DissimilarityMatrix::from_fn(table.rows, |i, j| {
        let mut total = 0.0;
        let mut shared = 0usize;
        for (column, range) in table.columns.iter().zip(ranges.iter()) {
            match &column.values {
                FeatureValues::Numeric(values) => {
                    if let (Some(x), Some(y)) = (values[i], values[j]) {
                        shared += 1;
                        if let Some(range) = range.filter(|r| *r > 0.0) {
                            total += (x - y).abs() / range;
                        }
                    }
                }
                FeatureValues::Categorical(values) => {
                    if let (Some(x), Some(y)) = (&values[i], &values[j]) {
                        shared += 1;
                        if x != y {
                            total += 1.0;
                        }
                    }
                }
            }
        }
        if shared == 0 {
            0.0
        } else {
            total / shared as f64
        }
    }))
}
