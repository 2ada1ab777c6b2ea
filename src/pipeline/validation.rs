//! Alignment checks run at every stage boundary.

use super::{PipelineError, Stage};
use crate::corpus::{Document, DocumentId};
use crate::dtm::DocumentTermMatrix;
use crate::similarity::SimilarityOutput;
use crate::topics::{FittedTopicModel, TopicLabel};

fn misaligned(stage: Stage, detail: String) -> PipelineError {
    PipelineError::Alignment { stage, detail }
}

/// Normalization keeps every document, in order.
pub(super) fn check_normalized(input: &[Document], output: &[Document]) -> Result<(), PipelineError> {
    if input.len() != output.len() {
        return Err(misaligned(
            Stage::Normalize,
            format!("{} documents in, {} out", input.len(), output.len()),
        ));
    }
    if let Some((before, after)) = input
        .iter()
        .zip(output.iter())
        .find(|(before, after)| before.meta != after.meta)
    {
        return Err(misaligned(
            Stage::Normalize,
            format!("document {} became {}", before.id(), after.id()),
        ));
    }
    Ok(())
}

/// The matrix is internally consistent, and its documents plus the dropped
/// ones are exactly the previous stage's documents, in order.
pub(super) fn check_matrix(
    stage: Stage,
    matrix: &DocumentTermMatrix,
    previous: &[DocumentId],
    dropped: &[DocumentId],
) -> Result<(), PipelineError> {
    matrix
        .validate()
        .map_err(|err| misaligned(stage, err.to_string()))?;
    if matrix.document_count() + dropped.len() != previous.len() {
        return Err(misaligned(
            stage,
            format!(
                "{} documents kept and {} dropped out of {}",
                matrix.document_count(),
                dropped.len(),
                previous.len()
            ),
        ));
    }
    let kept: Vec<&DocumentId> = previous.iter().filter(|id| !dropped.contains(*id)).collect();
    let ids = matrix.document_ids();
    if kept.len() != ids.len() || kept.iter().zip(ids.iter()).any(|(a, b)| *a != b) {
        return Err(misaligned(
            stage,
            "surviving documents are not in their original order".to_string(),
        ));
    }
    Ok(())
}

pub(super) fn check_model(
    model: &FittedTopicModel,
    matrix: &DocumentTermMatrix,
) -> Result<(), PipelineError> {
    if model.document_ids != matrix.document_ids() {
        return Err(misaligned(
            Stage::Fit,
            format!(
                "{} document-topic rows for {} documents",
                model.document_ids.len(),
                matrix.document_count()
            ),
        ));
    }
    model
        .validate(matrix.vocabulary().len())
        .map_err(|err| misaligned(Stage::Fit, err.to_string()))
}

pub(super) fn check_labels(labels: &[TopicLabel], topic_count: usize) -> Result<(), PipelineError> {
    if labels.len() != topic_count {
        return Err(misaligned(
            Stage::Label,
            format!("{} labels for {} topics", labels.len(), topic_count),
        ));
    }
    Ok(())
}

/// Every document is in exactly one non-empty cluster in `[0, K')`.
pub(super) fn check_clusters(
    output: &SimilarityOutput,
    document_count: usize,
) -> Result<(), PipelineError> {
    let clustering = &output.selection.clustering;
    if clustering.assignments.len() != document_count
        || output.dissimilarity.size() != document_count
    {
        return Err(misaligned(
            Stage::Cluster,
            format!(
                "{} assignments for {} documents",
                clustering.assignments.len(),
                document_count
            ),
        ));
    }
    let cluster_count = clustering.cluster_count();
    if clustering.assignments.iter().any(|c| *c >= cluster_count) {
        return Err(misaligned(
            Stage::Cluster,
            format!("cluster index outside [0, {})", cluster_count),
        ));
    }
    if clustering.cluster_sizes().iter().any(|size| *size == 0) {
        return Err(misaligned(Stage::Cluster, "empty cluster".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::DocumentMeta;
    use crate::dtm::build_vocabulary;

    fn make_doc(id: &str, text: &str) -> Document {
        Document {
            meta: DocumentMeta {
                id: DocumentId::from(id),
                band: "b".to_string(),
                writer: "w".to_string(),
                album: "a".to_string(),
                year: None,
            },
            raw_text: text.to_string(),
            cleaned_text: text.to_string(),
        }
    }

    #[test]
    fn test_check_normalized_detects_reorder() {
        let input = vec![make_doc("1", "x"), make_doc("2", "y")];
        let output = vec![make_doc("2", "y"), make_doc("1", "x")];
        assert!(check_normalized(&input, &input).is_ok());
        assert!(matches!(
            check_normalized(&input, &output),
            Err(PipelineError::Alignment {
                stage: Stage::Normalize,
                ..
            })
        ));
    }

    #[test]
    fn test_check_matrix_accounts_for_dropped() {
        let docs = vec![make_doc("1", "x"), make_doc("2", ""), make_doc("3", "y")];
        let build = build_vocabulary(&docs).unwrap();
        let previous: Vec<DocumentId> = docs.iter().map(|d| d.id().clone()).collect();
        assert!(check_matrix(Stage::Vocabulary, &build.matrix, &previous, &build.dropped).is_ok());
        assert!(check_matrix(Stage::Vocabulary, &build.matrix, &previous, &[]).is_err());
    }

    #[test]
    fn test_check_labels() {
        assert!(check_labels(&[], 0).is_ok());
        assert!(check_labels(&[], 2).is_err());
    }
}
