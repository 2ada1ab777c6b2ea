//! Artifacts of a finished run, read back from its checkpoints.

use super::checkpoint::CheckpointStore;
use super::{Stage, TopicSummary};
use crate::dtm::PruneOutput;
use crate::similarity::SimilarityOutput;
use crate::topics::FittedTopicModel;
use anyhow::{bail, Context, Result};
use std::path::Path;

#[derive(Debug, Clone)]
pub struct StoredRun {
    pub pruned: PruneOutput,
    pub model: FittedTopicModel,
    pub summary: TopicSummary,
    pub similarity: SimilarityOutput,
}

impl StoredRun {
    /// Reads the prune, fit, label and cluster checkpoints of `dir`. Fails
    /// unless all four come from the same run and describe the same
    /// documents.
    pub fn read(dir: &Path) -> Result<Self> {
        let missing = |stage: Stage| {
            format!(
                "No usable checkpoint of stage {} in {:?}, run lyrics-topics first",
                stage, dir
            )
        };
        let run = Self {
            pruned: CheckpointStore::read(dir, Stage::Prune)
                .with_context(|| missing(Stage::Prune))?,
            model: CheckpointStore::read(dir, Stage::Fit).with_context(|| missing(Stage::Fit))?,
            summary: CheckpointStore::read(dir, Stage::Label)
                .with_context(|| missing(Stage::Label))?,
            similarity: CheckpointStore::read(dir, Stage::Cluster)
                .with_context(|| missing(Stage::Cluster))?,
        };
        run.check_alignment()
            .with_context(|| format!("Checkpoints in {:?} do not belong together", dir))?;
        Ok(run)
    }

    fn check_alignment(&self) -> Result<()> {
        let documents = self.pruned.matrix.document_ids();
        if self.model.document_ids != documents {
            bail!(
                "The topic model covers {} documents, the pruned matrix {}",
                self.model.document_ids.len(),
                documents.len()
            );
        }
        if self.model.doc_topic.len() != documents.len() {
            bail!(
                "{} document-topic rows for {} documents",
                self.model.doc_topic.len(),
                documents.len()
            );
        }
        if self.summary.labels.len() != self.model.topic_count
            || self.summary.dominant_topics.len() != documents.len()
        {
            bail!(
                "Labels describe {} topics and {} documents, the model {} topics and {} documents",
                self.summary.labels.len(),
                self.summary.dominant_topics.len(),
                self.model.topic_count,
                documents.len()
            );
        }
        let assignments = &self.similarity.selection.clustering.assignments;
        if assignments.len() != documents.len()
            || self.similarity.dissimilarity.size() != documents.len()
        {
            bail!(
                "{} cluster assignments for {} documents",
                assignments.len(),
                documents.len()
            );
        }
        Ok(())
    }

    /// Row of `id` in the model, `None` when the document was not modeled.
    pub fn row_of(&self, id: &str) -> Option<usize> {
        self.model
            .document_ids
            .iter()
            .position(|d| d.as_str() == id)
    }
}
