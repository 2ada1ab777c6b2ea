//! Six-stage run over a corpus: normalize, vocabulary, prune, fit, label,
//! cluster. Every stage hands fresh artifacts to the next one and can be
//! checkpointed to disk.

mod checkpoint;
mod runner;
mod stored;
mod validation;

pub use checkpoint::{fingerprint, CheckpointStore, Manifest, MANIFEST_FILE};
pub use runner::{
    Pipeline, PipelineConfig, PipelineOutput, RunReport, TopicSummary, DEFAULT_SEED,
};
pub use stored::StoredRun;

use crate::dtm::DtmError;
use crate::similarity::SimilarityError;
use crate::topics::TopicModelError;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Normalize,
    Vocabulary,
    Prune,
    Fit,
    Label,
    Cluster,
}

impl Stage {
    pub const ALL: [Stage; 6] = [
        Stage::Normalize,
        Stage::Vocabulary,
        Stage::Prune,
        Stage::Fit,
        Stage::Label,
        Stage::Cluster,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Stage::Normalize => "normalize",
            Stage::Vocabulary => "vocabulary",
            Stage::Prune => "prune",
            Stage::Fit => "fit",
            Stage::Label => "label",
            Stage::Cluster => "cluster",
        }
    }

    /// 1-based position in the run.
    pub fn number(&self) -> usize {
        Stage::ALL
            .iter()
            .position(|s| s == self)
            .map(|p| p + 1)
            .unwrap_or(0)
    }

    /// Checkpoint file name, e.g. `03_prune.json`.
    pub fn file_name(&self) -> String {
        format!("{:02}_{}.json", self.number(), self.name())
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Stage {stage} failed: {source}")]
    Dtm {
        stage: Stage,
        #[source]
        source: DtmError,
    },

    #[error("Stage {stage} failed: {source}")]
    TopicModel {
        stage: Stage,
        #[source]
        source: TopicModelError,
    },

    #[error("Stage {stage} failed: {source}")]
    Similarity {
        stage: Stage,
        #[source]
        source: SimilarityError,
    },

    #[error("Alignment check failed after stage {stage}: {detail}")]
    Alignment { stage: Stage, detail: String },

    #[error("Checkpoint of stage {stage} failed: {detail}")]
    Checkpoint { stage: Stage, detail: String },

    #[error("Stage {stage} could not start: {detail}")]
    Setup { stage: Stage, detail: String },
}

impl PipelineError {
    pub fn stage(&self) -> Stage {
        match self {
            PipelineError::Dtm { stage, .. }
            | PipelineError::TopicModel { stage, .. }
            | PipelineError::Similarity { stage, .. }
            | PipelineError::Alignment { stage, .. }
            | PipelineError::Checkpoint { stage, .. }
            | PipelineError::Setup { stage, .. } => *stage,
        }
    }

    pub(crate) fn checkpoint(stage: Stage, error: anyhow::Error) -> Self {
        PipelineError::Checkpoint {
            stage,
            detail: format!("{:#}", error),
        }
    }
}
