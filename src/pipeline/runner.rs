use super::checkpoint::{fingerprint, CheckpointStore};
use super::validation::{check_clusters, check_labels, check_matrix, check_model, check_normalized};
use super::{PipelineError, Stage};
use crate::corpus::{Corpus, CovariateField, DocumentId, DocumentMeta};
use crate::dtm::{build_vocabulary, prune_by_proportion, PruneOutput, VocabularyBuild};
use crate::similarity::{
    build_features, cluster_documents, ClusterCandidate, ClusterCount, ClusteringConfig,
    ExtraFeatures, SimilarityOutput,
};
use crate::text::{NormalizedCorpus, NormalizerConfig, TextNormalizer};
use crate::topics::{
    dominant_topics, fit_topic_model, label_topics, prevalence_by_level,
    representative_documents, CandidateScore, FittedTopicModel, LevelPrevalence,
    RepresentativeDocument, TopicCount, TopicLabel, TopicModelConfig,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

pub const DEFAULT_SEED: u64 = 1234;

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub normalizer: NormalizerConfig,
    pub min_doc_proportion: f64,
    pub covariate: CovariateField,
    pub topic_count: TopicCount,
    pub topic_model: TopicModelConfig,
    /// Terms per topic label.
    pub label_terms: usize,
    /// Documents listed per topic in the summary.
    pub representative_documents: usize,
    pub extra_features: ExtraFeatures,
    pub clustering: ClusteringConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            normalizer: NormalizerConfig::default(),
            min_doc_proportion: 0.01,
            covariate: CovariateField::Writer,
            topic_count: TopicCount::Fixed(10),
            topic_model: TopicModelConfig::default(),
            label_terms: 5,
            representative_documents: 3,
            extra_features: ExtraFeatures::default(),
            clustering: ClusteringConfig {
                count: ClusterCount::Sweep { min: 2, max: 10 },
                restarts: 5,
                seed: DEFAULT_SEED,
            },
        }
    }
}

impl PipelineConfig {
    /// Uses `seed` for both the topic sampler and the medoid search.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.topic_model.seed = seed;
        self.clustering.seed = seed;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicSummary {
    pub labels: Vec<TopicLabel>,
    pub prevalence: Vec<LevelPrevalence>,
    /// Per topic, the documents weighting it most.
    pub representative: Vec<Vec<RepresentativeDocument>>,
    /// Per document, in model row order.
    pub dominant_topics: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub input_documents: usize,
    pub empty_after_normalization: usize,
    pub dropped_at_vocabulary: Vec<DocumentId>,
    pub vocabulary_size: usize,
    pub min_doc_frequency: usize,
    pub removed_terms: usize,
    pub dropped_at_prune: Vec<DocumentId>,
    pub pruned_vocabulary_size: usize,
    pub documents_modeled: usize,
    pub topic_count: usize,
    pub topic_count_candidates: Vec<CandidateScore>,
    pub log_likelihood: f64,
    pub per_token_log_likelihood: f64,
    pub cluster_count: usize,
    pub average_silhouette: f64,
    pub cluster_candidates: Vec<ClusterCandidate>,
    pub reused_stages: Vec<Stage>,
}

#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub normalized: NormalizedCorpus,
    pub vocabulary: VocabularyBuild,
    pub pruned: PruneOutput,
    pub model: FittedTopicModel,
    pub summary: TopicSummary,
    pub similarity: SimilarityOutput,
    pub report: RunReport,
}

impl PipelineOutput {
    /// Metadata of the modeled documents, aligned with the model rows.
    pub fn metadata(&self) -> &[DocumentMeta] {
        self.pruned.matrix.metadata()
    }

    pub fn cluster_assignments(&self) -> &[usize] {
        &self.similarity.selection.clustering.assignments
    }
}

#[derive(Serialize)]
struct NormalizeInputs<'a> {
    documents: Vec<(&'a DocumentMeta, &'a str)>,
    stop_words: Vec<&'a str>,
    lemmas: Vec<(&'a str, &'a str)>,
    builtin_lemmas: bool,
    stemming: bool,
    strip_annotations: bool,
}

/// Runs stages with optional checkpointing. Once a stage is recomputed,
/// every later stage is recomputed too.
struct StageExecutor {
    store: Option<CheckpointStore>,
    reuse: bool,
    previous: String,
    reused: Vec<Stage>,
}

impl StageExecutor {
    fn execute<T, I, F>(&mut self, stage: Stage, inputs: &I, compute: F) -> Result<T, PipelineError>
    where
        T: Serialize + DeserializeOwned,
        I: Serialize,
        F: FnOnce() -> Result<T, PipelineError>,
    {
        let stage_fingerprint = fingerprint(&self.previous, stage, inputs)
            .map_err(|err| PipelineError::checkpoint(stage, err))?;
        let parent = std::mem::replace(&mut self.previous, stage_fingerprint.clone());

        if self.reuse {
            if let Some(store) = self.store.as_ref() {
                let stored = store
                    .load(stage, &stage_fingerprint)
                    .map_err(|err| PipelineError::checkpoint(stage, err))?;
                if let Some(artifact) = stored {
                    info!("Stage {}: reusing checkpoint", stage);
                    self.reused.push(stage);
                    return Ok(artifact);
                }
            }
            self.reuse = false;
        }

        info!("Stage {}: running", stage);
        let artifact = compute()?;
        if let Some(store) = self.store.as_mut() {
            store
                .save(stage, &parent, &stage_fingerprint, &artifact)
                .map_err(|err| PipelineError::checkpoint(stage, err))?;
        }
        Ok(artifact)
    }
}

pub struct Pipeline {
    config: PipelineConfig,
    output_dir: Option<PathBuf>,
    reuse_checkpoints: bool,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            output_dir: None,
            reuse_checkpoints: false,
        }
    }

    /// Writes stage checkpoints to `dir`, loading matching ones when
    /// `reuse` is set.
    pub fn with_checkpoints(mut self, dir: &Path, reuse: bool) -> Self {
        self.output_dir = Some(dir.to_path_buf());
        self.reuse_checkpoints = reuse;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn run(&self, corpus: &Corpus) -> Result<PipelineOutput, PipelineError> {
        let config = &self.config;
        let store = match self.output_dir.as_ref() {
            Some(dir) => Some(
                CheckpointStore::open(dir)
                    .map_err(|err| PipelineError::checkpoint(Stage::Normalize, err))?,
            ),
            None => None,
        };
        let mut executor = StageExecutor {
            store,
            reuse: self.reuse_checkpoints,
            previous: String::new(),
            reused: vec![],
        };
        info!("Running pipeline over {} documents", corpus.len());

        // 1. normalize
        let normalize_inputs = NormalizeInputs {
            documents: corpus
                .documents()
                .iter()
                .map(|doc| (&doc.meta, doc.raw_text.as_str()))
                .collect(),
            stop_words: config.normalizer.stop_words.sorted_words(),
            lemmas: config.normalizer.lemmas.sorted_pairs(),
            builtin_lemmas: config.normalizer.builtin_lemmas,
            stemming: config.normalizer.stemming,
            strip_annotations: config.normalizer.strip_annotations,
        };
        let normalized: NormalizedCorpus =
            executor.execute(Stage::Normalize, &normalize_inputs, || {
                let normalizer = TextNormalizer::new(config.normalizer.clone()).map_err(|err| {
                    PipelineError::Setup {
                        stage: Stage::Normalize,
                        detail: format!("{:#}", err),
                    }
                })?;
                Ok(normalizer.normalize_corpus(corpus.documents()))
            })?;
        check_normalized(corpus.documents(), &normalized.documents)?;
        info!(
            "Normalized {} documents, {} empty",
            normalized.documents.len(),
            normalized.empty_count
        );

        // 2. vocabulary
        let vocabulary: VocabularyBuild = executor.execute(Stage::Vocabulary, &(), || {
            build_vocabulary(&normalized.documents).map_err(|source| PipelineError::Dtm {
                stage: Stage::Vocabulary,
                source,
            })
        })?;
        let normalized_ids: Vec<DocumentId> = normalized
            .documents
            .iter()
            .map(|doc| doc.id().clone())
            .collect();
        check_matrix(
            Stage::Vocabulary,
            &vocabulary.matrix,
            &normalized_ids,
            &vocabulary.dropped,
        )?;

        // 3. prune
        let pruned: PruneOutput =
            executor.execute(Stage::Prune, &config.min_doc_proportion, || {
                prune_by_proportion(&vocabulary.matrix, config.min_doc_proportion).map_err(
                    |source| PipelineError::Dtm {
                        stage: Stage::Prune,
                        source,
                    },
                )
            })?;
        check_matrix(
            Stage::Prune,
            &pruned.matrix,
            &vocabulary.matrix.document_ids(),
            &pruned.dropped,
        )?;

        // 4. fit
        let fit_inputs = (&config.covariate, &config.topic_count, &config.topic_model);
        let model: FittedTopicModel = executor.execute(Stage::Fit, &fit_inputs, || {
            fit_topic_model(
                &pruned.matrix,
                config.covariate,
                config.topic_count,
                &config.topic_model,
            )
            .map_err(|source| PipelineError::TopicModel {
                stage: Stage::Fit,
                source,
            })
        })?;
        check_model(&model, &pruned.matrix)?;

        // 5. label
        let label_inputs = (config.label_terms, config.representative_documents);
        let summary: TopicSummary = executor.execute(Stage::Label, &label_inputs, || {
            Ok(TopicSummary {
                labels: label_topics(
                    &model.term_topic,
                    pruned.matrix.vocabulary(),
                    &pruned.matrix.term_totals(),
                    config.label_terms,
                ),
                prevalence: prevalence_by_level(&model),
                representative: representative_documents(&model, config.representative_documents),
                dominant_topics: dominant_topics(&model),
            })
        })?;
        check_labels(&summary.labels, model.topic_count)?;
        for label in summary.labels.iter() {
            info!("Topic {}: {}", label.topic + 1, label.display());
        }

        // 6. cluster
        let cluster_inputs = (&config.extra_features, &config.clustering);
        let similarity: SimilarityOutput =
            executor.execute(Stage::Cluster, &cluster_inputs, || {
                build_features(
                    &model.doc_topic,
                    pruned.matrix.metadata(),
                    config.extra_features,
                )
                .and_then(|features| cluster_documents(&features, &config.clustering))
                .map_err(|source| PipelineError::Similarity {
                    stage: Stage::Cluster,
                    source,
                })
            })?;
        check_clusters(&similarity, pruned.matrix.document_count())?;

        let report = RunReport {
            input_documents: corpus.len(),
            empty_after_normalization: normalized.empty_count,
            dropped_at_vocabulary: vocabulary.dropped.clone(),
            vocabulary_size: vocabulary.matrix.vocabulary().len(),
            min_doc_frequency: pruned.min_doc_frequency,
            removed_terms: pruned.removed_terms,
            dropped_at_prune: pruned.dropped.clone(),
            pruned_vocabulary_size: pruned.matrix.vocabulary().len(),
            documents_modeled: pruned.matrix.document_count(),
            topic_count: model.topic_count,
            topic_count_candidates: model
                .selection
                .as_ref()
                .map(|s| s.candidates.clone())
                .unwrap_or_default(),
            log_likelihood: model.log_likelihood,
            per_token_log_likelihood: model.per_token_log_likelihood,
            cluster_count: similarity.selection.chosen,
            average_silhouette: similarity.selection.silhouette.average,
            cluster_candidates: similarity.selection.candidates.clone(),
            reused_stages: executor.reused,
        };
        info!(
            "Pipeline done: {} documents, {} topics, {} clusters",
            report.documents_modeled, report.topic_count, report.cluster_count
        );

        Ok(PipelineOutput {
            normalized,
            vocabulary,
            pruned,
            model,
            summary,
            similarity,
            report,
        })
    }
}
