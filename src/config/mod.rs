mod file_config;

pub use file_config::{
    ClusteringFileConfig, FileConfig, NormalizerFileConfig, PruningFileConfig, TopicCountValue,
    TopicsFileConfig,
};

use crate::corpus::CovariateField;
use crate::pipeline::{PipelineConfig, DEFAULT_SEED};
use crate::similarity::{ClusterCount, ClusteringConfig, ExtraFeatures};
use crate::text::{LemmaDictionary, NormalizerConfig, StopWords};
use crate::topics::{TopicCount, TopicModelConfig};
use anyhow::{anyhow, bail, Context, Result};
use clap::ValueEnum;
use std::path::PathBuf;

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub corpus_path: Option<PathBuf>,
    pub output_dir: PathBuf,
    pub seed: u64,
    /// "auto" or a number.
    pub topics: String,
    pub min_doc_proportion: f64,
    pub covariate: CovariateField,
    pub min_clusters: usize,
    pub max_clusters: usize,
    pub clusters: Option<usize>,
    pub reuse_checkpoints: bool,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            corpus_path: None,
            output_dir: PathBuf::from("output"),
            seed: DEFAULT_SEED,
            topics: "10".to_string(),
            min_doc_proportion: 0.01,
            covariate: CovariateField::Writer,
            min_clusters: 2,
            max_clusters: 10,
            clusters: None,
            reuse_checkpoints: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    // Core settings
    pub corpus_path: PathBuf,
    pub output_dir: PathBuf,
    pub seed: u64,
    pub reuse_checkpoints: bool,

    // Stage settings (with defaults)
    pub normalizer: NormalizerSettings,
    pub min_doc_proportion: f64,
    pub topics: TopicSettings,
    pub clustering: ClusteringSettings,
}

#[derive(Debug, Clone)]
pub struct NormalizerSettings {
    pub extra_stop_words: Vec<String>,
    pub stop_words_file: Option<PathBuf>,
    pub lemma_file: Option<PathBuf>,
    pub use_builtin_custom_stop_words: bool,
    pub stemming: bool,
    pub strip_annotations: bool,
}

impl Default for NormalizerSettings {
    fn default() -> Self {
        Self {
            extra_stop_words: vec![],
            stop_words_file: None,
            lemma_file: None,
            use_builtin_custom_stop_words: true,
            stemming: true,
            strip_annotations: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TopicSettings {
    pub count: TopicCount,
    pub covariate: CovariateField,
    pub model: TopicModelConfig,
    pub label_terms: usize,
    pub representative_documents: usize,
}

#[derive(Debug, Clone)]
pub struct ClusteringSettings {
    pub count: ClusterCount,
    pub restarts: usize,
    pub extra_features: ExtraFeatures,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let corpus_path = file
            .corpus_path
            .map(PathBuf::from)
            .or_else(|| cli.corpus_path.clone())
            .ok_or_else(|| {
                anyhow!("corpus_path must be specified as argument or in config file")
            })?;
        let output_dir = file
            .output_dir
            .map(PathBuf::from)
            .unwrap_or_else(|| cli.output_dir.clone());
        let seed = file.seed.unwrap_or(cli.seed);
        let reuse_checkpoints = file.reuse_checkpoints.unwrap_or(cli.reuse_checkpoints);

        let normalizer_file = file.normalizer.unwrap_or_default();
        let normalizer_defaults = NormalizerSettings::default();
        let normalizer = NormalizerSettings {
            extra_stop_words: normalizer_file.extra_stop_words.unwrap_or_default(),
            stop_words_file: normalizer_file.stop_words_file.map(PathBuf::from),
            lemma_file: normalizer_file.lemma_file.map(PathBuf::from),
            use_builtin_custom_stop_words: normalizer_file
                .use_builtin_custom_stop_words
                .unwrap_or(normalizer_defaults.use_builtin_custom_stop_words),
            stemming: normalizer_file
                .stemming
                .unwrap_or(normalizer_defaults.stemming),
            strip_annotations: normalizer_file
                .strip_annotations
                .unwrap_or(normalizer_defaults.strip_annotations),
        };

        let min_doc_proportion = file
            .pruning
            .unwrap_or_default()
            .min_doc_proportion
            .unwrap_or(cli.min_doc_proportion);
        if !(min_doc_proportion > 0.0 && min_doc_proportion <= 1.0) {
            bail!(
                "min_doc_proportion must be in (0, 1], got {}",
                min_doc_proportion
            );
        }

        let topics = resolve_topics(cli, file.topics.unwrap_or_default(), seed)?;
        let clustering = resolve_clustering(cli, file.clustering.unwrap_or_default())?;

        Ok(AppConfig {
            corpus_path,
            output_dir,
            seed,
            reuse_checkpoints,
            normalizer,
            min_doc_proportion,
            topics,
            clustering,
        })
    }

    /// Builds the stage configuration, reading the stop-word and lemma files.
    pub fn pipeline_config(&self) -> Result<PipelineConfig> {
        let mut stop_words = if self.normalizer.use_builtin_custom_stop_words {
            StopWords::english_with_fillers()
        } else {
            StopWords::english()
        };
        stop_words.extend(&self.normalizer.extra_stop_words);
        if let Some(path) = self.normalizer.stop_words_file.as_ref() {
            stop_words.extend_from_file(path)?;
        }

        let lemmas = match self.normalizer.lemma_file.as_ref() {
            Some(path) => {
                let custom = LemmaDictionary::from_file(path)?;
                LemmaDictionary::builtin()
                    .context("Invalid built-in lemma table")?
                    .merged_with(&custom)
                    .with_context(|| {
                        format!("Lemma file {:?} conflicts with built-in lemmas", path)
                    })?;
                custom
            }
            None => LemmaDictionary::default(),
        };

        Ok(PipelineConfig {
            normalizer: NormalizerConfig {
                stop_words,
                lemmas,
                builtin_lemmas: true,
                stemming: self.normalizer.stemming,
                strip_annotations: self.normalizer.strip_annotations,
            },
            min_doc_proportion: self.min_doc_proportion,
            covariate: self.topics.covariate,
            topic_count: self.topics.count,
            topic_model: self.topics.model.clone(),
            label_terms: self.topics.label_terms,
            representative_documents: self.topics.representative_documents,
            extra_features: self.clustering.extra_features,
            clustering: ClusteringConfig {
                count: self.clustering.count,
                restarts: self.clustering.restarts,
                seed: self.seed,
            },
        }
        .with_seed(self.seed))
    }
}

fn resolve_topics(cli: &CliConfig, file: TopicsFileConfig, seed: u64) -> Result<TopicSettings> {
    let defaults = TopicModelConfig::default();
    let model = TopicModelConfig {
        iterations: file.iterations.unwrap_or(defaults.iterations),
        burn_in: file.burn_in.unwrap_or(defaults.burn_in),
        optimize_interval: file.optimize_interval.unwrap_or(defaults.optimize_interval),
        alpha: file.alpha.unwrap_or(defaults.alpha),
        beta: file.beta.unwrap_or(defaults.beta),
        seed,
    };
    model.validate().context("Invalid topic model settings")?;

    let count_arg = file
        .count
        .map(|count| count.as_arg())
        .unwrap_or_else(|| cli.topics.clone());
    let count = parse_topic_count(
        &count_arg,
        file.auto_min.unwrap_or(3),
        file.auto_max.unwrap_or(12),
        file.holdout_fraction.unwrap_or(0.1),
    )?;

    let covariate = match file.covariate {
        Some(name) => parse_covariate(&name)
            .ok_or_else(|| anyhow!("Unknown covariate {:?}, expected writer, band, album or none", name))?,
        None => cli.covariate,
    };

    let label_terms = file.label_terms.unwrap_or(5);
    if label_terms == 0 {
        bail!("label_terms must be at least 1");
    }

    Ok(TopicSettings {
        count,
        covariate,
        model,
        label_terms,
        representative_documents: file.representative_documents.unwrap_or(3),
    })
}

fn resolve_clustering(cli: &CliConfig, file: ClusteringFileConfig) -> Result<ClusteringSettings> {
    let fixed = file.fixed_clusters.or(cli.clusters);
    let count = match fixed {
        Some(clusters) => {
            if clusters < 2 {
                bail!("Cluster count must be at least 2, got {}", clusters);
            }
            ClusterCount::Fixed(clusters)
        }
        None => {
            let min = file.min_clusters.unwrap_or(cli.min_clusters);
            let max = file.max_clusters.unwrap_or(cli.max_clusters);
            if min < 2 {
                bail!("min_clusters must be at least 2, got {}", min);
            }
            if min > max {
                bail!("Empty cluster range: min_clusters {} > max_clusters {}", min, max);
            }
            ClusterCount::Sweep { min, max }
        }
    };

    let restarts = file.restarts.unwrap_or(5);
    if restarts == 0 {
        bail!("clustering.restarts must be at least 1");
    }

    Ok(ClusteringSettings {
        count,
        restarts,
        extra_features: ExtraFeatures {
            band: file.include_band.unwrap_or(false),
            writer: file.include_writer.unwrap_or(false),
            year: file.include_year.unwrap_or(false),
        },
    })
}

/// `"auto"` searches `[auto_min, auto_max]`, a number fixes K.
pub fn parse_topic_count(
    value: &str,
    auto_min: usize,
    auto_max: usize,
    holdout_fraction: f64,
) -> Result<TopicCount> {
    if value.trim().eq_ignore_ascii_case("auto") {
        if auto_min < 2 {
            bail!("topics.auto_min must be at least 2, got {}", auto_min);
        }
        if auto_min > auto_max {
            bail!(
                "Empty topic count range: auto_min {} > auto_max {}",
                auto_min,
                auto_max
            );
        }
        if !(holdout_fraction > 0.0 && holdout_fraction < 1.0) {
            bail!(
                "topics.holdout_fraction must be in (0, 1), got {}",
                holdout_fraction
            );
        }
        return Ok(TopicCount::Auto {
            min: auto_min,
            max: auto_max,
            holdout_fraction,
        });
    }
    let topics: usize = value
        .trim()
        .parse()
        .with_context(|| format!("Topic count must be \"auto\" or a number, got {:?}", value))?;
    if topics < 2 {
        bail!("Topic count must be at least 2, got {}", topics);
    }
    Ok(TopicCount::Fixed(topics))
}

/// Uses clap's ValueEnum trait for parsing.
fn parse_covariate(s: &str) -> Option<CovariateField> {
    CovariateField::from_str(s, true).ok()
}
