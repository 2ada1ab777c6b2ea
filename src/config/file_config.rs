use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    // Core settings (can override CLI)
    pub corpus_path: Option<String>,
    pub output_dir: Option<String>,
    pub seed: Option<u64>,
    pub reuse_checkpoints: Option<bool>,

    // Stage configs
    pub normalizer: Option<NormalizerFileConfig>,
    pub pruning: Option<PruningFileConfig>,
    pub topics: Option<TopicsFileConfig>,
    pub clustering: Option<ClusteringFileConfig>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct NormalizerFileConfig {
    pub extra_stop_words: Option<Vec<String>>,
    /// One word per line, `#` comments.
    pub stop_words_file: Option<String>,
    /// `form<TAB>lemma` per line.
    pub lemma_file: Option<String>,
    /// Adds the lyric filler words (yeah, oh, la...) to the English list.
    pub use_builtin_custom_stop_words: Option<bool>,
    /// English Snowball stemming after the lemma lookup.
    pub stemming: Option<bool>,
    pub strip_annotations: Option<bool>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct PruningFileConfig {
    pub min_doc_proportion: Option<f64>,
}

/// `count = "auto"` or `count = 12`.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum TopicCountValue {
    Number(usize),
    Name(String),
}

impl TopicCountValue {
    pub fn as_arg(&self) -> String {
        match self {
            TopicCountValue::Number(n) => n.to_string(),
            TopicCountValue::Name(name) => name.clone(),
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct TopicsFileConfig {
    pub count: Option<TopicCountValue>,
    pub auto_min: Option<usize>,
    pub auto_max: Option<usize>,
    pub holdout_fraction: Option<f64>,
    pub iterations: Option<usize>,
    pub burn_in: Option<usize>,
    pub optimize_interval: Option<usize>,
    pub alpha: Option<f64>,
    pub beta: Option<f64>,
    /// "writer", "band", "album" or "none"
    pub covariate: Option<String>,
    pub label_terms: Option<usize>,
    pub representative_documents: Option<usize>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct ClusteringFileConfig {
    pub min_clusters: Option<usize>,
    pub max_clusters: Option<usize>,
    pub fixed_clusters: Option<usize>,
    pub restarts: Option<usize>,
    pub include_band: Option<bool>,
    pub include_writer: Option<bool>,
    pub include_year: Option<bool>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_full_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
seed = 99
output_dir = "/tmp/out"

[normalizer]
extra_stop_words = ["baby", "gonna"]
use_builtin_custom_stop_words = false
stemming = false

[pruning]
min_doc_proportion = 0.05

[topics]
count = "auto"
auto_min = 4
auto_max = 8
covariate = "band"

[clustering]
fixed_clusters = 3
include_year = true
"#
        )
        .unwrap();

        let config = FileConfig::load(file.path()).unwrap();
        assert_eq!(config.seed, Some(99));
        assert_eq!(config.output_dir.as_deref(), Some("/tmp/out"));
        let normalizer = config.normalizer.unwrap();
        assert_eq!(
            normalizer.extra_stop_words,
            Some(vec!["baby".to_string(), "gonna".to_string()])
        );
        assert_eq!(normalizer.use_builtin_custom_stop_words, Some(false));
        assert_eq!(normalizer.stemming, Some(false));
        assert_eq!(config.pruning.unwrap().min_doc_proportion, Some(0.05));
        let topics = config.topics.unwrap();
        assert_eq!(topics.count, Some(TopicCountValue::Name("auto".to_string())));
        assert_eq!(topics.auto_min, Some(4));
        assert_eq!(topics.covariate.as_deref(), Some("band"));
        let clustering = config.clustering.unwrap();
        assert_eq!(clustering.fixed_clusters, Some(3));
        assert_eq!(clustering.include_year, Some(true));
        assert_eq!(clustering.min_clusters, None);
    }

    #[test]
    fn test_numeric_topic_count() {
        let config: FileConfig = toml::from_str("[topics]\ncount = 12\n").unwrap();
        assert_eq!(
            config.topics.unwrap().count,
            Some(TopicCountValue::Number(12))
        );
    }

    #[test]
    fn test_empty_file() {
        let config: FileConfig = toml::from_str("").unwrap();
        assert!(config.seed.is_none());
        assert!(config.topics.is_none());
    }

    #[test]
    fn test_load_missing_file() {
        let error = FileConfig::load(Path::new("/nonexistent/config.toml")).unwrap_err();
        assert!(error.to_string().contains("Failed to read config file"));
    }
}
