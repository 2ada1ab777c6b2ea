use anyhow::{Context, Result};
use clap::Parser;
use lyrics_topics::config::{AppConfig, CliConfig, FileConfig};
use lyrics_topics::corpus::{load_corpus, CovariateField};
use lyrics_topics::export::export_results;
use lyrics_topics::pipeline::{Pipeline, PipelineOutput, DEFAULT_SEED};
use std::path::PathBuf;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn parse_path(s: &str) -> Result<PathBuf> {
    let original_path = PathBuf::from(s);
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
struct CliArgs {
    /// Path to the corpus, a .csv or .json file of songs.
    #[clap(value_parser = parse_path)]
    pub corpus: Option<PathBuf>,

    /// Path to a TOML config file. Its values override the command line.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// Directory receiving checkpoints, results.db and document_topics.csv.
    #[clap(long, value_parser = parse_path, default_value = "output")]
    pub output_dir: PathBuf,

    /// Seed of every random choice of the run.
    #[clap(long, default_value_t = DEFAULT_SEED)]
    pub seed: u64,

    /// Number of topics, or "auto" to pick it on held-out tokens.
    #[clap(long, default_value = "10")]
    pub topics: String,

    /// Terms must appear in at least this share of the documents.
    #[clap(long, default_value_t = 0.01)]
    pub min_doc_proportion: f64,

    /// Metadata field shifting topic prevalence.
    #[clap(long, value_enum, default_value = "writer")]
    pub covariate: CovariateField,

    /// Smallest cluster count tried by the silhouette sweep.
    #[clap(long, default_value_t = 2)]
    pub min_clusters: usize,

    /// Largest cluster count tried by the silhouette sweep.
    #[clap(long, default_value_t = 10)]
    pub max_clusters: usize,

    /// Fixed cluster count, skips the sweep.
    #[clap(long)]
    pub clusters: Option<usize>,

    /// Load stage checkpoints whose inputs did not change.
    #[clap(long)]
    pub reuse_checkpoints: bool,
}

impl CliArgs {
    fn to_cli_config(&self) -> CliConfig {
        CliConfig {
            corpus_path: self.corpus.clone(),
            output_dir: self.output_dir.clone(),
            seed: self.seed,
            topics: self.topics.clone(),
            min_doc_proportion: self.min_doc_proportion,
            covariate: self.covariate,
            min_clusters: self.min_clusters,
            max_clusters: self.max_clusters,
            clusters: self.clusters,
            reuse_checkpoints: self.reuse_checkpoints,
        }
    }
}

fn print_summary(output: &PipelineOutput) {
    let report = &output.report;
    println!(
        "Documents: {} loaded, {} empty after normalization, {} modeled",
        report.input_documents, report.empty_after_normalization, report.documents_modeled
    );
    println!(
        "Vocabulary: {} terms, {} after pruning (min document frequency {})",
        report.vocabulary_size, report.pruned_vocabulary_size, report.min_doc_frequency
    );
    if !report.dropped_at_prune.is_empty() {
        println!(
            "Dropped by pruning: {}",
            report
                .dropped_at_prune
                .iter()
                .map(|id| id.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        );
    }
    for candidate in report.topic_count_candidates.iter() {
        println!(
            "  K={:<3} held-out log-likelihood per token {:.4}",
            candidate.topics, candidate.held_out_log_likelihood
        );
    }
    println!(
        "Topics: {} (log-likelihood {:.2}, per token {:.4})",
        report.topic_count, report.log_likelihood, report.per_token_log_likelihood
    );
    for label in output.summary.labels.iter() {
        println!("  {:>3}. {}", label.topic + 1, label.display());
    }
    for candidate in report.cluster_candidates.iter() {
        println!(
            "  K'={:<3} average silhouette {:.4}",
            candidate.clusters, candidate.average_silhouette
        );
    }
    println!(
        "Clusters: {} (average silhouette {:.4})",
        report.cluster_count, report.average_silhouette
    );
    if !report.reused_stages.is_empty() {
        println!(
            "Reused checkpoints: {}",
            report
                .reused_stages
                .iter()
                .map(|s| s.name())
                .collect::<Vec<_>>()
                .join(", ")
        );
    }
}

fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .context("Failed to initialize logging")?;

    let file_config = match cli_args.config.as_ref() {
        Some(path) => {
            info!("Loading config from {:?}", path);
            Some(FileConfig::load(path)?)
        }
        None => None,
    };
    let app_config = AppConfig::resolve(&cli_args.to_cli_config(), file_config)?;
    let pipeline_config = app_config.pipeline_config()?;

    let corpus = load_corpus(&app_config.corpus_path)?;
    let output = Pipeline::new(pipeline_config)
        .with_checkpoints(&app_config.output_dir, app_config.reuse_checkpoints)
        .run(&corpus)?;
    export_results(&output, &app_config.output_dir)?;

    print_summary(&output);
    println!("Results written to {:?}", app_config.output_dir);
    Ok(())
}
