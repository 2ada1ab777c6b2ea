//! Final results written next to the checkpoints: a SQLite database and a
//! wide CSV of document-topic weights.

mod csv_table;
mod schema;
mod sqlite;

pub use csv_table::{write_document_topics, write_document_topics_file};
pub use schema::{create_results_schema, RESULTS_SCHEMA_VERSION, RESULTS_TABLES};
pub use sqlite::write_results_db;

use crate::corpus::DocumentMeta;
use crate::pipeline::PipelineOutput;
use crate::topics::TopicLabel;
use anyhow::{Context, Result};
use std::path::Path;
use tracing::info;

pub const RESULTS_DB_FILE: &str = "results.db";
pub const DOCUMENT_TOPICS_FILE: &str = "document_topics.csv";

#[derive(Debug, Clone, PartialEq)]
pub struct DocumentRow {
    pub meta: DocumentMeta,
    pub weights: Vec<f64>,
    pub dominant_topic: usize,
    pub cluster: usize,
}

/// Everything exported for one run, flattened from the pipeline output.
/// Topic and cluster indices are 0-based here.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultRows {
    pub documents: Vec<DocumentRow>,
    pub topics: Vec<TopicLabel>,
    pub run_info: Vec<(String, String)>,
}

impl ResultRows {
    pub fn from_output(output: &PipelineOutput) -> Self {
        let report = &output.report;
        let documents = output
            .metadata()
            .iter()
            .zip(output.model.doc_topic.iter())
            .zip(output.summary.dominant_topics.iter())
            .zip(output.cluster_assignments().iter())
            .map(|(((meta, weights), dominant_topic), cluster)| DocumentRow {
                meta: meta.clone(),
                weights: weights.clone(),
                dominant_topic: *dominant_topic,
                cluster: *cluster,
            })
            .collect();
        let run_info = vec![
            ("created_at", chrono::Utc::now().to_rfc3339()),
            ("seed", output.model.config.seed.to_string()),
            ("covariate", output.model.covariate.field.name().to_string()),
            ("input_documents", report.input_documents.to_string()),
            ("documents_modeled", report.documents_modeled.to_string()),
            ("vocabulary_size", report.pruned_vocabulary_size.to_string()),
            ("min_doc_frequency", report.min_doc_frequency.to_string()),
            ("topic_count", report.topic_count.to_string()),
            ("log_likelihood", report.log_likelihood.to_string()),
            (
                "per_token_log_likelihood",
                report.per_token_log_likelihood.to_string(),
            ),
            ("cluster_count", report.cluster_count.to_string()),
            ("average_silhouette", report.average_silhouette.to_string()),
        ]
        .into_iter()
        .map(|(key, value)| (key.to_string(), value))
        .collect();
        Self {
            documents,
            topics: output.summary.labels.clone(),
            run_info,
        }
    }
}

/// Writes `results.db` and `document_topics.csv` into `dir`.
pub fn export_results(output: &PipelineOutput, dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory {:?}", dir))?;
    let rows = ResultRows::from_output(output);
    write_results_db(&dir.join(RESULTS_DB_FILE), &rows)?;
    write_document_topics_file(&dir.join(DOCUMENT_TOPICS_FILE), &rows)?;
    info!(
        "Exported {} documents and {} topics to {:?}",
        rows.documents.len(),
        rows.topics.len(),
        dir
    );
    Ok(())
}
