//! Corpus loading functionality

use super::{Document, DocumentId, DocumentMeta};
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use tracing::{info, warn};

/// One row of the upstream song table, as found in CSV or JSON input.
#[derive(Debug, Clone, Deserialize)]
pub struct SongRow {
    pub id: String,
    #[serde(default)]
    pub band: String,
    #[serde(default)]
    pub writer: String,
    #[serde(default)]
    pub album: String,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub lyrics: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Problem {
    EmptyId { row: usize },
    DuplicateId(String),
    EmptyLyrics(String),
    MissingField { id: String, field: &'static str },
    NoDocuments,
}

impl Problem {
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Problem::EmptyId { .. } | Problem::DuplicateId(_) | Problem::NoDocuments
        )
    }
}

#[derive(Debug, Clone)]
pub struct Corpus {
    documents: Vec<Document>,
}

pub struct CorpusBuildResult {
    pub corpus: Option<Corpus>,
    pub problems: Vec<Problem>,
}

impl Corpus {
    pub fn from_documents(documents: Vec<Document>) -> Corpus {
        Corpus { documents }
    }

    /// Turns raw rows into documents, collecting every problem found on the
    /// way. The corpus is only produced when none of the problems is fatal.
    pub fn build(rows: Vec<SongRow>) -> CorpusBuildResult {
        let mut problems = vec![];
        let mut seen_ids = HashSet::new();
        let mut documents = Vec::with_capacity(rows.len());

        for (row_index, row) in rows.into_iter().enumerate() {
            let id = row.id.trim().to_string();
            if id.is_empty() {
                problems.push(Problem::EmptyId { row: row_index });
                continue;
            }
            if !seen_ids.insert(id.clone()) {
                problems.push(Problem::DuplicateId(id));
                continue;
            }
            if row.lyrics.trim().is_empty() {
                problems.push(Problem::EmptyLyrics(id.clone()));
            }
            let writer = fill_missing(&id, "writer", row.writer, &mut problems);
            let band = fill_missing(&id, "band", row.band, &mut problems);
            let album = fill_missing(&id, "album", row.album, &mut problems);

            documents.push(Document {
                meta: DocumentMeta {
                    id: DocumentId(id),
                    band,
                    writer,
                    album,
                    year: row.year,
                },
                raw_text: row.lyrics,
                cleaned_text: String::new(),
            });
        }

        if documents.is_empty() {
            problems.push(Problem::NoDocuments);
        }

        let corpus = if problems.iter().any(Problem::is_fatal) {
            None
        } else {
            Some(Corpus { documents })
        };
        CorpusBuildResult { corpus, problems }
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

fn fill_missing(
    id: &str,
    field: &'static str,
    value: String,
    problems: &mut Vec<Problem>,
) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        problems.push(Problem::MissingField {
            id: id.to_string(),
            field,
        });
        return "unknown".to_string();
    }
    trimmed.to_string()
}

pub fn read_rows(path: &Path) -> Result<Vec<SongRow>> {
    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "csv" => {
            let mut reader = csv::ReaderBuilder::new()
                .has_headers(true)
                .flexible(true)
                .from_path(path)
                .with_context(|| format!("Failed to open corpus file {:?}", path))?;
            let mut rows = vec![];
            for (index, record) in reader.deserialize().enumerate() {
                let row: SongRow = record
                    .with_context(|| format!("Invalid CSV record #{} in {:?}", index + 1, path))?;
                rows.push(row);
            }
            Ok(rows)
        }
        "json" => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read corpus file {:?}", path))?;
            serde_json::from_str(&text)
                .with_context(|| format!("Failed to parse corpus file {:?}", path))
        }
        other => bail!(
            "Unsupported corpus format \"{}\" for {:?}, expected .csv or .json",
            other,
            path
        ),
    }
}

pub fn load_corpus<P: AsRef<Path>>(path: P) -> Result<Corpus> {
    let path = path.as_ref();
    info!("Loading corpus from {:?}...", path);
    let rows = read_rows(path)?;
    let result = Corpus::build(rows);

    if !result.problems.is_empty() {
        warn!("Found {} problems:", result.problems.len());
        for problem in result.problems.iter() {
            warn!("- {:?}", problem);
        }
    }

    match result.corpus {
        Some(corpus) => {
            info!("Corpus has {} documents", corpus.len());
            Ok(corpus)
        }
        None => {
            let fatal = result.problems.iter().filter(|p| p.is_fatal()).count();
            bail!(
                "Could not load corpus, {} fatal problems out of {}",
                fatal,
                result.problems.len()
            )
        }
    }
}
