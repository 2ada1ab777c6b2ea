use super::ResultRows;
use anyhow::{Context, Result};
use std::io::Write;
use std::path::Path;

const METADATA_COLUMNS: [&str; 5] = ["id", "band", "writer", "album", "year"];

fn header(topic_count: usize) -> Vec<String> {
    METADATA_COLUMNS
        .iter()
        .map(|c| c.to_string())
        .chain((1..=topic_count).map(|t| format!("topic_{}", t)))
        .chain(std::iter::once("cluster".to_string()))
        .collect()
}

/// Wide table, one row per document: metadata, `topic_1..topic_K`, then
/// the 1-based cluster.
pub fn write_document_topics<W: Write>(writer: W, rows: &ResultRows) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(header(rows.topics.len()))?;
    for document in rows.documents.iter() {
        let meta = &document.meta;
        let mut record = vec![
            meta.id.to_string(),
            meta.band.clone(),
            meta.writer.clone(),
            meta.album.clone(),
            meta.year.map(|y| y.to_string()).unwrap_or_default(),
        ];
        record.extend(document.weights.iter().map(|w| w.to_string()));
        record.push((document.cluster + 1).to_string());
        csv_writer
            .write_record(&record)
            .with_context(|| format!("Could not write row of document {}", meta.id))?;
    }
    csv_writer.flush()?;
    Ok(())
}

pub fn write_document_topics_file(path: &Path, rows: &ResultRows) -> Result<()> {
    let file = std::fs::File::create(path).with_context(|| format!("Failed to create {:?}", path))?;
    write_document_topics(file, rows)
}
