use super::schema::{
    create_results_schema, DOCUMENTS_TABLE, DOCUMENT_TOPICS_TABLE, RUN_INFO_TABLE, TOPICS_TABLE,
};
use super::ResultRows;
use anyhow::{Context, Result};
use rusqlite::{params, Connection};
use std::path::Path;
use tracing::debug;

/// Writes `rows` into a fresh database at `path`, replacing any previous one.
/// Topic and cluster numbers are stored 1-based.
pub fn write_results_db(path: &Path, rows: &ResultRows) -> Result<()> {
    if path.exists() {
        std::fs::remove_file(path)
            .with_context(|| format!("Failed to remove previous results {:?}", path))?;
    }
    let mut conn =
        Connection::open(path).with_context(|| format!("Failed to open database {:?}", path))?;
    create_results_schema(&conn).context("Failed to create results schema")?;
    insert_rows(&mut conn, rows)?;
    debug!(
        "Wrote {} documents and {} topics to {:?}",
        rows.documents.len(),
        rows.topics.len(),
        path
    );
    Ok(())
}

fn insert_rows(conn: &mut Connection, rows: &ResultRows) -> Result<()> {
    let tx = conn.transaction()?;
    {
        let mut insert_document = tx.prepare(&DOCUMENTS_TABLE.insert_sql())?;
        for document in rows.documents.iter() {
            insert_document
                .execute(params![
                    document.meta.id.as_str(),
                    document.meta.band,
                    document.meta.writer,
                    document.meta.album,
                    document.meta.year,
                    document.cluster + 1,
                    document.dominant_topic + 1,
                ])
                .with_context(|| format!("Could not insert document {}", document.meta.id))?;
        }

        let mut insert_topic = tx.prepare(&TOPICS_TABLE.insert_sql())?;
        for label in rows.topics.iter() {
            insert_topic
                .execute(params![
                    label.topic + 1,
                    label.display(),
                    label.frex.join(", "),
                    label.lift.join(", "),
                    label.score.join(", "),
                ])
                .with_context(|| format!("Could not insert topic {}", label.topic))?;
        }

        let mut insert_weight = tx.prepare(&DOCUMENT_TOPICS_TABLE.insert_sql())?;
        for document in rows.documents.iter() {
            for (topic, weight) in document.weights.iter().enumerate() {
                insert_weight.execute(params![document.meta.id.as_str(), topic + 1, weight])?;
            }
        }

        let mut insert_info = tx.prepare(&RUN_INFO_TABLE.insert_sql())?;
        for (key, value) in rows.run_info.iter() {
            insert_info
                .execute(params![key, value])
                .with_context(|| format!("Could not insert run info {}", key))?;
        }
    }
    tx.commit().context("Failed to commit results")?;
    Ok(())
}
