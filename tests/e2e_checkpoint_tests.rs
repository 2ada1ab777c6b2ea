//! End-to-end tests of checkpoints, reuse and exported results.

mod common;

use common::{toy_corpus, toy_pipeline_config, write_corpus_csv};
use lyrics_topics::corpus::{load_corpus, DocumentId};
use lyrics_topics::dtm::PruneOutput;
use lyrics_topics::export::{export_results, DOCUMENT_TOPICS_FILE, RESULTS_DB_FILE};
use lyrics_topics::pipeline::{
    CheckpointStore, Manifest, Pipeline, Stage, StoredRun, TopicSummary, MANIFEST_FILE,
};
use lyrics_topics::topics::FittedTopicModel;
use rusqlite::Connection;
use tempfile::TempDir;

/// JSON round trips may move a float by one ulp.
fn assert_close(left: &[Vec<f64>], right: &[Vec<f64>]) {
    assert_eq!(left.len(), right.len());
    for (l, r) in left.iter().zip(right.iter()) {
        assert_eq!(l.len(), r.len());
        for (a, b) in l.iter().zip(r.iter()) {
            assert!((a - b).abs() < 1e-12, "{} != {}", a, b);
        }
    }
}

#[test]
fn test_run_writes_every_checkpoint_and_manifest() {
    let dir = TempDir::new().unwrap();
    Pipeline::new(toy_pipeline_config())
        .with_checkpoints(dir.path(), false)
        .run(&toy_corpus())
        .unwrap();

    for stage in Stage::ALL {
        assert!(
            dir.path().join(stage.file_name()).exists(),
            "missing checkpoint of {}",
            stage
        );
    }
    let manifest: Manifest =
        serde_json::from_str(&std::fs::read_to_string(dir.path().join(MANIFEST_FILE)).unwrap())
            .unwrap();
    assert_eq!(manifest.stages.len(), 6);
    assert!(manifest.stages.values().all(|f| f.starts_with("sha256:")));
}

#[test]
fn test_reuse_loads_unchanged_stages() {
    let dir = TempDir::new().unwrap();
    let first = Pipeline::new(toy_pipeline_config())
        .with_checkpoints(dir.path(), true)
        .run(&toy_corpus())
        .unwrap();
    assert!(first.report.reused_stages.is_empty());

    let second = Pipeline::new(toy_pipeline_config())
        .with_checkpoints(dir.path(), true)
        .run(&toy_corpus())
        .unwrap();
    assert_eq!(second.report.reused_stages, Stage::ALL.to_vec());
    assert_close(&first.model.doc_topic, &second.model.doc_topic);
    assert_eq!(first.cluster_assignments(), second.cluster_assignments());
}

#[test]
fn test_changed_setting_recomputes_from_its_stage() {
    let dir = TempDir::new().unwrap();
    Pipeline::new(toy_pipeline_config())
        .with_checkpoints(dir.path(), true)
        .run(&toy_corpus())
        .unwrap();
    let before = std::fs::read_to_string(dir.path().join(MANIFEST_FILE)).unwrap();

    let mut config = toy_pipeline_config();
    config.topic_model.iterations = 200;
    let output = Pipeline::new(config)
        .with_checkpoints(dir.path(), true)
        .run(&toy_corpus())
        .unwrap();
    assert_eq!(
        output.report.reused_stages,
        vec![Stage::Normalize, Stage::Vocabulary, Stage::Prune]
    );

    let before: Manifest = serde_json::from_str(&before).unwrap();
    let after: Manifest =
        serde_json::from_str(&std::fs::read_to_string(dir.path().join(MANIFEST_FILE)).unwrap())
            .unwrap();
    assert_eq!(before.stages["prune"], after.stages["prune"]);
    for stage in ["fit", "label", "cluster"] {
        assert_ne!(before.stages[stage], after.stages[stage], "{} kept its fingerprint", stage);
    }
}

#[test]
fn test_without_reuse_every_stage_runs() {
    let dir = TempDir::new().unwrap();
    for _ in 0..2 {
        let output = Pipeline::new(toy_pipeline_config())
            .with_checkpoints(dir.path(), false)
            .run(&toy_corpus())
            .unwrap();
        assert!(output.report.reused_stages.is_empty());
    }
}

#[test]
fn test_checkpoints_read_back() {
    let dir = TempDir::new().unwrap();
    let output = Pipeline::new(toy_pipeline_config())
        .with_checkpoints(dir.path(), false)
        .run(&toy_corpus())
        .unwrap();

    let model: FittedTopicModel = CheckpointStore::read(dir.path(), Stage::Fit).unwrap();
    assert_eq!(model.document_ids, output.model.document_ids);
    assert_eq!(model.topic_count, output.model.topic_count);
    assert_close(&model.doc_topic, &output.model.doc_topic);
    assert_close(&model.term_topic, &output.model.term_topic);
    let summary: TopicSummary = CheckpointStore::read(dir.path(), Stage::Label).unwrap();
    assert_eq!(summary.labels, output.summary.labels);
    assert_eq!(summary.dominant_topics, output.summary.dominant_topics);
}

#[test]
fn test_failed_rerun_leaves_no_stale_checkpoints() {
    let dir = TempDir::new().unwrap();
    Pipeline::new(toy_pipeline_config())
        .with_checkpoints(dir.path(), true)
        .run(&toy_corpus())
        .unwrap();

    // Only A and B keep terms, too few documents for two topics.
    let mut config = toy_pipeline_config();
    config.min_doc_proportion = 0.4;
    let error = Pipeline::new(config)
        .with_checkpoints(dir.path(), true)
        .run(&toy_corpus())
        .unwrap_err();
    assert_eq!(error.stage(), Stage::Fit);

    let pruned: PruneOutput = CheckpointStore::read(dir.path(), Stage::Prune).unwrap();
    assert_eq!(
        pruned.matrix.document_ids(),
        vec![DocumentId::from("A"), DocumentId::from("B")]
    );
    for stage in [Stage::Fit, Stage::Label, Stage::Cluster] {
        assert!(!dir.path().join(stage.file_name()).exists(), "{} kept", stage);
    }
    assert!(CheckpointStore::read::<FittedTopicModel>(dir.path(), Stage::Fit).is_err());
    let error = StoredRun::read(dir.path()).unwrap_err();
    assert!(format!("{:#}", error).contains("No usable checkpoint of stage fit"));
}

#[test]
fn test_stored_run_reads_complete_run() {
    let dir = TempDir::new().unwrap();
    let output = Pipeline::new(toy_pipeline_config())
        .with_checkpoints(dir.path(), false)
        .run(&toy_corpus())
        .unwrap();

    let run = StoredRun::read(dir.path()).unwrap();
    assert_eq!(run.model.document_ids, output.model.document_ids);
    assert_eq!(
        run.similarity.selection.clustering.assignments,
        output.cluster_assignments()
    );
    assert_eq!(run.row_of("C"), Some(2));
    assert_eq!(run.row_of("missing"), None);
}

#[test]
fn test_stored_run_rejects_misaligned_checkpoints() {
    let dir = TempDir::new().unwrap();
    Pipeline::new(toy_pipeline_config())
        .with_checkpoints(dir.path(), false)
        .run(&toy_corpus())
        .unwrap();

    let mut model: FittedTopicModel = CheckpointStore::read(dir.path(), Stage::Fit).unwrap();
    model.document_ids.pop();
    std::fs::write(
        dir.path().join(Stage::Fit.file_name()),
        serde_json::to_string_pretty(&model).unwrap(),
    )
    .unwrap();

    let error = StoredRun::read(dir.path()).unwrap_err();
    assert!(format!("{:#}", error).contains("do not belong together"));
}

#[test]
fn test_csv_corpus_to_exported_results() {
    let dir = TempDir::new().unwrap();
    let corpus_path = write_corpus_csv(&toy_corpus(), dir.path());
    let corpus = load_corpus(&corpus_path).unwrap();
    assert_eq!(corpus.len(), 5);

    let output_dir = dir.path().join("output");
    let output = Pipeline::new(toy_pipeline_config())
        .with_checkpoints(&output_dir, false)
        .run(&corpus)
        .unwrap();
    export_results(&output, &output_dir).unwrap();

    let conn = Connection::open(output_dir.join(RESULTS_DB_FILE)).unwrap();
    let documents: usize = conn
        .query_row("SELECT COUNT(*) FROM documents", [], |row| row.get(0))
        .unwrap();
    assert_eq!(documents, 5);
    let weights: usize = conn
        .query_row("SELECT COUNT(*) FROM document_topics", [], |row| row.get(0))
        .unwrap();
    assert_eq!(weights, 10);
    let topic_count: String = conn
        .query_row(
            "SELECT value FROM run_info WHERE key = 'topic_count'",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(topic_count, "2");
    let clusters: Vec<usize> = conn
        .prepare("SELECT DISTINCT cluster FROM documents ORDER BY cluster")
        .unwrap()
        .query_map([], |row| row.get(0))
        .unwrap()
        .map(|r| r.unwrap())
        .collect();
    assert_eq!(clusters, vec![1, 2]);

    let mut reader = csv::Reader::from_path(output_dir.join(DOCUMENT_TOPICS_FILE)).unwrap();
    let headers = reader.headers().unwrap().clone();
    assert_eq!(
        headers.iter().collect::<Vec<_>>(),
        vec!["id", "band", "writer", "album", "year", "topic_1", "topic_2", "cluster"]
    );
    let ids: Vec<String> = reader
        .records()
        .map(|r| r.unwrap()[0].to_string())
        .collect();
    assert_eq!(ids, vec!["A", "B", "C", "D", "E"]);
}
