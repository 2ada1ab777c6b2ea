//! Test fixture creation for corpora and configurations

use lyrics_topics::corpus::{Corpus, CovariateField, Document, DocumentId, DocumentMeta};
use lyrics_topics::pipeline::PipelineConfig;
use lyrics_topics::similarity::{ClusterCount, ClusteringConfig};
use lyrics_topics::topics::{TopicCount, TopicModelConfig};
use std::path::{Path, PathBuf};

/// Documents sharing most of their vocabulary.
pub const TOY_SHARED_IDS: [&str; 2] = ["A", "B"];
/// Documents lexically disjoint from everything else.
pub const TOY_DISJOINT_IDS: [&str; 3] = ["C", "D", "E"];

pub fn make_document(id: &str, writer: &str, year: Option<i32>, lyrics: &str) -> Document {
    Document {
        meta: DocumentMeta {
            id: DocumentId::from(id),
            band: format!("{} Band", writer),
            writer: writer.to_string(),
            album: format!("{} Album", writer),
            year,
        },
        raw_text: lyrics.to_string(),
        cleaned_text: String::new(),
    }
}

fn repeat(text: &str, times: usize) -> String {
    vec![text; times].join("\n")
}

/// Five songs: A and B share nine of their ten words, C, D and E use words
/// found nowhere else.
pub fn toy_corpus() -> Corpus {
    Corpus::from_documents(vec![
        make_document(
            "A",
            "Ann",
            Some(1990),
            &repeat(
                "The river and the mountain, the forest and the thunder\n\
                 a lantern by the harbor, the meadow, the canyon, the glacier, the desert",
                2,
            ),
        ),
        make_document(
            "B",
            "Ann",
            Some(1991),
            &repeat(
                "Oh the river, the mountain, the forest, the thunder\n\
                 my lantern in the harbor, a meadow, a canyon, a glacier, a volcano",
                2,
            ),
        ),
        make_document("C", "Carl", Some(2001), "Pizza, pasta, cheese, tomato and garlic"),
        make_document("D", "Dora", Some(2005), "Engine piston gear clutch throttle"),
        make_document("E", "Eve", None, "[Chorus] violin cello piano trumpet flute"),
    ])
}

/// Twelve songs over three themes and three writers. Every word is found
/// in at least two songs.
pub fn themed_corpus() -> Corpus {
    let themes: [(&str, [&str; 6]); 3] = [
        (
            "Ann",
            ["river", "mountain", "forest", "meadow", "canyon", "glacier"],
        ),
        ("Carl", ["pizza", "pasta", "cheese", "tomato", "garlic", "bread"]),
        ("Dora", ["engine", "piston", "clutch", "throttle", "wheel", "gear"]),
    ];
    // Step 2 leaves every song of the second theme with three of its words.
    let steps = [1, 2, 1];
    let mut documents = vec![];
    for song in 0..4 {
        for ((writer, words), step) in themes.iter().zip(steps) {
            let lyrics: Vec<&str> = (0..10).map(|i| words[(song + i * step) % 6]).collect();
            documents.push(make_document(
                &format!("{}-{}", writer, song + 1),
                writer,
                Some(1990 + song as i32),
                &lyrics.join(" "),
            ));
        }
    }
    Corpus::from_documents(documents)
}

/// Two fixed topics over the toy corpus, two fixed clusters, covariate off.
pub fn toy_pipeline_config() -> PipelineConfig {
    PipelineConfig {
        min_doc_proportion: 0.1,
        covariate: CovariateField::None,
        topic_count: TopicCount::Fixed(2),
        topic_model: TopicModelConfig {
            iterations: 300,
            burn_in: 50,
            optimize_interval: 25,
            alpha: 0.1,
            beta: 0.01,
            seed: 1234,
        },
        label_terms: 3,
        representative_documents: 2,
        clustering: ClusteringConfig {
            count: ClusterCount::Fixed(2),
            restarts: 5,
            seed: 1234,
        },
        ..PipelineConfig::default()
    }
}

/// Writes `corpus` as a CSV with the columns `load_corpus` expects.
pub fn write_corpus_csv(corpus: &Corpus, dir: &Path) -> PathBuf {
    let path = dir.join("songs.csv");
    let mut writer = csv::Writer::from_path(&path).unwrap();
    writer
        .write_record(["id", "band", "writer", "album", "year", "lyrics"])
        .unwrap();
    for doc in corpus.documents() {
        writer
            .write_record([
                doc.meta.id.to_string(),
                doc.meta.band.clone(),
                doc.meta.writer.clone(),
                doc.meta.album.clone(),
                doc.meta.year.map(|y| y.to_string()).unwrap_or_default(),
                doc.raw_text.clone(),
            ])
            .unwrap();
    }
    writer.flush().unwrap();
    path
}
