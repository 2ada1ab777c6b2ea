//! Lyric text normalization: lower-casing, punctuation removal,
//! lemmatization and stop-word removal.

use super::{LemmaDictionary, StopWords};
use crate::corpus::Document;
use anyhow::{Context, Result};
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use tracing::{debug, info};
use unicode_segmentation::UnicodeSegmentation;

/// Section markers such as `[Chorus]` or `[Verse 2: Someone]`.
const ANNOTATION_PATTERN: &str = r"\[[^\]]*\]";

/// Upper bound of lemma-then-stem rounds applied to one token.
const MAX_REDUCTION_ROUNDS: usize = 8;

/// Lower-cases a token and drops every character that is not a letter or
/// a digit. Stop-word and lemma entries go through this too.
pub fn clean_token(token: &str) -> String {
    token
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric())
        .collect()
}

#[derive(Debug, Clone)]
pub struct NormalizerConfig {
    pub stop_words: StopWords,
    /// Custom entries. They override the built-in table when
    /// `builtin_lemmas` is set.
    pub lemmas: LemmaDictionary,
    pub builtin_lemmas: bool,
    /// English Snowball stemming after the dictionary lookup.
    pub stemming: bool,
    pub strip_annotations: bool,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            stop_words: StopWords::english_with_fillers(),
            lemmas: LemmaDictionary::default(),
            builtin_lemmas: true,
            stemming: true,
            strip_annotations: true,
        }
    }
}

pub struct TextNormalizer {
    config: NormalizerConfig,
    lemmas: LemmaDictionary,
    stemmer: Option<Stemmer>,
    annotation_regex: Regex,
}

impl TextNormalizer {
    pub fn new(config: NormalizerConfig) -> Result<Self> {
        let annotation_regex =
            Regex::new(ANNOTATION_PATTERN).context("Invalid annotation pattern")?;
        let lemmas = if config.builtin_lemmas {
            LemmaDictionary::builtin()
                .context("Invalid built-in lemma table")?
                .merged_with(&config.lemmas)
                .context("Custom lemmas conflict with built-in lemmas")?
        } else {
            config.lemmas.clone()
        };
        let stemmer = config
            .stemming
            .then(|| Stemmer::create(Algorithm::English));
        Ok(Self {
            config,
            lemmas,
            stemmer,
            annotation_regex,
        })
    }

    pub fn config(&self) -> &NormalizerConfig {
        &self.config
    }

    /// Dictionary lemma then stem, repeated until the token is stable, so a
    /// reduced token reduces to itself.
    pub fn reduce(&self, token: &str) -> String {
        let mut current = token.to_string();
        for _ in 0..MAX_REDUCTION_ROUNDS {
            let lemma = self.lemmas.lemmatize(&current);
            let next = match self.stemmer.as_ref() {
                Some(stemmer) => stemmer.stem(lemma).into_owned(),
                None => lemma.to_string(),
            };
            if next == current {
                break;
            }
            current = next;
        }
        current
    }

    /// Returns the cleaned tokens of `text`, in order.
    pub fn tokens(&self, text: &str) -> Vec<String> {
        let text = if self.config.strip_annotations {
            self.annotation_regex.replace_all(text, " ")
        } else {
            text.into()
        };

        text.unicode_words()
            .filter_map(|word| {
                let surface = clean_token(word);
                if surface.is_empty() || self.config.stop_words.contains(&surface) {
                    return None;
                }
                let reduced = self.reduce(&surface);
                if reduced.is_empty() || self.config.stop_words.contains(&reduced) {
                    return None;
                }
                Some(reduced)
            })
            .collect()
    }

    /// Cleaned text: the tokens joined with single spaces. Empty when every
    /// token was removed.
    pub fn normalize(&self, text: &str) -> String {
        self.tokens(text).join(" ")
    }

    /// Produces new documents carrying their cleaned text. Documents that end
    /// up empty are kept here and counted; the vocabulary builder drops them.
    pub fn normalize_corpus(&self, documents: &[Document]) -> NormalizedCorpus {
        info!("Normalizing {} documents...", documents.len());
        let documents: Vec<Document> = documents
            .iter()
            .map(|doc| doc.with_cleaned_text(self.normalize(&doc.raw_text)))
            .collect();
        let empty_count = documents
            .iter()
            .filter(|d| d.cleaned_text.is_empty())
            .count();
        for doc in documents.iter().filter(|d| d.cleaned_text.is_empty()) {
            debug!("Document {} is empty after normalization", doc.id());
        }
        NormalizedCorpus {
            documents,
            empty_count,
        }
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct NormalizedCorpus {
    pub documents: Vec<Document>,
    pub empty_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::{DocumentId, DocumentMeta};

    fn make_normalizer() -> TextNormalizer {
        TextNormalizer::new(NormalizerConfig::default()).unwrap()
    }

    fn make_fixture_normalizer() -> TextNormalizer {
        TextNormalizer::new(NormalizerConfig {
            stop_words: StopWords::new(["the", "a", "is", "be", "yeah"]),
            lemmas: LemmaDictionary::from_pairs([("was", "be"), ("dogs", "dog"), ("ran", "run")])
                .unwrap(),
            builtin_lemmas: false,
            stemming: false,
            strip_annotations: true,
        })
        .unwrap()
    }

    #[test]
    fn test_clean_token() {
        assert_eq!(clean_token("Don't"), "dont");
        assert_eq!(clean_token("ROCK!"), "rock");
        assert_eq!(clean_token("..."), "");
        assert_eq!(clean_token("Café"), "café");
    }

    #[test]
    fn test_normalize_basic() {
        let normalizer = make_fixture_normalizer();
        assert_eq!(
            normalizer.normalize("The DOGS ran, yeah! The dog is a good dog."),
            "dog run dog good dog"
        );
    }

    #[test]
    fn test_lemma_that_is_stop_word_is_removed() {
        let normalizer = make_fixture_normalizer();
        assert_eq!(normalizer.normalize("it was late"), "it late");
    }

    #[test]
    fn test_annotations_are_stripped() {
        let normalizer = make_fixture_normalizer();
        assert_eq!(
            normalizer.normalize("[Chorus]\nstars shine\n[Verse 2: Robert]"),
            "stars shine"
        );
    }

    #[test]
    fn test_inflected_forms_share_a_term() {
        let normalizer = make_normalizer();
        let pairs = [
            ("songs", "song"),
            ("guitars", "guitar"),
            ("lights", "light"),
            ("dreamed", "dreaming"),
            ("sang", "sing"),
            ("lovin", "loves"),
        ];
        for (left, right) in pairs {
            assert_eq!(
                normalizer.normalize(left),
                normalizer.normalize(right),
                "{} and {} were not merged",
                left,
                right
            );
            assert!(!normalizer.normalize(left).is_empty());
        }
    }

    #[test]
    fn test_custom_lemmas_override_builtin() {
        let normalizer = TextNormalizer::new(NormalizerConfig {
            lemmas: LemmaDictionary::from_pairs([("sang", "chant")]).unwrap(),
            ..NormalizerConfig::default()
        })
        .unwrap();
        assert_eq!(normalizer.normalize("sang"), normalizer.normalize("chant"));
        assert_ne!(normalizer.normalize("sang"), normalizer.normalize("sing"));
    }

    #[test]
    fn test_custom_lemma_cycle_with_builtin_fails() {
        let result = TextNormalizer::new(NormalizerConfig {
            lemmas: LemmaDictionary::from_pairs([("sing", "sang")]).unwrap(),
            ..NormalizerConfig::default()
        });
        let error = result.err().unwrap();
        assert!(error.to_string().contains("conflict with built-in lemmas"));
    }

    #[test]
    fn test_reduced_tokens_are_stable() {
        let normalizer = make_normalizer();
        for word in ["dreaming", "happiness", "generously", "conditional", "engines"] {
            let once = normalizer.reduce(word);
            assert_eq!(normalizer.reduce(&once), once);
        }
    }

    #[test]
    fn test_only_stop_words_gives_empty_text() {
        let normalizer = make_normalizer();
        assert_eq!(normalizer.normalize("Oh yeah, and the, of it!"), "");
        assert_eq!(normalizer.normalize(""), "");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let normalizer = make_normalizer();
        let texts = [
            "I've been walking down the roads, my hearts were burning",
            "Don't stop believin', hold on to that feelin'!",
            "[Chorus] Whoa-oh, we went going, gone... 1975 summers",
            "Rock-n-roll ain't noise pollution",
            "Café au lait, naïve señor",
        ];
        for text in texts {
            let once = normalizer.normalize(text);
            let twice = normalizer.normalize(&once);
            assert_eq!(once, twice, "normalizing {:?} twice changed it", text);
        }
    }

    #[test]
    fn test_normalize_is_deterministic() {
        let normalizer = make_normalizer();
        let text = "Stairway to heaven, all that glitters is gold";
        assert_eq!(normalizer.normalize(text), normalizer.normalize(text));
    }

    #[test]
    fn test_normalize_corpus_counts_empty() {
        let normalizer = make_normalizer();
        let make_doc = |id: &str, text: &str| Document {
            meta: DocumentMeta {
                id: DocumentId::from(id),
                band: "b".to_string(),
                writer: "w".to_string(),
                album: "a".to_string(),
                year: None,
            },
            raw_text: text.to_string(),
            cleaned_text: String::new(),
        };
        let docs = vec![
            make_doc("1", "guitar thunder highway"),
            make_doc("2", "oh yeah yeah"),
        ];
        let normalized = normalizer.normalize_corpus(&docs);
        assert_eq!(normalized.documents.len(), 2);
        assert_eq!(normalized.empty_count, 1);
        assert_eq!(normalized.documents[0].cleaned_text, "guitar thunder highway");
        assert_eq!(normalized.documents[1].cleaned_text, "");
        assert_eq!(docs[0].cleaned_text, "");
    }
}
