//! Stop-word lists used by the text normalizer.
//!
//! Entries are stored in their normalized form (see [`clean_token`]), so a
//! list containing `"don't"` matches the normalized token `dont`.

use super::normalizer::clean_token;
use anyhow::{Context, Result};
use std::collections::HashSet;
use std::path::Path;
use stop_words::{get, LANGUAGE};

/// Interjections and fillers that are frequent in lyrics but missing from
/// general purpose lists.
pub const LYRIC_FILLER_WORDS: &[&str] = &[
    "yeah", "yea", "ya", "oh", "ohh", "ooh", "oooh", "woah", "whoa", "wo", "la", "na", "nah",
    "hey", "uh", "huh", "ah", "aah", "ahh", "da", "doo", "ba", "bop", "mmm", "mm", "hmm",
    "ha", "hah", "yo", "eh", "ay", "ayy", "gonna", "wanna", "gotta", "ain't", "em", "cause",
    "til", "till", "tho", "chorus", "verse", "repeat", "x2", "x3", "x4",
];

#[derive(Debug, Clone, Default)]
pub struct StopWords {
    words: HashSet<String>,
}

impl StopWords {
    pub fn new<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut stop_words = StopWords::default();
        stop_words.extend(words);
        stop_words
    }

    /// Standard English list of the `stop-words` crate.
    pub fn english() -> Self {
        Self::new(get(LANGUAGE::English))
    }

    /// Standard English list plus the lyric fillers.
    pub fn english_with_fillers() -> Self {
        let mut words = Self::english();
        words.extend(LYRIC_FILLER_WORDS);
        words
    }

    pub fn extend<I, S>(&mut self, words: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for word in words {
            let cleaned = clean_token(word.as_ref());
            if !cleaned.is_empty() {
                self.words.insert(cleaned);
            }
        }
    }

    /// Reads one word per line, ignoring blank lines and `#` comments.
    pub fn extend_from_file(&mut self, path: &Path) -> Result<usize> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read stop-word file: {:?}", path))?;
        let before = self.words.len();
        self.extend(
            content
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty() && !line.starts_with('#')),
        );
        Ok(self.words.len() - before)
    }

    /// `token` must already be normalized.
    pub fn contains(&self, token: &str) -> bool {
        self.words.contains(token)
    }

    /// Every entry in lexicographic order.
    pub fn sorted_words(&self) -> Vec<&str> {
        let mut words: Vec<&str> = self.words.iter().map(String::as_str).collect();
        words.sort_unstable();
        words
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}
