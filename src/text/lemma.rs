//! Dictionary based lemmatization. The dictionary holds forms a suffix
//! stemmer cannot reduce (irregular verbs and plurals, lyric spellings such
//! as `lovin`) and is consulted before stemming.

use super::normalizer::clean_token;
use anyhow::{Context, Result};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LemmaError {
    #[error("Lemma chain starting at \"{0}\" forms a cycle")]
    Cycle(String),

    #[error("Malformed lemma entry on line {line}: \"{content}\"")]
    Malformed { line: usize, content: String },
}

/// Built-in (form, lemma) pairs: irregular forms plus inflections that
/// are frequent in song lyrics.
pub const BUILTIN_LEMMAS: &[(&str, &str)] = &[
    ("men", "man"), ("women", "woman"), ("children", "child"), ("feet", "foot"),
    ("teeth", "tooth"), ("lives", "life"), ("wives", "wife"), ("knives", "knife"),
    ("wolves", "wolf"), ("mice", "mouse"), ("eyes", "eye"), ("hearts", "heart"),
    ("dreams", "dream"), ("nights", "night"), ("tears", "tear"), ("days", "day"),
    ("hands", "hand"), ("words", "word"), ("stars", "star"), ("roads", "road"),
    ("loved", "love"), ("loving", "love"), ("loves", "love"), ("lovin", "love"),
    ("cried", "cry"), ("cries", "cry"), ("crying", "cry"), ("died", "die"),
    ("dies", "die"), ("dying", "die"), ("burned", "burn"), ("burns", "burn"),
    ("burning", "burn"), ("walked", "walk"), ("walks", "walk"), ("walking", "walk"),
    ("ran", "run"), ("runs", "run"), ("running", "run"), ("fell", "fall"),
    ("fallen", "fall"), ("falls", "fall"), ("falling", "fall"), ("felt", "feel"),
    ("feels", "feel"), ("feeling", "feel"), ("came", "come"), ("comes", "come"),
    ("coming", "come"), ("comin", "come"), ("went", "go"), ("gone", "go"),
    ("goes", "go"), ("going", "go"), ("goin", "go"), ("knew", "know"),
    ("known", "know"), ("knows", "know"), ("knowing", "know"), ("said", "say"),
    ("says", "say"), ("saying", "say"), ("saw", "see"), ("seen", "see"),
    ("sees", "see"), ("seeing", "see"), ("took", "take"), ("taken", "take"),
    ("takes", "take"), ("taking", "take"), ("gave", "give"), ("given", "give"),
    ("gives", "give"), ("giving", "give"), ("made", "make"), ("makes", "make"),
    ("making", "make"), ("got", "get"), ("gotten", "get"), ("gets", "get"),
    ("getting", "get"), ("told", "tell"), ("tells", "tell"), ("telling", "tell"),
    ("thought", "think"), ("thinks", "think"), ("thinking", "think"), ("found", "find"),
    ("finds", "find"), ("held", "hold"), ("holds", "hold"), ("holding", "hold"),
    ("brought", "bring"), ("bought", "buy"), ("sang", "sing"), ("sung", "sing"),
    ("sings", "sing"), ("singing", "sing"), ("broke", "break"), ("broken", "break"),
    ("breaking", "break"), ("spoke", "speak"), ("spoken", "speak"), ("wrote", "write"),
    ("written", "write"), ("rode", "ride"), ("ridden", "ride"), ("riding", "ride"),
    ("flew", "fly"), ("flown", "fly"), ("flies", "fly"), ("flying", "fly"),
    ("drove", "drive"), ("driven", "drive"), ("driving", "drive"), ("stood", "stand"),
    ("understood", "understand"), ("lost", "lose"), ("losing", "lose"), ("won", "win"),
    ("wins", "win"), ("winning", "win"), ("began", "begin"), ("begun", "begin"),
    ("sent", "send"), ("spent", "spend"), ("kept", "keep"), ("slept", "sleep"),
    ("meant", "mean"), ("met", "meet"), ("paid", "pay"), ("heard", "hear"),
    ("became", "become"), ("shone", "shine"), ("shining", "shine"), ("woke", "wake"),
    ("woken", "wake"), ("wore", "wear"), ("worn", "wear"), ("tore", "tear"),
    ("torn", "tear"), ("froze", "freeze"), ("frozen", "freeze"), ("chose", "choose"),
    ("chosen", "choose"), ("hid", "hide"), ("hidden", "hide"), ("better", "good"),
    ("best", "good"), ("worse", "bad"), ("worst", "bad"),
];

/// Maps surface forms to lemmas. Chains are collapsed when the dictionary is
/// built, so every lemma maps to itself.
#[derive(Debug, Clone, Default)]
pub struct LemmaDictionary {
    lemmas: HashMap<String, String>,
}

impl LemmaDictionary {
    pub fn builtin() -> Result<Self, LemmaError> {
        Self::from_pairs(BUILTIN_LEMMAS.iter().copied())
    }

    pub fn from_pairs<I, S>(pairs: I) -> Result<Self, LemmaError>
    where
        I: IntoIterator<Item = (S, S)>,
        S: AsRef<str>,
    {
        let mut raw = HashMap::new();
        for (form, lemma) in pairs {
            let form = clean_token(form.as_ref());
            let lemma = clean_token(lemma.as_ref());
            if form.is_empty() || lemma.is_empty() || form == lemma {
                continue;
            }
            raw.insert(form, lemma);
        }
        Ok(LemmaDictionary {
            lemmas: resolve_chains(raw)?,
        })
    }

    /// Merges the entries of `other`, which win on conflicts.
    pub fn merged_with(&self, other: &LemmaDictionary) -> Result<Self, LemmaError> {
        let pairs = self
            .lemmas
            .iter()
            .filter(|(form, _)| !other.lemmas.contains_key(*form))
            .chain(other.lemmas.iter())
            .map(|(f, l)| (f.clone(), l.clone()));
        Self::from_pairs(pairs)
    }

    /// Reads a TSV file with `form<TAB>lemma` lines. Blank lines and lines
    /// starting with `#` are skipped.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read lemma file: {:?}", path))?;
        let mut pairs = vec![];
        for (index, line) in content.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let mut fields = trimmed.split('\t');
            match (fields.next(), fields.next(), fields.next()) {
                (Some(form), Some(lemma), None) => pairs.push((form.to_string(), lemma.to_string())),
                _ => {
                    return Err(LemmaError::Malformed {
                        line: index + 1,
                        content: line.to_string(),
                    })
                    .with_context(|| format!("Invalid lemma file: {:?}", path))
                }
            }
        }
        Self::from_pairs(pairs).with_context(|| format!("Invalid lemma file: {:?}", path))
    }

    /// `token` must already be normalized.
    pub fn lemmatize<'a>(&'a self, token: &'a str) -> &'a str {
        self.lemmas.get(token).map(String::as_str).unwrap_or(token)
    }

    /// Every (form, lemma) entry sorted by form.
    pub fn sorted_pairs(&self) -> Vec<(&str, &str)> {
        let mut pairs: Vec<(&str, &str)> = self
            .lemmas
            .iter()
            .map(|(form, lemma)| (form.as_str(), lemma.as_str()))
            .collect();
        pairs.sort_unstable();
        pairs
    }

    pub fn len(&self) -> usize {
        self.lemmas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lemmas.is_empty()
    }
}

fn resolve_chains(raw: HashMap<String, String>) -> Result<HashMap<String, String>, LemmaError> {
    let mut resolved = HashMap::with_capacity(raw.len());
    for form in raw.keys() {
        let mut visited = HashSet::new();
        visited.insert(form.as_str());
        let mut current = &raw[form];
        while let Some(next) = raw.get(current) {
            if !visited.insert(current.as_str()) {
                return Err(LemmaError::Cycle(form.clone()));
            }
            current = next;
        }
        resolved.insert(form.clone(), current.clone());
    }
    Ok(resolved)
}
