use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(pub String);

impl DocumentId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DocumentId {
    fn from(value: &str) -> Self {
        DocumentId(value.to_string())
    }
}

/// Per-song metadata that travels alongside the term vectors through
/// every stage of the pipeline.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMeta {
    pub id: DocumentId,
    pub band: String,
    pub writer: String,
    pub album: String,
    pub year: Option<i32>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub meta: DocumentMeta,
    pub raw_text: String,
    /// Empty until the document went through the text normalizer.
    #[serde(default)]
    pub cleaned_text: String,
}

impl Document {
    pub fn id(&self) -> &DocumentId {
        &self.meta.id
    }

    /// Returns a copy of this document carrying the given cleaned text.
    pub fn with_cleaned_text(&self, cleaned_text: String) -> Document {
        Document {
            meta: self.meta.clone(),
            raw_text: self.raw_text.clone(),
            cleaned_text,
        }
    }
}

/// The metadata field used as topic prevalence covariate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum CovariateField {
    #[default]
    Writer,
    Band,
    Album,
    None,
}

impl CovariateField {
    pub fn value<'a>(&self, meta: &'a DocumentMeta) -> &'a str {
        match self {
            CovariateField::Writer => &meta.writer,
            CovariateField::Band => &meta.band,
            CovariateField::Album => &meta.album,
            CovariateField::None => "all",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            CovariateField::Writer => "writer",
            CovariateField::Band => "band",
            CovariateField::Album => "album",
            CovariateField::None => "none",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_meta() -> DocumentMeta {
        DocumentMeta {
            id: DocumentId::from("song-1"),
            band: "The Band".to_string(),
            writer: "Somebody".to_string(),
            album: "First".to_string(),
            year: Some(1971),
        }
    }

    #[test]
    fn test_covariate_value() {
        let meta = make_meta();
        assert_eq!(CovariateField::Writer.value(&meta), "Somebody");
        assert_eq!(CovariateField::Band.value(&meta), "The Band");
        assert_eq!(CovariateField::Album.value(&meta), "First");
        assert_eq!(CovariateField::None.value(&meta), "all");
    }

    #[test]
    fn test_with_cleaned_text_keeps_original() {
        let doc = Document {
            meta: make_meta(),
            raw_text: "Hello World".to_string(),
            cleaned_text: String::new(),
        };
        let cleaned = doc.with_cleaned_text("hello world".to_string());
        assert_eq!(doc.cleaned_text, "");
        assert_eq!(cleaned.cleaned_text, "hello world");
        assert_eq!(cleaned.meta, doc.meta);
    }

    #[test]
    fn test_document_id_serializes_as_string() {
        let id = DocumentId::from("abc");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"abc\"");
    }
}
