mod lemma;
mod normalizer;
mod stopwords;

pub use lemma::{LemmaDictionary, LemmaError, BUILTIN_LEMMAS};
pub use normalizer::{clean_token, NormalizedCorpus, NormalizerConfig, TextNormalizer};
pub use stopwords::{StopWords, LYRIC_FILLER_WORDS};
