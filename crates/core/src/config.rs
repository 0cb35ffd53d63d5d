use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;

use crate::TitleError;

/// Denylist shipped with the crate, used when no other list is configured.
pub const DEFAULT_KEYWORDS: &str = include_str!("../resources/unexpected_keywords.json");

/// Minimum trimmed length of a line that may be a title.
pub const MIN_CHARS: usize = 6;
/// Maximum number of words kept in a sanitized title.
pub const MAX_WORDS: usize = 20;
/// Minimum length of the longest word of a valid title.
pub const MIN_LONGEST_WORD: usize = 4;
/// Pages walked before giving up on finding text.
pub const MAX_PAGES: usize = 3;

/// Thresholds and denylist driving the title heuristics.
///
/// Every field has a default, so a partial JSON document deserializes into a
/// complete configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TitleConfig {
    pub min_chars: usize,
    pub max_words: usize,
    pub min_longest_word: usize,
    /// The walk stops once more than this many pages were processed.
    pub max_pages: usize,
    /// Try the document's metadata title before the layout heuristics.
    pub use_metadata: bool,
    /// Substrings that disqualify a line (matched case-insensitively).
    pub keywords: Vec<String>,
}

impl Default for TitleConfig {
    fn default() -> Self {
        TitleConfig {
            min_chars: MIN_CHARS,
            max_words: MAX_WORDS,
            min_longest_word: MIN_LONGEST_WORD,
            max_pages: MAX_PAGES,
            use_metadata: false,
            keywords: parse_keywords(DEFAULT_KEYWORDS).unwrap_or_default(),
        }
    }
}

impl TitleConfig {
    /// Replace the denylist with the keywords of a JSON document.
    pub fn with_keywords_json(mut self, json: &str) -> Result<Self, TitleError> {
        self.keywords = parse_keywords(json)?;
        Ok(self)
    }
}

/// Parse a denylist document.
///
/// Accepts either a JSON array of strings or a JSON object whose keys are the
/// keywords. Keywords are lowercased and NFC-normalized; blank ones are
/// dropped.
pub fn parse_keywords(json: &str) -> Result<Vec<String>, TitleError> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum KeywordDocument {
        List(Vec<String>),
        Map(serde_json::Map<String, serde_json::Value>),
    }

    let document: KeywordDocument =
        serde_json::from_str(json).map_err(|e| TitleError::Config(e.to_string()))?;

    let raw: Vec<String> = match document {
        KeywordDocument::List(list) => list,
        KeywordDocument::Map(map) => map.into_iter().map(|(k, _)| k).collect(),
    };

    Ok(raw
        .iter()
        .map(|k| normalize_keyword(k))
        .filter(|k| !k.is_empty())
        .collect())
}

/// Lowercase and NFC-normalize a string for denylist matching.
pub fn normalize_keyword(text: &str) -> String {
    text.trim().to_lowercase().nfc().collect()
}
