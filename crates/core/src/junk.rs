//! Classification of lines that can never be a title.

use std::sync::OnceLock;

use regex::Regex;
use unicode_normalization::UnicodeNormalization;

use crate::config::TitleConfig;

/// Lines made only of numbers, `(cid:N)` placeholders, or a lone stop-word.
fn no_words_pattern() -> &'static Regex {
    static RE_NO_WORDS: OnceLock<Regex> = OnceLock::new();
    RE_NO_WORDS.get_or_init(|| {
        Regex::new(r"^[0-9 \t-]+$|^(\(cid:[0-9 \t-]*\))+|^(abstract|unknown|title|untitled):?$")
            .unwrap()
    })
}

/// Report numbers, venues and download banners.
fn boilerplate_pattern() -> &'static Regex {
    static RE_BOILERPLATE: OnceLock<Regex> = OnceLock::new();
    RE_BOILERPLATE.get_or_init(|| {
        Regex::new(
            r"technical\s+report|proceedings|preprint|to\s+appear|submission|(integrated|international).*conference|transactions\s+on|symposium\s+on|downloaded\s+from\s+http",
        )
        .unwrap()
    })
}

/// Why a line was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JunkReason {
    TooShort,
    NoWords,
    Boilerplate,
    Denylisted,
}

/// Classify a line, returning the first rule it breaks.
pub fn classify(line: &str, config: &TitleConfig) -> Option<JunkReason> {
    let trimmed = line.trim();
    if trimmed.chars().count() < config.min_chars {
        return Some(JunkReason::TooShort);
    }

    if no_words_pattern().is_match(&trimmed.to_lowercase()) {
        return Some(JunkReason::NoWords);
    }

    let lower = line.to_lowercase();
    if boilerplate_pattern().is_match(&lower) {
        return Some(JunkReason::Boilerplate);
    }

    let normalized: String = lower.nfc().collect();
    if config
        .keywords
        .iter()
        .any(|keyword| normalized.contains(keyword.as_str()))
    {
        return Some(JunkReason::Denylisted);
    }

    None
}

/// Judge whether a line is inappropriate for a title.
pub fn is_junk(line: &str, config: &TitleConfig) -> bool {
    classify(line, config).is_some()
}
