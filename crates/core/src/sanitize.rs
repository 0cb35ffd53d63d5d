//! Turning an accepted title into a display and file-name friendly string.

use encoding_rs::WINDOWS_1252;
use log::warn;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::TitleError;

/// Rounds of mojibake repair before giving up on reaching a fixed point.
const MAX_REPAIR_ROUNDS: usize = 4;

/// Collapse whitespace runs into single spaces and keep at most `max_words`
/// words.
pub fn limit_words(text: &str, max_words: usize) -> String {
    text.split_whitespace()
        .take(max_words)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Re-encode a title as NFC UTF-8, composing letters with diacritics.
///
/// A title still carrying U+FFFD was already damaged when it was decoded and
/// is reported as a decode error.
pub fn reencode_utf8(text: &str) -> Result<String, TitleError> {
    if text.contains('\u{FFFD}') {
        return Err(TitleError::Decode(text.to_string()));
    }
    Ok(text.nfc().collect())
}

/// Undo one layer of UTF-8 text that was decoded as Windows-1252/Latin-1.
fn repair_once(text: &str) -> Option<String> {
    if text.is_ascii() {
        return None;
    }

    let (bytes, _, had_unmappable) = WINDOWS_1252.encode(text);
    if had_unmappable {
        return None;
    }

    match std::str::from_utf8(&bytes) {
        Ok(repaired) if repaired != text => Some(repaired.to_string()),
        _ => None,
    }
}

/// Best-effort repair of mis-decoded text.
///
/// Text that was UTF-8 but got decoded as Windows-1252 (`CafÃ©`) is turned
/// back into what was meant (`Café`), layer by layer. Anything that cannot be
/// improved is returned unchanged (NFC-normalized).
pub fn repair_mojibake(text: &str) -> String {
    let mut current: String = text.nfc().collect();
    for _ in 0..MAX_REPAIR_ROUNDS {
        match repair_once(&current) {
            Some(repaired) => current = repaired.nfc().collect(),
            None => break,
        }
    }
    current
}

/// Rough ASCII rendition of a string, for diagnostics.
pub fn to_ascii_approximation(text: &str) -> String {
    text.chars()
        .flat_map(|c| match c {
            'đ' => "d".chars().collect::<Vec<_>>(),
            'Đ' => "D".chars().collect(),
            'ß' => "ss".chars().collect(),
            'æ' => "ae".chars().collect(),
            'Æ' => "AE".chars().collect(),
            'ø' => "o".chars().collect(),
            'Ø' => "O".chars().collect(),
            c => c.nfkd().filter(|d| !is_combining_mark(*d)).collect(),
        })
        .map(|c| if c.is_ascii() { c } else { '?' })
        .collect()
}

/// Turn a title into a safe display string.
///
/// Whitespace is collapsed and the title capped at `max_words` words; it is
/// NFC re-encoded (a decode failure is logged and the title kept as is);
/// colons become ` -`; mojibake is repaired. Repair and collapsing alternate
/// until the title stops changing, so sanitizing twice is a no-op.
pub fn sanitize_title(raw: &str, max_words: usize) -> String {
    let limited = limit_words(raw, max_words);

    let encoded = match reencode_utf8(&limited) {
        Ok(encoded) => encoded,
        Err(e) => {
            warn!("Skipping invalid title decoding: {e}");
            limited
        }
    };

    let separated = encoded.replace(':', " -");

    // A repaired layer can decode to a wide space that blocks the next layer
    // until it is collapsed. Every change shortens the title.
    let mut title = limit_words(&separated, max_words);
    for _ in 0..=title.len() {
        let next = limit_words(&repair_mojibake(&title), max_words);
        if next == title {
            break;
        }
        title = next;
    }
    title
}
