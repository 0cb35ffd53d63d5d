//! Picking a title out of a document walk.

use crate::config::TitleConfig;
use crate::junk::is_junk;
use crate::walker::DocumentWalk;

/// Length in characters of the longest whitespace-delimited word.
pub fn max_word_length(text: &str) -> usize {
    text.split_whitespace()
        .map(|word| word.chars().count())
        .max()
        .unwrap_or(0)
}

/// The extension a path-style split would find in `text`.
///
/// Looks at the last `/`-separated component; leading dots do not start an
/// extension. Returns the extension including its dot, or `""`.
pub fn path_extension(text: &str) -> &str {
    let name = text.rsplit('/').next().unwrap_or(text);
    let stem_start = name.len() - name.trim_start_matches('.').len();
    match name[stem_start..].rfind('.') {
        Some(dot) => &name[stem_start + dot..],
        None => "",
    }
}

/// Whether `title` is acceptable as a document title.
pub fn is_valid_title(title: &str, config: &TitleConfig) -> bool {
    !title.trim().is_empty()
        && max_word_length(title) >= config.min_longest_word
        && !is_junk(title, config)
        && path_extension(title).trim().is_empty()
}

/// Index of the first line that is neither blank nor junk, or 0.
pub fn title_start(lines: &[&str], config: &TitleConfig) -> usize {
    lines
        .iter()
        .position(|line| !line.trim().is_empty() && !is_junk(line, config))
        .unwrap_or(0)
}

/// End (exclusive) of a title paragraph starting at `start`.
///
/// The first blank line within the next `max_lines` lines ends the
/// paragraph; without one the title is the single line at `start`.
pub fn title_end(lines: &[&str], start: usize, max_lines: usize) -> usize {
    lines
        .iter()
        .enumerate()
        .skip(start + 1)
        .take(max_lines)
        .find(|(_, line)| line.trim().is_empty())
        .map(|(i, _)| i)
        .unwrap_or(start + 1)
}

/// Paragraph heuristic over plain text: the first real line, extended to a
/// following blank line when one is close.
pub fn paragraph_title(text: &str, config: &TitleConfig) -> String {
    let lines: Vec<&str> = text.trim().split('\n').collect();
    let start = title_start(&lines, config);
    let end = title_end(&lines, start, 2).min(lines.len());
    lines[start..end]
        .iter()
        .map(|line| line.trim())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Choose a title from a walk.
///
/// Candidates are tried largest size first (ties keep their recorded
/// order); the paragraph heuristic is used when none is valid. Periods are
/// removed from the result since they conflict with extension splitting.
pub fn select_title(walk: &DocumentWalk, config: &TitleConfig) -> String {
    let mut ranked: Vec<_> = walk.candidates.iter().collect();
    ranked.sort_by(|a, b| b.size.total_cmp(&a.size));

    let title = match ranked
        .into_iter()
        .find(|candidate| is_valid_title(&candidate.contents, config))
    {
        Some(candidate) => candidate.contents.trim().to_string(),
        None => paragraph_title(&walk.text, config),
    };

    title.replace('.', "")
}
