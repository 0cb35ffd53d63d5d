//! Text reconstruction for figures.
//!
//! A figure carries its characters without any line or word grouping, and
//! spaces are usually not rendered as glyphs at all. Lines are detected by
//! font-size changes; spaces by the horizontal distance between consecutive
//! glyphs relative to a running estimate of the intra-word gap.
//!
//! NOTE: a word starting with a lowercase letter right after another word
//! cannot be told apart from the current word when the gap is small.

use log::trace;

use crate::largest::LargestTextTracker;
use crate::layout::LayoutNode;
use crate::sanitize::to_ascii_approximation;

/// Smallest intra-word distance the estimate may shrink to.
const MIN_CHAR_DISTANCE: f64 = 0.1;
/// A gap below this multiple of the estimate is still inside a word.
const CALIBRATION_FACTOR: f64 = 2.5;
/// A gap above this multiple of the estimate is a space.
const SPACE_FACTOR: f64 = 8.5;

/// Where the reconstruction stands inside the current line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParsingState {
    /// No reference position recorded yet.
    InitX,
    /// Reference position known, distance estimate not calibrated.
    InitD,
    /// Calibrated; gaps are classified.
    InsideWord,
}

/// Result of reconstructing one figure.
#[derive(Debug, Clone, PartialEq)]
pub struct FigureText {
    /// Every line completed by a font-size change, each followed by `\n`.
    pub text: String,
    /// The line in progress when the figure ended, with its size.
    ///
    /// It is not part of `text` and was never merged into the largest-text
    /// candidate.
    pub trailing_line: String,
    pub trailing_size: f64,
}

/// Reconstruct the text of a figure's characters, merging every completed
/// line into `tracker`.
pub fn extract_figure_text(children: &[LayoutNode], tracker: &mut LargestTextTracker) -> FigureText {
    let mut text = String::new();
    let mut line = String::new();
    let mut size = 0.0;
    let mut char_distance: f64 = 0.0;
    let mut char_previous_x1 = 0.0;
    let mut state = ParsingState::InitX;

    for child in children {
        let LayoutNode::Character(glyph) = child else {
            continue;
        };

        trace!(
            "char: {} {}",
            glyph.size,
            to_ascii_approximation(&glyph.text)
        );

        if glyph.size != size {
            trace!("new line");
            tracker.update(&line, size);
            text.push_str(&line);
            text.push('\n');
            line = glyph.text.clone();
            size = glyph.size;
            char_previous_x1 = glyph.x1;
            state = ParsingState::InitD;
            continue;
        }

        let char_current_distance = (glyph.x0 - char_previous_x1).abs();
        trace!(
            "char_current_distance: {char_current_distance} char_distance: {char_distance} state: {state:?}"
        );

        match state {
            ParsingState::InitX => {
                char_previous_x1 = glyph.x1;
                state = ParsingState::InitD;
            }
            ParsingState::InitD => {
                // Only adopt a gap that does not look like a space.
                if char_distance > 0.0 && char_current_distance < char_distance * CALIBRATION_FACTOR
                {
                    char_distance = char_current_distance;
                }
                char_distance = char_distance.max(MIN_CHAR_DISTANCE);
                state = ParsingState::InsideWord;
            }
            ParsingState::InsideWord => {}
        }

        match state {
            ParsingState::InsideWord if glyph.x1 < char_previous_x1 => {
                trace!("x-position decreased");
                line.push(' ');
                char_previous_x1 = glyph.x1;
                state = ParsingState::InitD;
            }
            ParsingState::InsideWord if char_current_distance > char_distance * SPACE_FACTOR => {
                trace!("space detected");
                line.push(' ');
                char_previous_x1 = glyph.x1;
            }
            ParsingState::InsideWord
                if char_current_distance > char_distance
                    && char_current_distance < char_distance * CALIBRATION_FACTOR =>
            {
                char_distance = char_current_distance;
                char_previous_x1 = glyph.x1;
            }
            ParsingState::InitX | ParsingState::InitD | ParsingState::InsideWord => {
                char_previous_x1 = glyph.x1;
            }
        }

        line.push_str(&glyph.text);
    }

    FigureText {
        text,
        trailing_line: line,
        trailing_size: size,
    }
}
