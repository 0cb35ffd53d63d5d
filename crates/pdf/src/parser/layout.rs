//! Line grouping, block assembly, and conversion to the layout model.
//!
//! This module turns the glyphs extracted by [`super::content`] into the
//! [`Page`] model the title heuristics read. Every public function apart
//! from [`layout_page`] is a pure transformation.
//!
//! # Pipeline
//!
//! ```text
//! PositionedGlyph[]  ->  TextLine[]  ->  TextBlock[]  ->  Page
//!                        group_glyphs    group_lines      build_page
//! ```

use std::collections::HashMap;

use log::debug;
use pdftitle_core::layout::{Glyph, LayoutNode, Page};

use super::backend::{PageId, PdfBackend};
use super::content::{extract_page_content, PageContent, PageObject, PositionedGlyph};
use crate::PdfError;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// A horizontal run of glyphs sharing (approximately) one baseline.
#[derive(Debug, Clone, Default)]
pub struct TextLine {
    pub glyphs: Vec<PositionedGlyph>,
    /// Glyph text with inferred word spaces, without a trailing newline.
    pub text: String,
    pub y: f32,
    pub x0: f32,
    pub x1: f32,
    pub font_size: f32,
}

/// A vertical group of consecutive, aligned [`TextLine`]s.
#[derive(Debug, Clone, Default)]
pub struct TextBlock {
    pub lines: Vec<TextLine>,
}

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Two glyphs whose baselines differ by less than this are treated as
/// belonging to the same line.
const Y_TOLERANCE: f32 = 1.0;

/// A horizontal gap wider than this fraction of the font size is a word
/// break.
const WORD_GAP_RATIO: f32 = 0.1;

/// A horizontal gap wider than this multiple of the font size splits a line
/// in two (e.g. columns).
const LINE_SPLIT_RATIO: f32 = 1.5;

/// When grouping lines into blocks, a vertical gap larger than this multiple
/// of the line's font size starts a new block.
const BLOCK_GAP_FACTOR: f32 = 1.4;

/// Lines whose font sizes differ by more than this never share a block.
const FONT_SIZE_BUCKET: f32 = 0.5;

// ---------------------------------------------------------------------------
// CJK / spaceless-script helper
// ---------------------------------------------------------------------------

/// Returns `true` if `c` belongs to a script that does not use inter-word
/// spaces (CJK Unified Ideographs, Hiragana, Katakana, Hangul, Thai, etc.).
pub fn is_spaceless_script_char(c: char) -> bool {
    let cp = c as u32;
    matches!(
        cp,
        // CJK Unified Ideographs
        0x4E00..=0x9FFF
        // CJK Unified Ideographs Extension A
        | 0x3400..=0x4DBF
        // CJK Unified Ideographs Extension B
        | 0x20000..=0x2A6DF
        // CJK Compatibility Ideographs
        | 0xF900..=0xFAFF
        // Hiragana
        | 0x3040..=0x309F
        // Katakana
        | 0x30A0..=0x30FF
        // Hangul Syllables
        | 0xAC00..=0xD7AF
        // Hangul Jamo
        | 0x1100..=0x11FF
        // CJK Symbols and Punctuation
        | 0x3000..=0x303F
        // Fullwidth Forms
        | 0xFF00..=0xFFEF
        // Thai
        | 0x0E00..=0x0E7F
        // Lao
        | 0x0E80..=0x0EFF
        // Myanmar
        | 0x1000..=0x109F
        // Khmer
        | 0x1780..=0x17FF
    )
}

/// Whether a space belongs between two adjacent glyphs separated by `gap`.
fn needs_space(prev: &PositionedGlyph, next: &PositionedGlyph, gap: f32) -> bool {
    let size = prev.size.max(next.size);
    if gap <= size * WORD_GAP_RATIO {
        return false;
    }
    let last = prev.text.chars().next_back();
    let first = next.text.chars().next();
    match (last, first) {
        (Some(l), Some(f)) => {
            !l.is_whitespace()
                && !f.is_whitespace()
                && !(is_spaceless_script_char(l) && is_spaceless_script_char(f))
        }
        _ => false,
    }
}

// ---------------------------------------------------------------------------
// Public API: glyph -> line grouping
// ---------------------------------------------------------------------------

/// Group glyphs into [`TextLine`]s.
///
/// Glyphs whose baselines are within [`Y_TOLERANCE`] points of each other
/// share a row. Rows are ordered top of page first; within a row glyphs are
/// sorted left-to-right and split wherever the gap exceeds
/// [`LINE_SPLIT_RATIO`] times the font size.
pub fn group_glyphs_into_lines(mut glyphs: Vec<PositionedGlyph>) -> Vec<TextLine> {
    if glyphs.is_empty() {
        return Vec::new();
    }

    // Sort by Y descending (top of page first), then X ascending.
    glyphs.sort_by(|a, b| b.y.total_cmp(&a.y).then(a.x0.total_cmp(&b.x0)));

    let mut lines: Vec<TextLine> = Vec::new();
    let mut row: Vec<PositionedGlyph> = Vec::new();
    let mut row_y = glyphs[0].y;

    for glyph in glyphs {
        if (glyph.y - row_y).abs() > Y_TOLERANCE {
            lines.extend(split_row(std::mem::take(&mut row)));
            row_y = glyph.y;
        }
        row.push(glyph);
    }
    lines.extend(split_row(row));

    lines
}

/// Split one row of glyphs at wide gaps and assemble each piece.
fn split_row(mut row: Vec<PositionedGlyph>) -> Vec<TextLine> {
    row.sort_by(|a, b| a.x0.total_cmp(&b.x0));

    let mut lines = Vec::new();
    let mut current: Vec<PositionedGlyph> = Vec::new();

    for glyph in row {
        if let Some(prev) = current.last() {
            let gap = glyph.x0 - prev.x1;
            if gap > prev.size.max(glyph.size) * LINE_SPLIT_RATIO {
                lines.push(assemble_line(std::mem::take(&mut current)));
            }
        }
        current.push(glyph);
    }
    if !current.is_empty() {
        lines.push(assemble_line(current));
    }

    lines
}

/// Build a [`TextLine`] from left-to-right glyphs, inserting inter-word
/// spaces at visible gaps.
fn assemble_line(glyphs: Vec<PositionedGlyph>) -> TextLine {
    let mut text = String::new();
    for (i, glyph) in glyphs.iter().enumerate() {
        if let Some(prev) = i.checked_sub(1).map(|p| &glyphs[p]) {
            if needs_space(prev, glyph, glyph.x0 - prev.x1) {
                text.push(' ');
            }
        }
        text.push_str(&glyph.text);
    }

    TextLine {
        y: glyphs.first().map(|g| g.y).unwrap_or(0.0),
        x0: glyphs.iter().map(|g| g.x0).fold(f32::INFINITY, f32::min),
        x1: glyphs.iter().map(|g| g.x1).fold(f32::NEG_INFINITY, f32::max),
        font_size: dominant_font_size(&glyphs),
        text,
        glyphs,
    }
}

/// Returns the font size shared by the most glyphs.
fn dominant_font_size(glyphs: &[PositionedGlyph]) -> f32 {
    let mut counts: HashMap<i32, usize> = HashMap::new();
    for g in glyphs {
        let key = (g.size * 100.0).round() as i32;
        *counts.entry(key).or_insert(0) += 1;
    }
    counts
        .into_iter()
        .max_by_key(|&(k, c)| (c, k))
        .map(|(k, _)| k as f32 / 100.0)
        .unwrap_or(0.0)
}

// ---------------------------------------------------------------------------
// Public API: line -> block grouping
// ---------------------------------------------------------------------------

/// Whether `line` continues the block whose last line is `last`.
fn continues_block(last: &TextLine, line: &TextLine) -> bool {
    let gap = last.y - line.y;
    let threshold = last.font_size.max(line.font_size) * BLOCK_GAP_FACTOR;
    let overlaps = line.x0 < last.x1 && line.x1 > last.x0;
    let same_size = (last.font_size - line.font_size).abs() <= FONT_SIZE_BUCKET;
    gap > 0.0 && gap <= threshold && overlaps && same_size
}

/// Group lines (top-down order) into [`TextBlock`]s.
///
/// A line joins the most recent block whose last line sits directly above
/// it: within [`BLOCK_GAP_FACTOR`] times the font size, horizontally
/// overlapping and at the same font size. Otherwise it starts a new block.
/// Blocks keep the order in which they were started.
pub fn group_lines_into_blocks(lines: Vec<TextLine>) -> Vec<TextBlock> {
    let mut blocks: Vec<TextBlock> = Vec::new();

    for line in lines {
        let open = blocks
            .iter_mut()
            .rev()
            .find(|b| b.lines.last().is_some_and(|last| continues_block(last, &line)));
        match open {
            Some(block) => block.lines.push(line),
            None => blocks.push(TextBlock { lines: vec![line] }),
        }
    }

    blocks
}

// ---------------------------------------------------------------------------
// Public API: conversion to the layout model
// ---------------------------------------------------------------------------

fn to_glyph(g: &PositionedGlyph) -> Glyph {
    Glyph::new(g.text.clone(), g.size as f64, g.x0 as f64, g.x1 as f64)
}

fn line_node(line: &TextLine) -> LayoutNode {
    LayoutNode::line(
        format!("{}\n", line.text),
        line.glyphs.iter().map(to_glyph).collect(),
    )
}

/// Assemble a [`Page`]: text boxes top-down, then figures and images in
/// stream order.
pub fn build_page(content: PageContent) -> Page {
    let lines = group_glyphs_into_lines(content.glyphs);
    let blocks = group_lines_into_blocks(lines);

    let mut nodes: Vec<LayoutNode> = blocks
        .iter()
        .map(|block| LayoutNode::text_box(block.lines.iter().map(line_node).collect()))
        .collect();

    nodes.extend(content.objects.iter().map(|object| match object {
        PageObject::Figure(glyphs) => LayoutNode::figure(glyphs.iter().map(to_glyph).collect()),
        PageObject::Image => LayoutNode::Other,
    }));

    Page::new(nodes)
}

/// Extract and lay out one page.
pub fn layout_page(backend: &dyn PdfBackend, page_id: PageId) -> Result<Page, PdfError> {
    let content = extract_page_content(backend, page_id)?;
    debug!(
        "page {:?}: {} glyphs, {} objects",
        page_id,
        content.glyphs.len(),
        content.objects.len()
    );
    Ok(build_page(content))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
