//! Tracking of the largest-font text span of a document.

use serde::{Deserialize, Serialize};

use crate::layout::{LayoutNode, TextContainer};

/// The text span currently believed to carry the largest font.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TitleCandidate {
    pub contents: String,
    pub size: f64,
}

/// What a merge did to a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Merge {
    Unchanged,
    /// A strictly larger size replaced the previous contents.
    Replaced,
    /// A same-size line was appended (titles may span several lines).
    Appended,
}

/// Round a font size to two decimal digits.
pub fn round_size(size: f64) -> f64 {
    (size * 100.0).round() / 100.0
}

impl TitleCandidate {
    pub fn new(contents: impl Into<String>, size: f64) -> Self {
        TitleCandidate {
            contents: contents.into(),
            size,
        }
    }

    /// Merge a `(line, size)` pair into the candidate.
    pub fn merge(&mut self, line: &str, size: f64) -> Merge {
        let line: String = line.chars().filter(|c| !matches!(c, '\r' | '\n')).collect();
        let size = round_size(size);

        if line.trim().is_empty() {
            Merge::Unchanged
        } else if size > self.size {
            self.contents = line;
            self.size = size;
            Merge::Replaced
        } else if size == self.size && !self.contents.contains(&line) {
            self.contents.push_str(&line);
            Merge::Appended
        } else {
            Merge::Unchanged
        }
    }
}

/// Running largest-text state for one document.
///
/// Every replacement starts a new generation; snapshots recorded with
/// [`LargestTextTracker::record`] point at a generation rather than copying
/// it, so a heading that keeps growing in later layout nodes is seen whole by
/// every snapshot taken while it was the largest span.
#[derive(Debug, Clone)]
pub struct LargestTextTracker {
    generations: Vec<TitleCandidate>,
    snapshots: Vec<usize>,
}

impl Default for LargestTextTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl LargestTextTracker {
    pub fn new() -> Self {
        LargestTextTracker {
            generations: vec![TitleCandidate::default()],
            snapshots: Vec::new(),
        }
    }

    /// The current largest candidate.
    pub fn current(&self) -> &TitleCandidate {
        // The generation list is never empty.
        &self.generations[self.generations.len() - 1]
    }

    /// Apply the merge rule with a line and the size it was rendered at.
    pub fn update(&mut self, line: &str, size: f64) -> Merge {
        let mut next = self.current().clone();
        let outcome = next.merge(line, size);
        match outcome {
            Merge::Replaced => self.generations.push(next),
            Merge::Appended => {
                let last = self.generations.len() - 1;
                self.generations[last] = next;
            }
            Merge::Unchanged => {}
        }
        outcome
    }

    /// Append a snapshot of the current candidate to the candidate list.
    pub fn record(&mut self) {
        self.snapshots.push(self.generations.len() - 1);
    }

    /// The recorded candidate list, in recording order.
    pub fn candidates(&self) -> Vec<TitleCandidate> {
        self.snapshots
            .iter()
            .map(|&generation| self.generations[generation].clone())
            .collect()
    }

    /// Feed the lines of a text box or text line into the tracker.
    ///
    /// Each nested text line contributes its coalesced text at the size of
    /// its first character. A container holding characters directly
    /// contributes its own text at the size of its first character.
    pub fn track_text(&mut self, container: &TextContainer) {
        for child in &container.children {
            match child {
                LayoutNode::TextLine(line) => {
                    if let Some(size) = first_glyph_size(&line.children) {
                        self.update(&line.text, size);
                    }
                }
                LayoutNode::TextBox(inner) => self.track_text(inner),
                LayoutNode::Character(glyph) => {
                    self.update(&container.text, glyph.size);
                    break;
                }
                LayoutNode::Figure(_) | LayoutNode::Other => {}
            }
        }
    }
}

fn first_glyph_size(children: &[LayoutNode]) -> Option<f64> {
    children.iter().find_map(|node| match node {
        LayoutNode::Character(glyph) => Some(glyph.size),
        _ => None,
    })
}
