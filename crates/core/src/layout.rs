//! Layout model consumed by the title heuristics.
//!
//! The model mirrors what a layout-analysis pass produces for one page: a
//! flat list of top-level [`LayoutNode`]s, each of which may nest text lines
//! and characters. Producers (such as the `pdf` crate) build these values;
//! the engine only reads them.

use serde::{Deserialize, Serialize};

/// A single rendered character.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Glyph {
    /// Decoded text of the glyph (usually one character).
    pub text: String,
    /// Typographic font size.
    pub size: f64,
    /// Left edge in page coordinates.
    pub x0: f64,
    /// Right edge in page coordinates.
    pub x1: f64,
}

impl Glyph {
    pub fn new(text: impl Into<String>, size: f64, x0: f64, x1: f64) -> Self {
        Glyph {
            text: text.into(),
            size,
            x0,
            x1,
        }
    }
}

/// A text box or text line: nested children plus the coalesced text the
/// layout pass computed for them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextContainer {
    pub text: String,
    pub children: Vec<LayoutNode>,
}

impl TextContainer {
    pub fn new(text: impl Into<String>, children: Vec<LayoutNode>) -> Self {
        TextContainer {
            text: text.into(),
            children,
        }
    }
}

/// A positioned element of a parsed page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LayoutNode {
    /// Characters with no line or word grouping (e.g. a form XObject).
    Figure(Vec<LayoutNode>),
    TextBox(TextContainer),
    TextLine(TextContainer),
    Character(Glyph),
    /// Images, paths and anything else without text.
    Other,
}

impl LayoutNode {
    /// Build a text line from glyphs, with `text` as its coalesced string.
    pub fn line(text: impl Into<String>, glyphs: Vec<Glyph>) -> Self {
        LayoutNode::TextLine(TextContainer::new(
            text,
            glyphs.into_iter().map(LayoutNode::Character).collect(),
        ))
    }

    /// Build a text box whose coalesced text is the concatenation of its
    /// lines.
    pub fn text_box(lines: Vec<LayoutNode>) -> Self {
        let text = lines.iter().map(LayoutNode::text).collect::<String>();
        LayoutNode::TextBox(TextContainer::new(text, lines))
    }

    /// Build a figure from ungrouped glyphs.
    pub fn figure(glyphs: Vec<Glyph>) -> Self {
        LayoutNode::Figure(glyphs.into_iter().map(LayoutNode::Character).collect())
    }

    /// Coalesced text of the node.
    pub fn text(&self) -> String {
        match self {
            LayoutNode::Figure(children) => children.iter().map(LayoutNode::text).collect(),
            LayoutNode::TextBox(container) | LayoutNode::TextLine(container) => {
                container.text.clone()
            }
            LayoutNode::Character(glyph) => glyph.text.clone(),
            LayoutNode::Other => String::new(),
        }
    }
}

/// The top-level nodes of one page, in reading order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub nodes: Vec<LayoutNode>,
}

impl Page {
    pub fn new(nodes: Vec<LayoutNode>) -> Self {
        Page { nodes }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_box_concatenates_lines() {
        let node = LayoutNode::text_box(vec![
            LayoutNode::line("Deep\n", vec![Glyph::new("D", 20.0, 0.0, 10.0)]),
            LayoutNode::line("Learning\n", vec![Glyph::new("L", 20.0, 0.0, 10.0)]),
        ]);
        assert_eq!(node.text(), "Deep\nLearning\n");
    }

    #[test]
    fn test_figure_text_is_raw_glyphs() {
        let node = LayoutNode::figure(vec![
            Glyph::new("a", 10.0, 0.0, 5.0),
            Glyph::new("b", 10.0, 5.0, 10.0),
        ]);
        assert_eq!(node.text(), "ab");
    }

    #[test]
    fn test_other_has_no_text() {
        assert_eq!(LayoutNode::Other.text(), "");
    }
}
