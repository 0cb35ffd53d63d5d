//! Core library for pdftitle
//!
//! This crate implements the **Functional Core** of the pdftitle application,
//! following the Functional Core - Imperative Shell architectural pattern.
//!
//! # Architecture Overview
//!
//! - **`pdftitle_core`** (this crate): title heuristics over a layout model, with zero I/O
//! - **`pdf`**: lopdf-backed layout analysis producing that model
//! - **`pdftitle`**: file handling, renaming and the command line (the Imperative Shell)
//!
//! # Module Organization
//!
//! - [`layout`]: the page / node / glyph model the heuristics read
//! - [`junk`]: lines that can never be a title
//! - [`figure`]: line and space reconstruction for ungrouped glyphs
//! - [`largest`]: the largest-font candidate and its merge rule
//! - [`walker`]: page iteration with early stop
//! - [`select`]: candidate ranking, validation and the paragraph fallback
//! - [`sanitize`]: display-string cleanup
//! - [`config`]: thresholds and denylist
//!
//! # Example Usage
//!
//! ```rust,ignore
//! use pdftitle_core::{layout::{Glyph, LayoutNode, Page}, TitleEngine};
//!
//! let engine = TitleEngine::default();
//! let page = Page::new(vec![LayoutNode::text_box(vec![LayoutNode::line(
//!     "Attention Is All You Need\n",
//!     vec![Glyph::new("A", 17.2, 72.0, 80.0)],
//! )])]);
//!
//! let title = engine.layout_title(vec![Ok::<_, std::convert::Infallible>(page)]).unwrap();
//! assert_eq!(title, "Attention Is All You Need");
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod config;
pub mod figure;
pub mod junk;
pub mod largest;
pub mod layout;
pub mod sanitize;
pub mod select;
pub mod walker;

pub use config::TitleConfig;
pub use largest::TitleCandidate;
pub use walker::DocumentWalk;

/// Title used when even the file name has nothing to offer.
pub const UNTITLED: &str = "untitled";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TitleError {
    #[error("invalid title decoding: {0:?}")]
    Decode(String),
    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Which strategy produced a title.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TitleSource {
    Metadata,
    Layout,
    FileName,
}

/// Outcome of inferring a document's title.
///
/// `title` is never empty. `unreadable` holds the layout error when the
/// document could not be analyzed at all.
#[derive(Debug)]
pub struct Inference<E> {
    pub title: String,
    pub source: TitleSource,
    pub unreadable: Option<E>,
}

/// The title heuristics bound to one configuration.
///
/// The engine holds no per-document state and can be shared across threads.
#[derive(Debug, Clone, Default)]
pub struct TitleEngine {
    config: TitleConfig,
}

impl TitleEngine {
    pub fn new(config: TitleConfig) -> Self {
        TitleEngine { config }
    }

    pub fn config(&self) -> &TitleConfig {
        &self.config
    }

    pub fn is_junk(&self, line: &str) -> bool {
        junk::is_junk(line, &self.config)
    }

    pub fn is_valid_title(&self, title: &str) -> bool {
        select::is_valid_title(title, &self.config)
    }

    /// Walk pages until the early-stop rule fires.
    pub fn walk<I, E>(&self, pages: I) -> Result<DocumentWalk, E>
    where
        I: IntoIterator<Item = Result<layout::Page, E>>,
    {
        walker::walk_pages(pages, &self.config)
    }

    pub fn select_title(&self, walk: &DocumentWalk) -> String {
        select::select_title(walk, &self.config)
    }

    /// Title from the page layout alone (possibly invalid or empty).
    pub fn layout_title<I, E>(&self, pages: I) -> Result<String, E>
    where
        I: IntoIterator<Item = Result<layout::Page, E>>,
    {
        let walk = self.walk(pages)?;
        Ok(self.select_title(&walk))
    }

    /// Run the strategies in order: metadata (when enabled), layout, and the
    /// file name stem as the last resort.
    pub fn infer<I, E>(
        &self,
        metadata_title: Option<&str>,
        pages: Result<I, E>,
        file_stem: &str,
    ) -> Inference<E>
    where
        I: IntoIterator<Item = Result<layout::Page, E>>,
    {
        if self.config.use_metadata {
            if let Some(title) = metadata_title.filter(|t| self.is_valid_title(t)) {
                return Inference {
                    title: title.trim().to_string(),
                    source: TitleSource::Metadata,
                    unreadable: None,
                };
            }
        }

        let unreadable = match pages.and_then(|pages| self.layout_title(pages)) {
            Ok(title) if self.is_valid_title(&title) => {
                return Inference {
                    title,
                    source: TitleSource::Layout,
                    unreadable: None,
                };
            }
            Ok(_) => None,
            Err(e) => Some(e),
        };

        let stem = file_stem.trim();
        Inference {
            title: if stem.is_empty() { UNTITLED } else { stem }.to_string(),
            source: TitleSource::FileName,
            unreadable,
        }
    }

    pub fn sanitize_title(&self, raw: &str) -> String {
        sanitize::sanitize_title(raw, self.config.max_words)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{Glyph, LayoutNode, Page};

    fn title_page(title: &str, size: f64) -> Page {
        Page::new(vec![
            LayoutNode::text_box(vec![LayoutNode::line(
                format!("{title}\n"),
                vec![Glyph::new("x", size, 0.0, 5.0)],
            )]),
            LayoutNode::text_box(vec![LayoutNode::line(
                "Body text of the paper\n",
                vec![Glyph::new("B", 10.0, 0.0, 5.0)],
            )]),
        ])
    }

    fn pages(list: Vec<Page>) -> Result<Vec<Result<Page, String>>, String> {
        Ok(list.into_iter().map(Ok).collect())
    }

    #[test]
    fn test_infer_from_layout() {
        let engine = TitleEngine::default();
        let inference = engine.infer(
            None,
            pages(vec![title_page("Graph Neural Networks", 20.0)]),
            "file",
        );
        assert_eq!(inference.title, "Graph Neural Networks");
        assert_eq!(inference.source, TitleSource::Layout);
        assert!(inference.unreadable.is_none());
    }

    #[test]
    fn test_infer_metadata_disabled_by_default() {
        let engine = TitleEngine::default();
        let inference = engine.infer(
            Some("Metadata Title Wins"),
            pages(vec![title_page("Layout Title Wins", 20.0)]),
            "file",
        );
        assert_eq!(inference.source, TitleSource::Layout);
    }

    #[test]
    fn test_infer_metadata_when_enabled() {
        let engine = TitleEngine::new(TitleConfig {
            use_metadata: true,
            ..TitleConfig::default()
        });
        let inference = engine.infer(
            Some("Metadata Title Wins"),
            pages(vec![title_page("Layout Title Wins", 20.0)]),
            "file",
        );
        assert_eq!(inference.title, "Metadata Title Wins");
        assert_eq!(inference.source, TitleSource::Metadata);

        // Invalid metadata falls through to the layout.
        let inference = engine.infer(
            Some("untitled"),
            pages(vec![title_page("Layout Title Wins", 20.0)]),
            "file",
        );
        assert_eq!(inference.source, TitleSource::Layout);
    }

    #[test]
    fn test_infer_unreadable_document_uses_stem() {
        let engine = TitleEngine::default();
        let inference = engine.infer(
            None,
            Err::<Vec<Result<Page, String>>, _>("not a pdf".to_string()),
            "scan_0042",
        );
        assert_eq!(inference.title, "scan_0042");
        assert_eq!(inference.source, TitleSource::FileName);
        assert_eq!(inference.unreadable.as_deref(), Some("not a pdf"));
    }

    #[test]
    fn test_infer_failing_page_uses_stem() {
        let engine = TitleEngine::default();
        let inference = engine.infer(
            None,
            Ok::<_, String>(vec![Err("bad content stream".to_string())]),
            "report",
        );
        assert_eq!(inference.title, "report");
        assert!(inference.unreadable.is_some());
    }

    #[test]
    fn test_infer_no_text_uses_stem() {
        let engine = TitleEngine::default();
        let inference = engine.infer(None, pages(vec![Page::default()]), "empty-doc");
        assert_eq!(inference.title, "empty-doc");
        assert_eq!(inference.source, TitleSource::FileName);
        assert!(inference.unreadable.is_none());
    }

    #[test]
    fn test_infer_never_returns_empty() {
        let engine = TitleEngine::default();
        let inference = engine.infer(None, pages(vec![]), "  ");
        assert_eq!(inference.title, UNTITLED);
    }

    #[test]
    fn test_validator_word_length_property() {
        let engine = TitleEngine::default();
        assert!(engine.is_valid_title("Word list here"));
        assert!(!engine.is_valid_title("Wor lis her"));
    }

    #[test]
    fn test_denylist_from_config() {
        let config = TitleConfig::default()
            .with_keywords_json(r#"["Confidential Draft"]"#)
            .unwrap();
        let engine = TitleEngine::new(config);
        assert!(engine.is_junk("this is a CONFIDENTIAL DRAFT of the report"));
        assert!(!engine.is_valid_title("Confidential Draft Version"));
    }

    #[test]
    fn test_engine_sanitize_uses_max_words() {
        let engine = TitleEngine::new(TitleConfig {
            max_words: 3,
            ..TitleConfig::default()
        });
        assert_eq!(engine.sanitize_title("a b: c d e"), "a b -");
    }
}
