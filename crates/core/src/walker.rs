//! Walking the pages of a document.

use log::debug;

use crate::config::TitleConfig;
use crate::figure::extract_figure_text;
use crate::largest::{LargestTextTracker, TitleCandidate};
use crate::layout::{LayoutNode, Page};

/// Everything the walk collected from a document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentWalk {
    /// Plain text accumulated from every processed node.
    pub text: String,
    /// One candidate per processed top-level node.
    pub candidates: Vec<TitleCandidate>,
    /// The largest candidate when the walk ended.
    pub largest: TitleCandidate,
    /// Number of pages processed.
    pub pages: usize,
}

/// Process the top-level nodes of one page.
pub fn walk_page(page: &Page, tracker: &mut LargestTextTracker, text: &mut String) {
    for node in &page.nodes {
        match node {
            LayoutNode::Figure(children) => {
                let figure = extract_figure_text(children, tracker);
                text.push_str(&figure.text);
                tracker.record();
            }
            LayoutNode::TextBox(container) | LayoutNode::TextLine(container) => {
                tracker.track_text(container);
                text.push_str(&container.text);
                text.push('\n');
                tracker.record();
            }
            LayoutNode::Character(_) | LayoutNode::Other => {}
        }
    }
}

/// Whether the walk has seen enough after `pages` pages.
///
/// The walk stops as soon as any letter was extracted, or once more than
/// `max_pages` pages were processed.
pub fn should_stop(text: &str, pages: usize, config: &TitleConfig) -> bool {
    text.trim().chars().any(char::is_alphabetic) || pages > config.max_pages
}

/// Walk pages in order until the early-stop rule fires.
///
/// Pages are pulled lazily, so nothing past the stopping page is analyzed.
/// The first page that fails to lay out aborts the walk.
pub fn walk_pages<I, E>(pages: I, config: &TitleConfig) -> Result<DocumentWalk, E>
where
    I: IntoIterator<Item = Result<Page, E>>,
{
    let mut tracker = LargestTextTracker::new();
    let mut text = String::new();
    let mut processed = 0;

    for page in pages {
        let page = page?;
        walk_page(&page, &mut tracker, &mut text);
        processed += 1;
        debug!(
            "page {processed}: {} nodes, largest so far {:?}",
            page.nodes.len(),
            tracker.current()
        );

        if should_stop(&text, processed, config) {
            debug!("stopping after page {processed}");
            break;
        }
    }

    Ok(DocumentWalk {
        text,
        candidates: tracker.candidates(),
        largest: tracker.current().clone(),
        pages: processed,
    })
}
