//! lopdf-backed layout analysis for title inference.
//!
//! Pages are turned into the [`pdftitle_core::layout::Page`] model lazily,
//! one at a time, so the engine's early stop skips analysis of later pages.

use log::debug;
use pdftitle_core::layout::Page;
use pdftitle_core::{Inference, TitleEngine};
use thiserror::Error;

use parser::backend::{LopdfBackend, PageId, PdfBackend};

pub mod parser;
pub mod types;

#[cfg(test)]
pub(crate) mod fixtures;

pub use types::*;

#[derive(Debug, Error)]
pub enum PdfError {
    #[error("PDF parsing error: {0}")]
    Parse(String),
    #[error("Document is encrypted")]
    Encrypted,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// A loaded PDF document whose pages can be laid out on demand.
pub struct LayoutDocument {
    backend: LopdfBackend,
}

impl LayoutDocument {
    /// Parse PDF bytes. Encrypted documents are rejected.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PdfError> {
        let backend = LopdfBackend::load_bytes(bytes)?;
        Ok(LayoutDocument { backend })
    }

    /// Get document metadata.
    pub fn metadata(&self) -> DocumentMetadata {
        extract_metadata(&self.backend)
    }

    /// Iterate over laid-out pages in document order.
    pub fn pages(&self) -> LayoutPages<'_> {
        LayoutPages {
            backend: &self.backend,
            ids: self.backend.pages().into_values().collect::<Vec<_>>().into_iter(),
        }
    }
}

/// Lazy iterator over the pages of a [`LayoutDocument`].
pub struct LayoutPages<'a> {
    backend: &'a dyn PdfBackend,
    ids: std::vec::IntoIter<PageId>,
}

impl Iterator for LayoutPages<'_> {
    type Item = Result<Page, PdfError>;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.ids.next()?;
        Some(parser::layout::layout_page(self.backend, id))
    }
}

// ---------------------------------------------------------------------------
// Convenience free functions (stateless, re-parse each call)
// ---------------------------------------------------------------------------

/// Get document metadata without laying out any page.
pub fn info(bytes: &[u8]) -> Result<DocumentMetadata, PdfError> {
    let backend = LopdfBackend::load_bytes(bytes)?;
    Ok(extract_metadata(&backend))
}

/// Infer the title of a PDF held in memory.
///
/// Unreadable documents still get a title (the file stem); the parse error
/// is returned alongside it.
pub fn infer_title(bytes: &[u8], file_stem: &str, engine: &TitleEngine) -> Inference<PdfError> {
    let document = match LayoutDocument::from_bytes(bytes) {
        Ok(document) => document,
        Err(e) => {
            debug!("{file_stem}: cannot load document: {e}");
            return engine.infer(
                None,
                Err::<std::iter::Empty<Result<Page, PdfError>>, _>(e),
                file_stem,
            );
        }
    };

    let metadata = document.metadata();
    debug!(
        "{file_stem}: {} pages, metadata title {:?}",
        metadata.page_count, metadata.title
    );
    engine.infer(metadata.title.as_deref(), Ok(document.pages()), file_stem)
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn extract_metadata(backend: &LopdfBackend) -> DocumentMetadata {
    let raw = backend.metadata();
    DocumentMetadata {
        title: raw.get("Title").cloned(),
        author: raw.get("Author").cloned(),
        page_count: backend.page_count(),
        creator: raw.get("Creator").cloned(),
    }
}
