use serde::{Deserialize, Serialize};

/// Document information dictionary entries plus the page count.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct DocumentMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub page_count: usize,
    pub creator: Option<String>,
}
