//! Converter output consumed by the pipeline.
//!
//! The document-conversion step (PDF/Office to markdown) is external. This
//! module only describes the shape of what it hands over: the full text, an
//! optional list of pages with their table records, and file metadata.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A converted document as produced by the conversion collaborator.
///
/// # Examples
///
/// ```rust
/// use hierarchical_chunker::document::{ConvertedDocument, DocumentLayout};
///
/// let doc = ConvertedDocument::from_markdown("# Notes\n\nSome text.", "notes.md", "md");
/// assert!(matches!(doc.layout(), DocumentLayout::Unstructured(_)));
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ConvertedDocument {
    /// Full markdown text of the document.
    #[serde(default)]
    pub content: String,

    pub metadata: DocumentMetadata,

    /// Per-page records, empty when the converter produced no page structure.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pages: Vec<PageRecord>,
}

/// Source file information carried into every chunk.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub file_name: String,

    /// Extension or MIME-like tag, e.g. `pdf`, `xlsx`.
    #[serde(default)]
    pub file_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_pages: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub converter_used: Option<String>,
}

/// One page (or sheet/section) of converter output.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PageRecord {
    /// 1-based page number as reported by the converter.
    pub page_number: usize,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default)]
    pub content: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tables: Vec<TableRecord>,
}

/// A table the converter located on a page.
///
/// Line numbers are 0-based and inclusive, relative to the page content.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TableRecord {
    pub table_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default)]
    pub content: String,

    #[serde(default)]
    pub row_count: usize,

    #[serde(default)]
    pub column_count: usize,

    pub start_line: usize,
    pub end_line: usize,
}

/// The two shapes converter output comes in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DocumentLayout<'a> {
    /// One record per page, in converter order.
    Paged(&'a [PageRecord]),
    /// A single text blob with no page attribution.
    Unstructured(&'a str),
}

impl ConvertedDocument {
    /// Build a pageless document from markdown text.
    pub fn from_markdown(
        content: impl Into<String>,
        file_name: impl Into<String>,
        file_type: impl Into<String>,
    ) -> Self {
        Self {
            content: content.into(),
            metadata: DocumentMetadata {
                file_name: file_name.into(),
                file_type: file_type.into(),
                ..Default::default()
            },
            pages: Vec::new(),
        }
    }

    /// Parse converter output serialized as JSON.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Paged when some page has text. Pages that are all blank fall back to
    /// the full text.
    pub fn layout(&self) -> DocumentLayout<'_> {
        if self.pages.iter().all(|p| p.content.trim().is_empty()) {
            DocumentLayout::Unstructured(&self.content)
        } else {
            DocumentLayout::Paged(&self.pages)
        }
    }

    /// True when either the full text or some page has non-whitespace text.
    pub fn has_content(&self) -> bool {
        !self.content.trim().is_empty() || self.pages.iter().any(|p| !p.content.trim().is_empty())
    }
}
