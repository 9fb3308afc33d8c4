//! Error types for the chunking pipeline.
//!
//! Only problems detected before the first stage runs are errors. Anything a
//! stage finds while splitting (gaps in page numbering, malformed tables,
//! undersized chunks) is recorded on the [`HierarchicalResult`] instead.
//!
//! [`HierarchicalResult`]: crate::metadata::HierarchicalResult

use thiserror::Error;

/// Errors that reject a configuration or a document before splitting begins.
///
/// # Examples
///
/// ```rust
/// use hierarchical_chunker::{ChunkerError, HierarchicalChunker};
///
/// let err = HierarchicalChunker::builder()
///     .child_chunk_size(0)
///     .build()
///     .unwrap_err();
///
/// assert!(matches!(err, ChunkerError::InvalidConfig(_)));
/// ```
#[derive(Error, Debug)]
pub enum ChunkerError {
    /// A size is zero or an overlap is not smaller than its chunk size.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The document has no text, neither in its full content nor in any page.
    #[error("Document has no content: {0}")]
    EmptyDocument(String),

    /// Converter output could not be parsed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for chunking operations.
pub type Result<T> = std::result::Result<T, ChunkerError>;
