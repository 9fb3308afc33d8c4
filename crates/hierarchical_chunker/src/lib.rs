// src/lib.rs
//! # Hierarchical Chunker
//!
//! Splits converted documents (PDF/Office output rendered as markdown, with
//! optional page structure) into a two-level hierarchy for retrieval:
//! coarse parent chunks that keep context, and small child chunks sized for
//! embedding and rerank models.
//!
//! ## Features
//!
//! - **Header-aware parents**: sections follow `#`..`####` headings and carry
//!   their header path
//! - **Atomic tables**: a table is never cut, even when it is larger than the
//!   target size; such chunks are flagged instead
//! - **Page provenance**: every chunk keeps its page number, chunks are never
//!   merged across pages
//! - **Short-segment repair**: bare headings are folded into the following chunk
//! - **Statistics**: grouping integrity, size distribution, table handling and
//!   a defect report come with every result
//!
//! ## Quick Start
//!
//! ```rust
//! use hierarchical_chunker::HierarchicalChunker;
//!
//! let chunker = HierarchicalChunker::default();
//! let result = chunker
//!     .chunk_markdown("# Introduction\n\nThis is a test document.", "intro.md")
//!     .unwrap();
//!
//! for child in &result.child_chunks {
//!     let parent = result.parent_of(child).unwrap();
//!     println!("{} -> parent {} ({})", child.id, parent.id, parent.header_context());
//! }
//! ```
//!
//! ## Custom sizes
//!
//! ```rust
//! use hierarchical_chunker::HierarchicalChunker;
//!
//! let chunker = HierarchicalChunker::builder()
//!     .parent_chunk_size(1500)
//!     .child_chunk_size(300)
//!     .child_chunk_overlap(30)
//!     .build()
//!     .unwrap();
//!
//! let result = chunker.chunk_markdown("# My Document\n\nContent here.", "doc.md").unwrap();
//! assert_eq!(result.parent_chunks.len(), 1);
//! ```

pub mod analysis;
pub mod assembler;
pub mod chunker;
pub mod config;
pub mod document;
pub mod error;
pub mod metadata;
pub mod normalize;
pub mod overlap;
pub mod segmentation;
pub mod table;

pub use config::ChunkerConfig;
pub use document::{ConvertedDocument, DocumentLayout, DocumentMetadata, PageRecord, TableRecord};
pub use error::{ChunkerError, Result};
pub use metadata::{ChildChunk, ChunkMetadata, ContentUnit, HierarchicalResult, ParentChunk, TableSpan};

use analysis::{analyze, page_coverage, DefectReport, UndersizedChunk};
use assembler::{assemble, AssembledDocument};
use chunker::hierarchy::{HeaderAwareSplitter, SectionText};
use chunker::merge::{merge_short_segments, Mergeable};
use chunker::recursive::ChildSplitter;
use overlap::byte_offset;

/// Chunking pipeline for one configuration.
///
/// The configuration is validated once at construction; a built chunker can
/// be shared across threads and used for any number of documents.
#[derive(Debug, Clone)]
pub struct HierarchicalChunker {
    config: ChunkerConfig,
}

impl Default for HierarchicalChunker {
    /// A chunker with [`ChunkerConfig::default`].
    fn default() -> Self {
        Self {
            config: ChunkerConfig::default(),
        }
    }
}

impl HierarchicalChunker {
    /// Create a chunker, rejecting configurations the pipeline cannot run with.
    pub fn new(config: ChunkerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Create a builder for custom configuration.
    ///
    /// # Example
    ///
    /// ```rust
    /// use hierarchical_chunker::HierarchicalChunker;
    ///
    /// let chunker = HierarchicalChunker::builder()
    ///     .keep_tables_together(true)
    ///     .minimum_viable_length(20)
    ///     .build()
    ///     .unwrap();
    /// assert_eq!(chunker.config().minimum_viable_length, 20);
    /// ```
    pub fn builder() -> HierarchicalChunkerBuilder {
        HierarchicalChunkerBuilder::new()
    }

    pub fn config(&self) -> &ChunkerConfig {
        &self.config
    }

    /// Chunk markdown text that has no page structure.
    pub fn chunk_markdown(&self, text: &str, file_name: &str) -> Result<HierarchicalResult> {
        let file_type = std::path::Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("md");
        self.chunk_document(&ConvertedDocument::from_markdown(text, file_name, file_type))
    }

    /// Run the whole pipeline on one document.
    ///
    /// Fails only when the document has no text at all. Everything noticed
    /// while splitting is reported on the result.
    pub fn chunk_document(&self, document: &ConvertedDocument) -> Result<HierarchicalResult> {
        let file_name = document.metadata.file_name.clone();
        if !document.has_content() {
            return Err(ChunkerError::EmptyDocument(file_name));
        }

        let assembled = assemble(document, self.config.normalize_output);
        let mut defects = DefectReport {
            page_defects: assembled.page_defects.clone(),
            malformed_tables: assembled.malformed_tables.clone(),
            ..Default::default()
        };

        let drafts = self.build_parents(document, &assembled, &mut defects);
        let child_chunks = self.build_children(&assembled, &drafts, &mut defects);
        let parent_chunks: Vec<ParentChunk> = drafts.into_iter().map(|d| d.chunk).collect();

        let analysis = analyze(&parent_chunks, &child_chunks);
        defects.unresolved_parent_refs = analysis.unresolved_parent_refs;
        defects.unit_mismatches = analysis.unit_mismatches;

        let coverage = assembled.is_paged().then(|| {
            let pages: Vec<usize> = assembled.units.iter().filter_map(|u| u.unit_index).collect();
            page_coverage(&pages, &parent_chunks)
        });

        tracing::info!(
            file = %file_name,
            parents = parent_chunks.len(),
            children = child_chunks.len(),
            tables = analysis.tables.table_children,
            "chunked document"
        );

        Ok(HierarchicalResult {
            file_name,
            parent_chunks,
            child_chunks,
            grouping_analysis: analysis.grouping,
            size_distribution: analysis.sizes,
            table_handling_stats: analysis.tables,
            page_coverage: coverage,
            defects,
        })
    }

    fn build_parents(
        &self,
        document: &ConvertedDocument,
        assembled: &AssembledDocument,
        defects: &mut DefectReport,
    ) -> Vec<ParentDraft> {
        let splitter = HeaderAwareSplitter::new(&self.config);
        let mut parents = Vec::new();

        for unit in &assembled.units {
            let metadata = ChunkMetadata {
                file_name: document.metadata.file_name.clone(),
                file_type: document.metadata.file_type.clone(),
                source: document.metadata.file_path.clone(),
                unit_title: unit.title.clone(),
            };

            for segment in splitter.split(unit) {
                let chunk = ParentChunk {
                    id: parents.len(),
                    unit_index: unit.unit_index,
                    header_path: segment.header_path,
                    size: segment.content.chars().count(),
                    content: segment.content,
                    overlap_chars: segment.overlap_chars,
                    contains_table: !segment.table_ids.is_empty(),
                    source_table_ids: segment.table_ids,
                    oversized: false,
                    metadata: metadata.clone(),
                };
                parents.push(ParentDraft {
                    chunk,
                    sections: segment.sections,
                });
            }
        }

        let outcome = merge_short_segments(
            parents,
            self.config.minimum_viable_length,
            self.config.parent_chunk_size + self.config.parent_chunk_overlap,
        );
        let mut parents = outcome.chunks;
        for (id, draft) in parents.iter_mut().enumerate() {
            let parent = &mut draft.chunk;
            parent.id = id;
            parent.oversized = parent.contains_table && parent.size > self.config.parent_chunk_size;
        }

        for &position in &outcome.undersized {
            let parent = &parents[position].chunk;
            tracing::warn!(
                id = parent.id,
                unit = ?parent.unit_index,
                size = parent.size,
                "undersized parent chunk left unmerged"
            );
            defects.undersized_parents.push(UndersizedChunk {
                chunk_id: parent.id,
                unit_index: parent.unit_index,
                size: parent.size,
            });
        }

        tracing::debug!(parents = parents.len(), "built parent chunks");
        parents
    }

    fn build_children(
        &self,
        assembled: &AssembledDocument,
        parents: &[ParentDraft],
        defects: &mut DefectReport,
    ) -> Vec<ChildChunk> {
        let splitter = ChildSplitter::new(&self.config);
        let mut children = Vec::new();

        for draft in parents {
            let parent = &draft.chunk;
            // Each heading section is split on its own.
            for section in &draft.sections {
                for piece in splitter.split(&section.text) {
                    let table_id = if piece.is_table {
                        let id = table_id_for(assembled, parent, &piece.content);
                        if id.is_none() {
                            tracing::warn!(parent = parent.id, "table child without a known table id");
                        }
                        id
                    } else {
                        None
                    };
                    let size = piece.content.chars().count();
                    children.push(ChildChunk {
                        id: children.len(),
                        parent_id: parent.id,
                        index_within_parent: 0,
                        size,
                        content: piece.content,
                        overlap_chars: piece.overlap_chars,
                        is_table: piece.is_table,
                        oversized: piece.is_table && size > self.config.child_chunk_size,
                        table_id,
                        header_path: section.header_path.clone(),
                        unit_index: parent.unit_index,
                        metadata: parent.metadata.clone(),
                    });
                }
            }
        }

        let outcome = merge_short_segments(
            children,
            self.config.minimum_viable_length,
            self.config.child_chunk_size + self.config.child_chunk_overlap,
        );
        let mut children = outcome.chunks;
        let mut previous_parent = None;
        let mut index_within_parent = 0;
        for (id, child) in children.iter_mut().enumerate() {
            child.id = id;
            if previous_parent != Some(child.parent_id) {
                index_within_parent = 0;
                previous_parent = Some(child.parent_id);
            }
            child.index_within_parent = index_within_parent;
            index_within_parent += 1;
        }

        for &position in &outcome.undersized {
            let child = &children[position];
            tracing::warn!(
                id = child.id,
                parent = child.parent_id,
                size = child.size,
                "undersized child chunk left unmerged"
            );
            defects.undersized_children.push(UndersizedChunk {
                chunk_id: child.id,
                unit_index: child.unit_index,
                size: child.size,
            });
        }

        tracing::debug!(children = children.len(), "built child chunks");
        children
    }
}

/// A parent before its children are cut, with the heading sections its
/// content is made of.
#[derive(Debug)]
struct ParentDraft {
    chunk: ParentChunk,
    sections: Vec<SectionText>,
}

impl Mergeable for ParentDraft {
    fn content(&self) -> &str {
        self.chunk.content()
    }

    fn overlap_chars(&self) -> usize {
        self.chunk.overlap_chars()
    }

    fn is_atomic(&self) -> bool {
        self.chunk.is_atomic()
    }

    fn same_group(&self, next: &Self) -> bool {
        self.chunk.same_group(&next.chunk)
    }

    fn absorb(&mut self, merged_content: String, mut next: Self) {
        // The overlap prefix sits at the start of the first section.
        if let Some(first) = next.sections.first_mut() {
            let start = byte_offset(&first.text, next.chunk.overlap_chars);
            first.text = first.text[start..].trim_start().to_string();
        }
        self.sections
            .extend(next.sections.into_iter().filter(|s| !s.text.is_empty()));
        self.chunk.absorb(merged_content, next.chunk);
    }
}

/// Id of the parent's table whose text is exactly `content`.
fn table_id_for(assembled: &AssembledDocument, parent: &ParentChunk, content: &str) -> Option<String> {
    assembled
        .units
        .iter()
        .filter(|u| u.unit_index == parent.unit_index)
        .flat_map(|u| u.tables.iter().map(move |t| (u, t)))
        .filter(|(_, t)| parent.source_table_ids.contains(&t.id))
        .find(|(u, t)| AssembledDocument::table_text(u, t).trim() == content)
        .map(|(_, t)| t.id.clone())
}

/// Builder for configuring a [`HierarchicalChunker`].
#[derive(Debug, Clone, Default)]
pub struct HierarchicalChunkerBuilder {
    config: ChunkerConfig,
}

impl HierarchicalChunkerBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing configuration, e.g. one loaded from a file.
    pub fn from_config(config: ChunkerConfig) -> Self {
        Self { config }
    }

    /// Target parent size in characters.
    ///
    /// Default: 2000
    pub fn parent_chunk_size(mut self, size: usize) -> Self {
        self.config.parent_chunk_size = size;
        self
    }

    /// Default: 200
    pub fn parent_chunk_overlap(mut self, overlap: usize) -> Self {
        self.config.parent_chunk_overlap = overlap;
        self
    }

    /// Target child size in characters.
    ///
    /// Default: 350
    pub fn child_chunk_size(mut self, size: usize) -> Self {
        self.config.child_chunk_size = size;
        self
    }

    /// Default: 50
    pub fn child_chunk_overlap(mut self, overlap: usize) -> Self {
        self.config.child_chunk_overlap = overlap;
        self
    }

    /// Keep every table in one chunk at both levels.
    ///
    /// Default: true
    pub fn keep_tables_together(mut self, keep: bool) -> Self {
        self.config.keep_tables_together = keep;
        self
    }

    /// Default: true
    pub fn normalize_output(mut self, normalize: bool) -> Self {
        self.config.normalize_output = normalize;
        self
    }

    /// Chunks shorter than this are merged into their successor.
    ///
    /// Default: 30
    pub fn minimum_viable_length(mut self, length: usize) -> Self {
        self.config.minimum_viable_length = length;
        self
    }

    /// Build the chunker, validating the configuration.
    pub fn build(self) -> Result<HierarchicalChunker> {
        HierarchicalChunker::new(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_validates() {
        assert!(HierarchicalChunker::builder().build().is_ok());
        assert!(matches!(
            HierarchicalChunker::builder().parent_chunk_size(0).build(),
            Err(ChunkerError::InvalidConfig(_))
        ));
        assert!(matches!(
            HierarchicalChunker::builder()
                .child_chunk_size(100)
                .child_chunk_overlap(150)
                .build(),
            Err(ChunkerError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_empty_document_rejected() {
        let chunker = HierarchicalChunker::default();
        let err = chunker.chunk_markdown("  \n\n ", "blank.md").unwrap_err();
        assert!(matches!(err, ChunkerError::EmptyDocument(name) if name == "blank.md"));
    }

    #[test]
    fn test_blank_pages_chunk_full_text() {
        let doc = ConvertedDocument {
            content: "# Memo\n\nThe converter lost the page text but kept this copy.".to_string(),
            pages: vec![
                PageRecord {
                    page_number: 1,
                    content: " \n".to_string(),
                    ..Default::default()
                },
                PageRecord {
                    page_number: 2,
                    ..Default::default()
                },
            ],
            ..Default::default()
        };
        let result = HierarchicalChunker::default().chunk_document(&doc).unwrap();
        assert_eq!(result.parent_chunks.len(), 1);
        assert_eq!(result.parent_chunks[0].unit_index, None);
        assert!(result.parent_chunks[0].content.contains("kept this copy"));
        assert!(!result.child_chunks.is_empty());
        assert!(result.page_coverage.is_none());
    }

    #[test]
    fn test_merged_draft_drops_overlap_from_sections() {
        fn draft(content: &str, overlap_chars: usize, path: &str) -> ParentDraft {
            ParentDraft {
                chunk: ParentChunk {
                    id: 0,
                    unit_index: Some(1),
                    header_path: vec![path.to_string()],
                    content: content.to_string(),
                    size: content.chars().count(),
                    overlap_chars,
                    contains_table: false,
                    source_table_ids: Vec::new(),
                    oversized: false,
                    metadata: ChunkMetadata::default(),
                },
                sections: vec![SectionText {
                    header_path: vec![path.to_string()],
                    text: content.to_string(),
                }],
            }
        }

        let drafts = vec![
            draft("## Short", 0, "Short"),
            draft("tail\n\nfresh text", 4, "Next"),
        ];
        let outcome = merge_short_segments(drafts, 50, 200);
        assert_eq!(outcome.chunks.len(), 1);

        let merged = &outcome.chunks[0];
        assert_eq!(merged.chunk.content, "## Short\n\nfresh text");
        assert_eq!(merged.chunk.header_path, vec!["Short".to_string()]);
        let texts: Vec<&str> = merged.sections.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(texts, vec!["## Short", "fresh text"]);
        assert_eq!(merged.sections[1].header_path, vec!["Next".to_string()]);
    }

    #[test]
    fn test_ids_are_positions() {
        let text = format!("# One\n\n{}\n\n# Two\n\n{}", "alpha ".repeat(400), "beta ".repeat(400));
        let result = HierarchicalChunker::default().chunk_markdown(&text, "doc.md").unwrap();

        for (i, parent) in result.parent_chunks.iter().enumerate() {
            assert_eq!(parent.id, i);
        }
        for (i, child) in result.child_chunks.iter().enumerate() {
            assert_eq!(child.id, i);
            assert!(result.parent(child.parent_id).is_some());
        }
    }

    #[test]
    fn test_index_within_parent_restarts() {
        let text = format!("# One\n\n{}\n\n# Two\n\n{}", "alpha ".repeat(300), "beta ".repeat(300));
        let result = HierarchicalChunker::default().chunk_markdown(&text, "doc.md").unwrap();
        assert!(result.parent_chunks.len() >= 2);

        for parent in &result.parent_chunks {
            let indices: Vec<usize> = result
                .children_of(parent.id)
                .map(|c| c.index_within_parent)
                .collect();
            assert_eq!(indices, (0..indices.len()).collect::<Vec<_>>());
        }
    }

    #[test]
    fn test_metadata_carried_to_chunks() {
        let doc = ConvertedDocument {
            metadata: DocumentMetadata {
                file_name: "report.pdf".to_string(),
                file_type: "pdf".to_string(),
                file_path: Some("/data/report.pdf".to_string()),
                ..Default::default()
            },
            pages: vec![PageRecord {
                page_number: 1,
                title: Some("Summary".to_string()),
                content: "# Summary\n\nQuarterly numbers went up across all regions.".to_string(),
                tables: vec![],
            }],
            ..Default::default()
        };
        let result = HierarchicalChunker::default().chunk_document(&doc).unwrap();
        let child = &result.child_chunks[0];
        assert_eq!(child.metadata.file_name, "report.pdf");
        assert_eq!(child.metadata.source.as_deref(), Some("/data/report.pdf"));
        assert_eq!(child.metadata.unit_title.as_deref(), Some("Summary"));
        assert_eq!(child.unit_index, Some(1));
        assert_eq!(child.header_path, vec!["Summary".to_string()]);
    }
}
