// src/metadata.rs

use serde::{Deserialize, Serialize};

use crate::analysis::{
    DefectReport, GroupingAnalysis, PageCoverage, SizeDistribution, TableHandlingStats,
};

/// A table block inside a [`ContentUnit`] that must never be split.
///
/// Line numbers are 0-based and inclusive, relative to the unit text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSpan {
    pub id: String,
    pub start_line: usize,
    pub end_line: usize,
    /// Header plus data rows for pipe tables, `<tr>` rows for HTML tables.
    pub row_count: usize,
    pub column_count: usize,
    /// The converter could not linearise the table (row/column spans) and
    /// left it as an opaque block that is preserved verbatim.
    pub is_complex: bool,
}

impl TableSpan {
    pub fn contains_line(&self, line: usize) -> bool {
        (self.start_line..=self.end_line).contains(&line)
    }

    pub fn line_count(&self) -> usize {
        self.end_line - self.start_line + 1
    }
}

/// The atomic input to splitting: one page, or the whole document when the
/// converter produced no page structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentUnit {
    pub text: String,
    /// Page number, `None` when the document has no page attribution.
    pub unit_index: Option<usize>,
    pub title: Option<String>,
    /// Sorted by `start_line`, never overlapping.
    pub tables: Vec<TableSpan>,
}

impl ContentUnit {
    pub fn table_at_line(&self, line: usize) -> Option<&TableSpan> {
        self.tables.iter().find(|t| t.contains_line(line))
    }
}

/// Per-chunk provenance handed to retrieval and export collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub file_name: String,
    pub file_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_title: Option<String>,
}

/// A coarse, context-preserving segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParentChunk {
    /// Sequential id, equal to this chunk's position in
    /// [`HierarchicalResult::parent_chunks`].
    pub id: usize,
    pub unit_index: Option<usize>,
    /// Header texts from the outermost to the innermost level.
    pub header_path: Vec<String>,
    pub content: String,
    /// Character length of `content`.
    pub size: usize,
    /// Length of the prefix of `content` repeated from the previous parent.
    pub overlap_chars: usize,
    pub contains_table: bool,
    /// Ids of the tables inside `content`, in document order.
    pub source_table_ids: Vec<String>,
    /// Larger than `parent_chunk_size` because of an atomic table.
    pub oversized: bool,
    pub metadata: ChunkMetadata,
}

/// A fine-grained segment sized for embedding, linked to one parent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChildChunk {
    /// Sequential id, equal to this chunk's position in
    /// [`HierarchicalResult::child_chunks`].
    pub id: usize,
    pub parent_id: usize,
    pub index_within_parent: usize,
    pub content: String,
    pub size: usize,
    pub overlap_chars: usize,
    pub is_table: bool,
    /// A table child larger than `child_chunk_size`, kept whole.
    pub oversized: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table_id: Option<String>,
    pub header_path: Vec<String>,
    pub unit_index: Option<usize>,
    pub metadata: ChunkMetadata,
}

impl ParentChunk {
    /// Header path rendered for display, e.g. `Intro > Scope`.
    pub fn header_context(&self) -> String {
        self.header_path.join(" > ")
    }
}

impl ChildChunk {
    pub fn header_context(&self) -> String {
        self.header_path.join(" > ")
    }

    pub fn is_oversized_table(&self) -> bool {
        self.is_table && self.oversized
    }
}

/// Everything produced for one document.
///
/// Both chunk sequences are in document order (unit order, then split order
/// within the unit).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HierarchicalResult {
    pub file_name: String,
    pub parent_chunks: Vec<ParentChunk>,
    pub child_chunks: Vec<ChildChunk>,
    pub grouping_analysis: GroupingAnalysis,
    pub size_distribution: SizeDistribution,
    pub table_handling_stats: TableHandlingStats,
    /// Only present for documents with page structure.
    pub page_coverage: Option<PageCoverage>,
    pub defects: DefectReport,
}

impl HierarchicalResult {
    pub fn parent(&self, id: usize) -> Option<&ParentChunk> {
        self.parent_chunks.get(id).filter(|p| p.id == id)
    }

    pub fn child(&self, id: usize) -> Option<&ChildChunk> {
        self.child_chunks.get(id).filter(|c| c.id == id)
    }

    pub fn parent_of(&self, child: &ChildChunk) -> Option<&ParentChunk> {
        self.parent(child.parent_id)
    }

    pub fn children_of(&self, parent_id: usize) -> impl Iterator<Item = &ChildChunk> + '_ {
        self.child_chunks
            .iter()
            .filter(move |c| c.parent_id == parent_id)
    }
}
