// src/chunker/merge.rs

use crate::metadata::{ChildChunk, ParentChunk};
use crate::overlap::byte_offset;

use super::char_len;

/// Joins a merged chunk to the body of the chunk it absorbed.
const MERGE_JOINER: &str = "\n\n";

/// A chunk the short-segment merger can fold into its predecessor.
pub trait Mergeable: Sized {
    fn content(&self) -> &str;

    /// Length of the prefix repeated from the previous chunk.
    fn overlap_chars(&self) -> usize;

    /// Atomic chunks (tables) are never undersized and never absorbed.
    fn is_atomic(&self) -> bool;

    /// Whether `next` may be merged into `self`, e.g. both from one page.
    fn same_group(&self, next: &Self) -> bool;

    /// Take over `next`. `merged_content` already holds both texts.
    fn absorb(&mut self, merged_content: String, next: Self);
}

#[derive(Debug)]
pub struct MergeOutcome<T> {
    pub chunks: Vec<T>,
    /// Positions in `chunks` that are still undersized.
    pub undersized: Vec<usize>,
}

/// Merge chunks shorter than `min_len` into the chunk that follows them.
///
/// A merge only happens inside one group, never absorbs an atomic chunk and
/// never produces more than `max_len` characters. The absorbed chunk loses its
/// overlap prefix, which repeats text the merged chunk already holds. Merges
/// chain while the result is still undersized.
pub fn merge_short_segments<T: Mergeable>(
    chunks: Vec<T>,
    min_len: usize,
    max_len: usize,
) -> MergeOutcome<T> {
    let mut merged: Vec<T> = Vec::with_capacity(chunks.len());
    let mut undersized = Vec::new();
    let mut iter = chunks.into_iter().peekable();

    while let Some(mut current) = iter.next() {
        while is_undersized(&current, min_len) {
            let Some(next) = iter.next_if(|next| {
                current.same_group(next)
                    && !next.is_atomic()
                    && merged_len(&current, next) <= max_len
            }) else {
                break;
            };
            let content = format!("{}{}{}", current.content(), MERGE_JOINER, body(&next));
            current.absorb(content, next);
        }

        if is_undersized(&current, min_len) {
            undersized.push(merged.len());
        }
        merged.push(current);
    }

    MergeOutcome {
        chunks: merged,
        undersized,
    }
}

fn is_undersized<T: Mergeable>(chunk: &T, min_len: usize) -> bool {
    !chunk.is_atomic() && char_len(chunk.content().trim()) < min_len
}

/// Content of `chunk` without its overlap prefix.
fn body<T: Mergeable>(chunk: &T) -> &str {
    let content = chunk.content();
    content[byte_offset(content, chunk.overlap_chars())..].trim_start()
}

fn merged_len<T: Mergeable>(current: &T, next: &T) -> usize {
    char_len(current.content()) + char_len(MERGE_JOINER) + char_len(body(next))
}

impl Mergeable for ParentChunk {
    fn content(&self) -> &str {
        &self.content
    }

    fn overlap_chars(&self) -> usize {
        self.overlap_chars
    }

    fn is_atomic(&self) -> bool {
        false
    }

    fn same_group(&self, next: &Self) -> bool {
        self.unit_index == next.unit_index
    }

    fn absorb(&mut self, merged_content: String, next: Self) {
        self.size = char_len(&merged_content);
        self.content = merged_content;
        self.contains_table |= next.contains_table;
        for id in next.source_table_ids {
            if !self.source_table_ids.contains(&id) {
                self.source_table_ids.push(id);
            }
        }
    }
}

impl Mergeable for ChildChunk {
    fn content(&self) -> &str {
        &self.content
    }

    fn overlap_chars(&self) -> usize {
        self.overlap_chars
    }

    fn is_atomic(&self) -> bool {
        self.is_table
    }

    fn same_group(&self, next: &Self) -> bool {
        self.parent_id == next.parent_id && self.unit_index == next.unit_index
    }

    fn absorb(&mut self, merged_content: String, _next: Self) {
        self.size = char_len(&merged_content);
        self.content = merged_content;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::ChunkMetadata;

    fn parent(unit_index: Option<usize>, content: &str) -> ParentChunk {
        ParentChunk {
            id: 0,
            unit_index,
            header_path: vec![],
            content: content.to_string(),
            size: content.chars().count(),
            overlap_chars: 0,
            contains_table: false,
            source_table_ids: vec![],
            oversized: false,
            metadata: ChunkMetadata::default(),
        }
    }

    fn child(parent_id: usize, content: &str, is_table: bool) -> ChildChunk {
        ChildChunk {
            id: 0,
            parent_id,
            index_within_parent: 0,
            content: content.to_string(),
            size: content.chars().count(),
            overlap_chars: 0,
            is_table,
            oversized: false,
            table_id: None,
            header_path: vec![],
            unit_index: Some(1),
            metadata: ChunkMetadata::default(),
        }
    }

    #[test]
    fn test_heading_merged_into_successor() {
        let chunks = vec![
            parent(Some(1), "## Intro"),
            parent(Some(1), "A paragraph that is long enough to stand alone."),
        ];
        let outcome = merge_short_segments(chunks, 30, 2000);
        assert_eq!(outcome.chunks.len(), 1);
        assert_eq!(
            outcome.chunks[0].content,
            "## Intro\n\nA paragraph that is long enough to stand alone."
        );
        assert_eq!(outcome.chunks[0].size, outcome.chunks[0].content.chars().count());
        assert!(outcome.undersized.is_empty());
    }

    #[test]
    fn test_no_merge_across_units() {
        let chunks = vec![
            parent(Some(1), "# Heading only here"),
            parent(Some(2), "Content of the next page, long enough."),
        ];
        let outcome = merge_short_segments(chunks, 30, 2000);
        assert_eq!(outcome.chunks.len(), 2);
        assert_eq!(outcome.undersized, vec![0]);
    }

    #[test]
    fn test_trailing_undersized_reported() {
        let chunks = vec![
            parent(None, "A paragraph that is long enough to stand alone."),
            parent(None, "## Tail"),
        ];
        let outcome = merge_short_segments(chunks, 30, 2000);
        assert_eq!(outcome.chunks.len(), 2);
        assert_eq!(outcome.undersized, vec![1]);
    }

    #[test]
    fn test_merges_chain() {
        let chunks = vec![
            parent(None, "# A"),
            parent(None, "## B"),
            parent(None, "Body text that is long enough to count."),
        ];
        let outcome = merge_short_segments(chunks, 30, 2000);
        assert_eq!(outcome.chunks.len(), 1);
        assert!(outcome.chunks[0].content.starts_with("# A\n\n## B\n\nBody"));
    }

    #[test]
    fn test_size_limit_blocks_merge() {
        let long = "x".repeat(100);
        let chunks = vec![parent(None, "# A"), parent(None, &long)];
        let outcome = merge_short_segments(chunks, 30, 100);
        assert_eq!(outcome.chunks.len(), 2);
        assert_eq!(outcome.undersized, vec![0]);
    }

    #[test]
    fn test_table_child_never_absorbed() {
        let chunks = vec![child(0, "## Prices", false), child(0, "|a|\n|---|\n|1|", true)];
        let outcome = merge_short_segments(chunks, 30, 400);
        assert_eq!(outcome.chunks.len(), 2);
        assert_eq!(outcome.undersized, vec![0]);
    }

    #[test]
    fn test_small_table_child_not_undersized() {
        let chunks = vec![child(0, "|a|\n|---|\n|1|", true)];
        let outcome = merge_short_segments(chunks, 30, 400);
        assert!(outcome.undersized.is_empty());
    }

    #[test]
    fn test_children_of_different_parents_not_merged() {
        let chunks = vec![
            child(0, "## Heading", false),
            child(1, "Long enough content for the next parent.", false),
        ];
        let outcome = merge_short_segments(chunks, 30, 400);
        assert_eq!(outcome.chunks.len(), 2);
    }

    #[test]
    fn test_overlap_prefix_dropped_on_merge() {
        let mut next = child(0, "tail words here. The next body of text follows.", false);
        next.overlap_chars = "tail words here. ".chars().count();
        let chunks = vec![child(0, "## Heading", false), next];
        let outcome = merge_short_segments(chunks, 30, 400);
        assert_eq!(outcome.chunks.len(), 1);
        assert_eq!(
            outcome.chunks[0].content,
            "## Heading\n\nThe next body of text follows."
        );
    }
}
