// src/chunker/recursive.rs

use super::{char_len, split_blocks, Block};
use crate::config::ChunkerConfig;
use crate::normalize::normalize;
use crate::overlap::OverlapStrategy;
use crate::segmentation::unicode::SentenceSegmenter;
use crate::table::scan_lines;

#[derive(Debug, Clone, Copy)]
enum Separator {
    Literal(&'static str),
    Sentence,
}

/// Boundaries tried in order: paragraph, line, sentence, word. A hard
/// character cut is the last resort.
const SEPARATORS: &[Separator] = &[
    Separator::Literal("\n\n"),
    Separator::Literal("\n"),
    Separator::Sentence,
    Separator::Literal(" "),
];

/// Recursive character splitter
pub struct RecursiveCharacterSplitter {
    max_chars: usize,
}

impl RecursiveCharacterSplitter {
    pub fn new(max_chars: usize) -> Self {
        Self {
            max_chars: max_chars.max(1),
        }
    }

    /// Split `text` into trimmed, non-empty pieces of at most `max_chars`
    /// characters each, in order.
    pub fn split(&self, text: &str) -> Vec<String> {
        self.split_recursive(text, SEPARATORS)
            .into_iter()
            .map(|piece| piece.trim().to_string())
            .filter(|piece| !piece.is_empty())
            .collect()
    }

    fn split_recursive(&self, text: &str, separators: &[Separator]) -> Vec<String> {
        if char_len(text) <= self.max_chars {
            return vec![text.to_string()];
        }

        let Some((separator, remaining)) = separators.split_first() else {
            return self.split_by_chars(text);
        };

        let (parts, joiner): (Vec<&str>, &str) = match separator {
            Separator::Literal(sep) => (text.split(sep).collect(), sep),
            Separator::Sentence => (SentenceSegmenter::split_bounds(text), ""),
        };
        if parts.len() <= 1 {
            return self.split_recursive(text, remaining);
        }

        let joiner_len = char_len(joiner);
        let mut chunks = Vec::new();
        let mut current = String::new();
        let mut current_len = 0;

        for part in parts {
            let part_len = char_len(part);

            if part_len > self.max_chars {
                if !current.is_empty() {
                    chunks.push(std::mem::take(&mut current));
                    current_len = 0;
                }
                chunks.extend(self.split_recursive(part, remaining));
                continue;
            }

            if current.is_empty() {
                current.push_str(part);
                current_len = part_len;
            } else if current_len + joiner_len + part_len > self.max_chars {
                chunks.push(std::mem::replace(&mut current, part.to_string()));
                current_len = part_len;
            } else {
                current.push_str(joiner);
                current.push_str(part);
                current_len += joiner_len + part_len;
            }
        }

        if !current.is_empty() {
            chunks.push(current);
        }

        chunks
    }

    fn split_by_chars(&self, text: &str) -> Vec<String> {
        let chars: Vec<char> = text.chars().collect();
        chars
            .chunks(self.max_chars)
            .map(|chunk| chunk.iter().collect())
            .collect()
    }
}

/// One child-sized piece of a parent, before ids are assigned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildPiece {
    pub content: String,
    pub overlap_chars: usize,
    pub is_table: bool,
}

/// Splits parent content into child pieces, keeping tables whole.
pub struct ChildSplitter {
    splitter: RecursiveCharacterSplitter,
    overlap: OverlapStrategy,
    keep_tables_together: bool,
    normalize_output: bool,
}

impl ChildSplitter {
    pub fn new(config: &ChunkerConfig) -> Self {
        Self {
            splitter: RecursiveCharacterSplitter::new(config.child_chunk_size),
            overlap: OverlapStrategy::for_children(config.child_chunk_overlap),
            keep_tables_together: config.keep_tables_together,
            normalize_output: config.normalize_output,
        }
    }

    /// Split one parent's content.
    ///
    /// Each table becomes exactly one piece whatever its size. Text around
    /// tables is split recursively, and overlap is only carried between text
    /// pieces of the same run, never across a table.
    pub fn split(&self, content: &str) -> Vec<ChildPiece> {
        let lines: Vec<&str> = content.lines().collect();
        let tables: Vec<(usize, usize)> = if self.keep_tables_together {
            scan_lines(&lines)
                .tables
                .iter()
                .map(|t| (t.start_line, t.end_line))
                .collect()
        } else {
            Vec::new()
        };

        let mut pieces = Vec::new();
        for block in split_blocks(&lines, &tables) {
            match block {
                Block::Table(text) => pieces.push(ChildPiece {
                    content: text.trim().to_string(),
                    overlap_chars: 0,
                    is_table: true,
                }),
                Block::Text(text) => self.split_text(&text, &mut pieces),
            }
        }
        pieces
    }

    fn split_text(&self, text: &str, pieces: &mut Vec<ChildPiece>) {
        let bodies: Vec<String> = self
            .splitter
            .split(text)
            .into_iter()
            .map(|body| {
                if self.normalize_output {
                    normalize(&body)
                } else {
                    body
                }
            })
            .filter(|body| !body.is_empty())
            .collect();

        for (i, body) in bodies.iter().enumerate() {
            let (content, overlap_chars) = match i {
                0 => (body.clone(), 0),
                _ => self.overlap.prepend(&bodies[i - 1], body),
            };
            pieces.push(ChildPiece {
                content,
                overlap_chars,
                is_table: false,
            });
        }
    }
}
