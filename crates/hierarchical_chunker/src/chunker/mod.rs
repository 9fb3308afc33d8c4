// src/chunker/mod.rs

pub mod hierarchy;
pub mod merge;
pub mod recursive;

/// A run of lines that is either one whole table or the text between tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Block {
    Text(String),
    Table(String),
}

/// Cut `lines` into blocks at the given inclusive table line ranges.
///
/// Ranges must be sorted and disjoint. Whitespace-only text between tables is
/// dropped.
pub(crate) fn split_blocks(lines: &[&str], tables: &[(usize, usize)]) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut next = 0;

    for &(start, end) in tables {
        if start < next || end >= lines.len() {
            continue;
        }
        push_text(&mut blocks, &lines[next..start]);
        blocks.push(Block::Table(lines[start..=end].join("\n")));
        next = end + 1;
    }
    push_text(&mut blocks, &lines[next.min(lines.len())..]);

    blocks
}

fn push_text(blocks: &mut Vec<Block>, lines: &[&str]) {
    let text = lines.join("\n");
    if !text.trim().is_empty() {
        blocks.push(Block::Text(text));
    }
}

pub(crate) fn char_len(text: &str) -> usize {
    text.chars().count()
}
