// src/chunker/hierarchy.rs

use super::recursive::RecursiveCharacterSplitter;
use super::{char_len, split_blocks, Block};
use crate::config::ChunkerConfig;
use crate::metadata::ContentUnit;
use crate::normalize::normalize;
use crate::overlap::OverlapStrategy;

/// Deepest heading level that opens a section. Deeper headings are text.
pub const MAX_HEADER_LEVEL: usize = 4;

const SECTION_JOINER: &str = "\n\n";

/// Markdown heading parser
pub struct MarkdownParser;

impl MarkdownParser {
    /// Parse an ATX header: returns (level, title)
    pub fn parse_header(line: &str) -> Option<(usize, String)> {
        let trimmed = line.trim_start();
        let hash_count = trimmed.chars().take_while(|&c| c == '#').count();

        if hash_count > 0 && hash_count <= 6 && trimmed.len() > hash_count {
            let rest = &trimmed[hash_count..];
            if rest.starts_with(' ') || rest.starts_with('\t') {
                let title = rest.trim().to_string();
                if !title.is_empty() {
                    return Some((hash_count, title));
                }
            }
        }
        None
    }

    /// A heading that opens a new section, levels 1 to [`MAX_HEADER_LEVEL`].
    pub fn section_header(line: &str) -> Option<(usize, String)> {
        match Self::parse_header(line) {
            Some((level, title)) if level <= MAX_HEADER_LEVEL => Some((level, title)),
            Some(_) => None,
            None => {
                if Self::looks_like_header(line) {
                    tracing::warn!(line, "unrecognised heading syntax treated as text");
                }
                None
            }
        }
    }

    /// `#Title`: hashes glued to text.
    fn looks_like_header(line: &str) -> bool {
        let trimmed = line.trim_start();
        let hash_count = trimmed.chars().take_while(|&c| c == '#').count();
        (1..=6).contains(&hash_count)
            && trimmed[hash_count..]
                .chars()
                .next()
                .is_some_and(|c| c.is_alphanumeric())
    }
}

/// One parent-sized piece of a unit, before ids are assigned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParentSegment {
    /// Path of the first section in the segment.
    pub header_path: Vec<String>,
    pub content: String,
    pub overlap_chars: usize,
    /// Ids of the tables the segment holds, in document order.
    pub table_ids: Vec<String>,
    /// The heading sections `content` is made of, joined by a blank line.
    pub sections: Vec<SectionText>,
}

/// Text of one heading section inside a segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionText {
    pub header_path: Vec<String>,
    pub text: String,
}

/// Text between two section headings, with the headings above it.
#[derive(Debug)]
struct Section {
    header_path: Vec<String>,
    text: String,
    blocks: Vec<Block>,
    /// One id per `Block::Table` in `blocks`, same order.
    table_ids: Vec<String>,
}

/// Consecutive sections packed into one parent candidate.
#[derive(Debug)]
struct Group {
    size: usize,
    sections: Vec<Section>,
}

#[derive(Debug)]
enum Piece {
    Text(String),
    Table { body: String, id: Option<String> },
}

#[derive(Debug)]
struct Packed {
    body: String,
    size: usize,
    starts_with_text: bool,
    /// Text after the last table of the pack, the only text overlap may
    /// carry forward.
    trailing_text: String,
    table_ids: Vec<String>,
}

/// Splits a unit at headings, then packs and re-splits sections to the
/// parent size. Tables are never cut.
pub struct HeaderAwareSplitter {
    target: usize,
    overlap: OverlapStrategy,
    keep_tables_together: bool,
    normalize_output: bool,
}

impl HeaderAwareSplitter {
    pub fn new(config: &ChunkerConfig) -> Self {
        Self {
            target: config.parent_chunk_size,
            overlap: OverlapStrategy::for_parents(config.parent_chunk_overlap),
            keep_tables_together: config.keep_tables_together,
            normalize_output: config.normalize_output,
        }
    }

    pub fn split(&self, unit: &ContentUnit) -> Vec<ParentSegment> {
        let sections = self.sections(unit);
        let groups = self.group_sections(sections);

        let mut segments = Vec::new();
        for group in groups {
            if group.size <= self.target {
                segments.push(self.whole_group(group));
            } else {
                // Only a lone section can exceed the target.
                for section in group.sections {
                    segments.extend(self.resplit(section));
                }
            }
        }
        segments
    }

    /// Cut the unit at section headings. A heading inside a table takes
    /// effect on the first line after the table.
    fn sections(&self, unit: &ContentUnit) -> Vec<Section> {
        let lines: Vec<&str> = unit.text.lines().collect();
        let mut sections = Vec::new();
        let mut stack: Vec<(usize, String)> = Vec::new();
        let mut pending: Option<(usize, String)> = None;
        let mut start = 0;

        for (i, line) in lines.iter().enumerate() {
            if self.keep_tables_together && unit.table_at_line(i).is_some() {
                if let Some(header) = MarkdownParser::section_header(line) {
                    pending = Some(header);
                }
                continue;
            }

            let headers: Vec<(usize, String)> = pending
                .take()
                .into_iter()
                .chain(MarkdownParser::section_header(line))
                .collect();
            if headers.is_empty() {
                continue;
            }

            if i > start {
                sections.extend(self.section(unit, &lines, start, i, &stack));
            }
            for (level, title) in headers {
                stack.retain(|(l, _)| *l < level);
                stack.push((level, title));
            }
            start = i;
        }
        if start < lines.len() {
            sections.extend(self.section(unit, &lines, start, lines.len(), &stack));
        }

        sections
    }

    fn section(
        &self,
        unit: &ContentUnit,
        lines: &[&str],
        start: usize,
        end: usize,
        stack: &[(usize, String)],
    ) -> Option<Section> {
        let text = lines[start..end].join("\n").trim().to_string();
        if text.is_empty() {
            return None;
        }

        let spans: Vec<_> = if self.keep_tables_together {
            unit.tables
                .iter()
                .filter(|t| t.start_line >= start && t.end_line < end)
                .collect()
        } else {
            Vec::new()
        };
        let ranges: Vec<(usize, usize)> = spans
            .iter()
            .map(|t| (t.start_line - start, t.end_line - start))
            .collect();

        Some(Section {
            header_path: stack.iter().map(|(_, title)| title.clone()).collect(),
            text,
            blocks: split_blocks(&lines[start..end], &ranges),
            table_ids: spans.iter().map(|t| t.id.clone()).collect(),
        })
    }

    /// Append small sections to their predecessor while the result fits.
    fn group_sections(&self, sections: Vec<Section>) -> Vec<Group> {
        let mut groups: Vec<Group> = Vec::new();

        for section in sections {
            let size = char_len(&section.text);
            match groups.last_mut() {
                Some(last) if last.size + char_len(SECTION_JOINER) + size <= self.target => {
                    last.size += char_len(SECTION_JOINER) + size;
                    last.sections.push(section);
                }
                _ => groups.push(Group {
                    size,
                    sections: vec![section],
                }),
            }
        }

        groups
    }

    fn whole_group(&self, group: Group) -> ParentSegment {
        let mut table_ids = Vec::new();
        let sections: Vec<SectionText> = group
            .sections
            .into_iter()
            .map(|section| {
                table_ids.extend(section.table_ids);
                let text = if self.normalize_output {
                    normalize(&section.text)
                } else {
                    section.text
                };
                SectionText {
                    header_path: section.header_path,
                    text,
                }
            })
            .filter(|section| !section.text.is_empty())
            .collect();

        ParentSegment {
            header_path: sections
                .first()
                .map(|s| s.header_path.clone())
                .unwrap_or_default(),
            content: sections
                .iter()
                .map(|s| s.text.as_str())
                .collect::<Vec<_>>()
                .join(SECTION_JOINER),
            overlap_chars: 0,
            table_ids,
            sections,
        }
    }

    /// Re-split an oversized section: text pieces at the parent size, tables
    /// whole, packed greedily. Overlap only joins text to text.
    fn resplit(&self, section: Section) -> Vec<ParentSegment> {
        let splitter = RecursiveCharacterSplitter::new(self.target);
        let mut table_ids = section.table_ids.into_iter();
        let mut pieces: Vec<Piece> = Vec::new();

        for block in section.blocks {
            match block {
                Block::Table(text) => pieces.push(Piece::Table {
                    body: text.trim().to_string(),
                    id: table_ids.next(),
                }),
                Block::Text(text) => {
                    for piece in splitter.split(&text) {
                        let piece = if self.normalize_output {
                            normalize(&piece)
                        } else {
                            piece
                        };
                        if !piece.is_empty() {
                            pieces.push(Piece::Text(piece));
                        }
                    }
                }
            }
        }

        let packed = self.pack(pieces);
        if packed.iter().any(|p| p.size > self.target) {
            tracing::debug!(
                header = %section.header_path.join(" > "),
                "table larger than parent size kept whole"
            );
        }

        packed
            .iter()
            .enumerate()
            .map(|(i, piece)| {
                let carries_overlap =
                    i > 0 && !packed[i - 1].trailing_text.is_empty() && piece.starts_with_text;
                let (content, overlap_chars) = if carries_overlap {
                    self.overlap.prepend(&packed[i - 1].trailing_text, &piece.body)
                } else {
                    (piece.body.clone(), 0)
                };
                ParentSegment {
                    header_path: section.header_path.clone(),
                    sections: vec![SectionText {
                        header_path: section.header_path.clone(),
                        text: content.clone(),
                    }],
                    content,
                    overlap_chars,
                    table_ids: piece.table_ids.clone(),
                }
            })
            .collect()
    }

    fn pack(&self, pieces: Vec<Piece>) -> Vec<Packed> {
        let joiner_len = char_len(SECTION_JOINER);
        let mut packed: Vec<Packed> = Vec::new();
        let mut current: Option<Packed> = None;

        for piece in pieces {
            let (body, table_id) = match piece {
                Piece::Text(body) => (body, None),
                Piece::Table { body, id } => (body, Some(id)),
            };
            let is_text = table_id.is_none();
            let size = char_len(&body);

            if let Some(cur) = current.as_mut() {
                if cur.size + joiner_len + size <= self.target {
                    cur.body.push_str(SECTION_JOINER);
                    cur.body.push_str(&body);
                    cur.size += joiner_len + size;
                    if !is_text {
                        cur.trailing_text.clear();
                    } else if cur.trailing_text.is_empty() {
                        cur.trailing_text = body;
                    } else {
                        cur.trailing_text.push_str(SECTION_JOINER);
                        cur.trailing_text.push_str(&body);
                    }
                    cur.table_ids.extend(table_id.flatten());
                    continue;
                }
            }
            packed.extend(current.take());
            current = Some(Packed {
                trailing_text: if is_text { body.clone() } else { String::new() },
                body,
                size,
                starts_with_text: is_text,
                table_ids: table_id.flatten().into_iter().collect(),
            });
        }
        packed.extend(current);

        packed
    }
}
