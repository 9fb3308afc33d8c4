//! Table boundary detection over converter markdown.
//!
//! Two shapes are recognised:
//! 1. Pipe tables: a header row, a `---` separator row and at least one data
//!    row. Rows carrying span markers (`rowspan`, `colspan`, raw `<td>`) make
//!    the table complex.
//! 2. Raw HTML tables, optionally preceded by the converter's
//!    `<!-- complex table; keep HTML -->` marker. These are always complex:
//!    the converter could not linearise them and they are kept verbatim.
//!
//! Anything that looks table-like but does not match degrades to plain text
//! and is reported as [`MalformedTable`]; detection never fails.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::metadata::TableSpan;

static HTML_ROW: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<tr[\s>]").expect("valid regex"));
static HTML_CELL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<t[dh][\s>/]").expect("valid regex"));
static INLINE_TABLE_MARKUP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<t[dhr][\s>]|rowspan|colspan").expect("valid regex"));

const COMPLEX_MARKER: &str = "<!-- complex table";

/// A detected table before it is given an id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableBlock {
    pub start_line: usize,
    pub end_line: usize,
    pub row_count: usize,
    pub column_count: usize,
    pub is_complex: bool,
}

impl TableBlock {
    pub fn into_span(self, id: String) -> TableSpan {
        TableSpan {
            id,
            start_line: self.start_line,
            end_line: self.end_line,
            row_count: self.row_count,
            column_count: self.column_count,
            is_complex: self.is_complex,
        }
    }
}

/// Why a table-like region was left as plain text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MalformedKind {
    /// Pipe rows with no separator row after the first one.
    MissingSeparator,
    /// Header and separator rows followed by no data row.
    NoDataRows,
    /// `<table>` opened but never closed.
    UnclosedHtml,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MalformedTable {
    pub start_line: usize,
    pub kind: MalformedKind,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Detection {
    pub tables: Vec<TableBlock>,
    pub malformed: Vec<MalformedTable>,
}

/// Detect table blocks in `text`, scanning line by line.
///
/// # Examples
///
/// ```rust
/// use hierarchical_chunker::table::detect_tables;
///
/// let text = "Intro\n\n|A|B|\n|---|---|\n|1|2|\n\nOutro";
/// let detection = detect_tables(text);
/// assert_eq!(detection.tables.len(), 1);
/// assert_eq!(detection.tables[0].start_line, 2);
/// assert_eq!(detection.tables[0].end_line, 4);
/// ```
pub fn detect_tables(text: &str) -> Detection {
    let lines: Vec<&str> = text.lines().collect();
    let detection = scan_lines(&lines);
    for malformed in &detection.malformed {
        let reason = match malformed.kind {
            MalformedKind::MissingSeparator => "pipe rows without separator",
            MalformedKind::NoDataRows => "table header without data rows",
            MalformedKind::UnclosedHtml => "unclosed <table>",
        };
        tracing::warn!(line = malformed.start_line, "{reason} left as plain text");
    }
    detection
}

/// Same as [`detect_tables`] without logging, for re-scans of text that was
/// already reported on.
pub(crate) fn scan_lines(lines: &[&str]) -> Detection {
    let mut detection = Detection::default();
    let mut i = 0;

    while i < lines.len() {
        if let Some(open) = html_table_open(lines, i) {
            match html_table_end(lines, open) {
                Some(end) => {
                    detection.tables.push(html_block(lines, i, end));
                    i = end + 1;
                }
                None => {
                    detection.malformed.push(MalformedTable {
                        start_line: i,
                        kind: MalformedKind::UnclosedHtml,
                    });
                    i = open + 1;
                }
            }
            continue;
        }

        if !is_table_row(lines[i]) {
            i += 1;
            continue;
        }

        if i + 1 < lines.len() && is_separator_row(lines[i + 1]) {
            let mut end = i + 1;
            while end + 1 < lines.len() && is_table_row(lines[end + 1]) {
                end += 1;
            }

            let data_rows = end - (i + 1);
            if data_rows == 0 {
                detection.malformed.push(MalformedTable {
                    start_line: i,
                    kind: MalformedKind::NoDataRows,
                });
            } else {
                detection.tables.push(TableBlock {
                    start_line: i,
                    end_line: end,
                    row_count: data_rows + 1,
                    column_count: split_cells(lines[i]).len(),
                    is_complex: lines[i..=end].iter().any(|l| has_span_marker(l)),
                });
            }
            i = end + 1;
            continue;
        }

        // Report a run of separator-less pipe rows once, at its first row.
        if i == 0 || !is_table_row(lines[i - 1]) {
            detection.malformed.push(MalformedTable {
                start_line: i,
                kind: MalformedKind::MissingSeparator,
            });
        }
        i += 1;
    }

    detection
}

/// A markdown pipe-table row: `| a | b |`.
pub fn is_table_row(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.len() >= 2 && trimmed.starts_with('|') && trimmed.ends_with('|')
}

/// A separator row such as `|---|:---:|`.
pub fn is_separator_row(line: &str) -> bool {
    is_table_row(line) && split_cells(line).iter().all(|cell| is_separator_cell(cell))
}

pub(crate) fn is_separator_cell(cell: &str) -> bool {
    let cell = cell.trim();
    let cell = cell.strip_prefix(':').unwrap_or(cell);
    let cell = cell.strip_suffix(':').unwrap_or(cell);
    !cell.is_empty() && cell.chars().all(|c| c == '-')
}

/// Inner cells of a pipe row, without the outer pipes.
pub fn split_cells(line: &str) -> Vec<&str> {
    let trimmed = line.trim();
    let inner = trimmed.strip_prefix('|').unwrap_or(trimmed);
    let inner = inner.strip_suffix('|').unwrap_or(inner);
    inner.split('|').collect()
}

fn has_span_marker(line: &str) -> bool {
    line.to_ascii_lowercase().contains(COMPLEX_MARKER) || INLINE_TABLE_MARKUP.is_match(line)
}

fn is_complex_marker(line: &str) -> bool {
    line.trim_start().to_ascii_lowercase().starts_with(COMPLEX_MARKER)
}

fn count_opens(line: &str) -> usize {
    line.to_ascii_lowercase().matches("<table").count()
}

fn count_closes(line: &str) -> usize {
    line.to_ascii_lowercase().matches("</table").count()
}

/// Line holding `<table` for an HTML block starting at `i`, if one starts
/// there. The complex-table marker line belongs to the block it precedes.
fn html_table_open(lines: &[&str], i: usize) -> Option<usize> {
    if count_opens(lines[i]) > 0 {
        return Some(i);
    }
    if is_complex_marker(lines[i]) && i + 1 < lines.len() && count_opens(lines[i + 1]) > 0 {
        return Some(i + 1);
    }
    None
}

/// Last line of the HTML table opened at `open`, honouring nesting.
fn html_table_end(lines: &[&str], open: usize) -> Option<usize> {
    let mut depth: isize = 0;
    for (j, line) in lines.iter().enumerate().skip(open) {
        depth += count_opens(line) as isize;
        depth -= count_closes(line) as isize;
        if depth <= 0 {
            return Some(j);
        }
    }
    None
}

fn html_block(lines: &[&str], start: usize, end: usize) -> TableBlock {
    let block = lines[start..=end].join("\n");
    let rows: Vec<&str> = HTML_ROW.split(&block).skip(1).collect();
    let column_count = rows
        .iter()
        .map(|row| HTML_CELL.find_iter(row).count())
        .max()
        .unwrap_or(0);

    TableBlock {
        start_line: start,
        end_line: end,
        row_count: rows.len(),
        column_count,
        is_complex: true,
    }
}
