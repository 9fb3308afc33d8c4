//! Idempotent text canonicalization.
//!
//! Applied to whole units before table detection and to split pieces
//! afterwards. Table boundaries found in the input are found at the same lines
//! in the output: rows stay rows, blank lines stay blank, and HTML or complex
//! tables are passed through untouched.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::table::{is_separator_cell, is_table_row, scan_lines, split_cells};

static LINE_BREAK_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<br\s*/?>").expect("valid regex"));
static INLINE_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").expect("valid regex"));
static HORIZONTAL_SPACE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[ \t\u{a0}\u{3000}]+").expect("valid regex"));

#[derive(Clone, Copy, PartialEq)]
enum LineRole {
    Text,
    /// Line of an HTML block or a complex pipe table.
    Verbatim,
    TableRow,
    TableSeparator,
}

/// Canonicalize `text`.
///
/// * line endings become `\n`
/// * `<br>` becomes a space and other inline tags are removed
/// * runs of spaces and tabs collapse to one space, trailing space is dropped
/// * pipe rows are rewritten as `|a|b|`, table separator rows as `|---|---|`
/// * runs of blank lines collapse to one, leading and trailing blank lines go
///
/// `normalize(&normalize(x)) == normalize(x)` holds for every input.
///
/// # Examples
///
/// ```rust
/// use hierarchical_chunker::normalize::normalize;
///
/// let text = "Intro  <b>bold</b>\r\n\r\n\r\n| A |  B |\n|:--|--:|\n| 1 | 2 |";
/// assert_eq!(normalize(text), "Intro bold\n\n|A|B|\n|---|---|\n|1|2|");
/// ```
pub fn normalize(text: &str) -> String {
    let unified = text.replace("\r\n", "\n").replace('\r', "\n");
    let lines: Vec<&str> = unified.lines().collect();
    let roles = line_roles(&lines);

    let mut out: Vec<String> = Vec::with_capacity(lines.len());
    let mut previous_blank = true;

    for (line, role) in lines.iter().zip(roles) {
        let normalized = match role {
            LineRole::Verbatim => line.trim_end().to_string(),
            LineRole::TableRow => canonical_row(&strip_markup(line)),
            LineRole::TableSeparator => canonical_separator(line),
            LineRole::Text => normalize_text_line(line),
        };

        let blank = normalized.is_empty();
        if blank && previous_blank && role != LineRole::Verbatim {
            continue;
        }
        previous_blank = blank;
        out.push(normalized);
    }

    while out.last().is_some_and(|l| l.is_empty()) {
        out.pop();
    }

    out.join("\n").trim().to_string()
}

fn line_roles(lines: &[&str]) -> Vec<LineRole> {
    let mut roles = vec![LineRole::Text; lines.len()];
    for table in scan_lines(lines).tables {
        for (offset, role) in roles[table.start_line..=table.end_line].iter_mut().enumerate() {
            *role = if table.is_complex {
                LineRole::Verbatim
            } else if offset == 1 {
                LineRole::TableSeparator
            } else {
                LineRole::TableRow
            };
        }
    }
    roles
}

fn strip_markup(line: &str) -> String {
    let without_breaks = LINE_BREAK_TAG.replace_all(line, " ");
    INLINE_TAG.replace_all(&without_breaks, "").into_owned()
}

fn normalize_text_line(line: &str) -> String {
    let stripped = strip_markup(line);

    // Stripping must not turn a plain line into a pipe row, which could
    // join two tables into one.
    if is_table_row(&stripped) && !is_table_row(line) {
        return collapse(line);
    }
    if is_table_row(&stripped) {
        return canonical_row(&stripped);
    }
    collapse(&stripped)
}

fn collapse(line: &str) -> String {
    HORIZONTAL_SPACE.replace_all(line, " ").trim_end().to_string()
}

fn canonical_row(line: &str) -> String {
    let cells: Vec<String> = split_cells(line)
        .into_iter()
        .map(|cell| HORIZONTAL_SPACE.replace_all(cell, " ").trim().to_string())
        .collect();
    format!("|{}|", cells.join("|"))
}

fn canonical_separator(line: &str) -> String {
    let cells = split_cells(line);
    if cells.iter().all(|cell| is_separator_cell(cell)) {
        format!("|{}|", vec!["---"; cells.len()].join("|"))
    } else {
        canonical_row(line)
    }
}
