//! Turns converter output into ordered [`ContentUnit`]s.

use crate::analysis::{MalformedTableDefect, PageDefect, PageDefectKind};
use crate::document::{ConvertedDocument, DocumentLayout, PageRecord, TableRecord};
use crate::metadata::{ContentUnit, TableSpan};
use crate::normalize::normalize;
use crate::table::{detect_tables, TableBlock};

/// Units of one document plus what was noticed while building them.
#[derive(Debug, Clone, Default)]
pub struct AssembledDocument {
    pub units: Vec<ContentUnit>,
    pub page_defects: Vec<PageDefect>,
    pub malformed_tables: Vec<MalformedTableDefect>,
}

impl AssembledDocument {
    /// Text of a table span inside the unit it was detected in.
    pub fn table_text(unit: &ContentUnit, span: &TableSpan) -> String {
        unit.text
            .lines()
            .skip(span.start_line)
            .take(span.line_count())
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn is_paged(&self) -> bool {
        self.units.iter().any(|u| u.unit_index.is_some())
    }
}

/// One unit per page for paged documents, a single pageless unit otherwise.
///
/// Page numbers are kept as reported. Gaps, duplicates and regressions are
/// recorded, never repaired.
pub fn assemble(document: &ConvertedDocument, normalize_text: bool) -> AssembledDocument {
    let mut assembled = AssembledDocument::default();

    match document.layout() {
        DocumentLayout::Paged(pages) => {
            assembled.page_defects = page_defects(pages);
            for page in pages {
                let unit = build_unit(
                    &page.content,
                    Some(page.page_number),
                    page.title.clone(),
                    &page.tables,
                    normalize_text,
                    &mut assembled.malformed_tables,
                );
                assembled.units.push(unit);
            }
        }
        DocumentLayout::Unstructured(text) => {
            if !document.pages.is_empty() {
                tracing::warn!(
                    pages = document.pages.len(),
                    "every page is blank, chunking the full text instead"
                );
            }
            let unit = build_unit(
                text,
                None,
                None,
                &[],
                normalize_text,
                &mut assembled.malformed_tables,
            );
            assembled.units.push(unit);
        }
    }

    tracing::debug!(
        units = assembled.units.len(),
        page_defects = assembled.page_defects.len(),
        "assembled content units"
    );
    assembled
}

fn build_unit(
    raw: &str,
    unit_index: Option<usize>,
    title: Option<String>,
    records: &[TableRecord],
    normalize_text: bool,
    malformed: &mut Vec<MalformedTableDefect>,
) -> ContentUnit {
    let text = if normalize_text {
        normalize(raw)
    } else {
        raw.to_string()
    };

    let detection = detect_tables(&text);
    malformed.extend(detection.malformed.into_iter().map(|m| MalformedTableDefect {
        unit_index,
        start_line: m.start_line,
        kind: m.kind,
    }));

    let mut used = vec![false; records.len()];
    let tables = detection
        .tables
        .into_iter()
        .enumerate()
        .map(|(n, block)| {
            let id = matching_record(&block, records, &mut used)
                .unwrap_or_else(|| synthesized_id(unit_index, n + 1));
            block.into_span(id)
        })
        .collect();

    ContentUnit {
        text,
        unit_index,
        title,
        tables,
    }
}

/// First unused converter record whose line range overlaps the block.
fn matching_record(block: &TableBlock, records: &[TableRecord], used: &mut [bool]) -> Option<String> {
    let position = records.iter().enumerate().position(|(i, record)| {
        !used[i] && record.start_line <= block.end_line && block.start_line <= record.end_line
    })?;
    used[position] = true;
    Some(records[position].table_id.clone())
}

fn synthesized_id(unit_index: Option<usize>, n: usize) -> String {
    match unit_index {
        Some(page) => format!("p{page}-t{n}"),
        None => format!("doc-t{n}"),
    }
}

fn page_defects(pages: &[PageRecord]) -> Vec<PageDefect> {
    let mut defects = Vec::new();
    let mut previous: Option<usize> = None;

    for page in pages {
        let found = page.page_number;
        let expected = previous.map_or(1, |p| p + 1);
        let kind = match previous {
            Some(p) if found == p => Some(PageDefectKind::Duplicate),
            Some(p) if found < p => Some(PageDefectKind::OutOfOrder),
            _ if found != expected => Some(PageDefectKind::Gap),
            _ => None,
        };

        if let Some(kind) = kind {
            tracing::warn!(?kind, expected, found, "page numbering defect");
            defects.push(PageDefect {
                kind,
                expected,
                found,
            });
        }
        previous = Some(found);
    }

    defects
}
