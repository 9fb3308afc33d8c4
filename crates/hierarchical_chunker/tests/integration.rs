// tests/integration.rs

use hierarchical_chunker::assembler::{assemble, AssembledDocument};
use hierarchical_chunker::{ChunkerConfig, ConvertedDocument, HierarchicalChunker, PageRecord};
use std::collections::HashSet;

fn paragraph(target_chars: usize) -> String {
    let sentence = "The quick brown fox jumps over the lazy dog. ";
    let mut text = sentence.repeat(target_chars / sentence.len() + 1);
    text.truncate(target_chars - 1);
    let text = text.trim_end().to_string();
    format!("{text}.")
}

fn non_whitespace(text: &str) -> String {
    text.chars().filter(|c| !c.is_whitespace()).collect()
}

fn report() -> ConvertedDocument {
    ConvertedDocument::from_json_str(include_str!("fixtures/quarterly_report.json")).unwrap()
}

#[test]
fn test_scenario_small_unit_with_table() {
    let table = "|Region|Q1|Q2|Q3|\n|---|---|---|---|\n|North|120|135|160|\n|South|98|101|110|\n|West|87|90|95|";
    let text = format!("## Intro\n\n{}\n\n{table}\n\n{}", paragraph(500), paragraph(600));
    let doc = ConvertedDocument::from_markdown(text, "scenario_a.md", "md");

    let chunker = HierarchicalChunker::builder()
        .parent_chunk_size(2000)
        .child_chunk_size(350)
        .build()
        .unwrap();
    let result = chunker.chunk_document(&doc).unwrap();

    assert_eq!(result.parent_chunks.len(), 1);
    let parent = &result.parent_chunks[0];
    assert!(parent.size < 2000);
    assert!(parent.contains_table);
    assert!(!parent.oversized);

    let tables: Vec<_> = result.child_chunks.iter().filter(|c| c.is_table).collect();
    assert_eq!(tables.len(), 1);
    assert_eq!(tables[0].content, table);
    assert!(!tables[0].oversized);
    assert_eq!(tables[0].table_id.as_deref(), Some("doc-t1"));

    assert_eq!(result.child_chunks.len(), 5);
    assert_eq!(result.grouping_analysis.valid_groups, 1);
    assert_eq!(result.table_handling_stats.table_children, 1);
}

#[test]
fn test_indented_oversized_table_keeps_its_id() {
    let mut table = String::from("  <table>\n  <tr><th>Item</th><th>Count</th></tr>");
    let mut row = 0;
    while table.chars().count() < 3000 {
        table.push_str(&format!("\n  <tr><td>Item {row}</td><td>{row}</td></tr>"));
        row += 1;
    }
    table.push_str("\n  </table>");
    let text = format!("# Stock\n\n{table}\n\nCounts are refreshed every night.");
    let result = HierarchicalChunker::default()
        .chunk_markdown(&text, "stock.md")
        .unwrap();

    let holder = result
        .parent_chunks
        .iter()
        .find(|p| p.content.contains("<table>"))
        .expect("table parent");
    assert!(holder.content.contains("</table>"));
    assert!(holder.contains_table);
    assert!(holder.oversized);
    assert_eq!(holder.source_table_ids, vec!["doc-t1".to_string()]);

    let tables: Vec<_> = result.child_chunks.iter().filter(|c| c.is_table).collect();
    assert_eq!(tables.len(), 1);
    assert_eq!(tables[0].parent_id, holder.id);
    assert_eq!(tables[0].table_id.as_deref(), Some("doc-t1"));
    assert!(tables[0].oversized);
    assert_eq!(result.table_handling_stats.oversized_tables, 1);
}

#[test]
fn test_grouped_sections_give_children_their_own_path() {
    let intro = paragraph(180);
    let pricing = "Pricing costs ten dollars per seat. ".repeat(6);
    let pricing = pricing.trim_end();
    let text = format!("# Intro\n\n{intro}\n\n{intro}\n\n## Pricing\n\n{pricing}\n\n{pricing}");
    let result = HierarchicalChunker::default()
        .chunk_markdown(&text, "plans.md")
        .unwrap();

    assert_eq!(result.parent_chunks.len(), 1);
    assert_eq!(result.parent_chunks[0].header_path, vec!["Intro".to_string()]);

    let intro_path = vec!["Intro".to_string()];
    let pricing_path = vec!["Intro".to_string(), "Pricing".to_string()];
    let children = &result.child_chunks;
    assert!(children.len() >= 2);
    assert_eq!(children[0].header_path, intro_path);
    assert_eq!(children[children.len() - 1].header_path, pricing_path);

    for child in children {
        let has_pricing = child.content.contains("Pricing costs");
        let has_intro = child.content.contains("quick brown fox");
        assert!(!(has_pricing && has_intro), "child straddles two sections");
        if has_pricing {
            assert_eq!(child.header_path, pricing_path);
        } else {
            assert_eq!(child.header_path, intro_path);
        }
    }
}

#[test]
fn test_scenario_oversized_complex_table() {
    let mut table = String::from("<!-- complex table; keep HTML -->\n<table>\n<tr><th colspan=\"2\">Inventory</th></tr>");
    let mut row = 0;
    while table.chars().count() < 4000 {
        table.push_str(&format!(
            "\n<tr><td rowspan=\"1\">Item number {row}</td><td>Warehouse {row}</td></tr>"
        ));
        row += 1;
    }
    table.push_str("\n</table>");
    let text = format!("# Inventory\n\nStock levels at the end of the period.\n\n{table}\n\nAll counts are final.");
    let doc = ConvertedDocument::from_markdown(text, "scenario_b.md", "md");

    let chunker = HierarchicalChunker::builder()
        .child_chunk_size(350)
        .keep_tables_together(true)
        .build()
        .unwrap();
    let result = chunker.chunk_document(&doc).unwrap();

    let tables: Vec<_> = result.child_chunks.iter().filter(|c| c.is_table).collect();
    assert_eq!(tables.len(), 1);
    assert!(tables[0].size >= 4000);
    assert!(tables[0].oversized);
    assert!(tables[0].is_oversized_table());
    assert_eq!(tables[0].content, table);

    let holder = result.parent_of(tables[0]).unwrap();
    assert!(holder.oversized);
    assert_eq!(result.table_handling_stats.oversized_tables, 1);

    // No other child holds any row of the table.
    for child in result.child_chunks.iter().filter(|c| !c.is_table) {
        assert!(!child.content.contains("<tr>"));
        assert!(!child.content.contains("Item number"));
    }
}

#[test]
fn test_scenario_heading_only_page_not_merged_across_pages() {
    let doc = ConvertedDocument {
        pages: vec![
            PageRecord {
                page_number: 1,
                content: "# Quarterly Review".to_string(),
                ..Default::default()
            },
            PageRecord {
                page_number: 2,
                content: paragraph(400),
                ..Default::default()
            },
        ],
        ..Default::default()
    };
    let result = HierarchicalChunker::default().chunk_document(&doc).unwrap();

    let first = result
        .parent_chunks
        .iter()
        .find(|p| p.unit_index == Some(1))
        .unwrap();
    assert_eq!(first.content, "# Quarterly Review");
    assert_eq!(first.size, 18);

    for parent in result.parent_chunks.iter().filter(|p| p.unit_index == Some(2)) {
        assert!(!parent.content.contains("Quarterly Review"));
    }

    let undersized = &result.defects.undersized_parents;
    assert_eq!(undersized.len(), 1);
    assert_eq!(undersized[0].chunk_id, first.id);
    assert_eq!(undersized[0].unit_index, Some(1));
    assert!(result
        .defects
        .undersized_children
        .iter()
        .any(|c| c.unit_index == Some(1)));
}

#[test]
fn test_scenario_unstructured_document() {
    let text = include_str!("fixtures/handbook.md");
    let result = HierarchicalChunker::default()
        .chunk_markdown(text, "handbook.md")
        .unwrap();

    assert!(result.page_coverage.is_none());
    assert!(result.parent_chunks.iter().all(|p| p.unit_index.is_none()));
    assert!(result.child_chunks.iter().all(|c| c.unit_index.is_none()));
    assert!(result.defects.page_defects.is_empty());
}

#[test]
fn test_referential_integrity() {
    let result = HierarchicalChunker::default().chunk_document(&report()).unwrap();

    assert!(!result.child_chunks.is_empty());
    for child in &result.child_chunks {
        let parent = result.parent_of(child).expect("parent resolves");
        assert_eq!(parent.unit_index, child.unit_index);
    }
    for parent in &result.parent_chunks {
        let first = result.children_of(parent.id).next().expect("parent has children");
        assert_eq!(first.header_path, parent.header_path);
    }
    assert!(result.defects.unresolved_parent_refs.is_empty());
    assert!(result.defects.unit_mismatches.is_empty());
    assert_eq!(result.grouping_analysis.empty_groups, 0);
    assert_eq!(result.grouping_analysis.grouping_efficiency, 1.0);
}

#[test]
fn test_document_order_preserved() {
    let result = HierarchicalChunker::default().chunk_document(&report()).unwrap();

    let units: Vec<_> = result.parent_chunks.iter().map(|p| p.unit_index).collect();
    let mut sorted = units.clone();
    sorted.sort();
    assert_eq!(units, sorted);

    let parent_ids: Vec<_> = result.child_chunks.iter().map(|c| c.parent_id).collect();
    assert!(parent_ids.windows(2).all(|w| w[0] <= w[1]));
}

#[test]
fn test_paged_report_tables() {
    let doc = report();
    let result = HierarchicalChunker::default().chunk_document(&doc).unwrap();

    let ids: HashSet<_> = result
        .child_chunks
        .iter()
        .filter_map(|c| c.table_id.as_deref())
        .collect();
    assert!(ids.contains("revenue_by_region"));
    assert!(ids.contains("p2-t1"));

    let html = result
        .child_chunks
        .iter()
        .find(|c| c.table_id.as_deref() == Some("p2-t1"))
        .unwrap();
    assert!(html.content.starts_with("<!-- complex table; keep HTML -->"));
    assert!(html.content.contains("rowspan=\"2\""));
    assert!(html.content.ends_with("</table>"));
    assert_eq!(html.unit_index, Some(2));
    assert_eq!(html.metadata.unit_title.as_deref(), Some("Headcount"));

    let coverage = result.page_coverage.as_ref().unwrap();
    assert_eq!(coverage.pages_seen, 3);
    assert_eq!(coverage.pages_with_chunks, 3);
    assert!(coverage.pages_without_chunks.is_empty());
    assert!(result.table_handling_stats.fragmented_table_ids.is_empty());
}

#[test]
fn test_table_atomicity_across_units() {
    let doc = report();
    let config = ChunkerConfig {
        child_chunk_size: 60,
        child_chunk_overlap: 10,
        ..Default::default()
    };
    let chunker = HierarchicalChunker::new(config.clone()).unwrap();
    let result = chunker.chunk_document(&doc).unwrap();
    let assembled = assemble(&doc, config.normalize_output);

    for unit in &assembled.units {
        for span in &unit.tables {
            let text = AssembledDocument::table_text(unit, span);
            let holders: Vec<_> = result
                .child_chunks
                .iter()
                .filter(|c| c.content.contains(text.trim()))
                .collect();
            assert_eq!(holders.len(), 1, "table {} not in exactly one child", span.id);

            let rows: Vec<&str> = text.lines().skip(2).collect();
            for child in result.child_chunks.iter().filter(|c| c.id != holders[0].id) {
                for row in &rows {
                    assert!(!child.content.contains(row), "fragment of {} leaked", span.id);
                }
            }
        }
    }
}

#[test]
fn test_child_size_bound() {
    let text = include_str!("fixtures/handbook.md");
    let chunker = HierarchicalChunker::builder()
        .child_chunk_size(120)
        .child_chunk_overlap(20)
        .build()
        .unwrap();
    let result = chunker.chunk_markdown(text, "handbook.md").unwrap();

    for child in result.child_chunks.iter().filter(|c| !c.is_table) {
        assert!(
            child.size <= 140,
            "child {} has {} chars",
            child.id,
            child.size
        );
    }
    assert!(result.child_chunks.iter().any(|c| c.is_table && c.oversized));
}

#[test]
fn test_parent_coverage_without_normalization() {
    let text = include_str!("fixtures/handbook.md");
    let chunker = HierarchicalChunker::builder()
        .parent_chunk_size(300)
        .parent_chunk_overlap(60)
        .normalize_output(false)
        .build()
        .unwrap();
    let result = chunker.chunk_markdown(text, "handbook.md").unwrap();
    assert!(result.parent_chunks.len() > 3);

    let rebuilt: String = result
        .parent_chunks
        .iter()
        .map(|p| {
            let start = p
                .content
                .char_indices()
                .nth(p.overlap_chars)
                .map_or(p.content.len(), |(i, _)| i);
            &p.content[start..]
        })
        .collect();
    assert_eq!(non_whitespace(&rebuilt), non_whitespace(text));
}

#[test]
fn test_header_paths() {
    let text = include_str!("fixtures/handbook.md");
    let chunker = HierarchicalChunker::builder()
        .parent_chunk_size(400)
        .build()
        .unwrap();
    let result = chunker.chunk_markdown(text, "handbook.md").unwrap();

    let remote = result
        .parent_chunks
        .iter()
        .find(|p| p.content.contains("Remote work is allowed"))
        .unwrap();
    assert_eq!(
        remote.header_context(),
        "Employee Handbook > Working Hours > Remote Work"
    );

    let leave = result
        .parent_chunks
        .iter()
        .find(|p| p.content.contains("| Annual leave |") || p.content.contains("|Annual leave|"))
        .unwrap();
    assert_eq!(leave.header_path.last().map(String::as_str), Some("Leave"));
}

#[test]
fn test_tables_split_when_not_kept_together() {
    let text = include_str!("fixtures/handbook.md");
    let chunker = HierarchicalChunker::builder()
        .child_chunk_size(60)
        .child_chunk_overlap(0)
        .keep_tables_together(false)
        .build()
        .unwrap();
    let result = chunker.chunk_markdown(text, "handbook.md").unwrap();

    assert!(result.child_chunks.iter().all(|c| !c.is_table));
    assert!(result.child_chunks.iter().all(|c| c.size <= 60));
    assert_eq!(result.table_handling_stats.table_children, 0);
}

#[test]
fn test_result_serializes_to_json() {
    let result = HierarchicalChunker::default().chunk_document(&report()).unwrap();
    let json = serde_json::to_string(&result).unwrap();
    let back: hierarchical_chunker::HierarchicalResult = serde_json::from_str(&json).unwrap();
    assert_eq!(back.parent_chunks.len(), result.parent_chunks.len());
    assert_eq!(back.child_chunks.len(), result.child_chunks.len());
}
