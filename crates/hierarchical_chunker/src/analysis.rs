//! Read-only statistics over a finished chunking result.
//!
//! Nothing here fails: structural problems such as empty parent groups or
//! dangling `parent_id`s are counted and listed so callers can apply their
//! own thresholds.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::metadata::{ChildChunk, ParentChunk};
use crate::table::MalformedKind;

/// Parent/child relationship integrity.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GroupingAnalysis {
    pub total_groups: usize,
    /// Parents with at least one child.
    pub valid_groups: usize,
    /// Parents with no child at all.
    pub empty_groups: usize,
    /// Parents whose split produced exactly one child.
    pub single_child_groups: usize,
    /// `valid_groups / total_groups`, zero for an empty result.
    pub grouping_efficiency: f64,
    pub avg_children_per_parent: f64,
    pub unresolved_parent_refs: usize,
    pub unit_mismatches: usize,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SizeSummary {
    pub count: usize,
    pub min: usize,
    pub max: usize,
    pub mean: f64,
    pub median: f64,
}

impl SizeSummary {
    pub fn from_sizes(sizes: &[usize]) -> Self {
        if sizes.is_empty() {
            return Self::default();
        }
        let mut sorted = sizes.to_vec();
        sorted.sort_unstable();

        let count = sorted.len();
        let mid = count / 2;
        let median = if count % 2 == 0 {
            (sorted[mid - 1] + sorted[mid]) as f64 / 2.0
        } else {
            sorted[mid] as f64
        };

        Self {
            count,
            min: sorted[0],
            max: sorted[count - 1],
            mean: sorted.iter().sum::<usize>() as f64 / count as f64,
            median,
        }
    }
}

/// Child sizes in characters, bucketed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SizeBuckets {
    pub under_100: usize,
    pub from_100_to_250: usize,
    pub from_250_to_400: usize,
    pub over_400: usize,
}

impl SizeBuckets {
    pub fn record(&mut self, size: usize) {
        match size {
            0..=99 => self.under_100 += 1,
            100..=249 => self.from_100_to_250 += 1,
            250..=399 => self.from_250_to_400 += 1,
            _ => self.over_400 += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.under_100 + self.from_100_to_250 + self.from_250_to_400 + self.over_400
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SizeDistribution {
    pub child_buckets: SizeBuckets,
    pub parents: SizeSummary,
    pub children: SizeSummary,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TableHandlingStats {
    pub table_children: usize,
    /// Table children larger than the child target, kept whole.
    pub oversized_tables: usize,
    /// `table_children / total children`.
    pub table_child_ratio: f64,
    pub avg_table_size: f64,
    pub largest_table_size: usize,
    /// Table ids found in more than one child.
    pub fragmented_table_ids: Vec<String>,
}

/// Which pages produced chunks. Only computed for paged documents.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PageCoverage {
    pub pages_seen: usize,
    pub pages_with_chunks: usize,
    pub pages_without_chunks: Vec<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageDefectKind {
    /// One or more page numbers were skipped.
    Gap,
    /// The same page number appeared twice in a row.
    Duplicate,
    /// The page number went backwards.
    OutOfOrder,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageDefect {
    pub kind: PageDefectKind,
    pub expected: usize,
    pub found: usize,
}

/// A chunk still below `minimum_viable_length` after merging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UndersizedChunk {
    pub chunk_id: usize,
    pub unit_index: Option<usize>,
    pub size: usize,
}

/// A table-like block that was left as plain text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MalformedTableDefect {
    pub unit_index: Option<usize>,
    pub start_line: usize,
    pub kind: MalformedKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DefectReport {
    pub page_defects: Vec<PageDefect>,
    pub undersized_parents: Vec<UndersizedChunk>,
    pub undersized_children: Vec<UndersizedChunk>,
    pub malformed_tables: Vec<MalformedTableDefect>,
    /// Ids of children whose `parent_id` does not resolve.
    pub unresolved_parent_refs: Vec<usize>,
    /// Ids of children whose `unit_index` differs from their parent's.
    pub unit_mismatches: Vec<usize>,
}

impl DefectReport {
    pub fn is_clean(&self) -> bool {
        self.page_defects.is_empty()
            && self.undersized_parents.is_empty()
            && self.undersized_children.is_empty()
            && self.malformed_tables.is_empty()
            && self.unresolved_parent_refs.is_empty()
            && self.unit_mismatches.is_empty()
    }
}

/// Everything the analyzer derives from the two chunk sequences.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Analysis {
    pub grouping: GroupingAnalysis,
    pub sizes: SizeDistribution,
    pub tables: TableHandlingStats,
    pub unresolved_parent_refs: Vec<usize>,
    pub unit_mismatches: Vec<usize>,
}

/// Analyze a finished chunk set.
///
/// # Examples
///
/// ```rust
/// use hierarchical_chunker::analysis::analyze;
///
/// let analysis = analyze(&[], &[]);
/// assert_eq!(analysis.grouping.total_groups, 0);
/// assert_eq!(analysis.grouping.grouping_efficiency, 0.0);
/// ```
pub fn analyze(parents: &[ParentChunk], children: &[ChildChunk]) -> Analysis {
    let parent_units: BTreeMap<usize, Option<usize>> =
        parents.iter().map(|p| (p.id, p.unit_index)).collect();

    let mut child_counts: BTreeMap<usize, usize> = BTreeMap::new();
    let mut unresolved_parent_refs = Vec::new();
    let mut unit_mismatches = Vec::new();

    for child in children {
        match parent_units.get(&child.parent_id) {
            Some(unit_index) => {
                *child_counts.entry(child.parent_id).or_default() += 1;
                if *unit_index != child.unit_index {
                    unit_mismatches.push(child.id);
                }
            }
            None => unresolved_parent_refs.push(child.id),
        }
    }

    let grouping = grouping_analysis(
        parents,
        &child_counts,
        unresolved_parent_refs.len(),
        unit_mismatches.len(),
    );

    Analysis {
        grouping,
        sizes: size_distribution(parents, children),
        tables: table_handling_stats(children),
        unresolved_parent_refs,
        unit_mismatches,
    }
}

fn grouping_analysis(
    parents: &[ParentChunk],
    child_counts: &BTreeMap<usize, usize>,
    unresolved_parent_refs: usize,
    unit_mismatches: usize,
) -> GroupingAnalysis {
    let total_groups = parents.len();
    let counts: Vec<usize> = parents
        .iter()
        .map(|p| child_counts.get(&p.id).copied().unwrap_or(0))
        .collect();

    let valid_groups = counts.iter().filter(|&&n| n > 0).count();
    let resolved_children: usize = counts.iter().sum();

    let (grouping_efficiency, avg_children_per_parent) = if total_groups == 0 {
        (0.0, 0.0)
    } else {
        (
            valid_groups as f64 / total_groups as f64,
            resolved_children as f64 / total_groups as f64,
        )
    };

    GroupingAnalysis {
        total_groups,
        valid_groups,
        empty_groups: total_groups - valid_groups,
        single_child_groups: counts.iter().filter(|&&n| n == 1).count(),
        grouping_efficiency,
        avg_children_per_parent,
        unresolved_parent_refs,
        unit_mismatches,
    }
}

fn size_distribution(parents: &[ParentChunk], children: &[ChildChunk]) -> SizeDistribution {
    let mut child_buckets = SizeBuckets::default();
    for child in children {
        child_buckets.record(child.size);
    }

    let parent_sizes: Vec<usize> = parents.iter().map(|p| p.size).collect();
    let child_sizes: Vec<usize> = children.iter().map(|c| c.size).collect();

    SizeDistribution {
        child_buckets,
        parents: SizeSummary::from_sizes(&parent_sizes),
        children: SizeSummary::from_sizes(&child_sizes),
    }
}

fn table_handling_stats(children: &[ChildChunk]) -> TableHandlingStats {
    let tables: Vec<&ChildChunk> = children.iter().filter(|c| c.is_table).collect();
    if tables.is_empty() {
        return TableHandlingStats::default();
    }

    let mut seen = BTreeSet::new();
    let mut fragmented = BTreeSet::new();
    for id in tables.iter().filter_map(|c| c.table_id.as_deref()) {
        if !seen.insert(id) {
            fragmented.insert(id.to_string());
        }
    }

    let total_size: usize = tables.iter().map(|c| c.size).sum();

    TableHandlingStats {
        table_children: tables.len(),
        oversized_tables: tables.iter().filter(|c| c.oversized).count(),
        table_child_ratio: tables.len() as f64 / children.len() as f64,
        avg_table_size: total_size as f64 / tables.len() as f64,
        largest_table_size: tables.iter().map(|c| c.size).max().unwrap_or(0),
        fragmented_table_ids: fragmented.into_iter().collect(),
    }
}

/// Page coverage over the units of a paged document.
pub fn page_coverage(unit_indices: &[usize], parents: &[ParentChunk]) -> PageCoverage {
    let seen: BTreeSet<usize> = unit_indices.iter().copied().collect();
    let with_chunks: BTreeSet<usize> = parents.iter().filter_map(|p| p.unit_index).collect();

    PageCoverage {
        pages_seen: seen.len(),
        pages_with_chunks: seen.intersection(&with_chunks).count(),
        pages_without_chunks: seen.difference(&with_chunks).copied().collect(),
    }
}
