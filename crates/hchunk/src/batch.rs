//! Parallel processing of a batch of converter outputs.
//!
//! Every input is handled on its own: a document that fails to load or to
//! chunk is reported and the rest of the batch carries on.

use anyhow::{bail, Context, Result};
use hierarchical_chunker::{ConvertedDocument, HierarchicalChunker, HierarchicalResult};
use rayon::prelude::*;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// What to do with each result.
#[derive(Debug, Clone)]
pub enum OutputMode {
    /// Write `<stem>.chunks.json` into this directory.
    Directory(PathBuf),
    /// Only report a one-line summary.
    Summary,
}

/// Result of one input file.
#[derive(Debug)]
pub struct DocumentOutcome {
    pub input: PathBuf,
    pub result: Result<DocumentSummary>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DocumentSummary {
    pub parents: usize,
    pub children: usize,
    pub tables: usize,
    pub oversized_tables: usize,
    pub defects: usize,
    pub written_to: Option<PathBuf>,
}

impl DocumentSummary {
    fn from_result(result: &HierarchicalResult, written_to: Option<PathBuf>) -> Self {
        let defects = &result.defects;
        Self {
            parents: result.parent_chunks.len(),
            children: result.child_chunks.len(),
            tables: result.table_handling_stats.table_children,
            oversized_tables: result.table_handling_stats.oversized_tables,
            defects: defects.page_defects.len()
                + defects.undersized_parents.len()
                + defects.undersized_children.len()
                + defects.malformed_tables.len()
                + defects.unresolved_parent_refs.len()
                + defects.unit_mismatches.len(),
            written_to,
        }
    }
}

impl std::fmt::Display for DocumentSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} parents, {} children, {} tables ({} oversized), {} defects",
            self.parents, self.children, self.tables, self.oversized_tables, self.defects
        )
    }
}

/// Chunk every input in parallel. Outcomes come back in input order.
///
/// Inputs that would write the same output file fail instead of overwriting
/// each other.
pub fn run_batch(
    inputs: &[PathBuf],
    chunker: &HierarchicalChunker,
    mode: &OutputMode,
) -> Vec<DocumentOutcome> {
    let shared = match mode {
        OutputMode::Directory(dir) => shared_outputs(inputs, dir),
        OutputMode::Summary => HashSet::new(),
    };

    inputs
        .par_iter()
        .map(|input| {
            let result = process_file(input, chunker, mode, &shared);
            if let Err(err) = &result {
                tracing::warn!(input = %input.display(), "{err:#}");
            }
            DocumentOutcome {
                input: input.clone(),
                result,
            }
        })
        .collect()
}

fn process_file(
    input: &Path,
    chunker: &HierarchicalChunker,
    mode: &OutputMode,
    shared: &HashSet<PathBuf>,
) -> Result<DocumentSummary> {
    if let OutputMode::Directory(dir) = mode {
        let output = output_path(dir, input);
        if shared.contains(&output) {
            bail!(
                "Output {} is shared with another input, rename one of them",
                output.display()
            );
        }
    }

    let document = load_document(input)?;
    let result = chunker
        .chunk_document(&document)
        .with_context(|| format!("Failed to chunk {}", input.display()))?;

    let written_to = match mode {
        OutputMode::Directory(dir) => Some(write_result(dir, input, &result)?),
        OutputMode::Summary => None,
    };
    Ok(DocumentSummary::from_result(&result, written_to))
}

/// Read converter JSON, or markdown/plain text as an unstructured document.
pub fn load_document(path: &Path) -> Result<ConvertedDocument> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read input file: {}", path.display()))?;
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    match extension.as_str() {
        "json" => {
            let mut document = ConvertedDocument::from_json_str(&contents)
                .with_context(|| format!("Failed to parse converter output: {}", path.display()))?;
            if document.metadata.file_name.is_empty() {
                document.metadata.file_name = file_name;
            }
            Ok(document)
        }
        "md" | "markdown" | "txt" => {
            let mut document = ConvertedDocument::from_markdown(contents, file_name, extension);
            document.metadata.file_path = Some(path.display().to_string());
            Ok(document)
        }
        other => bail!("Unsupported input type '{other}': {}", path.display()),
    }
}

/// `<dir>/<stem>.chunks.json`
fn output_path(dir: &Path, input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());
    dir.join(format!("{stem}.chunks.json"))
}

/// Output paths claimed by more than one input, e.g. `report.json` and
/// `report.md`.
fn shared_outputs(inputs: &[PathBuf], dir: &Path) -> HashSet<PathBuf> {
    let mut seen = HashSet::new();
    let mut shared = HashSet::new();
    for input in inputs {
        let path = output_path(dir, input);
        if !seen.insert(path.clone()) {
            shared.insert(path);
        }
    }
    shared
}

fn write_result(dir: &Path, input: &Path, result: &HierarchicalResult) -> Result<PathBuf> {
    let path = output_path(dir, input);

    let json = serde_json::to_string_pretty(result).context("Failed to serialize result")?;
    std::fs::write(&path, json)
        .with_context(|| format!("Failed to write result: {}", path.display()))?;
    Ok(path)
}
