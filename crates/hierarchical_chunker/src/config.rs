// src/config.rs

use serde::{Deserialize, Serialize};

use crate::error::{ChunkerError, Result};

/// Default parent chunk size in characters.
pub const DEFAULT_PARENT_CHUNK_SIZE: usize = 2000;

/// Default overlap carried between re-split parent chunks.
pub const DEFAULT_PARENT_CHUNK_OVERLAP: usize = 200;

/// Default child chunk size in characters (fits a 512-token rerank window).
pub const DEFAULT_CHILD_CHUNK_SIZE: usize = 350;

/// Default overlap carried between child chunks.
pub const DEFAULT_CHILD_CHUNK_OVERLAP: usize = 50;

/// Default threshold below which a chunk counts as a bare heading.
pub const DEFAULT_MINIMUM_VIABLE_LENGTH: usize = 30;

/// Options recognised by the pipeline. All sizes are in characters.
///
/// The configuration is read-only once a [`HierarchicalChunker`] has been
/// built from it, so one value can be shared across worker threads.
///
/// [`HierarchicalChunker`]: crate::HierarchicalChunker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkerConfig {
    pub parent_chunk_size: usize,
    pub parent_chunk_overlap: usize,
    pub child_chunk_size: usize,
    pub child_chunk_overlap: usize,
    /// When false, tables are split like ordinary text and the
    /// oversized-atomic exception is disabled.
    pub keep_tables_together: bool,
    pub normalize_output: bool,
    pub minimum_viable_length: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            parent_chunk_size: DEFAULT_PARENT_CHUNK_SIZE,
            parent_chunk_overlap: DEFAULT_PARENT_CHUNK_OVERLAP,
            child_chunk_size: DEFAULT_CHILD_CHUNK_SIZE,
            child_chunk_overlap: DEFAULT_CHILD_CHUNK_OVERLAP,
            keep_tables_together: true,
            normalize_output: true,
            minimum_viable_length: DEFAULT_MINIMUM_VIABLE_LENGTH,
        }
    }
}

impl ChunkerConfig {
    /// Reject configurations the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        check_level("parent", self.parent_chunk_size, self.parent_chunk_overlap)?;
        check_level("child", self.child_chunk_size, self.child_chunk_overlap)?;
        Ok(())
    }
}

fn check_level(level: &str, size: usize, overlap: usize) -> Result<()> {
    if size == 0 {
        return Err(ChunkerError::InvalidConfig(format!(
            "{level}_chunk_size must be positive"
        )));
    }
    if overlap >= size {
        return Err(ChunkerError::InvalidConfig(format!(
            "{level}_chunk_overlap ({overlap}) must be smaller than {level}_chunk_size ({size})"
        )));
    }
    Ok(())
}
