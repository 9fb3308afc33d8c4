//! Configuration loading for hchunk.

use anyhow::{Context, Result};
use hierarchical_chunker::ChunkerConfig;
use serde::Deserialize;
use std::path::Path;

/// Contents of the optional TOML file. Only the `[chunking]` table is read;
/// missing keys keep their defaults.
#[derive(Debug, Deserialize, Default, Clone)]
pub struct Config {
    #[serde(default)]
    pub chunking: ChunkerConfig,
}

/// Values given on the command line, applied over the file.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub parent_chunk_size: Option<usize>,
    pub parent_chunk_overlap: Option<usize>,
    pub child_chunk_size: Option<usize>,
    pub child_chunk_overlap: Option<usize>,
    pub minimum_viable_length: Option<usize>,
    pub split_tables: bool,
    pub no_normalize: bool,
}

impl Config {
    pub fn apply(mut self, overrides: &Overrides) -> ChunkerConfig {
        let chunking = &mut self.chunking;
        if let Some(size) = overrides.parent_chunk_size {
            chunking.parent_chunk_size = size;
        }
        if let Some(overlap) = overrides.parent_chunk_overlap {
            chunking.parent_chunk_overlap = overlap;
        }
        if let Some(size) = overrides.child_chunk_size {
            chunking.child_chunk_size = size;
        }
        if let Some(overlap) = overrides.child_chunk_overlap {
            chunking.child_chunk_overlap = overlap;
        }
        if let Some(length) = overrides.minimum_viable_length {
            chunking.minimum_viable_length = length;
        }
        if overrides.split_tables {
            chunking.keep_tables_together = false;
        }
        if overrides.no_normalize {
            chunking.normalize_output = false;
        }
        self.chunking
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }

    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    let config: Config =
        toml::from_str(&contents).context("Failed to parse config file as TOML")?;
    Ok(config)
}
