//! hchunk - batch hierarchical chunking
//!
//! Usage:
//!   hchunk report.json notes.md -o out/     Write <stem>.chunks.json per input
//!   hchunk docs/*.json --summary            Print one line per document
//!   hchunk report.json --config hchunk.toml --child-size 300

mod batch;
mod config;

use anyhow::{Context, Result};
use batch::{run_batch, OutputMode};
use clap::Parser;
use config::{load_config, Overrides};
use hierarchical_chunker::HierarchicalChunker;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "hchunk")]
#[command(about = "Split converted documents into parent and child chunks")]
#[command(version)]
struct Cli {
    /// Converter output (.json) or markdown/text files
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// TOML file with a [chunking] table
    #[arg(short, long, value_name = "PATH", default_value = "hchunk.toml")]
    config: PathBuf,

    /// Directory for <stem>.chunks.json results
    #[arg(short, long, value_name = "DIR", default_value = ".")]
    output_dir: PathBuf,

    /// Print a summary per document instead of writing results
    #[arg(long)]
    summary: bool,

    #[arg(long, value_name = "CHARS")]
    parent_size: Option<usize>,

    #[arg(long, value_name = "CHARS")]
    parent_overlap: Option<usize>,

    #[arg(long, value_name = "CHARS")]
    child_size: Option<usize>,

    #[arg(long, value_name = "CHARS")]
    child_overlap: Option<usize>,

    /// Chunks shorter than this are merged into their successor
    #[arg(long, value_name = "CHARS")]
    min_length: Option<usize>,

    /// Split tables like ordinary text
    #[arg(long)]
    split_tables: bool,

    /// Keep text as the converter produced it
    #[arg(long)]
    no_normalize: bool,

    /// Debug logging
    #[arg(short = 'v', long)]
    verbose: bool,
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            parent_chunk_size: self.parent_size,
            parent_chunk_overlap: self.parent_overlap,
            child_chunk_size: self.child_size,
            child_chunk_overlap: self.child_overlap,
            minimum_viable_length: self.min_length,
            split_tables: self.split_tables,
            no_normalize: self.no_normalize,
        }
    }
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    let chunking = load_config(&cli.config)?.apply(&cli.overrides());
    let chunker = HierarchicalChunker::new(chunking).context("Invalid chunking configuration")?;

    let mode = if cli.summary {
        OutputMode::Summary
    } else {
        std::fs::create_dir_all(&cli.output_dir).with_context(|| {
            format!("Failed to create output directory: {}", cli.output_dir.display())
        })?;
        OutputMode::Directory(cli.output_dir.clone())
    };

    let outcomes = run_batch(&cli.inputs, &chunker, &mode);

    let mut failed = 0;
    for outcome in &outcomes {
        match &outcome.result {
            Ok(summary) => match &summary.written_to {
                Some(path) => println!("{}: {summary} -> {}", outcome.input.display(), path.display()),
                None => println!("{}: {summary}", outcome.input.display()),
            },
            Err(err) => {
                failed += 1;
                eprintln!("{}: error: {err:#}", outcome.input.display());
            }
        }
    }

    if failed > 0 {
        eprintln!("{failed} of {} documents failed", outcomes.len());
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}
