use std::path::PathBuf;

use clap::{Parser, ValueEnum};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// URL of the file to download
    #[arg(index = 1)]
    pub url: String,

    /// Where to write the file (defaults to the last segment of the URL)
    #[arg(short = 'o', long)]
    pub output: Option<PathBuf>,

    /// Number of concurrent range requests
    #[arg(short = 'c', long, conflicts_with = "chunk_size")]
    pub concurrency: Option<u64>,

    /// Split into chunks of roughly this many bytes instead of a fixed count
    #[arg(long = "chunk-size", value_parser = clap::value_parser!(u64).range(1..))]
    pub chunk_size: Option<u64>,

    /// Give up after this many seconds
    #[arg(short = 't', long)]
    pub timeout: Option<u64>,

    /// Parent directory for chunk storage (defaults to the system temp dir)
    #[arg(long = "storage-dir")]
    pub storage_dir: Option<PathBuf>,

    /// Leave the chunk directory in place after a successful download
    #[arg(short = 'k', long = "keep-chunks")]
    pub keep_chunks: bool,

    /// Per-chunk progress bars: auto (only on a terminal), on, off
    #[arg(long, value_enum, default_value = "auto")]
    pub progress: ProgressMode,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProgressMode {
    Auto,
    On,
    Off,
}

impl ProgressMode {
    pub fn enabled(self) -> bool {
        match self {
            ProgressMode::On => true,
            ProgressMode::Off => false,
            ProgressMode::Auto => std::io::IsTerminal::is_terminal(&std::io::stderr()),
        }
    }
}
