use std::path::PathBuf;

use clap::Parser;

use crate::{encoder::DEFAULT_BATCH_SIZE, session::SessionConfig};

#[derive(Debug, Parser)]
#[command(
    name = "lostfiles",
    about = "Find the text file you lost by describing what it says"
)]
pub struct Cli {
    /// Override the XDG data directory
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Override the sentence embedding model ID or local model path
    #[arg(long)]
    pub model: Option<String>,

    /// Number of results to show per query
    #[arg(short = 'k', long, default_value = "5", value_parser = clap::value_parser!(u32).range(1..))]
    pub top_k: u32,

    /// Number of documents per model call while encoding
    #[arg(long, default_value_t = DEFAULT_BATCH_SIZE as u32, value_parser = clap::value_parser!(u32).range(1..))]
    pub batch_size: u32,

    /// Log encoding progress instead of drawing a progress bar
    #[arg(long)]
    pub no_progress: bool,

    /// Increase log verbosity (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

impl Cli {
    /// Session settings derived from the command line. Table paths are
    /// filled in by the caller once the data directory is known.
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            top_k: self.top_k as usize,
            batch_size: self.batch_size as usize,
            ..SessionConfig::default()
        }
    }
}
