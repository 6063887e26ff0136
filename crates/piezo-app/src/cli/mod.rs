use std::path::PathBuf;

use clap::{ArgAction, Args, CommandFactory, Parser, Subcommand};

use crate::options::QualityPreset;

/// Top-level CLI entry point.
#[derive(Debug, Parser)]
#[command(
    name = "piezo",
    version,
    author,
    about = "Shrink PDF files locally via a Ghostscript engine"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
    /// Increase logging verbosity (-v, -vv, -vvv).
    #[arg(global = true, short = 'v', long = "verbose", action = ArgAction::Count)]
    pub verbose: u8,
}

impl Default for Cli {
    fn default() -> Self {
        Self {
            command: None,
            verbose: 0,
        }
    }
}

impl Cli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }

    pub fn print_help() {
        let mut cmd = Cli::command();
        let _ = cmd.print_help();
        println!();
    }
}

/// Supported subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Shrink one or more PDF files.
    Compress(CompressArgs),
    /// Show which engine binary discovery would use.
    Engine(EngineArgs),
}

/// Compress PDFs through the background worker queue.
#[derive(Debug, Args)]
pub struct CompressArgs {
    /// One or more PDF files to shrink.
    #[arg(required = true, value_name = "PDF")]
    pub inputs: Vec<PathBuf>,
    /// Directory for compressed outputs (defaults to a `.shrunk.pdf`
    /// sibling of each input).
    #[arg(long, value_name = "DIR")]
    pub out_dir: Option<PathBuf>,
    /// Quality preset (`screen`, `ebook`, `printer`, `prepress`).
    #[arg(long)]
    pub preset: Option<QualityPreset>,
    /// Target image resolution in DPI.
    #[arg(long, value_name = "DPI")]
    pub resolution: Option<f64>,
    /// Downsample images only above `resolution * threshold`.
    #[arg(long, value_name = "RATIO")]
    pub threshold: Option<f64>,
    /// Convert all color content to grayscale.
    #[arg(long)]
    pub grayscale: bool,
}

/// Probe engine binary discovery.
#[derive(Debug, Args)]
pub struct EngineArgs {
    /// Explicit engine binary to probe instead of running discovery.
    #[arg(long, value_name = "PATH")]
    pub binary: Option<PathBuf>,
}
