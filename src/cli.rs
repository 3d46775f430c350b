use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "commentmap")]
#[command(about = "Feature extraction for code-review comments on Python files", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase log verbosity (-v: info, -vv: debug, -vvv: trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, global = true)]
    pub verbosity: u8,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Extract feature records for every comment in a snapshot
    Extract {
        /// Snapshot file, or a directory of snapshot files
        snapshot: PathBuf,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "jsonl")]
        format: OutputFormat,

        /// Worker threads (0 = one per core)
        #[arg(short = 'j', long = "jobs", env = "COMMENTMAP_JOBS")]
        jobs: Option<usize>,

        /// Comments per parallel batch
        #[arg(long = "chunk-size")]
        chunk_size: Option<usize>,

        /// Keep records already in the output file and skip their comments
        #[arg(long, requires = "output")]
        resume: bool,

        /// Config file to use instead of searching for .commentmap.toml
        #[arg(long)]
        config: Option<PathBuf>,

        /// Hide progress bars
        #[arg(short, long)]
        quiet: bool,
    },

    /// Show code metrics of a Python file
    Metrics {
        /// Python source file
        file: PathBuf,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Show the context resolved for a range of lines
    Context {
        /// Python source file
        file: PathBuf,

        /// First line of the range (1-based)
        #[arg(long)]
        start: usize,

        /// Last line of the range (defaults to --start)
        #[arg(long)]
        end: Option<usize>,

        /// Config file to use instead of searching for .commentmap.toml
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Write a default .commentmap.toml to the current directory
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// One JSON record per line
    Jsonl,
    /// Pretty-printed JSON array
    Json,
}

impl From<OutputFormat> for crate::io::OutputFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Jsonl => crate::io::OutputFormat::JsonLines,
            OutputFormat::Json => crate::io::OutputFormat::Json,
        }
    }
}
