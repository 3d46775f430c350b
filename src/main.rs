use anyhow::Result;
use clap::Parser;
use commentmap::cli::{Cli, Commands};
use commentmap::commands::{self, ContextOptions, ExtractOptions};

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbosity);

    match cli.command {
        Commands::Extract {
            snapshot,
            output,
            format,
            jobs,
            chunk_size,
            resume,
            config,
            quiet,
        } => commands::run_extract(ExtractOptions {
            snapshot,
            output,
            format,
            jobs,
            chunk_size,
            resume,
            config,
            quiet,
        }),
        Commands::Metrics { file, json } => commands::run_metrics(&file, json),
        Commands::Context {
            file,
            start,
            end,
            config,
        } => commands::run_context(ContextOptions {
            file: &file,
            start,
            end,
            config: config.as_deref(),
        }),
        Commands::Init { force } => commands::init_config(force),
    }
}

/// `RUST_LOG` wins over `-v` flags; without either only warnings are shown
fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp(None)
        .init();
}
