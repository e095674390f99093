mod commands;
mod render;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "entropia",
    about = "Evidence support & decay diagnostics (non-normative)",
    long_about = "Entropia scans a public web page and reports how well its factual claims \
are supported by the sources it cites.\n\nIt does not determine what is true, correct, \
legal, authentic, or valid. Entropia is a mirror, not an oracle."
)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Scan a single URL and generate an evidence support report
    Scan(commands::scan::ScanArgs),
    /// Scan multiple URLs from a file in parallel
    Batch(commands::batch::BatchArgs),
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Print version information
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(default_level.into()))
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Scan(args) => commands::scan::run(args, cli.verbose).await,
        Command::Batch(args) => commands::batch::run(args, cli.verbose).await,
        Command::Config { action } => commands::config::run(action),
        Command::Version => {
            println!("entropia v{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
