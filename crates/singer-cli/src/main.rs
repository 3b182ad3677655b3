mod commands;
mod logging;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "singer-sync",
    version,
    about = "Run Singer taps into targets with checkpoints kept in S3"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Directory holding singer_project_config.yml
    #[arg(long, default_value = ".", global = true)]
    project_dir: PathBuf,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a tap into a target, resuming from the last checkpoint
    Sync {
        /// Tap name (e.g., "shopify" or "tap-shopify")
        #[arg(long)]
        tap: String,
        /// Target name (e.g., "redshift" or "target-redshift")
        #[arg(long)]
        target: String,
        /// Start from scratch instead of the last checkpoint
        #[arg(long)]
        ignore_state: bool,
    },
    /// Run a tap in discovery mode and write its catalog
    Discover {
        /// Tap name
        #[arg(long)]
        tap: String,
    },
    /// Create a virtualenv for every declared connector
    Install,
    /// Summarize stream and property selection in a tap's catalog
    Inspect {
        /// Tap name
        #[arg(long)]
        tap: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    logging::init(&cli.log_level);

    match cli.command {
        Commands::Sync {
            tap,
            target,
            ignore_state,
        } => commands::sync::execute(&cli.project_dir, tap, target, ignore_state).await,
        Commands::Discover { tap } => commands::discover::execute(&cli.project_dir, &tap).await,
        Commands::Install => commands::install::execute(&cli.project_dir).await,
        Commands::Inspect { tap } => commands::inspect::execute(&cli.project_dir, &tap),
    }
}
