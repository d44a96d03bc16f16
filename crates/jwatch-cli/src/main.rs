mod check;
mod discover;
mod report;
mod run;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::check::CheckArgs;
use crate::discover::DiscoverArgs;

#[derive(Debug, Parser)]
#[command(name = "jwatch")]
#[command(about = "Watch journal RSS/Atom feeds for keyword matches")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Check every feed in the feed list and write a digest report
    Check(CheckArgs),
    /// Probe generated feed URLs and list the ones that match
    Discover(DiscoverArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = jwatch_core::load_watch_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let cancel = run::cancel_on_ctrl_c();
    match cli.command {
        Commands::Check(args) => check::run_check(&config, &args, cancel).await,
        Commands::Discover(args) => discover::run_discover(&config, &args, cancel).await,
    }
}
