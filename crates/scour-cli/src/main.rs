//! scour CLI entry point

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use scour_cli::cmd;
use scour_cli::{Cli, Commands, WhitelistCommands};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let dry_run = cli.dry_run;
    let quiet = cli.quiet;

    match cli.command {
        Commands::Scan {
            roots,
            min_age_days,
            sort,
            json,
        } => cmd::scan::scan(&roots, min_age_days, sort, json, quiet).await,
        Commands::Clean {
            roots,
            yes,
            paths,
            min_age_days,
        } => cmd::clean::clean(&roots, yes, &paths, min_age_days, dry_run, quiet).await,
        Commands::Whitelist { command } => match command {
            WhitelistCommands::Add { path } => cmd::whitelist::add(&path, quiet),
            WhitelistCommands::List => cmd::whitelist::list(),
        },
        Commands::Completions { shell } => {
            cmd::completions::completions(shell);
            Ok(())
        }
    }
}
