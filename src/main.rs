use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod build;
mod commands;
mod config;

#[derive(Parser)]
#[command(version, about = "A small static site generator")]
struct Args {
    /// Log debug output (overridden by RUST_LOG)
    #[arg(short, long, global = true, default_value = "false")]
    verbose: bool,

    /// The command to execute
    #[command(subcommand)]
    command: FolioCommand,
}

#[derive(Parser)]
struct InitArgs {
    /// The path to initialize the project in
    path: PathBuf,

    /// Whether to create the directory if it doesn't exist
    #[arg(short, long, default_value = "false")]
    create: bool,
}

#[derive(Parser)]
struct BuildArgs {
    /// The path to the configuration file
    #[arg(short, long, default_value = "folio.yaml")]
    config_file: Option<PathBuf>,

    /// Build for production (same as BUILD_ENV=production); drafts are left out
    #[arg(short, long, default_value = "false")]
    production: bool,
}

#[derive(Parser)]
struct CleanArgs {
    /// The path to the configuration file
    #[arg(short, long, default_value = "folio.yaml")]
    config_file: Option<PathBuf>,

    /// Only print what would be deleted
    #[arg(short, long, default_value = "false")]
    dry_run: bool,
}

#[derive(Subcommand)]
enum FolioCommand {
    /// Initialize a new folio project
    Init(InitArgs),

    /// Build the site
    Build(BuildArgs),

    /// Delete the generated site
    Clean(CleanArgs),
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let args = Args::parse();
    init_tracing(args.verbose);

    match args.command {
        FolioCommand::Init(args) => {
            commands::init::run(&args).await?;
        }
        FolioCommand::Build(args) => {
            commands::build::run(&args).await?;
        }
        FolioCommand::Clean(args) => {
            commands::clean::run(&args).await?;
        }
    }

    Ok(())
}
