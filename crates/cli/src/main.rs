use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;

use commands::{ApproveArgs, RunArgs, StatusArgs};

#[derive(Parser)]
#[command(name = "pool-keeper")]
#[command(
    about = "Keeps Tracer perpetual pools balanced by committing mints before each window closes",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Watch the pool and commit a mint whenever the skew leaves the dead zone
    Run(RunArgs),
    /// Approve the pool to spend the keeper's settlement tokens
    Approve(ApproveArgs),
    /// Print the pool state, current window and the decision it would produce
    Status(StatusArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    match cli.command {
        Commands::Run(args) => commands::run::run(args).await,
        Commands::Approve(args) => commands::approve::run(args).await,
        Commands::Status(args) => commands::status::run(args).await,
    }
}
