//! CLI command to approve the pool for the settlement token.

use anyhow::{Context, Result};
use clap::Args;
use pool_keeper_core::{ConfigLoader, DEFAULT_CONFIG_PATH};
use pool_keeper_tracer::{AllowanceGuard, AllowanceStatus, PoolWatcher};
use std::sync::Arc;
use std::time::Duration;

/// Approve the pool to pull settlement tokens from the keeper account.
///
/// Sends at most one transaction, and none if an allowance is already set.
/// `run` does the same on startup; this is for setting it up ahead of time.
#[derive(Args, Debug)]
pub struct ApproveArgs {
    /// Config file path
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: String,
}

pub async fn run(args: ApproveArgs) -> Result<()> {
    let config = ConfigLoader::load(&args.config)
        .with_context(|| format!("failed to load config from {}", args.config))?;
    let client = super::connect(&config)?;

    let mut watcher = PoolWatcher::new(
        Arc::clone(&client),
        config.pool.address,
        config.watcher.clone(),
    );
    let watched = watcher.initialize().await?;

    println!("Pool:    {}", config.pool.address);
    println!("Token:   {}", watched.settlement_token);
    println!("Account: {}", client.account());
    println!();

    let guard = AllowanceGuard::new(
        client,
        watched.settlement_token,
        config.pool.address,
        Duration::from_secs(config.tx.confirmation_timeout_secs),
    );

    match guard.ensure_allowance().await? {
        AllowanceStatus::AlreadyApproved { allowance } => {
            println!("Already approved (allowance {allowance}), nothing sent.");
        }
        AllowanceStatus::Approved { tx_hash } => {
            println!("Approved. Transaction: {tx_hash}");
        }
        AllowanceStatus::Cached => println!("Already approved."),
    }

    Ok(())
}
