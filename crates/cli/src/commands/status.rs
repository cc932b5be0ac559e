//! Read-only view of the pool and the keeper's next decision.

use anyhow::{Context, Result};
use clap::Args;
use pool_keeper_core::{decide_snapshot, format_units, ConfigLoader, DEFAULT_CONFIG_PATH};
use pool_keeper_tracer::{AllowanceGuard, PoolWatcher};
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;

/// Print pool balances, pending mints, the current window and the decision.
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Config file path
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: String,
}

pub async fn run(args: StatusArgs) -> Result<()> {
    let config = ConfigLoader::load(&args.config)
        .with_context(|| format!("failed to load config from {}", args.config))?;
    let client = super::connect(&config)?;

    let mut watcher = PoolWatcher::new(
        Arc::clone(&client),
        config.pool.address,
        config.watcher.clone(),
    );
    let watched = watcher.initialize().await?;
    let timing = watcher.window_timing().await?;
    let snapshot = watcher.snapshot(timing.ends_at).await?;

    let guard = AllowanceGuard::new(
        Arc::clone(&client),
        watched.settlement_token,
        config.pool.address,
        Duration::from_secs(config.tx.confirmation_timeout_secs),
    );
    let allowance = guard.current_allowance().await?;

    println!("Account:         {}", client.account());
    println!("Pool:            {}", snapshot.pool);
    println!("Committer:       {}", watched.committer);
    println!("Settlement:      {} ({} decimals)", watched.settlement_token, watched.decimals);
    println!();
    println!("Window:          #{}", snapshot.update_interval_id);
    println!("Closes at:       {}", snapshot.window_ends_at);
    println!("Keeper acts at:  unix {}", timing.notify_at);
    println!();
    println!("Long balance:    {}", snapshot.long_balance);
    println!("Short balance:   {}", snapshot.short_balance);
    println!("Pending long:    {}", snapshot.pending_long_mints);
    println!("Pending short:   {}", snapshot.pending_short_mints);
    if snapshot.expected_skew == Decimal::MAX {
        println!("Expected skew:   unbounded (empty short side)");
    } else {
        println!("Expected skew:   {}", snapshot.expected_skew.round_dp(6));
    }
    println!("Decision:        {}", decide_snapshot(&snapshot));
    println!();

    if allowance == u128::MAX {
        println!("Allowance:       unlimited");
    } else {
        let human = format_units(allowance, watched.decimals).map_or_else(
            |_| allowance.to_string(),
            |amount| amount.to_string(),
        );
        println!("Allowance:       {human}");
    }

    Ok(())
}
