//! Long-running keeper loop.
//!
//! Setup (pool discovery and the allowance check) must succeed before the
//! first window is watched; any failure there aborts the process. After
//! that, per-window failures are logged and the keeper keeps going.

use anyhow::{Context, Result};
use clap::Args;
use pool_keeper_core::{ConfigLoader, DEFAULT_CONFIG_PATH};
use pool_keeper_tracer::{AllowanceGuard, CommitSubmitter, PoolWatcher, WindowCycle};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Config file path
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: String,

    /// Decide and log every window without sending commits
    #[arg(long)]
    pub dry_run: bool,
}

pub async fn run(args: RunArgs) -> Result<()> {
    let mut config = ConfigLoader::load(&args.config)
        .with_context(|| format!("failed to load config from {}", args.config))?;
    config.strategy.dry_run |= args.dry_run;

    let client = super::connect(&config)?;
    let pool = config.pool.address;
    let confirmation_timeout = Duration::from_secs(config.tx.confirmation_timeout_secs);

    let mut watcher = PoolWatcher::new(Arc::clone(&client), pool, config.watcher.clone());
    let watched = watcher
        .initialize()
        .await
        .inspect_err(|e| error!(error = %e, "Pool initialization failed"))
        .context("failed to read pool contracts")?;

    let guard = AllowanceGuard::new(
        Arc::clone(&client),
        watched.settlement_token,
        pool,
        confirmation_timeout,
    );
    if config.strategy.dry_run {
        let allowance = guard
            .current_allowance()
            .await
            .context("failed to read allowance")?;
        if allowance == 0 {
            warn!("Pool is not approved; a live run would approve it first");
        }
    } else {
        let status = guard
            .ensure_allowance()
            .await
            .inspect_err(|e| error!(error = %e, "Allowance setup failed"))?;
        info!(?status, "Allowance ready");
    }

    let submitter = CommitSubmitter::with_mint_amount(
        Arc::clone(&client),
        watched.committer,
        config.strategy.mint_amount,
        watched.decimals,
        confirmation_timeout,
    )
    .context("mint amount does not fit the settlement token")?
    .dry_run(config.strategy.dry_run);

    info!(
        %pool,
        mint_amount = %config.strategy.mint_amount,
        dry_run = config.strategy.dry_run,
        "Keeper started"
    );

    let stop = watcher.stop_handle();
    let (snapshots, watcher_handle) = watcher.start()?;

    let cycle = WindowCycle::new(submitter);
    let stats = cycle.stats();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown requested, finishing current window");
            stop.store(true, Ordering::SeqCst);
        }
    });

    // returns once the watcher stops and the last queued window is handled
    cycle.run(snapshots).await;
    watcher_handle.await.context("watcher task panicked")?;

    let stats = stats.read().await;
    println!();
    println!("Windows seen:      {}", stats.windows_seen);
    println!("Commits submitted: {}", stats.commits_submitted);
    println!("Skipped:           {}", stats.skipped);
    println!("Failures:          {}", stats.failures);

    Ok(())
}
