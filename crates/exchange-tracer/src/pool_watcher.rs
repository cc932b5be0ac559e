//! Pool watcher: raises one snapshot per commitment window, a configurable
//! number of seconds before the window closes.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────┐
//! │ LeveragedPool        │  lastPriceTimestamp, balances
//! │ PoolCommitter        │  pending mints
//! └──────────┬───────────┘
//!            │ poll
//!            ▼
//! ┌──────────────────────┐
//! │ PoolWatcher task     │  due = window close - buffer
//! └──────────┬───────────┘
//!            │ mpsc (capacity 1, overflow dropped)
//!            ▼
//! ┌──────────────────────┐
//! │ WindowCycle          │
//! └──────────────────────┘
//! ```

use chrono::{DateTime, TimeZone, Utc};
use pool_keeper_core::{
    format_units, saturating_add, skew_ratio, Address, PoolStateSnapshot, WatcherConfig,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::client::ChainClient;
use crate::contracts::{Erc20, LeveragedPool, PoolCommitter};
use crate::error::TxError;

/// One pending window notification at most; see [`PoolWatcher::start`].
const SNAPSHOT_CHANNEL_CAPACITY: usize = 1;

#[derive(Debug, Error)]
pub enum WatcherError {
    #[error("pool watcher used before initialize()")]
    NotInitialized,

    #[error("pool initialization failed: {0}")]
    Chain(#[from] TxError),
}

/// Pool facts resolved once by [`PoolWatcher::initialize`].
#[derive(Debug, Clone, Copy)]
pub struct WatchedPool {
    pub committer: Address,
    pub settlement_token: Address,
    pub decimals: u32,
    /// Window length in seconds.
    pub update_interval: u64,
}

/// Timing of the current window, unix seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowTiming {
    pub starts_at: u64,
    pub ends_at: u64,
    /// When the ending notification is due.
    pub notify_at: u64,
}

impl WindowTiming {
    #[must_use]
    pub fn new(last_price_timestamp: u64, update_interval: u64, buffer_secs: u64) -> Self {
        let ends_at = last_price_timestamp.saturating_add(update_interval);
        Self {
            starts_at: last_price_timestamp,
            ends_at,
            notify_at: ends_at.saturating_sub(buffer_secs).max(last_price_timestamp),
        }
    }
}

/// What the poll loop should do at `now`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollDecision {
    /// Take a snapshot and notify.
    Notify,
    /// Not due yet; sleep at most this long.
    Wait(Duration),
    /// Already notified for this window, or it closed before we saw it.
    Idle,
}

/// Decides what to do for `timing` at `now`, given the window end that was
/// last notified.
#[must_use]
pub fn poll_decision(now: u64, timing: &WindowTiming, last_notified: Option<u64>) -> PollDecision {
    if last_notified == Some(timing.ends_at) || now >= timing.ends_at {
        PollDecision::Idle
    } else if now >= timing.notify_at {
        PollDecision::Notify
    } else {
        PollDecision::Wait(Duration::from_secs(timing.notify_at - now))
    }
}

fn to_datetime(secs: u64) -> DateTime<Utc> {
    i64::try_from(secs)
        .ok()
        .and_then(|s| Utc.timestamp_opt(s, 0).single())
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Watches a single pool and emits [`PoolStateSnapshot`]s.
pub struct PoolWatcher {
    client: Arc<dyn ChainClient>,
    pool: LeveragedPool,
    config: WatcherConfig,
    watched: Option<WatchedPool>,
    should_stop: Arc<AtomicBool>,
}

impl PoolWatcher {
    pub fn new(client: Arc<dyn ChainClient>, pool: Address, config: WatcherConfig) -> Self {
        Self {
            client,
            pool: LeveragedPool::new(pool),
            config,
            watched: None,
            should_stop: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Resolves committer, settlement token, decimals and window length.
    /// Must be called before [`PoolWatcher::start`].
    pub async fn initialize(&mut self) -> Result<WatchedPool, WatcherError> {
        let client = self.client.as_ref();
        let committer = self.pool.pool_committer(client).await?;
        let settlement_token = self.pool.settlement_token(client).await?;
        let decimals = Erc20::new(settlement_token).decimals(client).await?;
        let update_interval = self.pool.update_interval(client).await?;

        let watched = WatchedPool {
            committer,
            settlement_token,
            decimals,
            update_interval,
        };
        info!(
            pool = %self.pool.address,
            committer = %committer,
            settlement_token = %settlement_token,
            decimals,
            update_interval,
            "Watched pool initialized"
        );
        self.watched = Some(watched);
        Ok(watched)
    }

    #[must_use]
    pub fn watched(&self) -> Option<WatchedPool> {
        self.watched
    }

    #[must_use]
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.should_stop)
    }

    /// Timing of the window currently open on chain.
    pub async fn window_timing(&self) -> Result<WindowTiming, WatcherError> {
        let watched = self.watched.ok_or(WatcherError::NotInitialized)?;
        let last = self.pool.last_price_timestamp(self.client.as_ref()).await?;
        Ok(WindowTiming::new(
            last,
            watched.update_interval,
            self.config.commitment_window_buffer_secs,
        ))
    }

    /// Reads balances and pending mints and projects the post-window skew.
    pub async fn snapshot(&self, window_ends_at: u64) -> Result<PoolStateSnapshot, WatcherError> {
        let watched = self.watched.ok_or(WatcherError::NotInitialized)?;
        let client = self.client.as_ref();
        let committer = PoolCommitter::new(watched.committer);

        let long = self.pool.long_balance(client).await?;
        let short = self.pool.short_balance(client).await?;
        let update_interval_id = committer.update_interval_id(client).await?;
        let pending = committer.pending_mints(client, update_interval_id).await?;

        let d = watched.decimals;
        let units = |amount| format_units(amount, d).map_err(TxError::from);
        let long_balance = units(long)?;
        let short_balance = units(short)?;
        let pending_long_mints = units(pending.long_mint_settlement)?;
        let pending_short_mints = units(pending.short_mint_settlement)?;

        // pending burns are not projected, only mints
        let expected_skew = skew_ratio(
            saturating_add(long_balance, pending_long_mints),
            saturating_add(short_balance, pending_short_mints),
        );

        Ok(PoolStateSnapshot {
            pool: self.pool.address,
            update_interval_id,
            window_ends_at: to_datetime(window_ends_at),
            long_balance,
            short_balance,
            pending_long_mints,
            pending_short_mints,
            expected_skew,
            observed_at: Utc::now(),
        })
    }

    /// Spawns the polling task.
    ///
    /// Snapshots go through a channel holding one pending item. A snapshot
    /// produced while that slot is still occupied is dropped with a warning,
    /// so at most one cycle runs and at most one waits.
    ///
    /// # Errors
    ///
    /// `WatcherError::NotInitialized` if [`PoolWatcher::initialize`] has not
    /// succeeded.
    pub fn start(
        self,
    ) -> Result<(mpsc::Receiver<PoolStateSnapshot>, JoinHandle<()>), WatcherError> {
        if self.watched.is_none() {
            return Err(WatcherError::NotInitialized);
        }
        let (tx, rx) = mpsc::channel(SNAPSHOT_CHANNEL_CAPACITY);
        let handle = tokio::spawn(self.run(tx));
        Ok((rx, handle))
    }

    async fn run(self, tx: mpsc::Sender<PoolStateSnapshot>) {
        info!(
            pool = %self.pool.address,
            buffer_secs = self.config.commitment_window_buffer_secs,
            "Watching pool"
        );

        let poll_interval = Duration::from_secs(self.config.poll_interval_secs);
        let mut last_notified: Option<u64> = None;

        loop {
            if self.should_stop.load(Ordering::SeqCst) {
                info!("Pool watcher stopped");
                return;
            }
            if tx.is_closed() {
                info!("Snapshot receiver dropped, pool watcher exiting");
                return;
            }

            let sleep_for = match self.poll_once(&tx, &mut last_notified).await {
                Ok(Some(wait)) => wait.min(poll_interval),
                Ok(None) => poll_interval,
                Err(e) => {
                    warn!(error = %e, "Pool poll failed");
                    poll_interval
                }
            };

            tokio::time::sleep(sleep_for).await;
        }
    }

    /// One poll. Returns how long until the next notification is due, if known.
    async fn poll_once(
        &self,
        tx: &mpsc::Sender<PoolStateSnapshot>,
        last_notified: &mut Option<u64>,
    ) -> Result<Option<Duration>, WatcherError> {
        let timing = self.window_timing().await?;
        let now = u64::try_from(Utc::now().timestamp()).unwrap_or(0);

        match poll_decision(now, &timing, *last_notified) {
            PollDecision::Wait(wait) => {
                debug!(
                    ends_at = timing.ends_at,
                    wait_secs = wait.as_secs(),
                    "Window not ending yet"
                );
                Ok(Some(wait))
            }
            PollDecision::Idle => Ok(None),
            PollDecision::Notify => {
                let snapshot = self.snapshot(timing.ends_at).await?;
                *last_notified = Some(timing.ends_at);

                info!(
                    window_id = snapshot.update_interval_id,
                    mint_projected_skew = %snapshot.expected_skew,
                    ends_at = %snapshot.window_ends_at,
                    "Commitment window ending"
                );

                match tx.try_send(snapshot) {
                    Ok(()) => {}
                    Err(TrySendError::Full(dropped)) => warn!(
                        window_id = dropped.update_interval_id,
                        "Previous window cycle still running, notification dropped"
                    ),
                    Err(TrySendError::Closed(_)) => {}
                }
                Ok(None)
            }
        }
    }
}
