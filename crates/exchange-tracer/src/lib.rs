//! Tracer perpetual pools integration for the skew keeper.
//!
//! This crate provides:
//! - A JSON-RPC [`ChainClient`] with local EIP-155 signing
//! - Typed views over the leveraged pool, its committer and the settlement token
//! - [`AllowanceGuard`]: one-time settlement token approval for the pool
//! - [`PoolWatcher`]: snapshots raised shortly before each commitment window closes
//! - [`CommitSubmitter`] and [`WindowCycle`]: decide and commit once per window
//!
//! # Example
//!
//! ```no_run
//! use pool_keeper_tracer::{
//!     AllowanceGuard, ChainClient, PoolWatcher, RpcChainClient, Wallet, WalletConfig,
//! };
//! use pool_keeper_core::{TxConfig, WatcherConfig};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn demo() -> anyhow::Result<()> {
//! let wallet = Wallet::from_env(WalletConfig::new("KEEPER_PRIVATE_KEY", 421611))?;
//! let rpc = RpcChainClient::new("http://localhost:8545", wallet, &TxConfig::default())?;
//! let client: Arc<dyn ChainClient> = Arc::new(rpc);
//! let pool = "0x654e7b6A222a79aDeA105f997F3C1D85D20C3B02".parse()?;
//!
//! let mut watcher = PoolWatcher::new(Arc::clone(&client), pool, WatcherConfig::default());
//! let watched = watcher.initialize().await?;
//!
//! let timeout = Duration::from_secs(120);
//! let guard = AllowanceGuard::new(client, watched.settlement_token, pool, timeout);
//! guard.ensure_allowance().await?;
//! # Ok(())
//! # }
//! ```

pub mod abi;
pub mod approvals;
pub mod client;
pub mod commit_encoder;
pub mod committer;
pub mod contracts;
pub mod error;
pub mod evm_tx;
pub mod pool_watcher;
pub mod signer;
pub mod window_cycle;

#[cfg(test)]
mod mock;

pub use approvals::{AllowanceGuard, AllowanceStatus, APPROVAL_AMOUNT};
pub use client::{ChainClient, RpcChainClient};
pub use commit_encoder::{encode_commit_params, encode_request};
pub use committer::{CommitSubmitter, SubmitOutcome};
pub use error::{KeeperError, TxError};
pub use pool_watcher::{PoolWatcher, WatchedPool, WatcherError, WindowTiming};
pub use signer::{Wallet, WalletConfig, WalletError};
pub use window_cycle::{CycleOutcome, CyclePhase, WindowCycle, WindowCycleStats};
