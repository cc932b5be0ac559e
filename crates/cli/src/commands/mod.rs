//! CLI commands for the pool keeper.

pub mod approve;
pub mod run;
pub mod status;

pub use approve::ApproveArgs;
pub use run::RunArgs;
pub use status::StatusArgs;

use anyhow::{Context, Result};
use pool_keeper_core::KeeperConfig;
use pool_keeper_tracer::{ChainClient, RpcChainClient, Wallet, WalletConfig};
use std::sync::Arc;

/// Builds the signing chain client described by `config`.
///
/// The key is read from the environment variable named in `[wallet]`.
pub(crate) fn connect(config: &KeeperConfig) -> Result<Arc<dyn ChainClient>> {
    let wallet = Wallet::from_env(WalletConfig::new(
        config.wallet.private_key_env.clone(),
        config.network.chain_id,
    ))
    .context("failed to load keeper wallet")?;

    tracing::info!(
        account = %wallet.checksummed_address(),
        rpc = %config.network.rpc_url,
        chain_id = config.network.chain_id,
        "Keeper wallet loaded"
    );

    let client = RpcChainClient::new(config.network.rpc_url.clone(), wallet, &config.tx)
        .context("failed to build RPC client")?;
    Ok(Arc::new(client))
}
