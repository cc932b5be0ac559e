use crate::address::Address;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Keeper configuration, loaded once at startup and handed to each component.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeeperConfig {
    pub network: NetworkConfig,
    pub pool: PoolConfig,
    #[serde(default)]
    pub wallet: WalletSettings,
    #[serde(default)]
    pub strategy: StrategyConfig,
    #[serde(default)]
    pub watcher: WatcherConfig,
    #[serde(default)]
    pub tx: TxConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// JSON-RPC endpoint of the node.
    pub rpc_url: String,
    pub chain_id: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Leveraged pool contract.
    pub address: Address,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletSettings {
    /// Environment variable holding the signing key. The key itself never
    /// goes in a config file.
    #[serde(default = "default_private_key_env")]
    pub private_key_env: String,
}

impl Default for WalletSettings {
    fn default() -> Self {
        Self {
            private_key_env: default_private_key_env(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyConfig {
    /// Settlement tokens committed per mint, in human units.
    #[serde(default = "default_mint_amount")]
    pub mint_amount: Decimal,
    /// Decide and log, but never send a transaction.
    #[serde(default)]
    pub dry_run: bool,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            mint_amount: default_mint_amount(),
            dry_run: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatcherConfig {
    /// Seconds before the window closes at which the snapshot is taken.
    #[serde(default = "default_window_buffer")]
    pub commitment_window_buffer_secs: u64,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            commitment_window_buffer_secs: default_window_buffer(),
            poll_interval_secs: default_poll_interval(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TxConfig {
    /// Upper bound on every confirmation wait.
    #[serde(default = "default_confirmation_timeout")]
    pub confirmation_timeout_secs: u64,
    #[serde(default = "default_gas_price_buffer")]
    pub gas_price_buffer_pct: u64,
    #[serde(default = "default_gas_limit_buffer")]
    pub gas_limit_buffer_pct: u64,
    /// Upper bound on any single JSON-RPC request.
    #[serde(default = "default_rpc_timeout")]
    pub rpc_timeout_secs: u64,
}

impl Default for TxConfig {
    fn default() -> Self {
        Self {
            confirmation_timeout_secs: default_confirmation_timeout(),
            gas_price_buffer_pct: default_gas_price_buffer(),
            gas_limit_buffer_pct: default_gas_limit_buffer(),
            rpc_timeout_secs: default_rpc_timeout(),
        }
    }
}

fn default_private_key_env() -> String {
    "KEEPER_PRIVATE_KEY".to_string()
}

fn default_mint_amount() -> Decimal {
    dec!(50)
}

fn default_window_buffer() -> u64 {
    30
}

fn default_poll_interval() -> u64 {
    5
}

fn default_confirmation_timeout() -> u64 {
    120
}

fn default_gas_price_buffer() -> u64 {
    20
}

fn default_gas_limit_buffer() -> u64 {
    25
}

fn default_rpc_timeout() -> u64 {
    30
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid config value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl ConfigError {
    fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

impl KeeperConfig {
    /// Checks values serde cannot.
    ///
    /// # Errors
    ///
    /// Returns the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.network.rpc_url.trim().is_empty() {
            return Err(ConfigError::invalid("network.rpc_url", "must not be empty"));
        }
        if self.pool.address.is_zero() {
            return Err(ConfigError::invalid("pool.address", "zero address"));
        }
        if self.wallet.private_key_env.trim().is_empty() {
            return Err(ConfigError::invalid("wallet.private_key_env", "must not be empty"));
        }
        if self.strategy.mint_amount <= Decimal::ZERO {
            return Err(ConfigError::invalid(
                "strategy.mint_amount",
                format!("must be positive, got {}", self.strategy.mint_amount),
            ));
        }
        if self.watcher.poll_interval_secs == 0 {
            return Err(ConfigError::invalid("watcher.poll_interval_secs", "must be > 0"));
        }
        if self.tx.confirmation_timeout_secs == 0 {
            return Err(ConfigError::invalid("tx.confirmation_timeout_secs", "must be > 0"));
        }
        if self.tx.rpc_timeout_secs == 0 {
            return Err(ConfigError::invalid("tx.rpc_timeout_secs", "must be > 0"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> KeeperConfig {
        KeeperConfig {
            network: NetworkConfig {
                rpc_url: "http://localhost:8545".to_string(),
                chain_id: 421611,
            },
            pool: PoolConfig {
                address: "0x654e7b6A222a79aDeA105f997F3C1D85D20C3B02".parse().unwrap(),
            },
            wallet: WalletSettings::default(),
            strategy: StrategyConfig::default(),
            watcher: WatcherConfig::default(),
            tx: TxConfig::default(),
        }
    }

    #[test]
    fn defaults_match_reference_keeper() {
        let cfg = sample();
        assert_eq!(cfg.strategy.mint_amount, dec!(50));
        assert!(!cfg.strategy.dry_run);
        assert_eq!(cfg.watcher.commitment_window_buffer_secs, 30);
        assert_eq!(cfg.wallet.private_key_env, "KEEPER_PRIVATE_KEY");
        assert_eq!(cfg.tx.rpc_timeout_secs, 30);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn validate_rejects_bad_values() {
        let mut cfg = sample();
        cfg.network.rpc_url = "  ".to_string();
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::Invalid { field: "network.rpc_url", .. })
        ));

        let mut cfg = sample();
        cfg.strategy.mint_amount = Decimal::ZERO;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::Invalid { field: "strategy.mint_amount", .. })
        ));

        let mut cfg = sample();
        cfg.pool.address = Address::ZERO;
        assert!(cfg.validate().is_err());

        let mut cfg = sample();
        cfg.tx.confirmation_timeout_secs = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = sample();
        cfg.tx.rpc_timeout_secs = 0;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::Invalid { field: "tx.rpc_timeout_secs", .. })
        ));
    }
}
