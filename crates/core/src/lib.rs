pub mod address;
pub mod config;
pub mod config_loader;
pub mod events;
pub mod skew;
pub mod units;

pub use address::{Address, AddressError};
pub use config::{
    ConfigError, KeeperConfig, NetworkConfig, PoolConfig, StrategyConfig, TxConfig,
    WalletSettings, WatcherConfig,
};
pub use config_loader::{ConfigLoader, DEFAULT_CONFIG_PATH};
pub use events::{CommitAction, CommitRequest, CommitType, PoolStateSnapshot};
pub use skew::{
    decide, decide_snapshot, saturating_add, skew_ratio, LOWER_SKEW_BOUND, UPPER_SKEW_BOUND,
};
pub use units::{format_units, parse_units, UnitsError};
