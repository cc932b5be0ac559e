use crate::config::KeeperConfig;
use anyhow::Result;
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use std::path::Path;

/// Default location of the keeper config file.
pub const DEFAULT_CONFIG_PATH: &str = "config/Keeper.toml";

/// Environment prefix; nested keys use `__`, e.g. `KEEPER_NETWORK__RPC_URL`.
pub const ENV_PREFIX: &str = "KEEPER_";

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads the keeper configuration by merging the TOML file with environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be parsed, a required key is missing,
    /// or a value fails validation.
    pub fn load(path: impl AsRef<Path>) -> Result<KeeperConfig> {
        let config: KeeperConfig = Figment::new()
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;

        config.validate()?;
        tracing::debug!(path = %path.as_ref().display(), "keeper config loaded");

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const TOML: &str = r#"
        [network]
        rpc_url = "http://localhost:8545"
        chain_id = 421611

        [pool]
        address = "0x654e7b6A222a79aDeA105f997F3C1D85D20C3B02"

        [strategy]
        mint_amount = "25.5"
    "#;

    #[test]
    fn loads_toml_with_defaults() {
        figment::Jail::expect_with(|jail| {
            jail.create_file("Keeper.toml", TOML)?;
            let cfg = ConfigLoader::load("Keeper.toml").map_err(|e| e.to_string())?;
            assert_eq!(cfg.network.chain_id, 421611);
            assert_eq!(cfg.strategy.mint_amount, dec!(25.5));
            assert_eq!(cfg.watcher.poll_interval_secs, 5);
            assert_eq!(cfg.tx.confirmation_timeout_secs, 120);
            Ok(())
        });
    }

    #[test]
    fn env_overrides_nested_keys() {
        figment::Jail::expect_with(|jail| {
            jail.create_file("Keeper.toml", TOML)?;
            jail.set_env("KEEPER_NETWORK__RPC_URL", "http://node:8545");
            jail.set_env("KEEPER_WATCHER__COMMITMENT_WINDOW_BUFFER_SECS", "45");
            let cfg = ConfigLoader::load("Keeper.toml").map_err(|e| e.to_string())?;
            assert_eq!(cfg.network.rpc_url, "http://node:8545");
            assert_eq!(cfg.watcher.commitment_window_buffer_secs, 45);
            Ok(())
        });
    }

    #[test]
    fn invalid_values_fail_to_load() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "Keeper.toml",
                r#"
                [network]
                rpc_url = "http://localhost:8545"
                chain_id = 1

                [pool]
                address = "0x654e7b6A222a79aDeA105f997F3C1D85D20C3B02"

                [strategy]
                mint_amount = "0"
                "#,
            )?;
            assert!(ConfigLoader::load("Keeper.toml").is_err());
            Ok(())
        });
    }
}
