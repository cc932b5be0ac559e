//! Keeper signing wallet.
//!
//! The private key is held in a `SecretString` (zeroized on drop), never shows
//! up in Debug output and is never logged. It is read from an environment
//! variable whose name comes from the keeper config.

use pool_keeper_core::Address;
use secrecy::{ExposeSecret, SecretString};
use std::env;
use thiserror::Error;

/// Expected length of a hex-encoded private key (without 0x prefix).
const PRIVATE_KEY_HEX_LEN: usize = 64;

/// Errors that can occur when loading the wallet.
#[derive(Debug, Error)]
pub enum WalletError {
    /// Environment variable not set or empty.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    /// Private key has invalid format.
    #[error("Invalid private key: {0}")]
    InvalidPrivateKey(String),
}

/// Where the key comes from and which chain it signs for.
#[derive(Debug, Clone)]
pub struct WalletConfig {
    private_key_env: String,
    chain_id: u64,
}

impl WalletConfig {
    #[must_use]
    pub fn new(private_key_env: impl Into<String>, chain_id: u64) -> Self {
        Self {
            private_key_env: private_key_env.into(),
            chain_id,
        }
    }

    #[must_use]
    pub fn env_var(&self) -> &str {
        &self.private_key_env
    }

    #[must_use]
    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }
}

/// Signing account for approvals and commits.
pub struct Wallet {
    /// SECURITY: Never log or expose this value.
    private_key: SecretString,
    address: Address,
    chain_id: u64,
}

impl Wallet {
    /// Creates a wallet from the environment variable named in `config`.
    ///
    /// # Errors
    /// - `WalletError::MissingEnvVar` - Environment variable not set or empty
    /// - `WalletError::InvalidPrivateKey` - Key is not a valid secp256k1 key
    pub fn from_env(config: WalletConfig) -> Result<Self, WalletError> {
        let env_var = &config.private_key_env;

        let key_raw = env::var(env_var).map_err(|_| WalletError::MissingEnvVar(env_var.clone()))?;
        if key_raw.is_empty() {
            return Err(WalletError::MissingEnvVar(env_var.clone()));
        }

        Self::from_private_key(&key_raw, config.chain_id)
    }

    /// Creates a wallet from a raw hex key, with or without `0x`.
    ///
    /// # Errors
    /// - `WalletError::InvalidPrivateKey` - Key is not a valid secp256k1 key
    pub fn from_private_key(private_key: &str, chain_id: u64) -> Result<Self, WalletError> {
        let key_hex = private_key.trim();
        let key_hex = key_hex.strip_prefix("0x").unwrap_or(key_hex);
        Self::validate_private_key(key_hex)?;
        let address = Self::derive_address(key_hex)?;

        Ok(Self {
            private_key: SecretString::from(key_hex.to_string()),
            address,
            chain_id,
        })
    }

    fn validate_private_key(key_hex: &str) -> Result<(), WalletError> {
        if key_hex.len() != PRIVATE_KEY_HEX_LEN {
            return Err(WalletError::InvalidPrivateKey(format!(
                "Expected {} hex characters, got {}",
                PRIVATE_KEY_HEX_LEN,
                key_hex.len()
            )));
        }

        if !key_hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(WalletError::InvalidPrivateKey(
                "Key contains non-hexadecimal characters".to_string(),
            ));
        }

        Ok(())
    }

    /// secp256k1 public key -> keccak256 -> last 20 bytes.
    fn derive_address(key_hex: &str) -> Result<Address, WalletError> {
        use k256::ecdsa::SigningKey;
        use sha3::{Digest, Keccak256};

        let key_bytes = hex::decode(key_hex).map_err(|e| {
            WalletError::InvalidPrivateKey(format!("Invalid hex encoding: {}", e))
        })?;

        let signing_key = SigningKey::from_slice(&key_bytes).map_err(|e| {
            WalletError::InvalidPrivateKey(format!("Invalid secp256k1 key: {}", e))
        })?;

        // Uncompressed point: 0x04 || x || y
        let public_key = signing_key.verifying_key().to_encoded_point(false);
        let hash = Keccak256::digest(&public_key.as_bytes()[1..]);

        let mut out = [0u8; 20];
        out.copy_from_slice(&hash[12..32]);
        Ok(Address::new(out))
    }

    #[must_use]
    pub fn address(&self) -> Address {
        self.address
    }

    /// EIP-55 form of the address, for display.
    #[must_use]
    pub fn checksummed_address(&self) -> String {
        eip55_checksum(self.address.as_bytes())
    }

    #[must_use]
    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// Only signing code may call this; never log or store the result.
    pub(crate) fn expose_private_key(&self) -> &str {
        self.private_key.expose_secret()
    }
}

/// Applies EIP-55 mixed-case checksum to an address.
pub fn eip55_checksum(address_bytes: &[u8; 20]) -> String {
    use sha3::{Digest, Keccak256};

    let hex_address = hex::encode(address_bytes);
    let hash = Keccak256::digest(hex_address.as_bytes());

    let mut checksummed = String::with_capacity(42);
    checksummed.push_str("0x");

    for (i, c) in hex_address.chars().enumerate() {
        let hash_byte = hash[i / 2];
        let hash_nibble = if i % 2 == 0 {
            hash_byte >> 4
        } else {
            hash_byte & 0x0f
        };

        if hash_nibble >= 8 {
            checksummed.push(c.to_ascii_uppercase());
        } else {
            checksummed.push(c);
        }
    }

    checksummed
}

impl std::fmt::Debug for Wallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Wallet")
            .field("address", &self.checksummed_address())
            .field("chain_id", &self.chain_id)
            .field("private_key", &"[REDACTED]")
            .finish()
    }
}
