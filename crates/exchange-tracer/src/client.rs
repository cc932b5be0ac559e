//! Chain access seam.
//!
//! Everything above this module talks to the chain through [`ChainClient`],
//! so the guard, submitter and watcher can be tested against an in-memory
//! chain. [`RpcChainClient`] is the JSON-RPC implementation.

use async_trait::async_trait;
use pool_keeper_core::{Address, TxConfig};
use reqwest::Client;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::TxError;
use crate::evm_tx::{self, LegacyTx};
use crate::signer::Wallet;

/// Receipt polling cadence.
const RECEIPT_POLL_INTERVAL: Duration = Duration::from_secs(2);

#[async_trait]
pub trait ChainClient: Send + Sync {
    /// The signing account.
    fn account(&self) -> Address;

    /// Read-only call, returns raw ABI return data.
    async fn call(&self, to: Address, data: Vec<u8>) -> Result<Vec<u8>, TxError>;

    /// Signs and broadcasts a transaction from [`ChainClient::account`].
    /// Returns the transaction hash.
    async fn send_transaction(&self, to: Address, data: Vec<u8>) -> Result<String, TxError>;

    /// Waits up to `timeout` for the receipt. `Ok(false)` means it reverted.
    async fn wait_for_receipt(&self, tx_hash: &str, timeout: Duration) -> Result<bool, TxError>;
}

/// JSON-RPC chain client signing with a local [`Wallet`].
pub struct RpcChainClient {
    http: Client,
    rpc_url: String,
    wallet: Wallet,
    gas_price_buffer_pct: u64,
    gas_limit_buffer_pct: u64,
    /// Held across nonce lookup and broadcast so sends never share a nonce.
    send_lock: Mutex<()>,
}

impl RpcChainClient {
    /// Every request made through this client is bounded by
    /// `tx.rpc_timeout_secs`.
    ///
    /// # Errors
    ///
    /// Fails if the HTTP client cannot be built.
    pub fn new(
        rpc_url: impl Into<String>,
        wallet: Wallet,
        tx: &TxConfig,
    ) -> Result<Self, TxError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(tx.rpc_timeout_secs))
            .build()?;

        Ok(Self {
            http,
            rpc_url: rpc_url.into(),
            wallet,
            gas_price_buffer_pct: tx.gas_price_buffer_pct,
            gas_limit_buffer_pct: tx.gas_limit_buffer_pct,
            send_lock: Mutex::new(()),
        })
    }

    #[must_use]
    pub fn wallet(&self) -> &Wallet {
        &self.wallet
    }

    #[must_use]
    pub fn rpc_url(&self) -> &str {
        &self.rpc_url
    }
}

/// `value` plus `pct` percent.
fn with_buffer(value: u64, pct: u64) -> u64 {
    value.saturating_add(value.saturating_mul(pct) / 100)
}

#[async_trait]
impl ChainClient for RpcChainClient {
    fn account(&self) -> Address {
        self.wallet.address()
    }

    async fn call(&self, to: Address, data: Vec<u8>) -> Result<Vec<u8>, TxError> {
        evm_tx::eth_call(&self.http, &self.rpc_url, &to.to_hex(), &data).await
    }

    async fn send_transaction(&self, to: Address, data: Vec<u8>) -> Result<String, TxError> {
        let _guard = self.send_lock.lock().await;

        let from = self.wallet.address().to_hex();
        let to_hex = to.to_hex();

        let nonce = evm_tx::get_nonce(&self.http, &self.rpc_url, &from).await?;
        let gas_price = evm_tx::get_gas_price(&self.http, &self.rpc_url).await?;
        let gas_estimate =
            evm_tx::estimate_gas(&self.http, &self.rpc_url, &from, &to_hex, &data).await?;

        let tx = LegacyTx {
            nonce,
            gas_price: with_buffer(gas_price, self.gas_price_buffer_pct),
            gas_limit: with_buffer(gas_estimate, self.gas_limit_buffer_pct),
            to: *to.as_bytes(),
            value: [0u8; 32],
            data,
        };

        debug!(
            nonce,
            gas_price = tx.gas_price,
            gas_limit = tx.gas_limit,
            to = %to_hex,
            "Signing transaction"
        );

        let signed = evm_tx::sign_legacy_tx(
            &tx,
            self.wallet.chain_id(),
            self.wallet.expose_private_key(),
        )?;
        let hash = evm_tx::broadcast_tx(&self.http, &self.rpc_url, &signed).await?;
        info!(tx_hash = %hash, nonce, to = %to_hex, "Transaction sent");

        Ok(hash)
    }

    async fn wait_for_receipt(&self, tx_hash: &str, timeout: Duration) -> Result<bool, TxError> {
        evm_tx::wait_for_receipt(
            &self.http,
            &self.rpc_url,
            tx_hash,
            timeout,
            RECEIPT_POLL_INTERVAL,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    fn rpc_result(result: serde_json::Value) -> ResponseTemplate {
        ResponseTemplate::new(200)
            .set_body_json(json!({ "jsonrpc": "2.0", "id": 1, "result": result }))
    }

    async fn mount(server: &MockServer, rpc_method: &str, result: serde_json::Value) {
        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "method": rpc_method })))
            .respond_with(rpc_result(result))
            .mount(server)
            .await;
    }

    fn client(server: &MockServer) -> RpcChainClient {
        let wallet = Wallet::from_private_key(KEY, 421611).unwrap();
        RpcChainClient::new(server.uri(), wallet, &TxConfig::default()).unwrap()
    }

    #[test]
    fn buffer_adds_percentage() {
        assert_eq!(with_buffer(100, 20), 120);
        assert_eq!(with_buffer(100, 0), 100);
        assert_eq!(with_buffer(u64::MAX, 50), u64::MAX);
    }

    #[tokio::test]
    async fn call_decodes_hex_result() {
        let server = MockServer::start().await;
        mount(&server, "eth_call", json!(format!("0x{}", "00".repeat(31) + "12"))).await;

        let out = client(&server)
            .call(Address::new([1; 20]), vec![0x31, 0x3c, 0xe5, 0x67])
            .await
            .unwrap();
        assert_eq!(out.len(), 32);
        assert_eq!(out[31], 0x12);
    }

    #[tokio::test]
    async fn send_transaction_signs_and_broadcasts() {
        let server = MockServer::start().await;
        mount(&server, "eth_getTransactionCount", json!("0x5")).await;
        mount(&server, "eth_gasPrice", json!("0x3b9aca00")).await;
        mount(&server, "eth_estimateGas", json!("0x186a0")).await;
        mount(&server, "eth_sendRawTransaction", json!("0xfeed")).await;

        let client = client(&server);
        assert_eq!(
            client.account().to_hex(),
            "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266"
        );

        let hash = client
            .send_transaction(Address::new([2; 20]), vec![0xde, 0xad])
            .await
            .unwrap();
        assert_eq!(hash, "0xfeed");
    }

    #[tokio::test]
    async fn send_transaction_propagates_estimate_failure() {
        let server = MockServer::start().await;
        mount(&server, "eth_getTransactionCount", json!("0x0")).await;
        mount(&server, "eth_gasPrice", json!("0x1")).await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "method": "eth_estimateGas" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0", "id": 1,
                "error": { "code": 3, "message": "execution reverted" }
            })))
            .mount(&server)
            .await;

        let err = client(&server)
            .send_transaction(Address::new([2; 20]), vec![])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("execution reverted"));
    }

    #[tokio::test]
    async fn hung_call_is_bounded_by_rpc_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(rpc_result(json!("0x")).set_delay(Duration::from_secs(5)))
            .mount(&server)
            .await;

        let tx = TxConfig {
            rpc_timeout_secs: 1,
            ..TxConfig::default()
        };
        let wallet = Wallet::from_private_key(KEY, 421611).unwrap();
        let client = RpcChainClient::new(server.uri(), wallet, &tx).unwrap();

        let started = std::time::Instant::now();
        let err = client.call(Address::new([1; 20]), vec![0x31]).await.unwrap_err();

        assert!(matches!(err, TxError::Http(_)));
        assert!(started.elapsed() < Duration::from_secs(3));
    }
}
