//! Minimal EVM transaction construction and JSON-RPC transport.
//!
//! Legacy (type 0) transactions with EIP-155 replay protection, signed with
//! `k256` over a `sha3` keccak digest. No SDK dependencies.

use k256::ecdsa::SigningKey;
use reqwest::Client;
use serde_json::{json, Value};
use sha3::{Digest, Keccak256};
use std::time::Duration;
use tracing::{debug, info};

use crate::error::TxError;

// =============================================================================
// RLP Encoding
// =============================================================================

fn rlp_encode_bytes(data: &[u8]) -> Vec<u8> {
    if data.len() == 1 && data[0] < 0x80 {
        // Single byte < 0x80: encoded as itself
        vec![data[0]]
    } else if data.len() <= 55 {
        let mut out = Vec::with_capacity(1 + data.len());
        out.push(0x80 + data.len() as u8);
        out.extend_from_slice(data);
        out
    } else {
        let len_bytes = to_minimal_be_bytes(data.len() as u64);
        let mut out = Vec::with_capacity(1 + len_bytes.len() + data.len());
        out.push(0xb7 + len_bytes.len() as u8);
        out.extend_from_slice(&len_bytes);
        out.extend_from_slice(data);
        out
    }
}

fn rlp_encode_u64(val: u64) -> Vec<u8> {
    rlp_encode_uint_bytes(&val.to_be_bytes())
}

/// Big-endian unsigned integer, leading zeros stripped.
fn rlp_encode_uint_bytes(val: &[u8]) -> Vec<u8> {
    rlp_encode_bytes(strip_leading_zeros(val))
}

fn rlp_encode_list(items: &[Vec<u8>]) -> Vec<u8> {
    let payload: Vec<u8> = items.iter().flat_map(|i| i.iter().copied()).collect();
    let payload_len = payload.len();

    if payload_len <= 55 {
        let mut out = Vec::with_capacity(1 + payload_len);
        out.push(0xc0 + payload_len as u8);
        out.extend_from_slice(&payload);
        out
    } else {
        let len_bytes = to_minimal_be_bytes(payload_len as u64);
        let mut out = Vec::with_capacity(1 + len_bytes.len() + payload_len);
        out.push(0xf7 + len_bytes.len() as u8);
        out.extend_from_slice(&len_bytes);
        out.extend_from_slice(&payload);
        out
    }
}

fn to_minimal_be_bytes(val: u64) -> Vec<u8> {
    let bytes = val.to_be_bytes();
    let stripped = strip_leading_zeros(&bytes);
    if stripped.is_empty() {
        vec![0]
    } else {
        stripped.to_vec()
    }
}

fn strip_leading_zeros(data: &[u8]) -> &[u8] {
    let start = data.iter().position(|&b| b != 0).unwrap_or(data.len());
    &data[start..]
}

// =============================================================================
// Transaction Signing (EIP-155)
// =============================================================================

/// A legacy (type 0) transaction.
#[derive(Debug, Clone)]
pub struct LegacyTx {
    pub nonce: u64,
    /// Gas price in wei.
    pub gas_price: u64,
    pub gas_limit: u64,
    pub to: [u8; 20],
    /// Value in wei, U256 big-endian. Always zero for keeper transactions.
    pub value: [u8; 32],
    pub data: Vec<u8>,
}

/// Signs a legacy transaction with EIP-155 replay protection.
///
/// Returns the RLP-encoded signed transaction ready for broadcasting.
pub fn sign_legacy_tx(
    tx: &LegacyTx,
    chain_id: u64,
    private_key_hex: &str,
) -> Result<Vec<u8>, TxError> {
    // EIP-155 signing payload ends with (chain_id, 0, 0)
    let unsigned_rlp = rlp_encode_list(&[
        rlp_encode_u64(tx.nonce),
        rlp_encode_u64(tx.gas_price),
        rlp_encode_u64(tx.gas_limit),
        rlp_encode_bytes(&tx.to),
        rlp_encode_uint_bytes(&tx.value),
        rlp_encode_bytes(&tx.data),
        rlp_encode_u64(chain_id),
        rlp_encode_bytes(&[]),
        rlp_encode_bytes(&[]),
    ]);

    let hash = Keccak256::digest(&unsigned_rlp);

    let key_bytes = hex::decode(private_key_hex.strip_prefix("0x").unwrap_or(private_key_hex))
        .map_err(|e| TxError::InvalidKey(e.to_string()))?;
    let signing_key =
        SigningKey::from_slice(&key_bytes).map_err(|e| TxError::InvalidKey(e.to_string()))?;

    let (signature, recovery_id) = signing_key
        .sign_prehash_recoverable(&hash)
        .map_err(|e| TxError::Signing(e.to_string()))?;

    let r_bytes = signature.r().to_bytes();
    let s_bytes = signature.s().to_bytes();

    // EIP-155: v = chain_id * 2 + 35 + recovery_id
    let v = chain_id
        .checked_mul(2)
        .and_then(|v| v.checked_add(35 + u64::from(recovery_id.to_byte())))
        .ok_or_else(|| TxError::Signing(format!("chain id {chain_id} too large")))?;

    Ok(rlp_encode_list(&[
        rlp_encode_u64(tx.nonce),
        rlp_encode_u64(tx.gas_price),
        rlp_encode_u64(tx.gas_limit),
        rlp_encode_bytes(&tx.to),
        rlp_encode_uint_bytes(&tx.value),
        rlp_encode_bytes(&tx.data),
        rlp_encode_u64(v),
        rlp_encode_uint_bytes(r_bytes.as_slice()),
        rlp_encode_uint_bytes(s_bytes.as_slice()),
    ]))
}

/// Keccak hash of a signed transaction, i.e. its transaction hash.
#[must_use]
pub fn tx_hash(signed_tx: &[u8]) -> String {
    format!("0x{}", hex::encode(Keccak256::digest(signed_tx)))
}

// =============================================================================
// RPC Helpers
// =============================================================================

/// Sends one JSON-RPC request and returns its `result`.
async fn rpc_request(
    http: &Client,
    rpc_url: &str,
    method: &str,
    params: Value,
) -> Result<Value, TxError> {
    let body = json!({
        "jsonrpc": "2.0",
        "method": method,
        "params": params,
        "id": 1
    });

    let resp: Value = http.post(rpc_url).json(&body).send().await?.json().await?;

    if let Some(error) = resp.get("error") {
        let msg = error
            .get("message")
            .and_then(|m| m.as_str())
            .unwrap_or("unknown error");
        return Err(TxError::Rpc(format!("{method}: {msg}")));
    }

    resp.get("result")
        .cloned()
        .ok_or_else(|| TxError::Rpc(format!("{method}: no result in response")))
}

/// Pending transaction count, so back-to-back sends get fresh nonces.
pub async fn get_nonce(http: &Client, rpc_url: &str, address: &str) -> Result<u64, TxError> {
    let result = rpc_request(
        http,
        rpc_url,
        "eth_getTransactionCount",
        json!([address, "pending"]),
    )
    .await?;
    parse_hex_u64(&result)
}

pub async fn get_gas_price(http: &Client, rpc_url: &str) -> Result<u64, TxError> {
    let result = rpc_request(http, rpc_url, "eth_gasPrice", json!([])).await?;
    parse_hex_u64(&result)
}

pub async fn estimate_gas(
    http: &Client,
    rpc_url: &str,
    from: &str,
    to: &str,
    data: &[u8],
) -> Result<u64, TxError> {
    let result = rpc_request(
        http,
        rpc_url,
        "eth_estimateGas",
        json!([{ "from": from, "to": to, "data": format!("0x{}", hex::encode(data)) }]),
    )
    .await?;
    parse_hex_u64(&result)
}

/// Read-only contract call against the latest block.
pub async fn eth_call(
    http: &Client,
    rpc_url: &str,
    to: &str,
    data: &[u8],
) -> Result<Vec<u8>, TxError> {
    let result = rpc_request(
        http,
        rpc_url,
        "eth_call",
        json!([{ "to": to, "data": format!("0x{}", hex::encode(data)) }, "latest"]),
    )
    .await?;

    let hex_str = result
        .as_str()
        .ok_or_else(|| TxError::Decode(format!("eth_call result is not a string: {result}")))?;
    hex::decode(hex_str.strip_prefix("0x").unwrap_or(hex_str))
        .map_err(|e| TxError::Decode(format!("eth_call result hex: {e}")))
}

/// Broadcasts a signed transaction and returns its hash.
pub async fn broadcast_tx(
    http: &Client,
    rpc_url: &str,
    signed_tx: &[u8],
) -> Result<String, TxError> {
    let tx_hex = format!("0x{}", hex::encode(signed_tx));

    let result = rpc_request(http, rpc_url, "eth_sendRawTransaction", json!([tx_hex]))
        .await
        .map_err(|e| match e {
            TxError::Rpc(msg) => TxError::Rejected(msg),
            other => other,
        })?;

    result
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| TxError::Rpc("No tx hash in response".to_string()))
}

/// Polls for a receipt until it appears or `timeout` elapses.
///
/// Returns `true` if the transaction succeeded (status = 1).
pub async fn wait_for_receipt(
    http: &Client,
    rpc_url: &str,
    tx_hash: &str,
    timeout: Duration,
    poll_interval: Duration,
) -> Result<bool, TxError> {
    // the deadline covers in-flight requests, not only the gaps between polls
    tokio::time::timeout(timeout, poll_receipt(http, rpc_url, tx_hash, poll_interval))
        .await
        .map_err(|_| TxError::Timeout)?
}

async fn poll_receipt(
    http: &Client,
    rpc_url: &str,
    tx_hash: &str,
    poll_interval: Duration,
) -> Result<bool, TxError> {
    loop {
        let result =
            rpc_request(http, rpc_url, "eth_getTransactionReceipt", json!([tx_hash])).await?;

        if !result.is_null() {
            let status = result
                .get("status")
                .and_then(|s| s.as_str())
                .unwrap_or("0x0");
            let success = status == "0x1";

            if success {
                info!(tx_hash, "Transaction confirmed");
            } else {
                debug!(tx_hash, "Transaction reverted");
            }

            return Ok(success);
        }

        tokio::time::sleep(poll_interval).await;
    }
}

fn parse_hex_u64(result: &Value) -> Result<u64, TxError> {
    let hex_str = result
        .as_str()
        .ok_or_else(|| TxError::Rpc(format!("expected hex string, got {result}")))?;

    let stripped = hex_str.strip_prefix("0x").unwrap_or(hex_str);
    u64::from_str_radix(stripped, 16)
        .map_err(|e| TxError::Rpc(format!("Failed to parse hex '{}': {}", hex_str, e)))
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    fn sample_tx(nonce: u64) -> LegacyTx {
        LegacyTx {
            nonce,
            gas_price: 30_000_000_000,
            gas_limit: 100_000,
            to: [0u8; 20],
            value: [0u8; 32],
            data: vec![],
        }
    }

    #[test]
    fn rlp_encodes_bytes() {
        assert_eq!(rlp_encode_bytes(&[]), vec![0x80]);
        assert_eq!(rlp_encode_bytes(&[0x42]), vec![0x42]);
        assert_eq!(rlp_encode_bytes(&[0x80]), vec![0x81, 0x80]);
        let long = [0x11u8; 56];
        let encoded = rlp_encode_bytes(&long);
        assert_eq!(&encoded[..2], &[0xb8, 56]);
        assert_eq!(encoded.len(), 58);
    }

    #[test]
    fn rlp_encodes_integers() {
        assert_eq!(rlp_encode_u64(0), vec![0x80]);
        assert_eq!(rlp_encode_u64(127), vec![0x7f]);
        assert_eq!(rlp_encode_u64(128), vec![0x81, 0x80]);
        assert_eq!(rlp_encode_u64(1000), vec![0x82, 0x03, 0xe8]);

        let mut val = [0u8; 32];
        assert_eq!(rlp_encode_uint_bytes(&val), vec![0x80]);
        val[31] = 1;
        assert_eq!(rlp_encode_uint_bytes(&val), vec![0x01]);
    }

    #[test]
    fn rlp_encodes_lists() {
        assert_eq!(rlp_encode_list(&[]), vec![0xc0]);
        let items = vec![rlp_encode_u64(1), rlp_encode_u64(2)];
        assert_eq!(rlp_encode_list(&items), vec![0xc2, 0x01, 0x02]);
    }

    #[test]
    fn signed_tx_is_rlp_list_and_nonce_sensitive() {
        let a = sign_legacy_tx(&sample_tx(0), 421611, KEY).unwrap();
        let b = sign_legacy_tx(&sample_tx(1), 421611, KEY).unwrap();
        assert!(a[0] >= 0xc0, "Should be an RLP list");
        assert_ne!(a, b);
        assert_ne!(tx_hash(&a), tx_hash(&b));
        assert_eq!(tx_hash(&a).len(), 66);
    }

    #[test]
    fn chain_id_changes_signature() {
        let a = sign_legacy_tx(&sample_tx(0), 1, KEY).unwrap();
        let b = sign_legacy_tx(&sample_tx(0), 421611, KEY).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn bad_key_is_rejected() {
        assert!(matches!(
            sign_legacy_tx(&sample_tx(0), 1, "nothex"),
            Err(TxError::InvalidKey(_))
        ));
    }

    #[tokio::test]
    async fn rpc_error_is_surfaced() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "method": "eth_gasPrice" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0", "id": 1,
                "error": { "code": -32000, "message": "boom" }
            })))
            .mount(&server)
            .await;

        let err = get_gas_price(&Client::new(), &server.uri()).await.unwrap_err();
        assert!(err.to_string().contains("boom"));
    }

    #[tokio::test]
    async fn broadcast_rejection_maps_to_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "method": "eth_sendRawTransaction" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0", "id": 1,
                "error": { "code": -32000, "message": "insufficient funds for gas" }
            })))
            .mount(&server)
            .await;

        let err = broadcast_tx(&Client::new(), &server.uri(), &[0xc0])
            .await
            .unwrap_err();
        assert!(matches!(err, TxError::Rejected(msg) if msg.contains("insufficient funds")));
    }

    #[tokio::test]
    async fn receipt_status_decides_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "params": ["0xok"] })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0", "id": 1, "result": { "status": "0x1" }
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "params": ["0xbad"] })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0", "id": 1, "result": { "status": "0x0" }
            })))
            .mount(&server)
            .await;

        let http = Client::new();
        let timeout = Duration::from_secs(5);
        let poll = Duration::from_millis(10);
        assert!(wait_for_receipt(&http, &server.uri(), "0xok", timeout, poll).await.unwrap());
        assert!(!wait_for_receipt(&http, &server.uri(), "0xbad", timeout, poll).await.unwrap());
    }

    #[tokio::test]
    async fn missing_receipt_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0", "id": 1, "result": null
            })))
            .mount(&server)
            .await;

        let err = wait_for_receipt(
            &Client::new(),
            &server.uri(),
            "0xpending",
            Duration::from_millis(50),
            Duration::from_millis(10),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, TxError::Timeout));
    }

    #[tokio::test]
    async fn hung_receipt_request_is_cut_off_at_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "jsonrpc": "2.0", "id": 1, "result": null }))
                    .set_delay(Duration::from_secs(4)),
            )
            .mount(&server)
            .await;

        let started = std::time::Instant::now();
        let err = wait_for_receipt(
            &Client::new(),
            &server.uri(),
            "0xslow",
            Duration::from_millis(200),
            Duration::from_millis(10),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, TxError::Timeout));
        assert!(started.elapsed() < Duration::from_secs(1));
    }
}
