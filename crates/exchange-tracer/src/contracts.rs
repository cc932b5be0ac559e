//! Typed views over the pool contracts the keeper touches.

use pool_keeper_core::Address;

use crate::abi;
use crate::client::ChainClient;
use crate::error::TxError;

pub const SETTLEMENT_TOKEN: &str = "settlementToken()";
pub const POOL_COMMITTER: &str = "poolCommitter()";
pub const LONG_BALANCE: &str = "longBalance()";
pub const SHORT_BALANCE: &str = "shortBalance()";
pub const LAST_PRICE_TIMESTAMP: &str = "lastPriceTimestamp()";
pub const UPDATE_INTERVAL: &str = "updateInterval()";
pub const UPDATE_INTERVAL_ID: &str = "updateIntervalId()";
pub const TOTAL_POOL_COMMITMENTS: &str = "totalPoolCommitments(uint256)";
pub const COMMIT: &str = "commit(bytes32)";
pub const DECIMALS: &str = "decimals()";
pub const ALLOWANCE: &str = "allowance(address,address)";
pub const APPROVE: &str = "approve(address,uint256)";

async fn call_word(
    client: &dyn ChainClient,
    to: Address,
    signature: &str,
    args: &[[u8; 32]],
    index: usize,
) -> Result<[u8; 32], TxError> {
    let ret = client.call(to, abi::calldata(signature, args)).await?;
    abi::word(&ret, index)
}

/// Leveraged pool.
#[derive(Debug, Clone, Copy)]
pub struct LeveragedPool {
    pub address: Address,
}

impl LeveragedPool {
    #[must_use]
    pub fn new(address: Address) -> Self {
        Self { address }
    }

    pub async fn settlement_token(&self, client: &dyn ChainClient) -> Result<Address, TxError> {
        abi::decode_address(&call_word(client, self.address, SETTLEMENT_TOKEN, &[], 0).await?)
    }

    pub async fn pool_committer(&self, client: &dyn ChainClient) -> Result<Address, TxError> {
        abi::decode_address(&call_word(client, self.address, POOL_COMMITTER, &[], 0).await?)
    }

    pub async fn long_balance(&self, client: &dyn ChainClient) -> Result<u128, TxError> {
        abi::decode_u128(&call_word(client, self.address, LONG_BALANCE, &[], 0).await?)
    }

    pub async fn short_balance(&self, client: &dyn ChainClient) -> Result<u128, TxError> {
        abi::decode_u128(&call_word(client, self.address, SHORT_BALANCE, &[], 0).await?)
    }

    /// Unix seconds of the last price update (window start).
    pub async fn last_price_timestamp(&self, client: &dyn ChainClient) -> Result<u64, TxError> {
        abi::decode_u64(&call_word(client, self.address, LAST_PRICE_TIMESTAMP, &[], 0).await?)
    }

    /// Window length in seconds.
    pub async fn update_interval(&self, client: &dyn ChainClient) -> Result<u64, TxError> {
        abi::decode_u64(&call_word(client, self.address, UPDATE_INTERVAL, &[], 0).await?)
    }
}

/// Pending mint settlement for one update interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PendingMints {
    pub long_mint_settlement: u128,
    pub short_mint_settlement: u128,
}

/// Pool committer.
#[derive(Debug, Clone, Copy)]
pub struct PoolCommitter {
    pub address: Address,
}

impl PoolCommitter {
    #[must_use]
    pub fn new(address: Address) -> Self {
        Self { address }
    }

    pub async fn update_interval_id(&self, client: &dyn ChainClient) -> Result<u128, TxError> {
        abi::decode_u128(&call_word(client, self.address, UPDATE_INTERVAL_ID, &[], 0).await?)
    }

    /// Reads the `TotalCommitment` struct for an interval. Word 0 is the long
    /// mint settlement and word 2 the short mint settlement; burns are ignored.
    pub async fn pending_mints(
        &self,
        client: &dyn ChainClient,
        update_interval_id: u128,
    ) -> Result<PendingMints, TxError> {
        let ret = client
            .call(
                self.address,
                abi::calldata(TOTAL_POOL_COMMITMENTS, &[abi::encode_u128(update_interval_id)]),
            )
            .await?;
        Ok(PendingMints {
            long_mint_settlement: abi::decode_u128(&abi::word(&ret, 0)?)?,
            short_mint_settlement: abi::decode_u128(&abi::word(&ret, 2)?)?,
        })
    }

    /// `commit(bytes32)` calldata.
    #[must_use]
    pub fn commit_calldata(args: [u8; 32]) -> Vec<u8> {
        abi::calldata(COMMIT, &[args])
    }
}

/// ERC-20 settlement token.
#[derive(Debug, Clone, Copy)]
pub struct Erc20 {
    pub address: Address,
}

impl Erc20 {
    #[must_use]
    pub fn new(address: Address) -> Self {
        Self { address }
    }

    pub async fn decimals(&self, client: &dyn ChainClient) -> Result<u32, TxError> {
        let value = abi::decode_u64(&call_word(client, self.address, DECIMALS, &[], 0).await?)?;
        u32::try_from(value).map_err(|_| TxError::Decode(format!("decimals {value} out of range")))
    }

    /// Allowance, saturated to `u128::MAX` for full-width approvals.
    pub async fn allowance(
        &self,
        client: &dyn ChainClient,
        owner: Address,
        spender: Address,
    ) -> Result<u128, TxError> {
        let word = call_word(
            client,
            self.address,
            ALLOWANCE,
            &[abi::encode_address(&owner), abi::encode_address(&spender)],
            0,
        )
        .await?;
        Ok(abi::decode_u128_saturating(&word))
    }

    #[must_use]
    pub fn approve_calldata(spender: &Address, amount: u128) -> Vec<u8> {
        abi::calldata(APPROVE, &[abi::encode_address(spender), abi::encode_u128(amount)])
    }
}
