//! In-memory pool, committer and token for tests.

use async_trait::async_trait;
use pool_keeper_core::Address;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::abi;
use crate::client::ChainClient;
use crate::contracts;
use crate::error::TxError;

#[derive(Debug, Clone)]
pub struct SentTx {
    pub to: Address,
    pub data: Vec<u8>,
}

#[derive(Debug)]
struct State {
    allowance: u128,
    decimals: u64,
    long_balance: u128,
    short_balance: u128,
    pending_long: u128,
    pending_short: u128,
    pending_long_burns: u128,
    pending_short_burns: u128,
    last_price_timestamp: u64,
    update_interval: u64,
    update_interval_id: u128,
    sent: Vec<SentTx>,
    calls: Vec<[u8; 4]>,
    fail_calls: bool,
    reject_sends: bool,
    revert_receipts: bool,
    timeout_receipts: bool,
    receipt_delay: Option<Duration>,
}

pub struct MockChain {
    pub pool: Address,
    pub committer: Address,
    pub token: Address,
    account: Address,
    state: Mutex<State>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockChain {
    pub fn new() -> Self {
        Self {
            pool: Address::new([0x01; 20]),
            committer: Address::new([0x02; 20]),
            token: Address::new([0x03; 20]),
            account: Address::new([0xAC; 20]),
            state: Mutex::new(State {
                allowance: 0,
                decimals: 18,
                long_balance: 0,
                short_balance: 0,
                pending_long: 0,
                pending_short: 0,
                pending_long_burns: 0,
                pending_short_burns: 0,
                last_price_timestamp: 0,
                update_interval: 3600,
                update_interval_id: 1,
                sent: Vec::new(),
                calls: Vec::new(),
                fail_calls: false,
                reject_sends: false,
                revert_receipts: false,
                timeout_receipts: false,
                receipt_delay: None,
            }),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    pub fn set_allowance(&self, allowance: u128) {
        self.state().allowance = allowance;
    }

    pub fn set_decimals(&self, decimals: u64) {
        self.state().decimals = decimals;
    }

    pub fn set_balances(&self, long: u128, short: u128) {
        let mut s = self.state();
        s.long_balance = long;
        s.short_balance = short;
    }

    pub fn set_pending_mints(&self, long: u128, short: u128) {
        let mut s = self.state();
        s.pending_long = long;
        s.pending_short = short;
    }

    pub fn set_pending_burns(&self, long: u128, short: u128) {
        let mut s = self.state();
        s.pending_long_burns = long;
        s.pending_short_burns = short;
    }

    pub fn set_window(
        &self,
        last_price_timestamp: u64,
        update_interval: u64,
        update_interval_id: u128,
    ) {
        let mut s = self.state();
        s.last_price_timestamp = last_price_timestamp;
        s.update_interval = update_interval;
        s.update_interval_id = update_interval_id;
    }

    pub fn fail_calls(&self, fail: bool) {
        self.state().fail_calls = fail;
    }

    pub fn reject_sends(&self, reject: bool) {
        self.state().reject_sends = reject;
    }

    pub fn revert_receipts(&self, revert: bool) {
        self.state().revert_receipts = revert;
    }

    pub fn timeout_receipts(&self, timeout: bool) {
        self.state().timeout_receipts = timeout;
    }

    pub fn delay_receipts(&self, delay: Duration) {
        self.state().receipt_delay = Some(delay);
    }

    pub fn sent(&self) -> Vec<SentTx> {
        self.state().sent.clone()
    }

    /// Number of read calls made with `signature`.
    pub fn call_count(&self, signature: &str) -> usize {
        let sel = abi::selector(signature);
        self.state().calls.iter().filter(|c| **c == sel).count()
    }

    /// Highest number of transactions observed in flight at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn uint(value: u128) -> Vec<u8> {
        abi::encode_u128(value).to_vec()
    }
}

#[async_trait]
impl ChainClient for MockChain {
    fn account(&self) -> Address {
        self.account
    }

    async fn call(&self, to: Address, data: Vec<u8>) -> Result<Vec<u8>, TxError> {
        let mut s = self.state();
        if s.fail_calls {
            return Err(TxError::Rpc("eth_call: node unavailable".to_string()));
        }
        let sel: [u8; 4] = data
            .get(..4)
            .and_then(|b| b.try_into().ok())
            .ok_or_else(|| TxError::Rpc("short calldata".to_string()))?;
        s.calls.push(sel);

        let is = |sig: &str| sel == abi::selector(sig);

        if to == self.pool {
            if is(contracts::SETTLEMENT_TOKEN) {
                return Ok(abi::encode_address(&self.token).to_vec());
            }
            if is(contracts::POOL_COMMITTER) {
                return Ok(abi::encode_address(&self.committer).to_vec());
            }
            if is(contracts::LONG_BALANCE) {
                return Ok(Self::uint(s.long_balance));
            }
            if is(contracts::SHORT_BALANCE) {
                return Ok(Self::uint(s.short_balance));
            }
            if is(contracts::LAST_PRICE_TIMESTAMP) {
                return Ok(Self::uint(u128::from(s.last_price_timestamp)));
            }
            if is(contracts::UPDATE_INTERVAL) {
                return Ok(Self::uint(u128::from(s.update_interval)));
            }
        } else if to == self.committer {
            if is(contracts::UPDATE_INTERVAL_ID) {
                return Ok(Self::uint(s.update_interval_id));
            }
            if is(contracts::TOTAL_POOL_COMMITMENTS) {
                let mut out = Vec::with_capacity(7 * 32);
                let words = [
                    s.pending_long,
                    s.pending_long_burns,
                    s.pending_short,
                    s.pending_short_burns,
                    0,
                    0,
                    s.update_interval_id,
                ];
                for value in words {
                    out.extend_from_slice(&abi::encode_u128(value));
                }
                return Ok(out);
            }
        } else if to == self.token {
            if is(contracts::DECIMALS) {
                return Ok(Self::uint(u128::from(s.decimals)));
            }
            if is(contracts::ALLOWANCE) {
                return Ok(Self::uint(s.allowance));
            }
        }

        Err(TxError::Rpc("eth_call: execution reverted".to_string()))
    }

    async fn send_transaction(&self, to: Address, data: Vec<u8>) -> Result<String, TxError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let mut s = self.state();
        if s.reject_sends {
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            return Err(TxError::Rejected("insufficient funds for gas".to_string()));
        }

        let is_approve = data.get(..4) == Some(&abi::selector(contracts::APPROVE)[..]);
        if to == self.token && is_approve && !s.revert_receipts {
            let word = abi::word(&data[4..], 1)?;
            s.allowance = abi::decode_u128_saturating(&word);
        }

        s.sent.push(SentTx { to, data });
        Ok(format!("0x{:064x}", s.sent.len()))
    }

    async fn wait_for_receipt(&self, _tx_hash: &str, timeout: Duration) -> Result<bool, TxError> {
        let (delay, timeout_receipts, revert) = {
            let s = self.state();
            (s.receipt_delay, s.timeout_receipts, s.revert_receipts)
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay.min(timeout)).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if timeout_receipts {
            return Err(TxError::Timeout);
        }
        Ok(!revert)
    }
}
