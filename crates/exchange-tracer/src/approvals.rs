//! Settlement token spend approval for the pool.
//!
//! Must succeed before the keeper watches any window: a mint pulls settlement
//! tokens from the wallet, which reverts without an allowance.

use pool_keeper_core::Address;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

use crate::client::ChainClient;
use crate::contracts::Erc20;
use crate::error::{KeeperError, TxError};

/// Approval size: `2^128 - 1`, treated as unlimited.
pub const APPROVAL_AMOUNT: u128 = u128::MAX;

/// Result of [`AllowanceGuard::ensure_allowance`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllowanceStatus {
    /// An allowance was already in place; nothing was sent.
    AlreadyApproved { allowance: u128 },
    /// An approval was sent and confirmed.
    Approved { tx_hash: String },
    /// A previous call on this guard already succeeded.
    Cached,
}

/// Makes sure the pool may pull settlement tokens from the keeper account.
pub struct AllowanceGuard {
    client: Arc<dyn ChainClient>,
    token: Erc20,
    spender: Address,
    confirmation_timeout: Duration,
    ensured: AtomicBool,
}

impl AllowanceGuard {
    /// `spender` is the pool contract.
    pub fn new(
        client: Arc<dyn ChainClient>,
        token: Address,
        spender: Address,
        confirmation_timeout: Duration,
    ) -> Self {
        Self {
            client,
            token: Erc20::new(token),
            spender,
            confirmation_timeout,
            ensured: AtomicBool::new(false),
        }
    }

    /// Current allowance of the keeper account towards the pool.
    pub async fn current_allowance(&self) -> Result<u128, TxError> {
        self.token
            .allowance(self.client.as_ref(), self.client.account(), self.spender)
            .await
    }

    /// Approves the pool if the current allowance is zero, waiting for the
    /// approval to confirm.
    ///
    /// # Errors
    ///
    /// `KeeperError::Setup` if the allowance cannot be read or the approval
    /// is rejected, reverts or does not confirm in time.
    pub async fn ensure_allowance(&self) -> Result<AllowanceStatus, KeeperError> {
        if self.ensured.load(Ordering::SeqCst) {
            return Ok(AllowanceStatus::Cached);
        }

        let allowance = self
            .current_allowance()
            .await
            .map_err(|e| KeeperError::setup("reading allowance", e))?;

        info!(
            pool = %self.spender,
            token = %self.token.address,
            allowance,
            "Pool settlement token allowance"
        );

        if allowance > 0 {
            self.ensured.store(true, Ordering::SeqCst);
            return Ok(AllowanceStatus::AlreadyApproved { allowance });
        }

        info!(pool = %self.spender, "Approving settlement token spend for pool");

        let tx_hash = self
            .client
            .send_transaction(
                self.token.address,
                Erc20::approve_calldata(&self.spender, APPROVAL_AMOUNT),
            )
            .await
            .map_err(|e| {
                error!(error = %e, "Approval transaction rejected");
                KeeperError::setup("sending approval", e)
            })?;

        match self
            .client
            .wait_for_receipt(&tx_hash, self.confirmation_timeout)
            .await
        {
            Ok(true) => {}
            Ok(false) => {
                error!(tx_hash = %tx_hash, "Approval transaction reverted");
                return Err(KeeperError::setup(
                    "confirming approval",
                    TxError::Reverted(tx_hash),
                ));
            }
            Err(e) => {
                error!(tx_hash = %tx_hash, error = %e, "Approval not confirmed");
                return Err(KeeperError::setup("confirming approval", e));
            }
        }

        info!(tx_hash = %tx_hash, pool = %self.spender, "Settlement token spend approved");
        self.ensured.store(true, Ordering::SeqCst);

        Ok(AllowanceStatus::Approved { tx_hash })
    }
}
