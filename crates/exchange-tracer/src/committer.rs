//! Commit submission for one window.

use pool_keeper_core::{parse_units, Address, CommitAction, CommitRequest, UnitsError};
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::client::ChainClient;
use crate::commit_encoder::encode_request;
use crate::contracts::PoolCommitter;
use crate::error::{KeeperError, TxError};

/// What a call to [`CommitSubmitter::submit`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Transaction confirmed.
    Submitted { tx_hash: String, request: CommitRequest },
    /// Dry run: the request was built but not sent.
    DryRun { request: CommitRequest },
    /// Nothing to do for a no-op decision.
    Skipped,
}

/// Sends one mint commitment per non-no-op decision.
pub struct CommitSubmitter {
    client: Arc<dyn ChainClient>,
    committer: PoolCommitter,
    /// Mint size in settlement token base units.
    amount: u128,
    confirmation_timeout: Duration,
    dry_run: bool,
}

impl CommitSubmitter {
    pub fn new(
        client: Arc<dyn ChainClient>,
        committer: Address,
        amount: u128,
        confirmation_timeout: Duration,
    ) -> Self {
        Self {
            client,
            committer: PoolCommitter::new(committer),
            amount,
            confirmation_timeout,
            dry_run: false,
        }
    }

    /// Builds a submitter from a human-readable mint amount.
    ///
    /// # Errors
    ///
    /// Fails if `mint_amount` cannot be represented at `decimals`.
    pub fn with_mint_amount(
        client: Arc<dyn ChainClient>,
        committer: Address,
        mint_amount: Decimal,
        decimals: u32,
        confirmation_timeout: Duration,
    ) -> Result<Self, UnitsError> {
        let amount = parse_units(mint_amount, decimals)?;
        Ok(Self::new(client, committer, amount, confirmation_timeout))
    }

    #[must_use]
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    #[must_use]
    pub fn amount(&self) -> u128 {
        self.amount
    }

    /// The request `action` would submit, `None` for a no-op.
    #[must_use]
    pub fn request_for(&self, action: CommitAction) -> Option<CommitRequest> {
        action
            .commit_type()
            .map(|commit_type| CommitRequest::wallet_mint(commit_type, self.amount))
    }

    /// Submits the commit for `action` and waits for it to confirm.
    ///
    /// Sends at most one transaction and never retries.
    ///
    /// # Errors
    ///
    /// `KeeperError::Submission` if sending fails, the transaction reverts or
    /// it does not confirm within the timeout.
    pub async fn submit(
        &self,
        window_id: u128,
        action: CommitAction,
    ) -> Result<SubmitOutcome, KeeperError> {
        let Some(request) = self.request_for(action) else {
            return Ok(SubmitOutcome::Skipped);
        };

        if self.dry_run {
            info!(window_id, %action, amount = request.amount, "Dry run, commit not sent");
            return Ok(SubmitOutcome::DryRun { request });
        }

        info!(window_id, %action, amount = request.amount, "Submitting commit");

        let calldata = PoolCommitter::commit_calldata(encode_request(&request));
        let tx_hash = self
            .client
            .send_transaction(self.committer.address, calldata)
            .await
            .map_err(|e| KeeperError::submission(window_id, action, e))?;

        let confirmed = self
            .client
            .wait_for_receipt(&tx_hash, self.confirmation_timeout)
            .await
            .map_err(|e| KeeperError::submission(window_id, action, e))?;

        if !confirmed {
            return Err(KeeperError::submission(
                window_id,
                action,
                TxError::Reverted(tx_hash),
            ));
        }

        info!(window_id, %action, tx_hash = %tx_hash, "Commit confirmed");
        Ok(SubmitOutcome::Submitted { tx_hash, request })
    }
}
