//! Error types for pool interaction.

use pool_keeper_core::{CommitAction, UnitsError};
use thiserror::Error;

/// Errors from transaction construction, broadcasting and contract reads.
#[derive(Debug, Error)]
pub enum TxError {
    /// RLP encoding error.
    #[error("RLP encoding error: {0}")]
    Rlp(String),

    /// Transaction signing failed.
    #[error("Signing failed: {0}")]
    Signing(String),

    /// RPC request failed.
    #[error("RPC error: {0}")]
    Rpc(String),

    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Transaction was rejected by the node.
    #[error("Transaction rejected: {0}")]
    Rejected(String),

    /// Transaction was mined but reverted.
    #[error("Transaction reverted: {0}")]
    Reverted(String),

    /// Timeout waiting for receipt.
    #[error("Timeout waiting for transaction receipt")]
    Timeout,

    /// Invalid private key.
    #[error("Invalid private key: {0}")]
    InvalidKey(String),

    /// Contract return data could not be decoded.
    #[error("Decode error: {0}")]
    Decode(String),

    /// Amount conversion failed.
    #[error(transparent)]
    Units(#[from] UnitsError),
}

/// Keeper-level failures, split by whether the process can carry on.
#[derive(Debug, Error)]
pub enum KeeperError {
    /// Startup could not establish the preconditions for committing. Fatal.
    #[error("setup failed while {stage}: {source}")]
    Setup {
        /// What the keeper was doing.
        stage: &'static str,
        #[source]
        source: TxError,
    },

    /// One window's commit failed. The next window is unaffected.
    #[error("{action} for window {window_id} failed: {source}")]
    Submission {
        /// Update interval id of the window.
        window_id: u128,
        action: CommitAction,
        #[source]
        source: TxError,
    },
}

impl KeeperError {
    pub(crate) fn setup(stage: &'static str, source: TxError) -> Self {
        Self::Setup { stage, source }
    }

    pub(crate) fn submission(window_id: u128, action: CommitAction, source: TxError) -> Self {
        Self::Submission {
            window_id,
            action,
            source,
        }
    }

    /// True for errors that must stop the keeper.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Setup { .. })
    }
}
