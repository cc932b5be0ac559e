//! Per-window decision and commit cycle.
//!
//! `Idle -> WindowEnding -> Decided -> {Submitting | Skipped} -> Idle`
//!
//! Snapshots are handled one at a time, so a cycle's commit confirms (or
//! fails) before the next window is evaluated.

use chrono::{DateTime, Utc};
use pool_keeper_core::{decide_snapshot, CommitAction, PoolStateSnapshot};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info, warn};

use crate::committer::{CommitSubmitter, SubmitOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CyclePhase {
    Idle,
    WindowEnding,
    Decided(CommitAction),
    Submitting,
    Skipped,
}

/// Result of one window cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CycleOutcome {
    Submitted {
        window_id: u128,
        action: CommitAction,
        tx_hash: String,
    },
    DryRun {
        window_id: u128,
        action: CommitAction,
    },
    Skipped {
        window_id: u128,
        skew: Decimal,
    },
    Failed {
        window_id: u128,
        action: CommitAction,
        error: String,
    },
}

/// Cycle statistics exposed for monitoring.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WindowCycleStats {
    pub windows_seen: u64,
    pub commits_submitted: u64,
    pub skipped: u64,
    pub failures: u64,
    pub last_outcome: Option<CycleOutcome>,
    pub started_at: Option<DateTime<Utc>>,
}

impl WindowCycleStats {
    fn record(&mut self, outcome: &CycleOutcome) {
        self.windows_seen += 1;
        match outcome {
            CycleOutcome::Submitted { .. } | CycleOutcome::DryRun { .. } => {
                self.commits_submitted += 1;
            }
            CycleOutcome::Skipped { .. } => self.skipped += 1,
            CycleOutcome::Failed { .. } => self.failures += 1,
        }
        self.last_outcome = Some(outcome.clone());
    }
}

/// Consumes window snapshots and runs the decision / commit cycle for each.
pub struct WindowCycle {
    submitter: CommitSubmitter,
    phase: CyclePhase,
    stats: Arc<RwLock<WindowCycleStats>>,
}

impl WindowCycle {
    #[must_use]
    pub fn new(submitter: CommitSubmitter) -> Self {
        Self {
            submitter,
            phase: CyclePhase::Idle,
            stats: Arc::new(RwLock::new(WindowCycleStats::default())),
        }
    }

    #[must_use]
    pub fn phase(&self) -> CyclePhase {
        self.phase
    }

    #[must_use]
    pub fn stats(&self) -> Arc<RwLock<WindowCycleStats>> {
        Arc::clone(&self.stats)
    }

    fn transition(&mut self, next: CyclePhase) {
        debug!(from = ?self.phase, to = ?next, "Window cycle transition");
        self.phase = next;
    }

    /// Runs one cycle to completion. Failures are contained in the outcome.
    pub async fn handle(&mut self, snapshot: PoolStateSnapshot) -> CycleOutcome {
        let window_id = snapshot.update_interval_id;
        self.transition(CyclePhase::WindowEnding);

        let action = decide_snapshot(&snapshot);
        self.transition(CyclePhase::Decided(action));

        let outcome = if action == CommitAction::NoOp {
            self.transition(CyclePhase::Skipped);
            info!(
                window_id,
                mint_projected_skew = %snapshot.expected_skew,
                "Skew within dead zone, not committing"
            );
            CycleOutcome::Skipped {
                window_id,
                skew: snapshot.expected_skew,
            }
        } else {
            self.transition(CyclePhase::Submitting);
            info!(
                window_id,
                %action,
                mint_projected_skew = %snapshot.expected_skew,
                "Skew out of balance"
            );
            match self.submitter.submit(window_id, action).await {
                Ok(SubmitOutcome::Submitted { tx_hash, .. }) => CycleOutcome::Submitted {
                    window_id,
                    action,
                    tx_hash,
                },
                Ok(SubmitOutcome::DryRun { .. }) => CycleOutcome::DryRun { window_id, action },
                // unreachable for non-no-op actions, kept total
                Ok(SubmitOutcome::Skipped) => CycleOutcome::Skipped {
                    window_id,
                    skew: snapshot.expected_skew,
                },
                Err(e) => {
                    warn!(window_id, %action, error = %e, "Window cycle failed");
                    CycleOutcome::Failed {
                        window_id,
                        action,
                        error: e.to_string(),
                    }
                }
            }
        };

        self.stats.write().await.record(&outcome);
        self.transition(CyclePhase::Idle);
        outcome
    }

    /// Handles snapshots until the watcher side of the channel closes.
    pub async fn run(mut self, mut snapshots: mpsc::Receiver<PoolStateSnapshot>) {
        self.stats.write().await.started_at = Some(Utc::now());
        info!("Window cycle started");

        while let Some(snapshot) = snapshots.recv().await {
            self.handle(snapshot).await;
        }

        let stats = self.stats.read().await;
        info!(
            windows = stats.windows_seen,
            committed = stats.commits_submitted,
            skipped = stats.skipped,
            failures = stats.failures,
            "Window cycle stopped"
        );
    }
}
