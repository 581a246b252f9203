//! Transaction lifecycle tracking.
//!
//! submitted → Pending → {Confirmed, Failed}. Terminal states absorb: once
//! a handle confirms or fails it never transitions again. Polling is
//! interval-driven with a fixed attempt budget; exhausting the budget
//! leaves the handle Pending on purpose (callers render "still pending",
//! never a fake failure).

use crate::wallet::{TransferRequest, WalletError, WalletProvider};
use alloy_primitives::B256;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

// ============================================
// CONSTANTS
// ============================================

/// Receipt polling cadence
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Polls before the tracker gives up and reports the handle still pending
pub const DEFAULT_MAX_ATTEMPTS: u32 = 30;

// ============================================
// HANDLE
// ============================================

/// Lifecycle states of a submitted transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxStatus {
    Pending,
    Confirmed,
    Failed,
}

impl TxStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TxStatus::Confirmed | TxStatus::Failed)
    }
}

impl std::fmt::Display for TxStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TxStatus::Pending => write!(f, "pending"),
            TxStatus::Confirmed => write!(f, "confirmed"),
            TxStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Handle to a submitted transfer. Status is mutated only by the tracker.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionHandle {
    pub hash: B256,
    pub submitted_at: DateTime<Utc>,
    status: TxStatus,
}

impl TransactionHandle {
    fn new(hash: B256) -> Self {
        Self {
            hash,
            submitted_at: Utc::now(),
            status: TxStatus::Pending,
        }
    }

    pub fn status(&self) -> TxStatus {
        self.status
    }
}

/// How a tracking run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackOutcome {
    Confirmed,
    Failed,
    /// Attempt budget spent with no receipt; the handle stays Pending
    BudgetExhausted,
}

/// A submitted transfer together with its tracking result
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedSubmission {
    pub handle: TransactionHandle,
    pub outcome: TrackOutcome,
}

impl TrackedSubmission {
    pub fn confirmed(&self) -> bool {
        self.outcome == TrackOutcome::Confirmed
    }
}

// ============================================
// TRACKER
// ============================================

type ConfirmedHook = Arc<dyn Fn(B256) + Send + Sync>;

/// Submits transfers and polls their receipts to a terminal state
pub struct TransactionTracker {
    provider: Arc<dyn WalletProvider>,
    poll_interval: Duration,
    max_attempts: u32,
    confirmed_hook: Option<ConfirmedHook>,
}

impl TransactionTracker {
    pub fn new(provider: Arc<dyn WalletProvider>) -> Self {
        Self {
            provider,
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            confirmed_hook: None,
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Hook fired exactly once per handle, on the Pending→Confirmed
    /// transition only. Used to refresh balances after a confirmed swap.
    pub fn on_confirmed(mut self, hook: impl Fn(B256) + Send + Sync + 'static) -> Self {
        self.confirmed_hook = Some(Arc::new(hook));
        self
    }

    /// Broadcast a transfer and hand back a Pending handle
    pub async fn submit(
        &self,
        request: &TransferRequest,
    ) -> Result<TransactionHandle, WalletError> {
        let hash = self.provider.send_transaction(request).await?;
        info!(%hash, value = %request.value, "transfer submitted");
        Ok(TransactionHandle::new(hash))
    }

    /// Single receipt check. Terminal handles short-circuit without
    /// touching the provider, which is what makes terminal states
    /// absorbing and the confirmed hook single-fire.
    pub async fn poll_once(
        &self,
        handle: &mut TransactionHandle,
    ) -> Result<TxStatus, WalletError> {
        if handle.status.is_terminal() {
            return Ok(handle.status);
        }

        match self.provider.transaction_receipt(handle.hash).await? {
            None => {
                debug!(hash = %handle.hash, "no receipt yet");
                Ok(TxStatus::Pending)
            }
            Some(receipt) => {
                handle.status = if receipt.succeeded() {
                    TxStatus::Confirmed
                } else {
                    TxStatus::Failed
                };
                info!(hash = %handle.hash, status = %handle.status, "receipt observed");
                if handle.status == TxStatus::Confirmed {
                    if let Some(hook) = &self.confirmed_hook {
                        hook(handle.hash);
                    }
                }
                Ok(handle.status)
            }
        }
    }

    /// Poll to a terminal state or until the attempt budget runs out. One
    /// immediate check, then interval-spaced attempts.
    pub async fn track(
        &self,
        handle: &mut TransactionHandle,
    ) -> Result<TrackOutcome, WalletError> {
        if let Some(outcome) = Self::outcome_for(self.poll_once(handle).await?) {
            return Ok(outcome);
        }

        for attempt in 1..=self.max_attempts {
            tokio::time::sleep(self.poll_interval).await;
            debug!(hash = %handle.hash, attempt, "polling receipt");
            if let Some(outcome) = Self::outcome_for(self.poll_once(handle).await?) {
                return Ok(outcome);
            }
        }

        warn!(
            hash = %handle.hash,
            attempts = self.max_attempts,
            "poll budget exhausted; transaction left pending"
        );
        Ok(TrackOutcome::BudgetExhausted)
    }

    /// Submit and track in one step
    pub async fn submit_and_track(
        &self,
        request: &TransferRequest,
    ) -> Result<TrackedSubmission, WalletError> {
        let mut handle = self.submit(request).await?;
        let outcome = self.track(&mut handle).await?;
        Ok(TrackedSubmission { handle, outcome })
    }

    fn outcome_for(status: TxStatus) -> Option<TrackOutcome> {
        match status {
            TxStatus::Confirmed => Some(TrackOutcome::Confirmed),
            TxStatus::Failed => Some(TrackOutcome::Failed),
            TxStatus::Pending => None,
        }
    }
}

// ============================================
// TESTS
// ============================================
