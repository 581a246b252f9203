//! Governance proposal store.
//!
//! Proposals come from the static registry seeds; voting history is
//! simulated per session. A vote is a tracked transaction and its weight
//! lands in the tally exactly once, on confirmation.

use crate::entropy::Entropy;
use crate::registry::{demo_recipient, seed_proposals};
use crate::tracker::{TrackedSubmission, TransactionTracker};
use crate::wallet::{SessionError, TransferRequest, WalletError, WalletSession};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;
use tracing::info;

// ============================================
// CONSTANTS
// ============================================

/// Fixed voting weight per account; there is no on-chain GOV snapshot
pub const VOTE_WEIGHT: f64 = 1000.0;

/// Chance the session already voted on an active proposal
const PRIOR_VOTE_PROBABILITY: f64 = 0.5;

// ============================================
// TYPES
// ============================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteChoice {
    For,
    Against,
}

impl std::fmt::Display for VoteChoice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VoteChoice::For => write!(f, "for"),
            VoteChoice::Against => write!(f, "against"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProposalStatus {
    Active,
    Closed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Proposal {
    pub id: u32,
    pub title: &'static str,
    pub description: &'static str,
    pub ends_at: DateTime<Utc>,
    pub votes_for: f64,
    pub votes_against: f64,
    pub user_vote: Option<VoteChoice>,
}

impl Proposal {
    pub fn status(&self) -> ProposalStatus {
        if self.ends_at > Utc::now() {
            ProposalStatus::Active
        } else {
            ProposalStatus::Closed
        }
    }

    /// Final result for a closed proposal; `None` while voting is open
    pub fn result(&self) -> Option<VoteChoice> {
        match self.status() {
            ProposalStatus::Active => None,
            ProposalStatus::Closed if self.votes_for > self.votes_against => {
                Some(VoteChoice::For)
            }
            ProposalStatus::Closed => Some(VoteChoice::Against),
        }
    }

    pub fn approval_pct(&self) -> f64 {
        let total = self.votes_for + self.votes_against;
        if total <= 0.0 {
            return 0.0;
        }
        self.votes_for / total * 100.0
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum GovernanceError {
    #[error("no proposal with id {0}")]
    NotFound(u32),

    #[error("voting on proposal {0} has closed")]
    NotActive(u32),

    #[error("already voted on proposal {0}")]
    AlreadyVoted(u32),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Wallet(#[from] WalletError),
}

// ============================================
// STORE
// ============================================

pub struct GovernanceStore {
    session: Arc<WalletSession>,
    tracker: Arc<TransactionTracker>,
    entropy: Arc<dyn Entropy>,
    state: watch::Sender<Vec<Proposal>>,
}

impl GovernanceStore {
    pub fn new(
        session: Arc<WalletSession>,
        tracker: Arc<TransactionTracker>,
        entropy: Arc<dyn Entropy>,
    ) -> Self {
        let (state, _) = watch::channel(Vec::new());
        Self {
            session,
            tracker,
            entropy,
            state,
        }
    }

    pub fn snapshot(&self) -> Vec<Proposal> {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Vec<Proposal>> {
        self.state.subscribe()
    }

    pub fn proposal(&self, id: u32) -> Option<Proposal> {
        self.snapshot().into_iter().find(|p| p.id == id)
    }

    /// Resolve the registry seeds to concrete proposals, simulating prior
    /// votes for active ones.
    pub async fn load_proposals(&self) -> Result<Vec<Proposal>, GovernanceError> {
        let connected = self.session.snapshot().is_connected();
        let now = Utc::now();

        let proposals: Vec<Proposal> = seed_proposals()
            .into_iter()
            .map(|seed| {
                let ends_at = now + ChronoDuration::days(seed.ends_in_days);
                let active = ends_at > now;
                let user_vote = if connected
                    && active
                    && self.entropy.chance(PRIOR_VOTE_PROBABILITY)
                {
                    Some(if self.entropy.chance(0.5) {
                        VoteChoice::For
                    } else {
                        VoteChoice::Against
                    })
                } else {
                    None
                };
                Proposal {
                    id: seed.id,
                    title: seed.title,
                    description: seed.description,
                    ends_at,
                    votes_for: seed.votes_for,
                    votes_against: seed.votes_against,
                    user_vote,
                }
            })
            .collect();

        self.state.send_replace(proposals.clone());
        Ok(proposals)
    }

    /// Cast a vote. The tally and the session's vote record move exactly
    /// once, and only when the transaction confirms.
    pub async fn vote(
        &self,
        id: u32,
        choice: VoteChoice,
    ) -> Result<TrackedSubmission, GovernanceError> {
        let account = self.session.account()?;
        let proposal = self.proposal(id).ok_or(GovernanceError::NotFound(id))?;
        if proposal.status() != ProposalStatus::Active {
            return Err(GovernanceError::NotActive(id));
        }
        if proposal.user_vote.is_some() {
            return Err(GovernanceError::AlreadyVoted(id));
        }

        let request = TransferRequest::action(account, demo_recipient());
        let submission = self.tracker.submit_and_track(&request).await?;

        if submission.confirmed() {
            self.state.send_modify(|proposals| {
                if let Some(p) = proposals.iter_mut().find(|p| p.id == id) {
                    // Another task's vote may have landed while ours was
                    // pending; only the first one counts.
                    if p.user_vote.is_none() {
                        match choice {
                            VoteChoice::For => p.votes_for += VOTE_WEIGHT,
                            VoteChoice::Against => p.votes_against += VOTE_WEIGHT,
                        }
                        p.user_vote = Some(choice);
                    }
                }
            });
            info!(proposal = id, %choice, weight = VOTE_WEIGHT, "vote cast");
        }

        Ok(submission)
    }
}

// ============================================
// TESTS
// ============================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entropy::ScriptedEntropy;
    use crate::registry::Network;
    use crate::tracker::TrackOutcome;
    use crate::wallet::{SimulatedWallet, WalletProvider};
    use std::time::Duration;

    async fn store_with(values: Vec<f64>) -> GovernanceStore {
        let entropy = Arc::new(ScriptedEntropy::new(values));
        let wallet = Arc::new(
            SimulatedWallet::new(entropy.clone())
                .with_confirmation_delay(Duration::ZERO, Duration::ZERO),
        );
        let session = Arc::new(WalletSession::new(
            Some(wallet.clone() as Arc<dyn WalletProvider>),
            Network::Sepolia,
        ));
        session.connect().await.unwrap();
        let tracker = Arc::new(TransactionTracker::new(wallet));
        GovernanceStore::new(session, tracker, entropy)
    }

    #[tokio::test]
    async fn test_seeds_resolve_to_proposals() {
        // Two active proposals, two prior-vote flips each: none voted.
        let store = store_with(vec![0.9, 0.9]).await;
        let proposals = store.load_proposals().await.unwrap();
        assert_eq!(proposals.len(), 3);
        assert_eq!(proposals[0].status(), ProposalStatus::Active);
        assert_eq!(proposals[1].status(), ProposalStatus::Active);
        assert_eq!(proposals[2].status(), ProposalStatus::Closed);
    }

    #[tokio::test]
    async fn test_closed_proposal_has_result() {
        let store = store_with(vec![0.9, 0.9]).await;
        store.load_proposals().await.unwrap();
        let closed = store.proposal(3).unwrap();
        assert_eq!(closed.result(), Some(VoteChoice::For));
        assert_eq!(closed.user_vote, None);
        assert!(closed.approval_pct() > 50.0);
    }

    #[tokio::test]
    async fn test_simulated_prior_vote() {
        // Proposal 1: voted (0.1), choice For (0.1); proposal 2: not voted.
        let store = store_with(vec![0.1, 0.1, 0.9]).await;
        store.load_proposals().await.unwrap();
        assert_eq!(store.proposal(1).unwrap().user_vote, Some(VoteChoice::For));
        assert_eq!(store.proposal(2).unwrap().user_vote, None);
    }

    #[tokio::test]
    async fn test_vote_moves_tally_once() {
        // Loads: no prior votes (0.9, 0.9); vote tx success (0.0, 0.0).
        let store = store_with(vec![0.9, 0.9, 0.0, 0.0]).await;
        store.load_proposals().await.unwrap();
        let before = store.proposal(1).unwrap().votes_for;

        let submission = store.vote(1, VoteChoice::For).await.unwrap();
        assert_eq!(submission.outcome, TrackOutcome::Confirmed);

        let after = store.proposal(1).unwrap();
        assert_eq!(after.votes_for, before + VOTE_WEIGHT);
        assert_eq!(after.user_vote, Some(VoteChoice::For));

        // Second vote on the same proposal is rejected before submission.
        assert_eq!(
            store.vote(1, VoteChoice::Against).await,
            Err(GovernanceError::AlreadyVoted(1))
        );
        assert_eq!(store.proposal(1).unwrap().votes_for, before + VOTE_WEIGHT);
    }

    #[tokio::test]
    async fn test_vote_on_closed_proposal_rejected() {
        let store = store_with(vec![0.9, 0.9]).await;
        store.load_proposals().await.unwrap();
        assert_eq!(
            store.vote(3, VoteChoice::For).await,
            Err(GovernanceError::NotActive(3))
        );
    }

    #[tokio::test]
    async fn test_vote_on_unknown_proposal_rejected() {
        let store = store_with(vec![0.9, 0.9]).await;
        store.load_proposals().await.unwrap();
        assert_eq!(
            store.vote(99, VoteChoice::For).await,
            Err(GovernanceError::NotFound(99))
        );
    }

    #[tokio::test]
    async fn test_failed_vote_leaves_tally_untouched() {
        // Loads (0.9, 0.9); vote tx reverts (0.95, 0.0).
        let store = store_with(vec![0.9, 0.9, 0.95, 0.0]).await;
        store.load_proposals().await.unwrap();
        let before = store.proposal(1).unwrap().clone();

        let submission = store.vote(1, VoteChoice::Against).await.unwrap();
        assert_eq!(submission.outcome, TrackOutcome::Failed);

        let after = store.proposal(1).unwrap();
        assert_eq!(after.votes_against, before.votes_against);
        assert_eq!(after.user_vote, None);
    }

    #[tokio::test]
    async fn test_vote_requires_connection() {
        let store = store_with(vec![0.9, 0.9]).await;
        store.load_proposals().await.unwrap();
        store.session.disconnect();
        assert!(matches!(
            store.vote(1, VoteChoice::For).await,
            Err(GovernanceError::Session(SessionError::NotConnected))
        ));
    }
}
