//! Staking position store.
//!
//! Positions are derived from the session's LP holdings: a simulated share
//! of the LP tokens sits in the farm, accruing GOV rewards linearly from
//! the staking date. Stake/unstake/claim all run through the tracker.

use crate::entropy::Entropy;
use crate::liquidity::LiquidityStore;
use crate::registry::demo_recipient;
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

/// Chance an LP holder already has a staked position
const STAKED_PROBABILITY: f64 = 0.5;

/// Fraction of LP tokens staked, percent
const STAKED_PCT_MIN: f64 = 10.0;
const STAKED_PCT_MAX: f64 = 90.0;

/// Simulated APR band, percent
const APR_MIN_PCT: f64 = 5.0;
const APR_MAX_PCT: f64 = 25.0;

/// Simulated position age, days
const AGE_MIN_DAYS: f64 = 1.0;
const AGE_MAX_DAYS: f64 = 60.0;

// ============================================
// TYPES
// ============================================

/// LP tokens locked in the farm for one pool
#[derive(Debug, Clone, PartialEq)]
pub struct StakingPosition {
    pub pool_id: &'static str,
    pub staked_lp: f64,
    pub pending_rewards: f64,
    pub apr_pct: f64,
    pub staked_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum StakingError {
    #[error("invalid amount: {0}")]
    InvalidAmount(f64),

    #[error("insufficient LP tokens: have {available}, need {requested}")]
    InsufficientLp { available: f64, requested: f64 },

    #[error("no staking position in pool {0}")]
    NoPosition(String),

    #[error("no rewards to claim")]
    NothingToClaim,

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Wallet(#[from] WalletError),
}

/// Linear reward accrual: `staked * apr * age`, with age in years
pub fn accrued_rewards(staked_lp: f64, apr_pct: f64, age_days: f64) -> f64 {
    (staked_lp * (apr_pct / 100.0) * (age_days / 365.0)).max(0.0)
}

// ============================================
// STORE
// ============================================

pub struct StakingStore {
    session: Arc<WalletSession>,
    liquidity: Arc<LiquidityStore>,
    tracker: Arc<TransactionTracker>,
    entropy: Arc<dyn Entropy>,
    state: watch::Sender<Vec<StakingPosition>>,
}

impl StakingStore {
    pub fn new(
        session: Arc<WalletSession>,
        liquidity: Arc<LiquidityStore>,
        tracker: Arc<TransactionTracker>,
        entropy: Arc<dyn Entropy>,
    ) -> Self {
        let (state, _) = watch::channel(Vec::new());
        Self {
            session,
            liquidity,
            tracker,
            entropy,
            state,
        }
    }

    pub fn snapshot(&self) -> Vec<StakingPosition> {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Vec<StakingPosition>> {
        self.state.subscribe()
    }

    /// Derive (simulate) staking positions from current LP holdings
    pub async fn load_positions(&self) -> Result<Vec<StakingPosition>, StakingError> {
        let pools = self.liquidity.snapshot();
        if !self.session.snapshot().is_connected() || pools.is_empty() {
            self.state.send_replace(Vec::new());
            return Ok(Vec::new());
        }

        let positions = if self.entropy.chance(STAKED_PROBABILITY) {
            pools
                .iter()
                .map(|pool| {
                    let staked_pct = self.entropy.range(STAKED_PCT_MIN, STAKED_PCT_MAX);
                    let staked_lp = pool.lp_tokens * staked_pct / 100.0;
                    let apr_pct = self.entropy.range(APR_MIN_PCT, APR_MAX_PCT);
                    let age_days = self.entropy.range(AGE_MIN_DAYS, AGE_MAX_DAYS).floor();
                    StakingPosition {
                        pool_id: pool.pool_id,
                        staked_lp,
                        pending_rewards: accrued_rewards(staked_lp, apr_pct, age_days),
                        apr_pct,
                        staked_at: Utc::now() - ChronoDuration::days(age_days as i64),
                    }
                })
                .collect()
        } else {
            Vec::new()
        };

        self.state.send_replace(positions.clone());
        Ok(positions)
    }

    fn available_lp(&self) -> f64 {
        self.liquidity
            .snapshot()
            .iter()
            .map(|p| p.lp_tokens)
            .sum()
    }

    /// Lock LP tokens in the farm
    pub async fn stake(&self, amount: f64) -> Result<TrackedSubmission, StakingError> {
        if amount <= 0.0 || !amount.is_finite() {
            return Err(StakingError::InvalidAmount(amount));
        }
        let account = self.session.account()?;
        let available = self.available_lp();
        if amount > available {
            return Err(StakingError::InsufficientLp {
                available,
                requested: amount,
            });
        }

        let request = TransferRequest::action(account, demo_recipient());
        let submission = self.tracker.submit_and_track(&request).await?;

        if submission.confirmed() {
            let apr = self.entropy.range(APR_MIN_PCT, APR_MAX_PCT);
            self.state.send_modify(|positions| {
                match positions.iter_mut().find(|p| p.pool_id == crate::liquidity::POOL_ID) {
                    Some(position) => position.staked_lp += amount,
                    None => positions.push(StakingPosition {
                        pool_id: crate::liquidity::POOL_ID,
                        staked_lp: amount,
                        pending_rewards: 0.0,
                        apr_pct: apr,
                        staked_at: Utc::now(),
                    }),
                }
            });
            info!(amount, "LP tokens staked");
        }

        Ok(submission)
    }

    /// Unstake the full position, claiming its rewards along the way
    pub async fn unstake(&self) -> Result<TrackedSubmission, StakingError> {
        let account = self.session.account()?;
        let position = self
            .snapshot()
            .into_iter()
            .find(|p| p.pool_id == crate::liquidity::POOL_ID)
            .ok_or_else(|| StakingError::NoPosition(crate::liquidity::POOL_ID.to_string()))?;

        let request = TransferRequest::action(account, demo_recipient());
        let submission = self.tracker.submit_and_track(&request).await?;

        if submission.confirmed() {
            self.state
                .send_modify(|positions| positions.retain(|p| p.pool_id != position.pool_id));
            info!(
                staked = position.staked_lp,
                rewards = position.pending_rewards,
                "position unstaked"
            );
        }

        Ok(submission)
    }

    /// Claim pending rewards, zeroing them on confirmation
    pub async fn claim(&self) -> Result<TrackedSubmission, StakingError> {
        let account = self.session.account()?;
        let position = self
            .snapshot()
            .into_iter()
            .find(|p| p.pool_id == crate::liquidity::POOL_ID)
            .ok_or_else(|| StakingError::NoPosition(crate::liquidity::POOL_ID.to_string()))?;
        if position.pending_rewards <= 0.0 {
            return Err(StakingError::NothingToClaim);
        }

        let request = TransferRequest::action(account, demo_recipient());
        let submission = self.tracker.submit_and_track(&request).await?;

        if submission.confirmed() {
            self.state.send_modify(|positions| {
                if let Some(p) = positions.iter_mut().find(|p| p.pool_id == position.pool_id) {
                    p.pending_rewards = 0.0;
                }
            });
            info!(rewards = position.pending_rewards, "rewards claimed");
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
    use crate::market::PriceOracle;
    use crate::registry::Network;
    use crate::wallet::{SimulatedWallet, WalletProvider};
    use std::time::Duration;

    async fn stores_with(values: Vec<f64>) -> (Arc<LiquidityStore>, StakingStore) {
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
        let oracle = Arc::new(PriceOracle::start(Arc::new(ScriptedEntropy::new([0.5]))).await);
        let tracker = Arc::new(TransactionTracker::new(wallet));
        let liquidity = Arc::new(LiquidityStore::new(
            session.clone(),
            oracle,
            tracker.clone(),
            entropy.clone(),
        ));
        let staking = StakingStore::new(session, liquidity.clone(), tracker, entropy);
        (liquidity, staking)
    }

    #[test]
    fn test_accrual_math() {
        // 100 LP at 10% APR for half a year.
        let rewards = accrued_rewards(100.0, 10.0, 182.5);
        assert!((rewards - 5.0).abs() < 1e-9);
        assert_eq!(accrued_rewards(0.0, 10.0, 30.0), 0.0);
    }

    #[tokio::test]
    async fn test_no_lp_means_no_staking() {
        let (_, staking) = stores_with(vec![]).await;
        assert!(staking.load_positions().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_positions_derived_from_lp() {
        // add_liquidity: success 0.0, delay 0.0;
        // load: staked chance 0.1, staked pct 0.5, apr 0.5, age 0.5.
        let (liquidity, staking) = stores_with(vec![0.0, 0.0, 0.1, 0.5, 0.5, 0.5]).await;
        liquidity.add_liquidity(2.5).await.unwrap();

        let positions = staking.load_positions().await.unwrap();
        assert_eq!(positions.len(), 1);
        let position = &positions[0];
        let lp = liquidity.snapshot()[0].lp_tokens;
        assert!(position.staked_lp > 0.0 && position.staked_lp < lp);
        assert!((APR_MIN_PCT..=APR_MAX_PCT).contains(&position.apr_pct));
        assert!(position.pending_rewards > 0.0);
        assert!(position.staked_at < Utc::now());
    }

    #[tokio::test]
    async fn test_stake_rejects_overdraw() {
        // add_liquidity success + delay.
        let (liquidity, staking) = stores_with(vec![0.0, 0.0]).await;
        liquidity.add_liquidity(1.0).await.unwrap();
        let available = liquidity.snapshot()[0].lp_tokens;

        let result = staking.stake(available * 2.0).await;
        assert!(matches!(result, Err(StakingError::InsufficientLp { .. })));
    }

    #[tokio::test]
    async fn test_stake_creates_position() {
        // add (0.0, 0.0), stake tx (0.0, 0.0), apr 0.5.
        let (liquidity, staking) = stores_with(vec![0.0, 0.0, 0.0, 0.0, 0.5]).await;
        liquidity.add_liquidity(1.0).await.unwrap();

        let submission = staking.stake(10.0).await.unwrap();
        assert!(submission.confirmed());
        let positions = staking.snapshot();
        assert_eq!(positions.len(), 1);
        assert_eq!(positions[0].staked_lp, 10.0);
        assert_eq!(positions[0].pending_rewards, 0.0);
    }

    #[tokio::test]
    async fn test_claim_zeroes_rewards_once() {
        // add (0.0, 0.0); load: chance 0.1, pct 0.5, apr 0.5, age 0.5;
        // claim tx (0.0, 0.0).
        let (liquidity, staking) =
            stores_with(vec![0.0, 0.0, 0.1, 0.5, 0.5, 0.5, 0.0, 0.0]).await;
        liquidity.add_liquidity(2.0).await.unwrap();
        staking.load_positions().await.unwrap();
        assert!(staking.snapshot()[0].pending_rewards > 0.0);

        staking.claim().await.unwrap();
        assert_eq!(staking.snapshot()[0].pending_rewards, 0.0);

        // Nothing left to claim.
        assert!(matches!(
            staking.claim().await,
            Err(StakingError::NothingToClaim)
        ));
    }

    #[tokio::test]
    async fn test_unstake_removes_position() {
        // add (0.0, 0.0); load (0.1, 0.5, 0.5, 0.5); unstake tx (0.0, 0.0).
        let (liquidity, staking) =
            stores_with(vec![0.0, 0.0, 0.1, 0.5, 0.5, 0.5, 0.0, 0.0]).await;
        liquidity.add_liquidity(2.0).await.unwrap();
        staking.load_positions().await.unwrap();

        let submission = staking.unstake().await.unwrap();
        assert!(submission.confirmed());
        assert!(staking.snapshot().is_empty());
    }
}
