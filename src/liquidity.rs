//! Liquidity position store.
//!
//! One seeded ETH-TUSD pool with fixed mock reserves. Positions are
//! recomputed wholesale on each load; add/remove go through the
//! transaction tracker like every other chain action.

use crate::entropy::Entropy;
use crate::market::PriceOracle;
use crate::registry::{demo_recipient, get_asset, Asset};
use crate::tracker::{TrackedSubmission, TransactionTracker};
use crate::wallet::{SessionError, TransferRequest, WalletError, WalletSession};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;
use tracing::info;

// ============================================
// CONSTANTS
// ============================================

/// Mock ETH-TUSD pool reserves; there is no deployed pool contract
pub const POOL_ID: &str = "eth-tusd";
pub const POOL_RESERVE0: f64 = 250.0; // ETH
pub const POOL_RESERVE1: f64 = 450_000.0; // TUSD
pub const POOL_LP_SUPPLY: f64 = 10_000.0;

/// Chance a fresh session already holds a position
const POSITION_PROBABILITY: f64 = 0.5;

/// Simulated position size bounds, in ETH
const POSITION_MIN_ETH: f64 = 0.1;
const POSITION_MAX_ETH: f64 = 5.0;

// ============================================
// TYPES
// ============================================

/// A user's share of one pool. No durable identity across loads.
#[derive(Debug, Clone, PartialEq)]
pub struct PoolPosition {
    pub pool_id: &'static str,
    pub asset0: Asset,
    pub asset1: Asset,
    pub amount0: f64,
    pub amount1: f64,
    pub lp_tokens: f64,
    pub share_pct: f64,
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum LiquidityError {
    #[error("invalid amount: {0}")]
    InvalidAmount(f64),

    #[error("no liquidity position in pool {0}")]
    NoPosition(String),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Wallet(#[from] WalletError),
}

/// LP tokens minted for a deposit, by the min-proportion rule. An empty
/// pool treats the deposit as initial liquidity.
pub fn lp_tokens_for_deposit(
    amount0: f64,
    amount1: f64,
    reserve0: f64,
    reserve1: f64,
    total_supply: f64,
) -> f64 {
    if reserve0 <= 0.0 || reserve1 <= 0.0 || total_supply <= 0.0 {
        return amount0;
    }
    let proportion = (amount0 / reserve0).min(amount1 / reserve1);
    total_supply * proportion
}

// ============================================
// STORE
// ============================================

pub struct LiquidityStore {
    session: Arc<WalletSession>,
    oracle: Arc<PriceOracle>,
    tracker: Arc<TransactionTracker>,
    entropy: Arc<dyn Entropy>,
    state: watch::Sender<Vec<PoolPosition>>,
}

impl LiquidityStore {
    pub fn new(
        session: Arc<WalletSession>,
        oracle: Arc<PriceOracle>,
        tracker: Arc<TransactionTracker>,
        entropy: Arc<dyn Entropy>,
    ) -> Self {
        let (state, _) = watch::channel(Vec::new());
        Self {
            session,
            oracle,
            tracker,
            entropy,
            state,
        }
    }

    pub fn snapshot(&self) -> Vec<PoolPosition> {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Vec<PoolPosition>> {
        self.state.subscribe()
    }

    fn assets() -> (Asset, Asset) {
        // Both sides of the seeded pool are always in the registry.
        (get_asset("ETH").unwrap(), get_asset("TUSD").unwrap())
    }

    fn position_from_amount0(&self, amount0: f64, amount1: f64) -> PoolPosition {
        let (asset0, asset1) = Self::assets();
        PoolPosition {
            pool_id: POOL_ID,
            asset0,
            asset1,
            amount0,
            amount1,
            lp_tokens: (amount0 / POOL_RESERVE0) * POOL_LP_SUPPLY,
            share_pct: (amount0 / POOL_RESERVE0) * 100.0,
        }
    }

    /// Load (simulate) the session's positions. A coin flip decides
    /// whether the account already provides liquidity.
    pub async fn load_positions(&self) -> Result<Vec<PoolPosition>, LiquidityError> {
        if !self.session.snapshot().is_connected() {
            self.state.send_replace(Vec::new());
            return Ok(Vec::new());
        }

        let positions = if self.entropy.chance(POSITION_PROBABILITY) {
            let amount0 = self.entropy.range(POSITION_MIN_ETH, POSITION_MAX_ETH);
            let amount1 = amount0 * self.oracle.spot_rate("ETH", "TUSD").await;
            vec![self.position_from_amount0(amount0, amount1)]
        } else {
            Vec::new()
        };

        self.state.send_replace(positions.clone());
        Ok(positions)
    }

    /// TUSD needed to pair with `amount0` ETH at the current ratio
    pub async fn counterpart_amount(&self, amount0: f64) -> f64 {
        if amount0 <= 0.0 {
            return 0.0;
        }
        amount0 * self.oracle.spot_rate("ETH", "TUSD").await
    }

    /// Deposit both sides and mint LP tokens on confirmation
    pub async fn add_liquidity(
        &self,
        amount0: f64,
    ) -> Result<TrackedSubmission, LiquidityError> {
        if amount0 <= 0.0 || !amount0.is_finite() {
            return Err(LiquidityError::InvalidAmount(amount0));
        }
        let account = self.session.account()?;
        let amount1 = self.counterpart_amount(amount0).await;

        let request = TransferRequest::action(account, demo_recipient());
        let submission = self.tracker.submit_and_track(&request).await?;

        if submission.confirmed() {
            let minted = lp_tokens_for_deposit(
                amount0,
                amount1,
                POOL_RESERVE0,
                POOL_RESERVE1,
                POOL_LP_SUPPLY,
            );
            self.state.send_modify(|positions| {
                match positions.iter_mut().find(|p| p.pool_id == POOL_ID) {
                    Some(position) => {
                        position.amount0 += amount0;
                        position.amount1 += amount1;
                        position.lp_tokens += minted;
                        position.share_pct = (position.amount0 / POOL_RESERVE0) * 100.0;
                    }
                    None => {
                        let (asset0, asset1) = Self::assets();
                        positions.push(PoolPosition {
                            pool_id: POOL_ID,
                            asset0,
                            asset1,
                            amount0,
                            amount1,
                            lp_tokens: minted,
                            share_pct: (amount0 / POOL_RESERVE0) * 100.0,
                        });
                    }
                }
            });
            info!(amount0, amount1, "liquidity added");
        }

        Ok(submission)
    }

    /// Withdraw `percent` of the position; 100% removes it entirely
    pub async fn remove_liquidity(
        &self,
        percent: f64,
    ) -> Result<TrackedSubmission, LiquidityError> {
        if !(0.0..=100.0).contains(&percent) || percent == 0.0 {
            return Err(LiquidityError::InvalidAmount(percent));
        }
        let account = self.session.account()?;
        if !self.snapshot().iter().any(|p| p.pool_id == POOL_ID) {
            return Err(LiquidityError::NoPosition(POOL_ID.to_string()));
        }

        let request = TransferRequest::action(account, demo_recipient());
        let submission = self.tracker.submit_and_track(&request).await?;

        if submission.confirmed() {
            let keep = 1.0 - percent / 100.0;
            self.state.send_modify(|positions| {
                if percent >= 100.0 {
                    positions.retain(|p| p.pool_id != POOL_ID);
                } else if let Some(position) =
                    positions.iter_mut().find(|p| p.pool_id == POOL_ID)
                {
                    position.amount0 *= keep;
                    position.amount1 *= keep;
                    position.lp_tokens *= keep;
                    position.share_pct *= keep;
                }
            });
            info!(percent, "liquidity removed");
        }

        Ok(submission)
    }
}

// ============================================
// TESTS
// ============================================
