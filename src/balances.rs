//! Per-token balance store.
//!
//! Native balances come from the wallet provider; token balances are
//! simulated until real contract reads exist on these testnets. Simulated
//! entries survive refreshes so the numbers do not jump around the UI.

use crate::entropy::Entropy;
use crate::registry::{assets_on, Asset};
use crate::wallet::{SessionError, WalletSession};
use alloy_primitives::U256;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::warn;

// ============================================
// CONSTANTS
// ============================================

/// Simulated token balance bounds
const TUSD_BALANCE_MIN: f64 = 100.0;
const TUSD_BALANCE_MAX: f64 = 1000.0;
const TOKEN_BALANCE_MIN: f64 = 10.0;
const TOKEN_BALANCE_MAX: f64 = 100.0;

/// Fallback native bounds when the provider read fails
const NATIVE_FALLBACK_MIN: f64 = 0.5;
const NATIVE_FALLBACK_MAX: f64 = 2.0;

// ============================================
// TYPES
// ============================================

#[derive(Debug, Clone, PartialEq)]
pub struct TokenBalance {
    pub asset: Asset,
    pub amount: f64,
}

/// Snapshot of every balance the session can see
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BalanceBook {
    pub entries: Vec<TokenBalance>,
}

impl BalanceBook {
    pub fn amount(&self, symbol: &str) -> f64 {
        self.entries
            .iter()
            .find(|b| b.asset.symbol == symbol)
            .map(|b| b.amount)
            .unwrap_or(0.0)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub fn wei_to_ether(wei: U256) -> f64 {
    u128::try_from(wei).unwrap_or(u128::MAX) as f64 / 1e18
}

// ============================================
// STORE
// ============================================

/// Owns the balance book; refreshed on demand and after confirmed swaps
pub struct BalanceStore {
    session: Arc<WalletSession>,
    entropy: Arc<dyn Entropy>,
    state: watch::Sender<BalanceBook>,
}

impl BalanceStore {
    pub fn new(session: Arc<WalletSession>, entropy: Arc<dyn Entropy>) -> Self {
        let (state, _) = watch::channel(BalanceBook::default());
        Self {
            session,
            entropy,
            state,
        }
    }

    pub fn snapshot(&self) -> BalanceBook {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<BalanceBook> {
        self.state.subscribe()
    }

    /// Recompute the whole book for the active account and network
    pub async fn refresh(&self) -> Result<BalanceBook, SessionError> {
        let session = self.session.snapshot();
        let (account, network) = match (session.account, session.network) {
            (Some(account), Some(network)) => (account, network),
            _ => {
                self.state.send_replace(BalanceBook::default());
                return Ok(BalanceBook::default());
            }
        };

        let previous = self.snapshot();
        let mut entries = Vec::new();

        for asset in assets_on(network) {
            let existing = previous.amount(asset.symbol);
            let amount = if asset.is_native() {
                match self.session.provider()?.balance(account).await {
                    Ok(wei) => wei_to_ether(wei),
                    Err(err) => {
                        warn!(symbol = asset.symbol, %err, "balance read failed; simulating");
                        if existing > 0.0 {
                            existing
                        } else {
                            self.entropy.range(NATIVE_FALLBACK_MIN, NATIVE_FALLBACK_MAX)
                        }
                    }
                }
            } else if existing > 0.0 {
                existing
            } else if asset.symbol == "TUSD" {
                self.entropy.range(TUSD_BALANCE_MIN, TUSD_BALANCE_MAX)
            } else {
                self.entropy.range(TOKEN_BALANCE_MIN, TOKEN_BALANCE_MAX)
            };

            entries.push(TokenBalance { asset, amount });
        }

        let book = BalanceBook { entries };
        self.state.send_replace(book.clone());
        Ok(book)
    }
}

// ============================================
// TESTS
// ============================================
