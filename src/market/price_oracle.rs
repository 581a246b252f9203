//! Simulated spot-price table.
//!
//! Prices are resampled inside fixed per-asset bands on a timer, the same
//! way the testnet has no real market to read from. Consumers only ever see
//! the latest snapshot; the estimator takes a rate from here and never
//! reaches back in.

use crate::entropy::Entropy;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

// ============================================
// CONSTANTS
// ============================================

/// How often the table is resampled
pub const DEFAULT_REFRESH_SECS: u64 = 30;

/// ETH band in USD
const ETH_MIN_USD: f64 = 1800.0;
const ETH_MAX_USD: f64 = 2200.0;

/// METH tracks ETH within a small factor
const METH_FACTOR_MIN: f64 = 0.98;
const METH_FACTOR_MAX: f64 = 1.02;

/// GOV band in USD
const GOV_MIN_USD: f64 = 2.0;
const GOV_MAX_USD: f64 = 5.0;

/// TUSD is the stablecoin peg
const TUSD_USD: f64 = 1.0;

// ============================================
// ORACLE
// ============================================

/// Holds the latest USD price per asset symbol
pub struct PriceOracle {
    entropy: Arc<dyn Entropy>,
    prices: RwLock<HashMap<&'static str, f64>>,
}

impl PriceOracle {
    /// Builds the oracle and seeds the table so the first read never sees
    /// an empty snapshot.
    pub async fn start(entropy: Arc<dyn Entropy>) -> Self {
        let oracle = Self {
            entropy,
            prices: RwLock::new(HashMap::new()),
        };
        oracle.refresh().await;
        oracle
    }

    fn sample(&self) -> HashMap<&'static str, f64> {
        let mut prices = HashMap::new();
        let eth = self.entropy.range(ETH_MIN_USD, ETH_MAX_USD);
        prices.insert("ETH", eth);
        prices.insert("TUSD", TUSD_USD);
        prices.insert(
            "METH",
            eth * self.entropy.range(METH_FACTOR_MIN, METH_FACTOR_MAX),
        );
        prices.insert("GOV", self.entropy.range(GOV_MIN_USD, GOV_MAX_USD));
        prices
    }

    /// Resample every asset in its band
    pub async fn refresh(&self) {
        let next = self.sample();
        debug!(eth = next["ETH"], gov = next["GOV"], "price table refreshed");
        *self.prices.write().await = next;
    }

    /// Latest USD price for a symbol
    pub async fn price_usd(&self, symbol: &str) -> Option<f64> {
        self.prices.read().await.get(symbol).copied()
    }

    /// Full table snapshot
    pub async fn snapshot(&self) -> HashMap<&'static str, f64> {
        self.prices.read().await.clone()
    }

    /// Spot exchange rate: units of `to` per unit of `from`. Returns 0 when
    /// either side is unpriced, which the estimator folds into a zero quote.
    pub async fn spot_rate(&self, from: &str, to: &str) -> f64 {
        let prices = self.prices.read().await;
        let from_usd = prices.get(from).copied().unwrap_or(0.0);
        let to_usd = prices.get(to).copied().unwrap_or(0.0);
        if from_usd <= 0.0 || to_usd <= 0.0 {
            if prices.get(from).is_none() || prices.get(to).is_none() {
                warn!(from, to, "spot rate requested for unpriced asset");
            }
            return 0.0;
        }
        from_usd / to_usd
    }

    /// Periodic refresh task. The handle is dropped (and the task aborted
    /// with the runtime) when the owning scope tears down.
    pub fn spawn_refresh(self: &Arc<Self>, period: Duration) -> JoinHandle<()> {
        let oracle = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            // First tick fires immediately; the table is already seeded.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                oracle.refresh().await;
            }
        })
    }
}

// ============================================
// TESTS
// ============================================
