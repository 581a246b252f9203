//! Portfolio aggregation.
//!
//! Reads the current snapshots of every store, prices them through the
//! oracle, and folds the result into one USD summary. Pure read path; this
//! module never submits transactions or mutates store state.

use crate::balances::BalanceStore;
use crate::liquidity::{LiquidityStore, POOL_LP_SUPPLY, POOL_RESERVE0, POOL_RESERVE1};
use crate::market::PriceOracle;
use crate::staking::StakingStore;
use std::sync::Arc;

// ============================================
// TYPES
// ============================================

/// One priced line of the wallet section
#[derive(Debug, Clone, PartialEq)]
pub struct HoldingLine {
    pub symbol: &'static str,
    pub amount: f64,
    pub value_usd: f64,
}

/// Everything the session owns, in USD
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PortfolioSummary {
    pub holdings: Vec<HoldingLine>,
    pub wallet_usd: f64,
    pub liquidity_usd: f64,
    pub staked_usd: f64,
    pub rewards_usd: f64,
}

impl PortfolioSummary {
    pub fn total_usd(&self) -> f64 {
        self.wallet_usd + self.liquidity_usd + self.staked_usd + self.rewards_usd
    }
}

/// USD value of one LP token: the pool's priced reserves over its supply
pub fn lp_token_usd(price0: f64, price1: f64) -> f64 {
    if POOL_LP_SUPPLY <= 0.0 {
        return 0.0;
    }
    (POOL_RESERVE0 * price0 + POOL_RESERVE1 * price1) / POOL_LP_SUPPLY
}

// ============================================
// AGGREGATOR
// ============================================

pub struct Portfolio {
    oracle: Arc<PriceOracle>,
    balances: Arc<BalanceStore>,
    liquidity: Arc<LiquidityStore>,
    staking: Arc<StakingStore>,
}

impl Portfolio {
    pub fn new(
        oracle: Arc<PriceOracle>,
        balances: Arc<BalanceStore>,
        liquidity: Arc<LiquidityStore>,
        staking: Arc<StakingStore>,
    ) -> Self {
        Self {
            oracle,
            balances,
            liquidity,
            staking,
        }
    }

    /// Price the current snapshots into a summary
    pub async fn summarize(&self) -> PortfolioSummary {
        let prices = self.oracle.snapshot().await;
        let price_of = |symbol: &str| prices.get(symbol).copied().unwrap_or(0.0);

        let holdings: Vec<HoldingLine> = self
            .balances
            .snapshot()
            .entries
            .iter()
            .map(|entry| HoldingLine {
                symbol: entry.asset.symbol,
                amount: entry.amount,
                value_usd: entry.amount * price_of(entry.asset.symbol),
            })
            .collect();
        let wallet_usd = holdings.iter().map(|h| h.value_usd).sum();

        let liquidity_usd = self
            .liquidity
            .snapshot()
            .iter()
            .map(|p| {
                p.amount0 * price_of(p.asset0.symbol) + p.amount1 * price_of(p.asset1.symbol)
            })
            .sum();

        let lp_usd = lp_token_usd(price_of("ETH"), price_of("TUSD"));
        let gov_usd = price_of("GOV");
        let (staked_usd, rewards_usd) = self.staking.snapshot().iter().fold(
            (0.0, 0.0),
            |(staked, rewards), position| {
                (
                    staked + position.staked_lp * lp_usd,
                    rewards + position.pending_rewards * gov_usd,
                )
            },
        );

        PortfolioSummary {
            holdings,
            wallet_usd,
            liquidity_usd,
            staked_usd,
            rewards_usd,
        }
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
    use crate::tracker::TransactionTracker;
    use crate::wallet::{SimulatedWallet, WalletProvider, WalletSession};
    use std::time::Duration;

    /// Oracle pinned to ETH 2000, METH 2000, GOV 3.5, TUSD 1.
    async fn pinned_oracle() -> Arc<PriceOracle> {
        Arc::new(PriceOracle::start(Arc::new(ScriptedEntropy::new([0.5, 0.5, 0.5]))).await)
    }

    async fn portfolio_with(values: Vec<f64>) -> (Portfolio, Arc<LiquidityStore>, Arc<StakingStore>) {
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
        let oracle = pinned_oracle().await;
        let tracker = Arc::new(TransactionTracker::new(wallet));
        let balances = Arc::new(BalanceStore::new(session.clone(), entropy.clone()));
        let liquidity = Arc::new(LiquidityStore::new(
            session.clone(),
            oracle.clone(),
            tracker.clone(),
            entropy.clone(),
        ));
        let staking = Arc::new(StakingStore::new(
            session,
            liquidity.clone(),
            tracker,
            entropy,
        ));
        let portfolio = Portfolio::new(oracle, balances, liquidity.clone(), staking.clone());
        (portfolio, liquidity, staking)
    }

    #[test]
    fn test_lp_token_valuation() {
        // 250 ETH at 2000 plus 450k TUSD at 1, over 10k LP tokens.
        let usd = lp_token_usd(2000.0, 1.0);
        assert!((usd - 95.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_empty_session_sums_to_zero() {
        let (portfolio, _, _) = portfolio_with(vec![]).await;
        let summary = portfolio.summarize().await;
        assert!(summary.holdings.is_empty());
        assert_eq!(summary.total_usd(), 0.0);
    }

    #[tokio::test]
    async fn test_wallet_holdings_priced() {
        let (portfolio, _, _) = portfolio_with(vec![]).await;
        portfolio.balances.refresh().await.unwrap();

        let summary = portfolio.summarize().await;
        assert_eq!(summary.holdings.len(), 4);
        assert!(summary.wallet_usd > 0.0);
        // TUSD is pegged, so its line values at face amount.
        let tusd = summary
            .holdings
            .iter()
            .find(|h| h.symbol == "TUSD")
            .unwrap();
        assert!((tusd.value_usd - tusd.amount).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_liquidity_and_staking_sections() {
        // add_liquidity tx (0.0, 0.0); stake tx (0.0, 0.0), apr 0.5.
        let (portfolio, liquidity, staking) =
            portfolio_with(vec![0.0, 0.0, 0.0, 0.0, 0.5]).await;
        liquidity.add_liquidity(2.0).await.unwrap();
        staking.stake(10.0).await.unwrap();

        let summary = portfolio.summarize().await;
        // 2 ETH at 2000 plus 4000 TUSD at 1.
        assert!((summary.liquidity_usd - 8000.0).abs() < 1e-6);
        // 10 LP at 95 USD each.
        assert!((summary.staked_usd - 950.0).abs() < 1e-6);
        assert_eq!(summary.rewards_usd, 0.0);
        assert!((summary.total_usd() - 8950.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_rewards_priced_in_gov() {
        // add (0.0, 0.0); staking load: chance 0.1, pct 0.5, apr 0.5, age 0.5.
        let (portfolio, liquidity, staking) =
            portfolio_with(vec![0.0, 0.0, 0.1, 0.5, 0.5, 0.5]).await;
        liquidity.add_liquidity(2.0).await.unwrap();
        staking.load_positions().await.unwrap();

        let pending = staking.snapshot()[0].pending_rewards;
        assert!(pending > 0.0);
        let summary = portfolio.summarize().await;
        assert!((summary.rewards_usd - pending * 3.5).abs() < 1e-9);
    }
}
