//! MegaSwap - Testnet DEX Demo
//!
//! Run with: cargo run
//!
//! Connects a simulated wallet, quotes and executes a swap, loads the
//! liquidity/staking/governance views, and prints a portfolio summary.
//! Every chain interaction goes through the wallet provider boundary.

use clap::Parser;
use color_eyre::eyre::{eyre, Result};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod balances;
mod config;
mod entropy;
mod governance;
mod liquidity;
mod market;
mod portfolio;
mod registry;
mod staking;
mod tracker;
mod wallet;

use balances::BalanceStore;
use config::Config;
use entropy::{Entropy, ThreadEntropy};
use governance::{GovernanceStore, ProposalStatus};
use liquidity::LiquidityStore;
use market::{estimate, PriceOracle};
use portfolio::Portfolio;
use registry::{demo_recipient, explorer_tx_url};
use staking::StakingStore;
use tracker::{TrackOutcome, TransactionTracker};
use wallet::{SimulatedWallet, TransferRequest, WalletProvider, WalletSession};

#[derive(Parser, Debug)]
#[command(name = "megaswap", about = "Testnet DEX demo over a simulated wallet")]
struct Args {
    /// Path to a TOML config file; environment variables otherwise
    #[arg(long)]
    config: Option<String>,

    /// Swap input amount, overriding the configured demo amount
    #[arg(long)]
    amount: Option<f64>,

    /// Input asset symbol
    #[arg(long, default_value = "ETH")]
    from: String,

    /// Output asset symbol
    #[arg(long, default_value = "TUSD")]
    to: String,
}

fn print_banner() {
    println!();
    println!(
        "{}",
        style("═══════════════════════════════════════════════════════════════").cyan()
    );
    println!(
        "{}",
        style(" 🔄 MEGASWAP - Testnet DEX Demo").cyan().bold()
    );
    println!(
        "{}",
        style("    Sepolia + MEGA | Simulated Wallet | Tracked Transactions").cyan()
    );
    println!(
        "{}",
        style("═══════════════════════════════════════════════════════════════").cyan()
    );
    println!();
}

fn spinner(message: &str) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    bar.set_message(message.to_string());
    bar.enable_steady_tick(Duration::from_millis(100));
    bar
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("megaswap=info".parse()?),
        )
        .init();

    let args = Args::parse();
    print_banner();

    // Load configuration
    let config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::from_env()?,
    };
    if let Err(e) = config.validate() {
        error!("Configuration validation failed: {}", e);
        return Err(e);
    }
    config.print_summary();
    println!();

    let amount_in = args.amount.unwrap_or(config.demo_swap_amount);
    let entropy: Arc<dyn Entropy> = Arc::new(ThreadEntropy);

    // =============================================
    // PHASE 1: WALLET CONNECTION
    // =============================================
    println!();
    println!("{}", style("═══ PHASE 1: WALLET CONNECTION ═══").blue().bold());
    println!();

    let provider = Arc::new(
        SimulatedWallet::new(entropy.clone())
            .with_success_rate(config.success_rate)
            .with_confirmation_delay(
                Duration::from_millis(config.min_confirmation_ms),
                Duration::from_millis(config.max_confirmation_ms),
            ),
    );
    let session = Arc::new(WalletSession::new(
        Some(provider.clone() as Arc<dyn WalletProvider>),
        config.default_network,
    ));
    let _events = session.spawn_event_listener()?;

    let state = session.connect().await?;
    let account = state
        .account
        .ok_or_else(|| eyre!("wallet connected without an account"))?;
    let network = state
        .network
        .ok_or_else(|| eyre!("wallet connected without a network"))?;
    println!("{} Connected: {}", style("✓").green(), style(account).cyan());
    println!("{} Network:   {}", style("✓").green(), network);

    let balance_store = Arc::new(BalanceStore::new(session.clone(), entropy.clone()));
    let balances_for_hook = balance_store.clone();
    let tracker = Arc::new(
        TransactionTracker::new(provider.clone() as Arc<dyn WalletProvider>)
            .with_poll_interval(Duration::from_secs(config.poll_interval_secs))
            .with_max_attempts(config.max_poll_attempts)
            .on_confirmed(move |_| {
                let balances = balances_for_hook.clone();
                tokio::spawn(async move {
                    if let Err(e) = balances.refresh().await {
                        warn!("balance refresh after confirmation failed: {e}");
                    }
                });
            }),
    );

    let book = balance_store.refresh().await?;
    println!();
    println!("   Balances:");
    for entry in &book.entries {
        println!("     {:>6}  {:.4}", entry.asset.symbol, entry.amount);
    }

    // =============================================
    // PHASE 2: MARKET
    // =============================================
    println!();
    println!("{}", style("═══ PHASE 2: MARKET ═══").magenta().bold());
    println!();

    let oracle = Arc::new(PriceOracle::start(entropy.clone()).await);
    let _refresh = oracle.spawn_refresh(Duration::from_secs(config.price_refresh_secs));

    let prices = oracle.snapshot().await;
    println!("   Prices (USD):");
    for symbol in ["ETH", "TUSD", "METH", "GOV"] {
        if let Some(price) = prices.get(symbol) {
            println!("     {:>6}  ${:.2}", symbol, price);
        }
    }

    let rate = oracle.spot_rate(&args.from, &args.to).await;
    let quote = estimate(amount_in, rate);
    if quote.is_zero() {
        return Err(eyre!(
            "no quote for {} → {}: pair is unpriced",
            args.from,
            args.to
        ));
    }
    println!();
    println!(
        "   Quote: {} {} → {:.4} {} (impact {:.3}%, min received {:.4})",
        amount_in,
        args.from,
        quote.amount_out,
        args.to,
        quote.impact_pct,
        quote.min_received(config.slippage_pct)
    );

    // =============================================
    // PHASE 3: SWAP
    // =============================================
    println!();
    println!("{}", style("═══ PHASE 3: SWAP ═══").green().bold());
    println!();

    let request = TransferRequest::action(account, demo_recipient());
    let bar = spinner("Submitting swap and waiting for confirmation...");
    let submission = tracker.submit_and_track(&request).await?;
    bar.finish_and_clear();

    let hash = format!("{}", submission.handle.hash);
    match submission.outcome {
        TrackOutcome::Confirmed => {
            println!("{} Swap confirmed: {}", style("✓").green(), style(&hash).cyan());
            if let Some(url) = explorer_tx_url(network, &hash) {
                println!("   Explorer: {}", style(url).dim());
            }
        }
        TrackOutcome::Failed => {
            println!("{} Swap reverted: {}", style("✗").red(), style(&hash).cyan());
        }
        TrackOutcome::BudgetExhausted => {
            println!(
                "{} Swap still pending after {} polls: {}",
                style("…").yellow(),
                config.max_poll_attempts,
                style(&hash).cyan()
            );
        }
    }

    // =============================================
    // PHASE 4: POSITIONS & GOVERNANCE
    // =============================================
    println!();
    println!(
        "{}",
        style("═══ PHASE 4: POSITIONS & GOVERNANCE ═══").yellow().bold()
    );
    println!();

    let liquidity_store = Arc::new(LiquidityStore::new(
        session.clone(),
        oracle.clone(),
        tracker.clone(),
        entropy.clone(),
    ));
    let positions = liquidity_store.load_positions().await?;
    if positions.is_empty() {
        println!("   No liquidity positions.");
    } else {
        for position in &positions {
            println!(
                "   Pool {}: {:.4} {} + {:.2} {} ({:.2} LP, {:.3}% share)",
                position.pool_id,
                position.amount0,
                position.asset0.symbol,
                position.amount1,
                position.asset1.symbol,
                position.lp_tokens,
                position.share_pct
            );
        }
    }

    let staking_store = Arc::new(StakingStore::new(
        session.clone(),
        liquidity_store.clone(),
        tracker.clone(),
        entropy.clone(),
    ));
    let staked = staking_store.load_positions().await?;
    if staked.is_empty() {
        println!("   No staking positions.");
    } else {
        for position in &staked {
            println!(
                "   Farm {}: {:.2} LP staked at {:.1}% APR, {:.4} GOV pending",
                position.pool_id, position.staked_lp, position.apr_pct, position.pending_rewards
            );
        }
    }

    let governance_store = GovernanceStore::new(session.clone(), tracker.clone(), entropy.clone());
    let proposals = governance_store.load_proposals().await?;
    println!();
    println!("   Governance:");
    for proposal in &proposals {
        let status = match proposal.status() {
            ProposalStatus::Active => style("ACTIVE").green(),
            ProposalStatus::Closed => style("CLOSED").dim(),
        };
        let voted = match proposal.user_vote {
            Some(choice) => format!(" (voted {choice})"),
            None => String::new(),
        };
        println!(
            "     #{} [{}] {} — {:.0}% approval{}",
            proposal.id,
            status,
            proposal.title,
            proposal.approval_pct(),
            voted
        );
    }

    // =============================================
    // PHASE 5: PORTFOLIO
    // =============================================
    println!();
    println!("{}", style("═══ PHASE 5: PORTFOLIO ═══").cyan().bold());
    println!();

    let portfolio = Portfolio::new(
        oracle.clone(),
        balance_store.clone(),
        liquidity_store.clone(),
        staking_store.clone(),
    );
    let summary = portfolio.summarize().await;
    for line in &summary.holdings {
        println!(
            "     {:>6}  {:>12.4}  ${:>10.2}",
            line.symbol, line.amount, line.value_usd
        );
    }
    println!();
    println!("     Wallet:     ${:>12.2}", summary.wallet_usd);
    println!("     Liquidity:  ${:>12.2}", summary.liquidity_usd);
    println!("     Staked:     ${:>12.2}", summary.staked_usd);
    println!("     Rewards:    ${:>12.2}", summary.rewards_usd);
    println!(
        "     {}",
        style(format!("Total:      ${:>12.2}", summary.total_usd())).bold()
    );

    println!();
    println!(
        "{}",
        style("═══════════════════════════════════════════════════════════════").green()
    );
    println!("{}", style(" ✅ DEMO COMPLETE").green().bold());
    println!(
        "{}",
        style("═══════════════════════════════════════════════════════════════").green()
    );

    Ok(())
}
