//! Runtime configuration.
//!
//! Every knob of the simulation has an environment override and a sane
//! default, so the demo runs with zero setup and tests can pin behavior.

use crate::market::DEFAULT_REFRESH_SECS;
use crate::registry::Network;
use crate::tracker::{DEFAULT_MAX_ATTEMPTS, DEFAULT_POLL_INTERVAL};
use crate::wallet::DEFAULT_SUCCESS_RATE;
use eyre::Result;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;

// ============================================
// MAIN CONFIGURATION
// ============================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // ========== Network Settings ==========
    /// Network the session lands on after connecting
    pub default_network: Network,

    // ========== Market Settings ==========
    /// Seconds between price table refreshes
    pub price_refresh_secs: u64,

    /// Slippage tolerance applied to quotes, percent
    pub slippage_pct: f64,

    /// Swap size used by the scripted demo run, in the input asset
    pub demo_swap_amount: f64,

    // ========== Tracking Settings ==========
    /// Seconds between receipt polls
    pub poll_interval_secs: u64,

    /// Receipt polls before a transaction is reported still-pending
    pub max_poll_attempts: u32,

    // ========== Simulation Settings ==========
    /// Fraction of simulated transactions that confirm successfully
    pub success_rate: f64,

    /// Simulated confirmation delay bounds, milliseconds
    pub min_confirmation_ms: u64,
    pub max_confirmation_ms: u64,
}

impl Config {
    /// Load configuration from environment variables and .env file
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            default_network: env::var("MEGASWAP_NETWORK")
                .unwrap_or_else(|_| "sepolia".to_string())
                .parse()
                .unwrap_or(Network::Sepolia),
            price_refresh_secs: env::var("MEGASWAP_PRICE_REFRESH_SECS")
                .unwrap_or_else(|_| DEFAULT_REFRESH_SECS.to_string())
                .parse()
                .unwrap_or(DEFAULT_REFRESH_SECS),
            slippage_pct: env::var("MEGASWAP_SLIPPAGE_PCT")
                .unwrap_or_else(|_| "0.5".to_string())
                .parse()
                .unwrap_or(0.5),
            demo_swap_amount: env::var("MEGASWAP_DEMO_SWAP_AMOUNT")
                .unwrap_or_else(|_| "0.1".to_string())
                .parse()
                .unwrap_or(0.1),
            poll_interval_secs: env::var("MEGASWAP_POLL_INTERVAL_SECS")
                .unwrap_or_else(|_| DEFAULT_POLL_INTERVAL.as_secs().to_string())
                .parse()
                .unwrap_or(DEFAULT_POLL_INTERVAL.as_secs()),
            max_poll_attempts: env::var("MEGASWAP_MAX_POLL_ATTEMPTS")
                .unwrap_or_else(|_| DEFAULT_MAX_ATTEMPTS.to_string())
                .parse()
                .unwrap_or(DEFAULT_MAX_ATTEMPTS),
            success_rate: env::var("MEGASWAP_SUCCESS_RATE")
                .unwrap_or_else(|_| DEFAULT_SUCCESS_RATE.to_string())
                .parse()
                .unwrap_or(DEFAULT_SUCCESS_RATE),
            min_confirmation_ms: env::var("MEGASWAP_MIN_CONFIRMATION_MS")
                .unwrap_or_else(|_| "1000".to_string())
                .parse()
                .unwrap_or(1000),
            max_confirmation_ms: env::var("MEGASWAP_MAX_CONFIRMATION_MS")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .unwrap_or(3000),
        })
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Sanity-check the knobs before wiring anything up
    pub fn validate(&self) -> Result<()> {
        if self.price_refresh_secs == 0 {
            return Err(eyre::eyre!("MEGASWAP_PRICE_REFRESH_SECS must be positive"));
        }
        if !(0.0..=1.0).contains(&self.success_rate) {
            return Err(eyre::eyre!(
                "MEGASWAP_SUCCESS_RATE must be between 0 and 1 (currently {})",
                self.success_rate
            ));
        }
        if self.min_confirmation_ms > self.max_confirmation_ms {
            return Err(eyre::eyre!(
                "MEGASWAP_MIN_CONFIRMATION_MS ({}) exceeds MEGASWAP_MAX_CONFIRMATION_MS ({})",
                self.min_confirmation_ms,
                self.max_confirmation_ms
            ));
        }
        if !(0.0..100.0).contains(&self.slippage_pct) {
            return Err(eyre::eyre!(
                "MEGASWAP_SLIPPAGE_PCT must be in [0, 100) (currently {})",
                self.slippage_pct
            ));
        }
        if self.max_poll_attempts == 0 {
            return Err(eyre::eyre!("MEGASWAP_MAX_POLL_ATTEMPTS must be positive"));
        }
        if self.demo_swap_amount <= 0.0 {
            return Err(eyre::eyre!(
                "MEGASWAP_DEMO_SWAP_AMOUNT must be positive (currently {})",
                self.demo_swap_amount
            ));
        }
        Ok(())
    }

    /// Print configuration summary
    pub fn print_summary(&self) {
        println!("╔════════════════════════════════════════════════════════════╗");
        println!("║              MEGASWAP - CONFIGURATION                      ║");
        println!("╠════════════════════════════════════════════════════════════╣");
        println!("║ Network:           {:^40} ║", self.default_network.to_string());
        println!("╠════════════════════════════════════════════════════════════╣");
        println!("║ MARKET                                                     ║");
        println!("║ • Price Refresh:   {:>37}s  ║", self.price_refresh_secs);
        println!("║ • Slippage:        {:>37.2}%  ║", self.slippage_pct);
        println!("║ • Demo Swap:       {:>38.4} ║", self.demo_swap_amount);
        println!("╠════════════════════════════════════════════════════════════╣");
        println!("║ TRACKING                                                   ║");
        println!("║ • Poll Interval:   {:>37}s  ║", self.poll_interval_secs);
        println!("║ • Max Attempts:    {:^40} ║", self.max_poll_attempts);
        println!("╠════════════════════════════════════════════════════════════╣");
        println!("║ SIMULATION                                                 ║");
        println!("║ • Success Rate:    {:>37.0}%  ║", self.success_rate * 100.0);
        println!(
            "║ • Confirmation:    {:>30}-{} ms  ║",
            self.min_confirmation_ms, self.max_confirmation_ms
        );
        println!("╚════════════════════════════════════════════════════════════╝");
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_network: Network::Sepolia,
            price_refresh_secs: DEFAULT_REFRESH_SECS,
            slippage_pct: 0.5,
            demo_swap_amount: 0.1,
            poll_interval_secs: DEFAULT_POLL_INTERVAL.as_secs(),
            max_poll_attempts: DEFAULT_MAX_ATTEMPTS,
            success_rate: DEFAULT_SUCCESS_RATE,
            min_confirmation_ms: 1000,
            max_confirmation_ms: 3000,
        }
    }
}

// ============================================
// TESTS
// ============================================
