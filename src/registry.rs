//! Static registries: assets, networks, and seed governance proposals.
//!
//! Everything here is configuration, not computed state. The rest of the
//! app reads these tables and never mutates them.

use alloy_primitives::Address;
use lazy_static::lazy_static;
use std::collections::HashMap;
use std::str::FromStr;

// ============================================
// NETWORKS
// ============================================

/// Supported testnets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Network {
    Sepolia,
    Mega,
}

impl std::fmt::Display for Network {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Network::Sepolia => write!(f, "Sepolia Testnet"),
            Network::Mega => write!(f, "MEGA Testnet"),
        }
    }
}

impl FromStr for Network {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sepolia" => Ok(Network::Sepolia),
            "mega" => Ok(Network::Mega),
            other => Err(format!("unknown network: {other}")),
        }
    }
}

/// Wallet-facing chain metadata, the shape `add_chain` expects
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainParams {
    pub chain_id: u64,
    pub chain_name: String,
    /// Native currency symbol; the MEGA registry entry ships without one
    pub native_symbol: Option<String>,
    pub native_decimals: u8,
    pub rpc_urls: Vec<String>,
    pub explorer_url: Option<String>,
}

/// Sepolia chain id (0xaa36a7)
pub const SEPOLIA_CHAIN_ID: u64 = 11_155_111;

/// MEGA testnet chain id (0x18c6)
pub const MEGA_CHAIN_ID: u64 = 6342;

impl Network {
    pub fn chain_id(&self) -> u64 {
        match self {
            Network::Sepolia => SEPOLIA_CHAIN_ID,
            Network::Mega => MEGA_CHAIN_ID,
        }
    }

    pub fn chain_params(&self) -> ChainParams {
        match self {
            Network::Sepolia => ChainParams {
                chain_id: SEPOLIA_CHAIN_ID,
                chain_name: "Sepolia Testnet".to_string(),
                native_symbol: Some("ETH".to_string()),
                native_decimals: 18,
                rpc_urls: vec!["https://rpc.sepolia.org".to_string()],
                explorer_url: Some("https://sepolia.etherscan.io".to_string()),
            },
            Network::Mega => ChainParams {
                chain_id: MEGA_CHAIN_ID,
                chain_name: "MEGA Testnet".to_string(),
                native_symbol: None,
                native_decimals: 18,
                rpc_urls: vec!["https://carrot.megaeth.com/rpc".to_string()],
                explorer_url: Some("https://explorer-testnet.megachain.xyz".to_string()),
            },
        }
    }
}

/// Map a wallet-reported chain id back to a known network
pub fn network_for_chain(chain_id: u64) -> Option<Network> {
    match chain_id {
        SEPOLIA_CHAIN_ID => Some(Network::Sepolia),
        MEGA_CHAIN_ID => Some(Network::Mega),
        _ => None,
    }
}

/// Explorer link for a transaction hash, if the network has an explorer
pub fn explorer_tx_url(network: Network, tx_hash: &str) -> Option<String> {
    network
        .chain_params()
        .explorer_url
        .map(|base| format!("{base}/tx/{tx_hash}"))
}

// ============================================
// ASSETS
// ============================================

/// An entry in the static asset registry
#[derive(Debug, Clone, PartialEq)]
pub struct Asset {
    pub symbol: &'static str,
    pub name: &'static str,
    /// Contract address; `None` for the chain's native coin
    pub address: Option<Address>,
    pub decimals: u8,
    pub network: Network,
}

impl Asset {
    pub fn is_native(&self) -> bool {
        self.address.is_none()
    }
}

/// Test USD contract on Sepolia
const TUSD_ADDRESS: &str = "0xc7a78BFFb60BEc6Cea1287FfB95210D9c7fce071";

/// Governance token contract on Sepolia
const GOV_ADDRESS: &str = "0x6f76000000000000000000000000000000000000";

pub fn all_assets() -> Vec<Asset> {
    vec![
        Asset {
            symbol: "ETH",
            name: "Sepolia Ethereum",
            address: None,
            decimals: 18,
            network: Network::Sepolia,
        },
        Asset {
            symbol: "TUSD",
            name: "Test USD",
            address: Some(Address::from_str(TUSD_ADDRESS).unwrap()),
            decimals: 18,
            network: Network::Sepolia,
        },
        Asset {
            symbol: "METH",
            name: "Mega Ethereum",
            address: None,
            decimals: 18,
            network: Network::Mega,
        },
        Asset {
            symbol: "GOV",
            name: "Governance Token",
            address: Some(Address::from_str(GOV_ADDRESS).unwrap()),
            decimals: 18,
            network: Network::Sepolia,
        },
    ]
}

/// Assets shown when connected to `network`. METH is always listed on
/// Sepolia so the bridge pair stays visible.
pub fn assets_on(network: Network) -> Vec<Asset> {
    let mut assets: Vec<Asset> = all_assets()
        .into_iter()
        .filter(|a| a.network == network)
        .collect();

    if network == Network::Sepolia && !assets.iter().any(|a| a.symbol == "METH") {
        if let Some(meth) = get_asset("METH") {
            assets.push(meth);
        }
    }

    assets
}

pub fn get_asset(symbol: &str) -> Option<Asset> {
    all_assets().into_iter().find(|a| a.symbol == symbol)
}

lazy_static! {
    /// Symbol lookup by contract address (native coins have no entry)
    static ref ADDRESS_TO_SYMBOL: HashMap<Address, &'static str> = {
        let mut map = HashMap::new();
        for asset in all_assets() {
            if let Some(address) = asset.address {
                map.insert(address, asset.symbol);
            }
        }
        map
    };
}

pub fn symbol_for_address(address: &Address) -> Option<&'static str> {
    ADDRESS_TO_SYMBOL.get(address).copied()
}

/// Stand-in swap-router recipient for demo transfers. There is no deployed
/// router on these testnets; transfers go to the TUSD contract.
pub fn demo_recipient() -> Address {
    Address::from_str(TUSD_ADDRESS).unwrap()
}

// ============================================
// POOLS
// ============================================

/// The one seeded liquidity pool
#[derive(Debug, Clone, PartialEq)]
pub struct PoolSeed {
    pub id: &'static str,
    pub symbol0: &'static str,
    pub symbol1: &'static str,
    pub apr_pct: f64,
    pub tvl_usd: f64,
}

pub fn seed_pools() -> Vec<PoolSeed> {
    vec![PoolSeed {
        id: "eth-tusd",
        symbol0: "ETH",
        symbol1: "TUSD",
        apr_pct: 5.2,
        tvl_usd: 1_245_000.0,
    }]
}

// ============================================
// GOVERNANCE SEEDS
// ============================================

/// Seed proposal data. End times are offsets from session start because the
/// registry is static; the governance store resolves them to timestamps.
#[derive(Debug, Clone, PartialEq)]
pub struct ProposalSeed {
    pub id: u32,
    pub title: &'static str,
    pub description: &'static str,
    /// Days until voting ends; negative means the proposal already closed
    pub ends_in_days: i64,
    pub votes_for: f64,
    pub votes_against: f64,
}

pub fn seed_proposals() -> Vec<ProposalSeed> {
    vec![
        ProposalSeed {
            id: 1,
            title: "Add New Pool: TUSD-GOV",
            description: "Proposal to add a new liquidity pool for TUSD-GOV pair with 0.3% swap fee.",
            ends_in_days: 3,
            votes_for: 340_000.0,
            votes_against: 120_000.0,
        },
        ProposalSeed {
            id: 2,
            title: "Increase Rewards for ETH-TUSD Pool",
            description: "Increase the GOV token rewards for ETH-TUSD liquidity providers by 20%.",
            ends_in_days: 5,
            votes_for: 420_000.0,
            votes_against: 180_000.0,
        },
        ProposalSeed {
            id: 3,
            title: "Implement Flash Loans Protocol",
            description: "Add flash loan capability to the protocol with a 0.09% fee.",
            ends_in_days: -2,
            votes_for: 650_000.0,
            votes_against: 350_000.0,
        },
    ]
}

// ============================================
// TESTS
// ============================================
