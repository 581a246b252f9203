//! The injected wallet capability.
//!
//! Everything the app needs from a browser-extension-style wallet is this
//! trait: account approval, chain introspection and switching, balance
//! reads, transfer submission, receipt lookup, and change notifications.
//! Nothing else in the crate assumes a concrete provider.

use crate::registry::ChainParams;
use alloy_primitives::{Address, B256, U256};
use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::broadcast;

/// Standard gas for a plain value transfer
pub const TRANSFER_GAS_LIMIT: u64 = 21_000;

/// Provider-level failures, the error taxonomy every action maps from
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WalletError {
    /// No wallet capability is present at all
    #[error("no wallet provider available")]
    Unavailable,

    /// The user dismissed the approval prompt
    #[error("request rejected by user")]
    UserRejected,

    /// Switch target the wallet has never seen; callers add it first
    #[error("chain {0:#x} is not known to the wallet")]
    UnknownChain(u64),

    /// Anything the underlying transport reports
    #[error("provider error: {0}")]
    Rpc(String),
}

/// Result code carried by a mined receipt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiptStatus {
    Success,
    Reverted,
}

/// Wallet-returned record for a mined transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub tx_hash: B256,
    pub status: ReceiptStatus,
}

impl Receipt {
    pub fn succeeded(&self) -> bool {
        self.status == ReceiptStatus::Success
    }
}

/// Parameters for a value transfer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    pub from: Address,
    pub to: Address,
    pub value: U256,
    pub gas_limit: u64,
}

impl TransferRequest {
    pub fn new(from: Address, to: Address, value: U256) -> Self {
        Self {
            from,
            to,
            value,
            gas_limit: TRANSFER_GAS_LIMIT,
        }
    }

    /// Zero-value transfer used by actions that only need a tracked
    /// transaction (liquidity, staking, voting) on the simulated path.
    pub fn action(from: Address, to: Address) -> Self {
        Self::new(from, to, U256::ZERO)
    }
}

/// Change notifications a wallet pushes at the app
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalletEvent {
    AccountsChanged(Vec<Address>),
    ChainChanged(u64),
}

/// The capability set consumed by the rest of the crate. Constructed once
/// at startup and threaded through; never referenced as a global.
#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Prompt the user to approve access and return the approved accounts
    async fn request_accounts(&self) -> Result<Vec<Address>, WalletError>;

    /// Already-approved accounts, without prompting (empty when none)
    async fn accounts(&self) -> Result<Vec<Address>, WalletError>;

    /// Active chain id
    async fn chain_id(&self) -> Result<u64, WalletError>;

    /// Switch the active chain; `UnknownChain` if the wallet lacks it
    async fn switch_chain(&self, chain_id: u64) -> Result<(), WalletError>;

    /// Register a chain with the wallet
    async fn add_chain(&self, params: &ChainParams) -> Result<(), WalletError>;

    /// Native-coin balance in wei
    async fn balance(&self, account: Address) -> Result<U256, WalletError>;

    /// Sign and broadcast a transfer, returning its hash
    async fn send_transaction(&self, request: &TransferRequest) -> Result<B256, WalletError>;

    /// Receipt for a submitted transfer; `None` while still unmined
    async fn transaction_receipt(&self, tx_hash: B256) -> Result<Option<Receipt>, WalletError>;

    /// Subscribe to account/chain change notifications
    fn subscribe(&self) -> broadcast::Receiver<WalletEvent>;
}
