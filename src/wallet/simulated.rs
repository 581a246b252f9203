//! In-memory wallet provider.
//!
//! Implements the full capability trait against nothing but entropy: one
//! generated account, chain switching over the static registry, fabricated
//! balances, and transfers that become visible as receipts after a
//! randomized confirmation delay with a fixed success probability.

use crate::entropy::Entropy;
use crate::registry::{ChainParams, Network};
use crate::wallet::provider::{
    Receipt, ReceiptStatus, TransferRequest, WalletError, WalletEvent, WalletProvider,
};
use alloy_primitives::{Address, B256, U256};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex};
use tokio::time::Instant;
use tracing::debug;

// ============================================
// CONSTANTS
// ============================================

/// Probability a submitted transfer mines successfully
pub const DEFAULT_SUCCESS_RATE: f64 = 0.90;

/// Confirmation delay bounds
const DEFAULT_MIN_CONFIRMATION: Duration = Duration::from_millis(1000);
const DEFAULT_MAX_CONFIRMATION: Duration = Duration::from_millis(3000);

/// Fabricated native balance bounds, in ether
const NATIVE_BALANCE_MIN: f64 = 0.5;
const NATIVE_BALANCE_MAX: f64 = 2.0;

const EVENT_CHANNEL_CAPACITY: usize = 16;

// ============================================
// STATE
// ============================================

struct PendingTx {
    visible_at: Instant,
    status: ReceiptStatus,
}

struct WalletState {
    approved: bool,
    accounts: Vec<Address>,
    chain_id: u64,
    known_chains: HashMap<u64, ChainParams>,
    balances: HashMap<Address, U256>,
    pending: HashMap<B256, PendingTx>,
    reject_requests: bool,
}

/// Simulated wallet provider
pub struct SimulatedWallet {
    entropy: Arc<dyn Entropy>,
    state: Mutex<WalletState>,
    events: broadcast::Sender<WalletEvent>,
    success_rate: f64,
    min_confirmation: Duration,
    max_confirmation: Duration,
}

impl SimulatedWallet {
    /// Wallet starting on Sepolia with one generated account. MEGA is not
    /// pre-registered, so switching there exercises the add-then-switch
    /// path like a real extension would.
    pub fn new(entropy: Arc<dyn Entropy>) -> Self {
        let mut account_bytes = [0u8; 20];
        entropy.fill_bytes(&mut account_bytes);
        let account = Address::from(account_bytes);

        let sepolia = Network::Sepolia.chain_params();
        let mut known_chains = HashMap::new();
        known_chains.insert(sepolia.chain_id, sepolia);

        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Self {
            entropy,
            state: Mutex::new(WalletState {
                approved: false,
                accounts: vec![account],
                chain_id: Network::Sepolia.chain_id(),
                known_chains,
                balances: HashMap::new(),
                pending: HashMap::new(),
                reject_requests: false,
            }),
            events,
            success_rate: DEFAULT_SUCCESS_RATE,
            min_confirmation: DEFAULT_MIN_CONFIRMATION,
            max_confirmation: DEFAULT_MAX_CONFIRMATION,
        }
    }

    pub fn with_success_rate(mut self, rate: f64) -> Self {
        self.success_rate = rate;
        self
    }

    pub fn with_confirmation_delay(mut self, min: Duration, max: Duration) -> Self {
        self.min_confirmation = min;
        self.max_confirmation = max;
        self
    }

    /// Make the next approval prompts fail as user rejections
    pub async fn set_reject_requests(&self, reject: bool) {
        self.state.lock().await.reject_requests = reject;
    }

    /// Simulate the extension emitting an account change
    pub async fn emit_accounts_changed(&self, accounts: Vec<Address>) {
        self.state.lock().await.accounts = accounts.clone();
        let _ = self.events.send(WalletEvent::AccountsChanged(accounts));
    }

    fn fabricate_hash(&self) -> B256 {
        let mut bytes = [0u8; 32];
        self.entropy.fill_bytes(&mut bytes);
        B256::from(bytes)
    }

    fn fabricate_balance(&self) -> U256 {
        let ether = self.entropy.range(NATIVE_BALANCE_MIN, NATIVE_BALANCE_MAX);
        U256::from((ether * 1e18) as u128)
    }
}

#[async_trait]
impl WalletProvider for SimulatedWallet {
    async fn request_accounts(&self) -> Result<Vec<Address>, WalletError> {
        let mut state = self.state.lock().await;
        if state.reject_requests {
            return Err(WalletError::UserRejected);
        }
        state.approved = true;
        Ok(state.accounts.clone())
    }

    async fn accounts(&self) -> Result<Vec<Address>, WalletError> {
        let state = self.state.lock().await;
        if state.approved {
            Ok(state.accounts.clone())
        } else {
            Ok(Vec::new())
        }
    }

    async fn chain_id(&self) -> Result<u64, WalletError> {
        Ok(self.state.lock().await.chain_id)
    }

    async fn switch_chain(&self, chain_id: u64) -> Result<(), WalletError> {
        let mut state = self.state.lock().await;
        if !state.known_chains.contains_key(&chain_id) {
            return Err(WalletError::UnknownChain(chain_id));
        }
        if state.chain_id != chain_id {
            state.chain_id = chain_id;
            let _ = self.events.send(WalletEvent::ChainChanged(chain_id));
        }
        Ok(())
    }

    async fn add_chain(&self, params: &ChainParams) -> Result<(), WalletError> {
        let mut state = self.state.lock().await;
        state.known_chains.insert(params.chain_id, params.clone());
        Ok(())
    }

    async fn balance(&self, account: Address) -> Result<U256, WalletError> {
        let mut state = self.state.lock().await;
        if !state.balances.contains_key(&account) {
            let fabricated = self.fabricate_balance();
            state.balances.insert(account, fabricated);
        }
        Ok(state.balances[&account])
    }

    async fn send_transaction(&self, request: &TransferRequest) -> Result<B256, WalletError> {
        let mut state = self.state.lock().await;
        if !state.approved {
            return Err(WalletError::UserRejected);
        }
        if !state.accounts.contains(&request.from) {
            return Err(WalletError::Rpc(format!(
                "unknown sender {}",
                request.from
            )));
        }

        let hash = self.fabricate_hash();
        let status = if self.entropy.chance(self.success_rate) {
            ReceiptStatus::Success
        } else {
            ReceiptStatus::Reverted
        };
        let delay_ms = self.entropy.range(
            self.min_confirmation.as_millis() as f64,
            self.max_confirmation.as_millis() as f64,
        );
        let visible_at = Instant::now() + Duration::from_millis(delay_ms as u64);

        debug!(%hash, ?status, delay_ms, "simulated transfer submitted");
        state.pending.insert(hash, PendingTx { visible_at, status });
        Ok(hash)
    }

    async fn transaction_receipt(&self, tx_hash: B256) -> Result<Option<Receipt>, WalletError> {
        let state = self.state.lock().await;
        match state.pending.get(&tx_hash) {
            Some(tx) if Instant::now() >= tx.visible_at => Ok(Some(Receipt {
                tx_hash,
                status: tx.status,
            })),
            Some(_) => Ok(None),
            None => Err(WalletError::Rpc(format!("unknown transaction {tx_hash}"))),
        }
    }

    fn subscribe(&self) -> broadcast::Receiver<WalletEvent> {
        self.events.subscribe()
    }
}

// ============================================
// TESTS
// ============================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entropy::{ScriptedEntropy, ThreadEntropy};

    fn instant_wallet(entropy: Arc<dyn Entropy>) -> SimulatedWallet {
        SimulatedWallet::new(entropy)
            .with_confirmation_delay(Duration::ZERO, Duration::ZERO)
    }

    #[tokio::test]
    async fn test_accounts_empty_until_approved() {
        let wallet = SimulatedWallet::new(Arc::new(ThreadEntropy));
        assert!(wallet.accounts().await.unwrap().is_empty());
        let approved = wallet.request_accounts().await.unwrap();
        assert_eq!(approved.len(), 1);
        assert_eq!(wallet.accounts().await.unwrap(), approved);
    }

    #[tokio::test]
    async fn test_rejection_path() {
        let wallet = SimulatedWallet::new(Arc::new(ThreadEntropy));
        wallet.set_reject_requests(true).await;
        assert_eq!(
            wallet.request_accounts().await,
            Err(WalletError::UserRejected)
        );
    }

    #[tokio::test]
    async fn test_switch_to_unknown_chain_needs_add() {
        let wallet = SimulatedWallet::new(Arc::new(ThreadEntropy));
        let mega = Network::Mega.chain_params();
        assert_eq!(
            wallet.switch_chain(mega.chain_id).await,
            Err(WalletError::UnknownChain(mega.chain_id))
        );
        wallet.add_chain(&mega).await.unwrap();
        wallet.switch_chain(mega.chain_id).await.unwrap();
        assert_eq!(wallet.chain_id().await.unwrap(), mega.chain_id);
    }

    #[tokio::test]
    async fn test_chain_switch_broadcasts_event() {
        let wallet = SimulatedWallet::new(Arc::new(ThreadEntropy));
        let mut events = wallet.subscribe();
        let mega = Network::Mega.chain_params();
        wallet.add_chain(&mega).await.unwrap();
        wallet.switch_chain(mega.chain_id).await.unwrap();
        assert_eq!(
            events.recv().await.unwrap(),
            WalletEvent::ChainChanged(mega.chain_id)
        );
    }

    #[tokio::test]
    async fn test_balance_is_stable_across_reads() {
        let wallet = SimulatedWallet::new(Arc::new(ThreadEntropy));
        let account = wallet.request_accounts().await.unwrap()[0];
        let first = wallet.balance(account).await.unwrap();
        let second = wallet.balance(account).await.unwrap();
        assert_eq!(first, second);
        assert!(first > U256::ZERO);
    }

    #[tokio::test]
    async fn test_send_requires_approval() {
        let wallet = instant_wallet(Arc::new(ThreadEntropy));
        let account = Address::ZERO;
        let request = TransferRequest::action(account, account);
        assert_eq!(
            wallet.send_transaction(&request).await,
            Err(WalletError::UserRejected)
        );
    }

    #[tokio::test]
    async fn test_successful_transfer_yields_receipt() {
        // Success draw 0.0 < 0.9, zero delay.
        let entropy = Arc::new(ScriptedEntropy::new([0.0, 0.0]));
        let wallet = instant_wallet(entropy);
        let account = wallet.request_accounts().await.unwrap()[0];
        let request = TransferRequest::action(account, account);
        let hash = wallet.send_transaction(&request).await.unwrap();
        let receipt = wallet.transaction_receipt(hash).await.unwrap().unwrap();
        assert!(receipt.succeeded());
    }

    #[tokio::test]
    async fn test_failed_transfer_yields_reverted_receipt() {
        // Success draw 0.95 >= 0.9.
        let entropy = Arc::new(ScriptedEntropy::new([0.95, 0.0]));
        let wallet = instant_wallet(entropy);
        let account = wallet.request_accounts().await.unwrap()[0];
        let request = TransferRequest::action(account, account);
        let hash = wallet.send_transaction(&request).await.unwrap();
        let receipt = wallet.transaction_receipt(hash).await.unwrap().unwrap();
        assert!(!receipt.succeeded());
    }

    #[tokio::test(start_paused = true)]
    async fn test_receipt_hidden_until_delay_elapses() {
        let entropy = Arc::new(ScriptedEntropy::new([0.0, 0.5]));
        let wallet = SimulatedWallet::new(entropy)
            .with_confirmation_delay(Duration::from_secs(2), Duration::from_secs(2));
        let account = wallet.request_accounts().await.unwrap()[0];
        let request = TransferRequest::action(account, account);
        let hash = wallet.send_transaction(&request).await.unwrap();

        assert!(wallet.transaction_receipt(hash).await.unwrap().is_none());
        tokio::time::advance(Duration::from_secs(3)).await;
        assert!(wallet.transaction_receipt(hash).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_unknown_hash_is_rpc_error() {
        let wallet = SimulatedWallet::new(Arc::new(ThreadEntropy));
        let result = wallet.transaction_receipt(B256::ZERO).await;
        assert!(matches!(result, Err(WalletError::Rpc(_))));
    }
}
