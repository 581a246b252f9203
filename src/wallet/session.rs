//! Wallet session state machine.
//!
//! Owns the connection state (account, active network) over an injected
//! provider. Every feature store reads the session instead of touching the
//! provider's account/chain surface directly.

use crate::registry::{network_for_chain, Network};
use crate::wallet::provider::{WalletError, WalletEvent, WalletProvider};
use alloy_primitives::Address;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Session-level failures, mapped from the provider taxonomy where needed
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("no wallet provider available; install or connect a wallet")]
    ProviderMissing,

    #[error("connection rejected by user")]
    Rejected,

    #[error("wallet not connected")]
    NotConnected,

    #[error("wrong network: expected {expected}, wallet is on {actual}")]
    NetworkMismatch { expected: Network, actual: Network },

    #[error(transparent)]
    Wallet(#[from] WalletError),
}

/// Immutable snapshot of the session
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SessionState {
    pub account: Option<Address>,
    pub network: Option<Network>,
}

impl SessionState {
    pub fn is_connected(&self) -> bool {
        self.account.is_some()
    }
}

/// Connection state over an optional provider. `None` models the browser
/// without an extension installed.
pub struct WalletSession {
    provider: Option<Arc<dyn WalletProvider>>,
    default_network: Network,
    state: watch::Sender<SessionState>,
}

impl WalletSession {
    pub fn new(provider: Option<Arc<dyn WalletProvider>>, default_network: Network) -> Self {
        let (state, _) = watch::channel(SessionState::default());
        Self {
            provider,
            default_network,
            state,
        }
    }

    pub fn snapshot(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// The provider, or the user-facing install prompt error
    pub fn provider(&self) -> Result<Arc<dyn WalletProvider>, SessionError> {
        self.provider.clone().ok_or(SessionError::ProviderMissing)
    }

    /// The connected account, or `NotConnected`
    pub fn account(&self) -> Result<Address, SessionError> {
        self.snapshot().account.ok_or(SessionError::NotConnected)
    }

    fn update<F: FnOnce(&mut SessionState)>(&self, apply: F) {
        self.state.send_modify(apply);
    }

    /// Silent reconnect: adopt an already-approved account and whatever
    /// chain the wallet is on, without prompting.
    pub async fn restore(&self) -> Result<SessionState, SessionError> {
        let provider = self.provider()?;
        let accounts = provider.accounts().await?;
        if let Some(&account) = accounts.first() {
            let chain_id = provider.chain_id().await?;
            self.update(|s| {
                s.account = Some(account);
                s.network = network_for_chain(chain_id);
            });
        }
        Ok(self.snapshot())
    }

    /// Prompt for approval and land on the default network.
    pub async fn connect(&self) -> Result<SessionState, SessionError> {
        let provider = self.provider()?;
        let accounts = provider.request_accounts().await.map_err(|e| match e {
            WalletError::UserRejected => SessionError::Rejected,
            other => SessionError::Wallet(other),
        })?;
        let account = accounts
            .first()
            .copied()
            .ok_or(SessionError::Rejected)?;

        self.update(|s| s.account = Some(account));

        let chain_id = provider.chain_id().await?;
        match network_for_chain(chain_id) {
            Some(network) if network == self.default_network => {
                self.update(|s| s.network = Some(network));
            }
            _ => self.switch_network(self.default_network).await?,
        }

        info!(%account, network = %self.default_network, "wallet connected");
        Ok(self.snapshot())
    }

    /// Local-only disconnect; extensions have no programmatic disconnect.
    pub fn disconnect(&self) {
        self.update(|s| {
            s.account = None;
            s.network = None;
        });
        info!("wallet disconnected");
    }

    /// Switch the wallet's chain, registering it first if the wallet does
    /// not know it yet.
    pub async fn switch_network(&self, network: Network) -> Result<(), SessionError> {
        let provider = self.provider()?;
        let params = network.chain_params();

        match provider.switch_chain(params.chain_id).await {
            Ok(()) => {}
            Err(WalletError::UnknownChain(_)) => {
                provider.add_chain(&params).await?;
                provider.switch_chain(params.chain_id).await?;
            }
            Err(other) => return Err(other.into()),
        }

        self.update(|s| s.network = Some(network));
        info!(%network, "switched network");
        Ok(())
    }

    /// Guard used before network-bound actions (e.g. swapping the native
    /// coin of a specific testnet).
    pub fn require_network(&self, expected: Network) -> Result<(), SessionError> {
        match self.snapshot().network {
            Some(actual) if actual == expected => Ok(()),
            Some(actual) => Err(SessionError::NetworkMismatch { expected, actual }),
            None => Err(SessionError::NotConnected),
        }
    }

    /// Fold a wallet notification into the session state
    pub fn apply_event(&self, event: &WalletEvent) {
        match event {
            WalletEvent::AccountsChanged(accounts) => {
                let account = accounts.first().copied();
                if account.is_none() {
                    info!("wallet reported no accounts; disconnecting");
                }
                self.update(|s| s.account = account);
            }
            WalletEvent::ChainChanged(chain_id) => {
                let network = network_for_chain(*chain_id);
                if network.is_none() {
                    warn!(chain_id, "wallet switched to an unrecognized chain");
                }
                self.update(|s| s.network = network);
            }
        }
    }

    /// Forward wallet notifications into the session until the provider's
    /// event channel closes.
    pub fn spawn_event_listener(self: &Arc<Self>) -> Result<JoinHandle<()>, SessionError> {
        let provider = self.provider()?;
        let session = Arc::clone(self);
        let mut events = provider.subscribe();
        Ok(tokio::spawn(async move {
            while let Ok(event) = events.recv().await {
                session.apply_event(&event);
            }
        }))
    }
}

// ============================================
// TESTS
// ============================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entropy::ThreadEntropy;
    use crate::wallet::simulated::SimulatedWallet;

    fn session_with_wallet() -> (Arc<SimulatedWallet>, WalletSession) {
        let wallet = Arc::new(SimulatedWallet::new(Arc::new(ThreadEntropy)));
        let session = WalletSession::new(
            Some(wallet.clone() as Arc<dyn WalletProvider>),
            Network::Sepolia,
        );
        (wallet, session)
    }

    #[tokio::test]
    async fn test_connect_without_provider_prompts_install() {
        let session = WalletSession::new(None, Network::Sepolia);
        assert_eq!(session.connect().await, Err(SessionError::ProviderMissing));
        assert!(!session.snapshot().is_connected());
    }

    #[tokio::test]
    async fn test_connect_lands_on_default_network() {
        let (_, session) = session_with_wallet();
        let state = session.connect().await.unwrap();
        assert!(state.is_connected());
        assert_eq!(state.network, Some(Network::Sepolia));
    }

    #[tokio::test]
    async fn test_rejected_connect_is_non_fatal() {
        let (wallet, session) = session_with_wallet();
        wallet.set_reject_requests(true).await;
        assert_eq!(session.connect().await, Err(SessionError::Rejected));
        assert!(!session.snapshot().is_connected());

        // Retry after the user relents.
        wallet.set_reject_requests(false).await;
        assert!(session.connect().await.is_ok());
    }

    #[tokio::test]
    async fn test_switch_to_mega_adds_chain_first() {
        let (wallet, session) = session_with_wallet();
        session.connect().await.unwrap();
        session.switch_network(Network::Mega).await.unwrap();
        assert_eq!(session.snapshot().network, Some(Network::Mega));
        assert_eq!(
            wallet.chain_id().await.unwrap(),
            Network::Mega.chain_id()
        );
    }

    #[tokio::test]
    async fn test_require_network_mismatch() {
        let (_, session) = session_with_wallet();
        session.connect().await.unwrap();
        assert!(session.require_network(Network::Sepolia).is_ok());
        assert_eq!(
            session.require_network(Network::Mega),
            Err(SessionError::NetworkMismatch {
                expected: Network::Mega,
                actual: Network::Sepolia,
            })
        );
    }

    #[tokio::test]
    async fn test_restore_is_silent_without_approval() {
        let (_, session) = session_with_wallet();
        let state = session.restore().await.unwrap();
        assert!(!state.is_connected());
    }

    #[tokio::test]
    async fn test_restore_adopts_approved_account() {
        let (wallet, session) = session_with_wallet();
        wallet.request_accounts().await.unwrap();
        let state = session.restore().await.unwrap();
        assert!(state.is_connected());
        assert_eq!(state.network, Some(Network::Sepolia));
    }

    #[tokio::test]
    async fn test_accounts_changed_event_disconnects() {
        let (_, session) = session_with_wallet();
        session.connect().await.unwrap();
        session.apply_event(&WalletEvent::AccountsChanged(Vec::new()));
        assert!(!session.snapshot().is_connected());
    }

    #[tokio::test]
    async fn test_chain_changed_event_tracks_network() {
        let (_, session) = session_with_wallet();
        session.connect().await.unwrap();
        session.apply_event(&WalletEvent::ChainChanged(Network::Mega.chain_id()));
        assert_eq!(session.snapshot().network, Some(Network::Mega));
    }

    #[tokio::test]
    async fn test_disconnect_clears_state() {
        let (_, session) = session_with_wallet();
        session.connect().await.unwrap();
        session.disconnect();
        assert_eq!(session.snapshot(), SessionState::default());
        assert!(matches!(session.account(), Err(SessionError::NotConnected)));
    }
}
