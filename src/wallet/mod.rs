//! The wallet boundary: the injected provider capability, the simulated
//! implementation, and the session state machine built on top.

mod provider;
mod session;
mod simulated;

pub use provider::{
    Receipt, ReceiptStatus, TransferRequest, WalletError, WalletEvent, WalletProvider,
};
pub use session::{SessionError, SessionState, WalletSession};
pub use simulated::{SimulatedWallet, DEFAULT_SUCCESS_RATE};
