//! Wallet/contract bridge.
//!
//! Signing and chain access stay behind [`WalletBridge`]. The editor only
//! sees connection state, an account address, and transaction ids whose
//! status it can poll.

use crate::BoxFuture;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use thiserror::Error;

/// Wallet errors.
#[derive(Debug, Error)]
pub enum WalletError {
    #[error("Please connect your wallet")]
    NotConnected,
    #[error("Invalid address: {0}")]
    InvalidAddress(String),
    #[error("Transaction rejected: {0}")]
    Rejected(String),
    #[error("Wallet transport error: {0}")]
    Transport(String),
    #[error("Unknown transaction: {0}")]
    UnknownTransaction(String),
}

/// Result type for wallet operations.
pub type WalletResult<T> = Result<T, WalletError>;

/// A `0x`-prefixed 20-byte hex account or contract address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(String);

impl Address {
    pub fn parse(value: &str) -> WalletResult<Self> {
        let hex = value
            .strip_prefix("0x")
            .or_else(|| value.strip_prefix("0X"))
            .ok_or_else(|| WalletError::InvalidAddress(value.to_string()))?;
        if hex.len() != 40 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(WalletError::InvalidAddress(value.to_string()));
        }
        Ok(Self(format!("0x{hex}")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Address {
    type Error = WalletError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Transaction hash handed back on submission.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(String);

impl TransactionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// On-chain status of a submitted transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxStatus {
    Pending,
    Confirmed,
    Failed(String),
}

impl TxStatus {
    pub fn is_final(&self) -> bool {
        !matches!(self, TxStatus::Pending)
    }
}

/// A contract write to submit through the wallet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractCall {
    pub contract: Address,
    pub abi: serde_json::Value,
    pub function: String,
    pub args: Vec<serde_json::Value>,
}

/// Connection state
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connected(Address),
}

/// Events from the wallet provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalletEvent {
    Connected { address: Address },
    Disconnected,
    AccountChanged { address: Address },
}

/// Connection lifecycle, driven by provider events.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WalletSession {
    state: ConnectionState,
}

impl WalletSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle(&mut self, event: WalletEvent) {
        self.state = match event {
            WalletEvent::Connected { address } => {
                log::info!("Wallet connected: {}", address);
                ConnectionState::Connected(address)
            }
            WalletEvent::AccountChanged { address } => {
                if matches!(self.state, ConnectionState::Disconnected) {
                    log::warn!("Account change while disconnected, ignoring");
                    return;
                }
                log::info!("Wallet account changed: {}", address);
                ConnectionState::Connected(address)
            }
            WalletEvent::Disconnected => {
                log::info!("Wallet disconnected");
                ConnectionState::Disconnected
            }
        };
    }

    pub fn state(&self) -> &ConnectionState {
        &self.state
    }

    pub fn is_connected(&self) -> bool {
        matches!(self.state, ConnectionState::Connected(_))
    }

    pub fn address(&self) -> Option<&Address> {
        match &self.state {
            ConnectionState::Connected(address) => Some(address),
            ConnectionState::Disconnected => None,
        }
    }
}

/// Trait for wallet providers.
///
/// On native platforms implementations must be Send + Sync.
#[cfg(not(target_arch = "wasm32"))]
pub trait WalletBridge: Send + Sync {
    fn is_connected(&self) -> bool;

    fn address(&self) -> Option<Address>;

    /// Ask the wallet to sign and broadcast a contract call.
    fn submit_transaction(&self, call: ContractCall) -> BoxFuture<'_, WalletResult<TransactionId>>;

    /// Current status of a submitted transaction.
    fn transaction_status<'a>(
        &'a self,
        id: &'a TransactionId,
    ) -> BoxFuture<'a, WalletResult<TxStatus>>;
}

/// Trait for wallet providers (WASM version without Send + Sync).
#[cfg(target_arch = "wasm32")]
pub trait WalletBridge {
    fn is_connected(&self) -> bool;

    fn address(&self) -> Option<Address>;

    fn submit_transaction(&self, call: ContractCall) -> BoxFuture<'_, WalletResult<TransactionId>>;

    fn transaction_status<'a>(
        &'a self,
        id: &'a TransactionId,
    ) -> BoxFuture<'a, WalletResult<TxStatus>>;
}

/// Follows submitted transactions until they settle.
#[derive(Debug, Default)]
pub struct ConfirmationTracker {
    tracked: HashMap<TransactionId, TxStatus>,
}

impl ConfirmationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn track(&mut self, id: TransactionId) {
        self.tracked.entry(id).or_insert(TxStatus::Pending);
    }

    pub fn status(&self, id: &TransactionId) -> Option<&TxStatus> {
        self.tracked.get(id)
    }

    pub fn pending(&self) -> impl Iterator<Item = &TransactionId> {
        self.tracked
            .iter()
            .filter(|(_, status)| !status.is_final())
            .map(|(id, _)| id)
    }

    /// Poll every pending transaction once. Returns the ones that settled.
    /// A transport error leaves that transaction pending.
    pub async fn refresh(&mut self, bridge: &dyn WalletBridge) -> Vec<(TransactionId, TxStatus)> {
        let pending: Vec<TransactionId> = self.pending().cloned().collect();
        let mut settled = Vec::new();
        for id in pending {
            match bridge.transaction_status(&id).await {
                Ok(TxStatus::Pending) => {}
                Ok(status) => {
                    match &status {
                        TxStatus::Failed(reason) => log::error!("Mint {} failed: {}", id, reason),
                        _ => log::info!("Mint {} confirmed", id),
                    }
                    self.tracked.insert(id.clone(), status.clone());
                    settled.push((id, status));
                }
                Err(e) => log::warn!("Could not query {}: {}", id, e),
            }
        }
        settled
    }
}

/// In-process wallet for tests and offline runs. Records submitted calls;
/// statuses are set by hand.
#[derive(Debug, Default)]
pub struct MemoryWallet {
    session: RwLock<WalletSession>,
    submitted: RwLock<Vec<(TransactionId, ContractCall)>>,
    statuses: RwLock<HashMap<TransactionId, TxStatus>>,
    rejecting: AtomicBool,
    counter: AtomicU64,
}

impl MemoryWallet {
    pub fn new() -> Self {
        Self::default()
    }

    /// A wallet already connected to `address`.
    pub fn connected(address: Address) -> Self {
        let wallet = Self::new();
        wallet.handle(WalletEvent::Connected { address });
        wallet
    }

    pub fn handle(&self, event: WalletEvent) {
        if let Ok(mut session) = self.session.write() {
            session.handle(event);
        }
    }

    /// Make the user "reject" every subsequent submission.
    pub fn set_rejecting(&self, rejecting: bool) {
        self.rejecting.store(rejecting, Ordering::SeqCst);
    }

    pub fn set_status(&self, id: &TransactionId, status: TxStatus) {
        if let Ok(mut statuses) = self.statuses.write() {
            statuses.insert(id.clone(), status);
        }
    }

    pub fn submitted(&self) -> Vec<(TransactionId, ContractCall)> {
        self.submitted.read().map(|s| s.clone()).unwrap_or_default()
    }
}

impl WalletBridge for MemoryWallet {
    fn is_connected(&self) -> bool {
        self.session.read().map(|s| s.is_connected()).unwrap_or(false)
    }

    fn address(&self) -> Option<Address> {
        self.session.read().ok()?.address().cloned()
    }

    fn submit_transaction(&self, call: ContractCall) -> BoxFuture<'_, WalletResult<TransactionId>> {
        Box::pin(async move {
            if !self.is_connected() {
                return Err(WalletError::NotConnected);
            }
            if self.rejecting.load(Ordering::SeqCst) {
                return Err(WalletError::Rejected("User rejected the request".to_string()));
            }
            let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
            let id = TransactionId::new(format!("0x{n:064x}"));
            self.submitted
                .write()
                .map_err(|e| WalletError::Transport(format!("Lock error: {}", e)))?
                .push((id.clone(), call));
            self.set_status(&id, TxStatus::Pending);
            Ok(id)
        })
    }

    fn transaction_status<'a>(
        &'a self,
        id: &'a TransactionId,
    ) -> BoxFuture<'a, WalletResult<TxStatus>> {
        Box::pin(async move {
            let statuses = self
                .statuses
                .read()
                .map_err(|e| WalletError::Transport(format!("Lock error: {}", e)))?;
            statuses
                .get(id)
                .cloned()
                .ok_or_else(|| WalletError::UnknownTransaction(id.to_string()))
        })
    }
}
