//! Wallet engine - the contract the gateway expects from the Ark wallet SDK
//!
//! The engine owns keys, signing and the ark protocol. The gateway only calls it.
//!
//! # Architecture
//!
//! ```text
//! WalletBackend ──load()/create()──► Arc<dyn WalletEngine>
//!                                          │
//!                                          ▼
//!                                    WalletHandle (RwLock gate + timeout + cancel)
//!                                          │
//!                       ┌──────────────────┼──────────────────┐
//!                       ▼                  ▼                  ▼
//!                  FeeEstimator     BalanceAggregator    PaymentRouter
//! ```
//!
//! # Implementations
//!
//! | Engine | Use |
//! |--------|-----|
//! | [`ArkCli`] | Production: drives the external wallet process |
//! | [`MemoryEngine`] | Tests and front-end development |

mod cli;
mod handle;
mod memory;

pub use cli::{ArkCli, ArkCliBackend, STATE_FILE};
pub use handle::{CallPolicy, WalletHandle};
pub use memory::{EngineCall, MemoryBackend, MemoryEngine, Op};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    /// Failure reported by the engine. Message is passed through untouched.
    #[error("{0}")]
    Failed(String),
    #[error("{op} timed out after {}s", after.as_secs())]
    Timeout { op: &'static str, after: Duration },
    #[error("{op} cancelled")]
    Cancelled { op: &'static str },
    /// Engine answered, but not in a shape we understand.
    #[error("unexpected engine response: {0}")]
    Protocol(String),
}

/// Sum of amounts reported by the engine. Overflow means the engine sent nonsense.
pub fn checked_total(amounts: impl IntoIterator<Item = u64>) -> EngineResult<u64> {
    amounts
        .into_iter()
        .try_fold(0u64, u64::checked_add)
        .ok_or_else(|| EngineError::Protocol("amount total overflows u64".into()))
}

/// Off-chain address and the on-chain boarding address that funds it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressPair {
    pub offchain_address: String,
    pub boarding_address: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vtxo {
    pub amount: u64,
}

/// Engine view of off-chain outputs. The two sets are disjoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VtxoSet {
    #[serde(default)]
    pub spendable: Vec<Vtxo>,
    #[serde(default)]
    pub spent: Vec<Vtxo>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnchainBalance {
    pub spendable: u64,
}

/// Network data published by the ark server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub server_url: String,
    pub explorer_url: String,
    pub network: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receiver {
    pub address: String,
    pub amount: u64,
}

impl Receiver {
    pub fn new(address: impl Into<String>, amount: u64) -> Self {
        Self { address: address.into(), amount }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WalletType {
    #[default]
    SingleKey,
}

impl WalletType {
    pub fn as_str(&self) -> &'static str {
        match self {
            WalletType::SingleKey => "singlekey",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClientType {
    #[default]
    Grpc,
    Rest,
}

impl ClientType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClientType::Grpc => "grpc",
            ClientType::Rest => "rest",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "grpc" => Some(ClientType::Grpc),
            "rest" => Some(ClientType::Rest),
            _ => None,
        }
    }
}

/// Arguments for first-run wallet creation.
#[derive(Clone, PartialEq, Eq)]
pub struct InitArgs {
    pub wallet_type: WalletType,
    pub client_type: ClientType,
    pub server_url: String,
    pub password: String,
}

impl fmt::Debug for InitArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InitArgs")
            .field("wallet_type", &self.wallet_type)
            .field("client_type", &self.client_type)
            .field("server_url", &self.server_url)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[async_trait]
pub trait WalletEngine: Send + Sync {
    async fn unlock(&self, password: &str) -> EngineResult<()>;
    async fn init(&self, args: &InitArgs) -> EngineResult<()>;
    async fn receive(&self) -> EngineResult<AddressPair>;
    async fn list_vtxos(&self) -> EngineResult<VtxoSet>;
    /// Move pending off-chain funds (and boarding funds) into a confirmed round. Returns the round txid.
    async fn settle(&self) -> EngineResult<String>;
    async fn send_offchain(&self, receivers: &[Receiver], wait_for_confirmation: bool) -> EngineResult<String>;
    async fn collaborative_exit(&self, address: &str, amount: u64) -> EngineResult<String>;
    async fn onchain_balance(&self) -> EngineResult<OnchainBalance>;
    async fn config_data(&self) -> EngineResult<NetworkConfig>;
}

/// Storage side of the engine: finds a persisted wallet or makes a fresh one.
#[async_trait]
pub trait WalletBackend: Send + Sync {
    /// `None` when no wallet has been persisted yet.
    async fn load(&self) -> EngineResult<Option<Arc<dyn WalletEngine>>>;
    async fn create(&self) -> EngineResult<Arc<dyn WalletEngine>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_args_debug_redacts_password() {
        let args = InitArgs {
            wallet_type: WalletType::SingleKey,
            client_type: ClientType::Grpc,
            server_url: "localhost:7070".into(),
            password: "hunter2".into(),
        };
        let rendered = format!("{:?}", args);
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("localhost:7070"));
    }

    #[test]
    fn client_type_parsing() {
        assert_eq!(ClientType::from_str(" GRPC "), Some(ClientType::Grpc));
        assert_eq!(ClientType::from_str("rest"), Some(ClientType::Rest));
        assert_eq!(ClientType::from_str("ws"), None);
    }

    #[test]
    fn engine_error_messages_pass_through() {
        assert_eq!(EngineError::Failed("not enough funds".into()).to_string(), "not enough funds");
        let timeout = EngineError::Timeout { op: "settle", after: Duration::from_secs(3) };
        assert_eq!(timeout.to_string(), "settle timed out after 3s");
    }
}
