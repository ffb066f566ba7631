//! Arkgate: HTTP/JSON gateway over an Ark + on-chain Bitcoin wallet engine.
//!
//! # Architecture
//!
//! ```text
//! HTTP (axum router, CORS, tracing)
//!   │
//!   ├── PaymentRouter     create / send / deposit / withdraw
//!   ├── BalanceAggregator utxos / balance
//!   ├── FeeEstimator      estimate (engine config + Esplora fee-estimates)
//!   └── Faucet            regtest funding (feature `faucet`)
//!         │
//!         ▼
//!   WalletHandle (one per process, read/write gate, timeouts, shutdown token)
//!         │
//!         ▼
//!   WalletEngine (ark CLI process | in-memory ledger)
//! ```
//!
//! [`SessionManager`] produces the handle at startup by unlocking the persisted wallet or
//! creating a new one. Nothing is served until it reaches `Ready`.
//!
//! # Endpoints
//!
//! | Method | Path | Response |
//! |--------|------|----------|
//! | POST | `/wallet/create` | `{offchain_address, boarding_address}` |
//! | POST | `/payment/send` | `{txid}` |
//! | GET | `/payment/estimate` | `{total_fee, breakdown: {network_fee, service_fee}}` |
//! | GET | `/wallet/utxos` | `[{amount, locked, spendable}]` |
//! | POST | `/wallet/deposit` | `{txid}` |
//! | POST | `/wallet/faucet` | `{message}` |
//! | GET | `/wallet/balance` | `{offchain_balance, onchain_balance}` |
//! | POST | `/wallet/withdraw` | `{txid}` |
//!
//! # Features
//!
//! - `faucet` (default) - expose the regtest faucet endpoint
//!
//! # Usage
//!
//! ```ignore
//! use arkgate::{bootstrap, backend, serve, GatewayConfig, SessionConfig, Shutdown};
//!
//! let config = GatewayConfig::new(SessionConfig::new(password, "http://localhost:7070"));
//! let shutdown = Shutdown::new();
//! let state = bootstrap(&config, backend(&config)?, shutdown.token()).await?;
//! let listener = tokio::net::TcpListener::bind(config.listen_addr()).await?;
//! serve(listener, state, shutdown.token()).await?;
//! ```

pub mod core;
pub mod engine;
pub mod error;
#[cfg(feature = "faucet")]
pub mod faucet;
pub mod logging;
pub mod runtime;
pub mod server;
pub mod session;
pub mod wallet;

pub use engine::{
    AddressPair, ArkCli, ArkCliBackend, CallPolicy, EngineError, EngineResult, MemoryBackend, MemoryEngine,
    WalletBackend, WalletEngine, WalletHandle,
};
pub use error::{GatewayError, GatewayResult};
#[cfg(feature = "faucet")]
pub use faucet::Faucet;
pub use runtime::{install_signal_handlers, Shutdown};
pub use server::{backend, bootstrap, create_router, serve, GatewayState};
pub use session::{EngineKind, GatewayConfig, SessionConfig, SessionManager, SessionState};
pub use wallet::{
    BalanceAggregator, BalanceSnapshot, EsploraFeeOracle, FeeEstimate, FeeEstimator, FeeOracle, FeePolicy,
    PaymentRouter, SendRequest, Settlement, Utxo,
};
