//! Wallet session - brings the single engine handle to `Ready` at startup
//!
//! ```text
//! Uninitialized ──found──► Unlocking ────ok──► Ready
//!       │                      └──err──► Failed
//!       └──not found──► Initializing ──ok──► Ready
//!                              └──err──► Failed
//! ```
//!
//! `Failed` is terminal; the binary exits instead of serving.

mod config;

pub use config::{default_data_dir, EngineKind, FaucetConfig, GatewayConfig, SessionConfig};

use crate::engine::{CallPolicy, EngineResult, InitArgs, WalletBackend, WalletHandle};
use crate::error::{GatewayError, GatewayResult};
use std::sync::Arc;
use tracing::{error, info};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    Unlocking,
    Initializing,
    Ready,
    Failed(String),
}

pub struct SessionManager {
    backend: Arc<dyn WalletBackend>,
    config: SessionConfig,
    policy: CallPolicy,
    history: Vec<SessionState>,
}

impl SessionManager {
    pub fn new(backend: Arc<dyn WalletBackend>, config: SessionConfig, policy: CallPolicy) -> Self {
        Self { backend, config, policy, history: vec![SessionState::Uninitialized] }
    }

    pub fn state(&self) -> &SessionState {
        self.history.last().unwrap_or(&SessionState::Uninitialized)
    }

    /// Every state visited so far, starting with `Uninitialized`.
    pub fn history(&self) -> &[SessionState] { &self.history }

    /// Unlock the persisted wallet or create a new one. Runs once per process.
    pub async fn start(&mut self) -> GatewayResult<WalletHandle> {
        if *self.state() != SessionState::Uninitialized {
            return Err(GatewayError::FatalStartup(format!("session already {:?}", self.state())));
        }
        match self.open().await {
            Ok(handle) => {
                self.transition(SessionState::Ready);
                Ok(handle)
            }
            Err(e) => {
                let reason = e.to_string();
                error!(error = %reason, "wallet session failed");
                self.transition(SessionState::Failed(reason.clone()));
                Err(GatewayError::FatalStartup(reason))
            }
        }
    }

    async fn open(&mut self) -> EngineResult<WalletHandle> {
        match self.backend.load().await? {
            Some(engine) => {
                info!("existing wallet detected, unlocking");
                self.transition(SessionState::Unlocking);
                let handle = WalletHandle::new(engine, self.policy.clone());
                let password = self.config.password.clone();
                handle.exclusive("unlock", move |e| async move { e.unlock(&password).await }).await?;
                Ok(handle)
            }
            None => {
                info!(server_url = %self.config.server_url, "no wallet found, creating one");
                self.transition(SessionState::Initializing);
                let engine = self.backend.create().await?;
                let handle = WalletHandle::new(engine, self.policy.clone());
                let args = InitArgs {
                    wallet_type: self.config.wallet_type,
                    client_type: self.config.client_type,
                    server_url: self.config.server_url.clone(),
                    password: self.config.password.clone(),
                };
                handle.exclusive("init", move |e| async move { e.init(&args).await }).await?;
                Ok(handle)
            }
        }
    }

    fn transition(&mut self, next: SessionState) {
        info!(from = ?self.state(), to = ?next, "wallet session");
        self.history.push(next);
    }
}
