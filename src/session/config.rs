//! Gateway configuration - built by the binary from env/flags

use crate::engine::{CallPolicy, ClientType, WalletType};
use crate::wallet::FeePolicy;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EngineKind {
    #[default]
    Cli,
    Memory,
}

impl EngineKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EngineKind::Cli => "cli",
            EngineKind::Memory => "memory",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "cli" | "ark" => Some(EngineKind::Cli),
            "memory" | "mem" => Some(EngineKind::Memory),
            _ => None,
        }
    }
}

/// Inputs for unlocking or creating the wallet. The secret is injected here once and never
/// looked up again.
#[derive(Clone, Default)]
pub struct SessionConfig {
    pub password: String,
    pub server_url: String,
    pub wallet_type: WalletType,
    pub client_type: ClientType,
}

impl fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionConfig")
            .field("password", &"<redacted>")
            .field("server_url", &self.server_url)
            .field("wallet_type", &self.wallet_type)
            .field("client_type", &self.client_type)
            .finish()
    }
}

impl SessionConfig {
    pub fn new(password: impl Into<String>, server_url: impl Into<String>) -> Self {
        Self { password: password.into(), server_url: server_url.into(), ..Default::default() }
    }
    pub fn with_client_type(mut self, client_type: ClientType) -> Self { self.client_type = client_type; self }
}

#[derive(Debug, Clone)]
pub struct FaucetConfig {
    pub enabled: bool,
    pub program: PathBuf,
}

impl Default for FaucetConfig {
    fn default() -> Self { Self { enabled: cfg!(feature = "faucet"), program: PathBuf::from("nigiri") } }
}

/// Gateway configuration. The binary constructs this.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub app: String,
    pub bind: String,
    pub port: u16,
    pub data_dir: PathBuf,
    pub engine: EngineKind,
    /// Wallet program and leading arguments for [`EngineKind::Cli`].
    pub ark_command: Vec<String>,
    pub session: SessionConfig,
    pub call_timeout: Duration,
    pub fees: FeePolicy,
    pub faucet: FaucetConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            app: "arkgate".into(),
            bind: "0.0.0.0".into(),
            port: 8080,
            data_dir: default_data_dir(),
            engine: EngineKind::default(),
            ark_command: vec!["ark".into()],
            session: SessionConfig::default(),
            call_timeout: CallPolicy::default().timeout,
            fees: FeePolicy::default(),
            faucet: FaucetConfig::default(),
        }
    }
}

impl GatewayConfig {
    pub fn new(session: SessionConfig) -> Self { Self { session, ..Default::default() } }
    pub fn with_port(mut self, port: u16) -> Self { self.port = port; self }
    pub fn with_bind(mut self, bind: impl Into<String>) -> Self { self.bind = bind.into(); self }
    pub fn with_data_dir(mut self, path: impl Into<PathBuf>) -> Self { self.data_dir = path.into(); self }
    pub fn with_engine(mut self, engine: EngineKind) -> Self { self.engine = engine; self }
    pub fn with_ark_command(mut self, command: Vec<String>) -> Self { self.ark_command = command; self }
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self { self.call_timeout = timeout; self }
    pub fn with_fees(mut self, fees: FeePolicy) -> Self { self.fees = fees; self }
    pub fn with_faucet(mut self, faucet: FaucetConfig) -> Self { self.faucet = faucet; self }

    pub fn listen_addr(&self) -> String { format!("{}:{}", self.bind, self.port) }

    pub fn call_policy(&self) -> CallPolicy { CallPolicy::default().with_timeout(self.call_timeout) }
}

/// `<local data dir>/ark-wallet/data`, the wallet SDK's default location.
pub fn default_data_dir() -> PathBuf {
    dirs::data_local_dir().unwrap_or_else(|| PathBuf::from(".")).join("ark-wallet").join("data")
}
