//! ArkCli - wallet engine backed by an external wallet process
//!
//! Every operation is one invocation: `<program> [base args] --datadir <dir> <subcommand> [flags]`.
//! A successful run prints a single JSON object on stdout. A failed run exits non-zero and its
//! stderr becomes the error message as-is. The wallet secret travels in the child's environment.
//!
//! | Subcommand | stdout |
//! |------------|--------|
//! | `init --wallet-type --client-type --server-url` | ignored |
//! | `unlock` | ignored |
//! | `receive` | `{offchain_address, boarding_address}` |
//! | `vtxos` | `{spendable: [{amount}], spent: [{amount}]}` |
//! | `settle` | `{txid}` |
//! | `send --to --amount [--wait]` | `{txid}` |
//! | `redeem --address --amount` | `{txid}` |
//! | `balance` | `{onchain_balance: {spendable_amount, locked_amount: [{amount, expiry_time}]}}` |
//! | `config` | `{server_url, explorer_url, network}` |

use super::{
    AddressPair, EngineError, EngineResult, InitArgs, NetworkConfig, OnchainBalance, Receiver, VtxoSet,
    WalletBackend, WalletEngine,
};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::{Arc, RwLock};
use tokio::process::Command;
use tracing::debug;

/// Written by the wallet process once a wallet exists in the data dir.
pub const STATE_FILE: &str = "state.json";
pub const PASSWORD_ENV: &str = "ARK_WALLET_PASSWORD";

#[derive(Debug, Clone)]
struct Invocation {
    program: PathBuf,
    base_args: Vec<String>,
    datadir: PathBuf,
}

#[derive(Debug, Clone)]
pub struct ArkCliBackend {
    invocation: Invocation,
}

impl ArkCliBackend {
    pub fn new(program: impl Into<PathBuf>, datadir: impl Into<PathBuf>) -> Self {
        Self { invocation: Invocation { program: program.into(), base_args: Vec::new(), datadir: datadir.into() } }
    }

    /// Arguments placed before `--datadir`, e.g. `exec ark ark` behind `docker`.
    pub fn with_base_args(mut self, args: Vec<String>) -> Self { self.invocation.base_args = args; self }

    pub fn datadir(&self) -> &Path { &self.invocation.datadir }

    pub fn has_wallet(&self) -> bool { self.invocation.datadir.join(STATE_FILE).is_file() }
}

#[async_trait]
impl WalletBackend for ArkCliBackend {
    async fn load(&self) -> EngineResult<Option<Arc<dyn WalletEngine>>> {
        if !self.has_wallet() {
            return Ok(None);
        }
        Ok(Some(Arc::new(ArkCli::new(self.invocation.clone()))))
    }

    async fn create(&self) -> EngineResult<Arc<dyn WalletEngine>> {
        tokio::fs::create_dir_all(&self.invocation.datadir)
            .await
            .map_err(|e| EngineError::Failed(format!("mkdir {}: {}", self.invocation.datadir.display(), e)))?;
        Ok(Arc::new(ArkCli::new(self.invocation.clone())))
    }
}

pub struct ArkCli {
    invocation: Invocation,
    password: RwLock<Option<String>>,
}

#[derive(Debug, Deserialize)]
struct TxidOutput {
    txid: String,
}

#[derive(Deserialize)]
struct BalanceOutput {
    onchain_balance: OnchainOutput,
}

/// `locked_amount` (a list of `{amount, expiry_time}`) is left to serde's unknown-field skipping.
#[derive(Deserialize)]
struct OnchainOutput {
    spendable_amount: u64,
}

impl ArkCli {
    fn new(invocation: Invocation) -> Self { Self { invocation, password: RwLock::new(None) } }

    fn remember_password(&self, password: &str) -> EngineResult<()> {
        let mut guard = self.password.write().map_err(|_| EngineError::Failed("password lock".into()))?;
        *guard = Some(password.to_string());
        Ok(())
    }

    async fn exec(&self, sub: &str, args: &[String], password: Option<&str>) -> EngineResult<Vec<u8>> {
        let inv = &self.invocation;
        let mut cmd = Command::new(&inv.program);
        cmd.args(&inv.base_args)
            .arg("--datadir")
            .arg(&inv.datadir)
            .arg(sub)
            .args(args)
            .stdin(Stdio::null())
            .kill_on_drop(true);

        let stored = self.password.read().map_err(|_| EngineError::Failed("password lock".into()))?.clone();
        if let Some(pw) = password.map(str::to_string).or(stored) {
            cmd.env(PASSWORD_ENV, pw);
        }

        debug!(program = %inv.program.display(), sub, "invoking wallet process");
        let output = cmd
            .output()
            .await
            .map_err(|e| EngineError::Failed(format!("{}: {}", inv.program.display(), e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(EngineError::Failed(if stderr.is_empty() {
                format!("{} exited with {}", sub, output.status)
            } else {
                stderr
            }));
        }
        Ok(output.stdout)
    }

    async fn call<T: DeserializeOwned>(&self, sub: &str, args: &[String]) -> EngineResult<T> {
        let stdout = self.exec(sub, args, None).await?;
        serde_json::from_slice(&stdout).map_err(|e| EngineError::Protocol(format!("{}: {}", sub, e)))
    }
}

#[async_trait]
impl WalletEngine for ArkCli {
    async fn unlock(&self, password: &str) -> EngineResult<()> {
        self.exec("unlock", &[], Some(password)).await?;
        self.remember_password(password)
    }

    async fn init(&self, args: &InitArgs) -> EngineResult<()> {
        let flags = vec![
            "--wallet-type".to_string(),
            args.wallet_type.as_str().to_string(),
            "--client-type".to_string(),
            args.client_type.as_str().to_string(),
            "--server-url".to_string(),
            args.server_url.clone(),
        ];
        self.exec("init", &flags, Some(&args.password)).await?;
        self.remember_password(&args.password)
    }

    async fn receive(&self) -> EngineResult<AddressPair> { self.call("receive", &[]).await }

    async fn list_vtxos(&self) -> EngineResult<VtxoSet> { self.call("vtxos", &[]).await }

    async fn settle(&self) -> EngineResult<String> {
        Ok(self.call::<TxidOutput>("settle", &[]).await?.txid)
    }

    async fn send_offchain(&self, receivers: &[Receiver], wait_for_confirmation: bool) -> EngineResult<String> {
        let mut flags = Vec::with_capacity(receivers.len() * 4 + 1);
        for r in receivers {
            flags.extend(["--to".to_string(), r.address.clone(), "--amount".to_string(), r.amount.to_string()]);
        }
        if wait_for_confirmation {
            flags.push("--wait".to_string());
        }
        Ok(self.call::<TxidOutput>("send", &flags).await?.txid)
    }

    async fn collaborative_exit(&self, address: &str, amount: u64) -> EngineResult<String> {
        let flags = vec!["--address".to_string(), address.to_string(), "--amount".to_string(), amount.to_string()];
        Ok(self.call::<TxidOutput>("redeem", &flags).await?.txid)
    }

    async fn onchain_balance(&self) -> EngineResult<OnchainBalance> {
        let out: BalanceOutput = self.call("balance", &[]).await?;
        Ok(OnchainBalance { spendable: out.onchain_balance.spendable_amount })
    }

    async fn config_data(&self) -> EngineResult<NetworkConfig> { self.call("config", &[]).await }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::engine::{ClientType, Vtxo, WalletType};
    use tempfile::TempDir;

    const FAKE_WALLET: &str = r#"
shift 2
cmd="$1"; shift
case "$cmd" in
  unlock)
    [ "$ARK_WALLET_PASSWORD" = "secret" ] || { echo "invalid password" >&2; exit 1; } ;;
  init)
    echo "$@" > "$ARK_FAKE_LOG" ;;
  receive) echo '{"offchain_address":"tark1qfake","boarding_address":"bcrt1pfake"}' ;;
  vtxos) echo '{"spendable":[{"amount":1000}],"spent":[{"amount":250}]}' ;;
  settle) echo '{"txid":"round-1"}' ;;
  send) echo "{\"txid\":\"ark-$2-$4-$5-$ARK_WALLET_PASSWORD\"}" ;;
  redeem) echo "{\"txid\":\"exit-$2-$4\"}" ;;
  balance) echo '{"onchain_balance":{"spendable_amount":42,"locked_amount":[{"amount":5,"expiry_time":1},{"amount":7,"expiry_time":2}]}}' ;;
  config) echo '{"server_url":"http://ark:7070","explorer_url":"http://esplora:3000","network":"regtest"}' ;;
  garbage) echo 'not json' ;;
  *) echo "unknown command $cmd" >&2; exit 2 ;;
esac
"#;

    fn backend(dir: &TempDir) -> ArkCliBackend {
        let script = dir.path().join("fake-ark.sh");
        std::fs::write(&script, FAKE_WALLET).expect("script");
        ArkCliBackend::new("sh", dir.path().join("data")).with_base_args(vec![script.display().to_string()])
    }

    #[tokio::test]
    async fn load_requires_state_file() {
        let dir = TempDir::new().expect("tempdir");
        let backend = backend(&dir);
        assert!(backend.load().await.unwrap().is_none());

        backend.create().await.unwrap();
        std::fs::write(backend.datadir().join(STATE_FILE), "{}").unwrap();
        assert!(backend.has_wallet());
        assert!(backend.load().await.unwrap().is_some());
    }

    #[tokio::test]
    async fn parses_read_only_outputs() {
        let dir = TempDir::new().expect("tempdir");
        let engine = backend(&dir).create().await.unwrap();

        let pair = engine.receive().await.unwrap();
        assert_eq!(pair.offchain_address, "tark1qfake");
        assert_eq!(pair.boarding_address, "bcrt1pfake");

        let set = engine.list_vtxos().await.unwrap();
        assert_eq!(set.spendable, vec![Vtxo { amount: 1000 }]);
        assert_eq!(set.spent, vec![Vtxo { amount: 250 }]);

        assert_eq!(engine.config_data().await.unwrap().explorer_url, "http://esplora:3000");
    }

    #[tokio::test]
    async fn unlock_passes_secret_via_env_and_reuses_it() {
        let dir = TempDir::new().expect("tempdir");
        let engine = backend(&dir).create().await.unwrap();

        let err = engine.unlock("wrong").await.unwrap_err();
        assert_eq!(err, EngineError::Failed("invalid password".into()));

        engine.unlock("secret").await.unwrap();
        let txid = engine.send_offchain(&[Receiver::new("tark1qdest", 1000)], true).await.unwrap();
        assert_eq!(txid, "ark-tark1qdest-1000---wait-secret");
        assert_eq!(engine.collaborative_exit("bcrt1qdest", 2000).await.unwrap(), "exit-bcrt1qdest-2000");
        assert_eq!(engine.settle().await.unwrap(), "round-1");
    }

    #[tokio::test]
    async fn onchain_balance_ignores_locked_entries() {
        let dir = TempDir::new().expect("tempdir");
        let engine = backend(&dir).create().await.unwrap();
        assert_eq!(engine.onchain_balance().await.unwrap(), OnchainBalance { spendable: 42 });
    }

    #[tokio::test]
    async fn init_forwards_wallet_and_client_type() {
        let dir = TempDir::new().expect("tempdir");
        let log = dir.path().join("init.log");
        std::env::set_var("ARK_FAKE_LOG", &log);
        let engine = backend(&dir).create().await.unwrap();
        engine
            .init(&InitArgs {
                wallet_type: WalletType::SingleKey,
                client_type: ClientType::Rest,
                server_url: "http://ark:7070".into(),
                password: "secret".into(),
            })
            .await
            .unwrap();
        let logged = std::fs::read_to_string(&log).unwrap();
        assert_eq!(logged.trim(), "--wallet-type singlekey --client-type rest --server-url http://ark:7070");
    }

    #[tokio::test]
    async fn bad_output_and_unknown_commands_are_errors() {
        let dir = TempDir::new().expect("tempdir");
        let engine = ArkCli::new(backend(&dir).invocation);
        assert!(matches!(engine.call::<TxidOutput>("garbage", &[]).await, Err(EngineError::Protocol(_))));
        assert_eq!(
            engine.call::<TxidOutput>("nope", &[]).await.unwrap_err(),
            EngineError::Failed("unknown command nope".into())
        );
    }
}
