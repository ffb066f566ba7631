//! MemoryEngine - in-process wallet engine
//!
//! Keeps a tiny vtxo ledger in memory, records every call and can be told to fail a given
//! operation. Clones share the same ledger, so a test can hand one clone to the gateway and
//! inspect the call log through another.

use super::{
    checked_total, AddressPair, ClientType, EngineError, EngineResult, InitArgs, NetworkConfig, OnchainBalance,
    Receiver, Vtxo, VtxoSet, WalletBackend, WalletEngine,
};
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Unlock,
    Init,
    Receive,
    ListVtxos,
    Settle,
    SendOffchain,
    CollaborativeExit,
    OnchainBalance,
    ConfigData,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCall {
    Unlock,
    Init { server_url: String, client_type: ClientType },
    Receive,
    ListVtxos,
    Settle,
    SendOffchain { receivers: Vec<Receiver>, wait: bool },
    CollaborativeExit { address: String, amount: u64 },
    OnchainBalance,
    ConfigData,
}

impl EngineCall {
    pub fn op(&self) -> Op {
        match self {
            EngineCall::Unlock => Op::Unlock,
            EngineCall::Init { .. } => Op::Init,
            EngineCall::Receive => Op::Receive,
            EngineCall::ListVtxos => Op::ListVtxos,
            EngineCall::Settle => Op::Settle,
            EngineCall::SendOffchain { .. } => Op::SendOffchain,
            EngineCall::CollaborativeExit { .. } => Op::CollaborativeExit,
            EngineCall::OnchainBalance => Op::OnchainBalance,
            EngineCall::ConfigData => Op::ConfigData,
        }
    }
}

struct Ledger {
    password: Option<String>,
    locked: bool,
    spendable: Vec<u64>,
    spent: Vec<u64>,
    /// Funds on the boarding address, swept into a vtxo by the next settle.
    boarding: u64,
    onchain: OnchainBalance,
    config: NetworkConfig,
    failures: HashMap<Op, String>,
    calls: Vec<EngineCall>,
    nonce: u64,
}

impl Default for Ledger {
    fn default() -> Self {
        Self {
            password: None,
            locked: false,
            spendable: Vec::new(),
            spent: Vec::new(),
            boarding: 0,
            onchain: OnchainBalance::default(),
            config: NetworkConfig {
                server_url: "http://localhost:7070".into(),
                explorer_url: "http://localhost:3000".into(),
                network: "regtest".into(),
            },
            failures: HashMap::new(),
            calls: Vec::new(),
            nonce: 0,
        }
    }
}

impl Ledger {
    /// Record the call, then apply injected failure and lock state.
    fn enter(&mut self, call: EngineCall) -> EngineResult<()> {
        let op = call.op();
        self.calls.push(call);
        if let Some(msg) = self.failures.get(&op) {
            return Err(EngineError::Failed(msg.clone()));
        }
        if self.locked && !matches!(op, Op::Unlock | Op::Init) {
            return Err(EngineError::Failed("wallet is locked".into()));
        }
        Ok(())
    }

    fn next_id(&mut self, tag: &str) -> String {
        self.nonce += 1;
        let mut hasher = Sha256::new();
        hasher.update(tag.as_bytes());
        hasher.update(self.nonce.to_le_bytes());
        hex::encode(hasher.finalize())
    }

    /// Spend enough vtxos to cover `amount`, keeping change as a new spendable vtxo.
    fn spend(&mut self, amount: u64) -> EngineResult<()> {
        if amount == 0 {
            return Err(EngineError::Failed("amount must be greater than zero".into()));
        }
        let available = checked_total(self.spendable.iter().copied())?;
        if available < amount {
            return Err(EngineError::Failed(format!("not enough funds to cover amount: have {available}, need {amount}")));
        }
        let mut selected = 0u64;
        while selected < amount {
            let vtxo = self.spendable.remove(0);
            selected += vtxo;
            self.spent.push(vtxo);
        }
        if selected > amount {
            self.spendable.push(selected - amount);
        }
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct MemoryEngine {
    ledger: Arc<Mutex<Ledger>>,
}

impl MemoryEngine {
    pub fn new() -> Self { Self::default() }

    /// Engine for an already-initialized wallet; starts locked.
    pub fn with_password(self, password: impl Into<String>) -> Self {
        self.update(|l| { l.password = Some(password.into()); l.locked = true; })
    }
    pub fn with_spendable(self, amounts: Vec<u64>) -> Self { self.update(|l| l.spendable = amounts) }
    pub fn with_spent(self, amounts: Vec<u64>) -> Self { self.update(|l| l.spent = amounts) }
    pub fn with_boarding(self, amount: u64) -> Self { self.update(|l| l.boarding = amount) }
    pub fn with_onchain(self, spendable: u64) -> Self { self.update(|l| l.onchain.spendable = spendable) }
    pub fn with_config(self, config: NetworkConfig) -> Self { self.update(|l| l.config = config) }

    /// Make every future call of `op` fail with `message`.
    pub fn fail(&self, op: Op, message: impl Into<String>) {
        if let Ok(mut l) = self.ledger.lock() {
            l.failures.insert(op, message.into());
        }
    }

    pub fn calls(&self) -> Vec<EngineCall> {
        self.ledger.lock().map(|l| l.calls.clone()).unwrap_or_default()
    }

    pub fn count(&self, op: Op) -> usize {
        self.ledger.lock().map(|l| l.calls.iter().filter(|c| c.op() == op).count()).unwrap_or(0)
    }

    pub fn is_initialized(&self) -> bool {
        self.ledger.lock().map(|l| l.password.is_some()).unwrap_or(false)
    }

    pub fn is_locked(&self) -> bool {
        self.ledger.lock().map(|l| l.locked).unwrap_or(true)
    }

    fn lock(&self) {
        if let Ok(mut l) = self.ledger.lock() {
            l.locked = true;
        }
    }

    fn update(self, f: impl FnOnce(&mut Ledger)) -> Self {
        if let Ok(mut l) = self.ledger.lock() {
            f(&mut l);
        }
        self
    }

    fn with_ledger<T>(&self, f: impl FnOnce(&mut Ledger) -> EngineResult<T>) -> EngineResult<T> {
        let mut guard = self.ledger.lock().map_err(|_| EngineError::Failed("ledger lock".into()))?;
        f(&mut guard)
    }
}

#[async_trait]
impl WalletEngine for MemoryEngine {
    async fn unlock(&self, password: &str) -> EngineResult<()> {
        self.with_ledger(|l| {
            l.enter(EngineCall::Unlock)?;
            match l.password.as_deref() {
                Some(expected) if expected != password => Err(EngineError::Failed("invalid password".into())),
                _ => { l.locked = false; Ok(()) }
            }
        })
    }

    async fn init(&self, args: &InitArgs) -> EngineResult<()> {
        self.with_ledger(|l| {
            l.enter(EngineCall::Init { server_url: args.server_url.clone(), client_type: args.client_type })?;
            if l.password.is_some() {
                return Err(EngineError::Failed("wallet already initialized".into()));
            }
            l.password = Some(args.password.clone());
            l.config.server_url = args.server_url.clone();
            l.locked = false;
            Ok(())
        })
    }

    async fn receive(&self) -> EngineResult<AddressPair> {
        self.with_ledger(|l| {
            l.enter(EngineCall::Receive)?;
            let off = l.next_id("offchain");
            let board = l.next_id("boarding");
            Ok(AddressPair { offchain_address: format!("tark1q{}", &off[..58]), boarding_address: format!("bcrt1p{}", &board[..58]) })
        })
    }

    async fn list_vtxos(&self) -> EngineResult<VtxoSet> {
        self.with_ledger(|l| {
            l.enter(EngineCall::ListVtxos)?;
            Ok(VtxoSet {
                spendable: l.spendable.iter().map(|&amount| Vtxo { amount }).collect(),
                spent: l.spent.iter().map(|&amount| Vtxo { amount }).collect(),
            })
        })
    }

    async fn settle(&self) -> EngineResult<String> {
        self.with_ledger(|l| {
            l.enter(EngineCall::Settle)?;
            let total = checked_total(l.spendable.iter().copied().chain([l.boarding]))?;
            if total == 0 {
                return Err(EngineError::Failed("no funds to settle".into()));
            }
            let forfeited = std::mem::take(&mut l.spendable);
            l.spent.extend(forfeited);
            l.spendable.push(total);
            l.boarding = 0;
            Ok(l.next_id("round"))
        })
    }

    async fn send_offchain(&self, receivers: &[Receiver], wait_for_confirmation: bool) -> EngineResult<String> {
        self.with_ledger(|l| {
            l.enter(EngineCall::SendOffchain { receivers: receivers.to_vec(), wait: wait_for_confirmation })?;
            let amount = checked_total(receivers.iter().map(|r| r.amount))?;
            l.spend(amount)?;
            Ok(l.next_id("ark"))
        })
    }

    async fn collaborative_exit(&self, address: &str, amount: u64) -> EngineResult<String> {
        self.with_ledger(|l| {
            l.enter(EngineCall::CollaborativeExit { address: address.to_string(), amount })?;
            l.spend(amount)?;
            Ok(l.next_id("exit"))
        })
    }

    async fn onchain_balance(&self) -> EngineResult<OnchainBalance> {
        self.with_ledger(|l| {
            l.enter(EngineCall::OnchainBalance)?;
            Ok(l.onchain)
        })
    }

    async fn config_data(&self) -> EngineResult<NetworkConfig> {
        self.with_ledger(|l| {
            l.enter(EngineCall::ConfigData)?;
            Ok(l.config.clone())
        })
    }
}

/// Backend over a single in-memory slot. A wallet created here is found again by later
/// `load` calls once it has been initialized, and comes back locked like after a restart.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    slot: Arc<Mutex<Option<MemoryEngine>>>,
    load_error: Arc<Mutex<Option<String>>>,
}

impl MemoryBackend {
    pub fn new() -> Self { Self::default() }

    pub fn with_wallet(engine: MemoryEngine) -> Self {
        Self { slot: Arc::new(Mutex::new(Some(engine))), ..Default::default() }
    }

    pub fn fail_load(&self, message: impl Into<String>) {
        if let Ok(mut e) = self.load_error.lock() {
            *e = Some(message.into());
        }
    }

    /// Engine currently held in the slot, if any.
    pub fn wallet(&self) -> Option<MemoryEngine> {
        self.slot.lock().ok().and_then(|s| s.clone())
    }
}

#[async_trait]
impl WalletBackend for MemoryBackend {
    async fn load(&self) -> EngineResult<Option<Arc<dyn WalletEngine>>> {
        if let Some(msg) = self.load_error.lock().ok().and_then(|e| e.clone()) {
            return Err(EngineError::Failed(msg));
        }
        let slot = self.slot.lock().map_err(|_| EngineError::Failed("backend lock".into()))?;
        Ok(slot.as_ref().filter(|e| e.is_initialized()).map(|e| {
            e.lock();
            Arc::new(e.clone()) as Arc<dyn WalletEngine>
        }))
    }

    /// Reuses an uninitialized engine already in the slot, so tests can prepare it.
    async fn create(&self) -> EngineResult<Arc<dyn WalletEngine>> {
        let mut slot = self.slot.lock().map_err(|_| EngineError::Failed("backend lock".into()))?;
        let engine = match slot.as_ref() {
            Some(existing) if !existing.is_initialized() => existing.clone(),
            _ => MemoryEngine::new(),
        };
        *slot = Some(engine.clone());
        Ok(Arc::new(engine))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_spends_oldest_vtxos_and_keeps_change() {
        let engine = MemoryEngine::new().with_spendable(vec![600, 700]);
        let txid = engine.send_offchain(&[Receiver::new("tark1qdest", 1000)], true).await.unwrap();
        assert_eq!(txid.len(), 64);

        let set = engine.list_vtxos().await.unwrap();
        assert_eq!(set.spendable, vec![Vtxo { amount: 300 }]);
        assert_eq!(set.spent, vec![Vtxo { amount: 600 }, Vtxo { amount: 700 }]);
    }

    #[tokio::test]
    async fn insufficient_funds_leaves_ledger_untouched() {
        let engine = MemoryEngine::new().with_spendable(vec![100]);
        let err = engine.collaborative_exit("bcrt1qdest", 500).await.unwrap_err();
        assert!(err.to_string().contains("not enough funds"));
        assert_eq!(engine.list_vtxos().await.unwrap().spendable, vec![Vtxo { amount: 100 }]);
    }

    #[tokio::test]
    async fn settle_sweeps_boarding_into_single_vtxo() {
        let engine = MemoryEngine::new().with_spendable(vec![200]).with_boarding(5000);
        engine.settle().await.unwrap();
        let set = engine.list_vtxos().await.unwrap();
        assert_eq!(set.spendable, vec![Vtxo { amount: 5200 }]);
        assert_eq!(set.spent, vec![Vtxo { amount: 200 }]);
        assert!(engine.settle().await.is_ok());
    }

    #[tokio::test]
    async fn overflowing_ledger_is_an_error() {
        let engine = MemoryEngine::new().with_spendable(vec![u64::MAX, 1]);
        let err = engine.send_offchain(&[Receiver::new("tark1qdest", 10)], false).await.unwrap_err();
        assert!(matches!(err, EngineError::Protocol(_)));
        assert!(engine.settle().await.is_err());
        assert_eq!(engine.list_vtxos().await.unwrap().spendable.len(), 2);
    }

    #[tokio::test]
    async fn locked_wallet_rejects_work_until_unlocked() {
        let engine = MemoryEngine::new().with_password("secret");
        assert!(engine.receive().await.is_err());
        assert_eq!(engine.unlock("wrong").await.unwrap_err(), EngineError::Failed("invalid password".into()));
        engine.unlock("secret").await.unwrap();
        assert!(engine.receive().await.is_ok());
    }

    #[tokio::test]
    async fn injected_failure_is_recorded_and_returned() {
        let engine = MemoryEngine::new();
        engine.fail(Op::Settle, "round aborted");
        assert_eq!(engine.settle().await.unwrap_err(), EngineError::Failed("round aborted".into()));
        assert_eq!(engine.count(Op::Settle), 1);
        assert_eq!(engine.calls(), vec![EngineCall::Settle]);
    }

    #[tokio::test]
    async fn backend_only_finds_initialized_wallets() {
        let backend = MemoryBackend::new();
        assert!(backend.load().await.unwrap().is_none());

        let engine = backend.create().await.unwrap();
        assert!(backend.load().await.unwrap().is_none());

        engine
            .init(&InitArgs {
                wallet_type: Default::default(),
                client_type: ClientType::Grpc,
                server_url: "http://ark:7070".into(),
                password: "pw".into(),
            })
            .await
            .unwrap();
        assert!(backend.load().await.unwrap().is_some());
        assert!(backend.wallet().unwrap().is_locked());
    }
}
