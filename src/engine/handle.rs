//! WalletHandle - the one engine handle shared by every request
//!
//! Mutating calls (settle, send, exit, unlock, init) go through the write side of a fair
//! `tokio::sync::RwLock`, read-only calls through the read side. Reads queue behind a waiting
//! writer. Every call is bounded by [`CallPolicy::timeout`] and aborted when the shutdown token
//! fires; in both cases the guard is dropped with the future, so the gate is never left held.

use super::{EngineError, EngineResult, WalletEngine};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Clone)]
pub struct CallPolicy {
    /// Upper bound for queueing on the gate plus the engine call itself.
    pub timeout: Duration,
    pub cancel: CancellationToken,
}

impl Default for CallPolicy {
    fn default() -> Self { Self { timeout: DEFAULT_CALL_TIMEOUT, cancel: CancellationToken::new() } }
}

impl CallPolicy {
    pub fn with_timeout(mut self, timeout: Duration) -> Self { self.timeout = timeout; self }
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self { self.cancel = cancel; self }
}

#[derive(Clone)]
pub struct WalletHandle {
    engine: Arc<dyn WalletEngine>,
    gate: Arc<RwLock<()>>,
    policy: CallPolicy,
}

impl WalletHandle {
    pub fn new(engine: Arc<dyn WalletEngine>, policy: CallPolicy) -> Self {
        Self { engine, gate: Arc::new(RwLock::new(())), policy }
    }

    /// Run read-only engine work. Concurrent with other readers, never with a writer.
    pub async fn shared<T, F, Fut>(&self, op: &'static str, f: F) -> EngineResult<T>
    where
        F: FnOnce(Arc<dyn WalletEngine>) -> Fut,
        Fut: Future<Output = EngineResult<T>>,
    {
        let (engine, gate) = (self.engine.clone(), self.gate.clone());
        self.bounded(op, async move {
            let _guard = gate.read().await;
            f(engine).await
        })
        .await
    }

    /// Run state-changing engine work. One at a time across the whole process.
    pub async fn exclusive<T, F, Fut>(&self, op: &'static str, f: F) -> EngineResult<T>
    where
        F: FnOnce(Arc<dyn WalletEngine>) -> Fut,
        Fut: Future<Output = EngineResult<T>>,
    {
        let (engine, gate) = (self.engine.clone(), self.gate.clone());
        self.bounded(op, async move {
            let _guard = gate.write().await;
            debug!(op, "exclusive engine call");
            f(engine).await
        })
        .await
    }

    async fn bounded<T>(&self, op: &'static str, call: impl Future<Output = EngineResult<T>>) -> EngineResult<T> {
        let result = tokio::select! {
            biased;
            _ = self.policy.cancel.cancelled() => Err(EngineError::Cancelled { op }),
            res = tokio::time::timeout(self.policy.timeout, call) => match res {
                Ok(inner) => inner,
                Err(_) => Err(EngineError::Timeout { op, after: self.policy.timeout }),
            },
        };
        if let Err(ref e) = result {
            warn!(op, error = %e, "engine call failed");
        }
        result
    }
}
