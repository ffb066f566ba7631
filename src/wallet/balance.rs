//! Balance and UTXO views over the engine's vtxo sets

use crate::engine::{checked_total, EngineError, EngineResult, VtxoSet, WalletHandle};
use crate::error::GatewayResult;
use serde::{Serialize, Serializer};

/// Unified output view. Spendable and locked are mutually exclusive by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Utxo {
    Spendable { amount: u64 },
    Locked { amount: u64 },
}

impl Utxo {
    pub fn amount(&self) -> u64 {
        match *self {
            Utxo::Spendable { amount } | Utxo::Locked { amount } => amount,
        }
    }

    pub fn is_spendable(&self) -> bool { matches!(self, Utxo::Spendable { .. }) }
}

/// Wire shape: `{amount, locked, spendable}`.
impl Serialize for Utxo {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct Wire {
            amount: u64,
            locked: bool,
            spendable: bool,
        }
        let spendable = self.is_spendable();
        Wire { amount: self.amount(), locked: !spendable, spendable }.serialize(serializer)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BalanceSnapshot {
    pub offchain_balance: u64,
    pub onchain_balance: u64,
}

/// Spendable entries first, then locked, each in engine order.
pub fn unify(set: &VtxoSet) -> Vec<Utxo> {
    set.spendable
        .iter()
        .map(|v| Utxo::Spendable { amount: v.amount })
        .chain(set.spent.iter().map(|v| Utxo::Locked { amount: v.amount }))
        .collect()
}

pub fn spendable_total(set: &VtxoSet) -> EngineResult<u64> {
    checked_total(set.spendable.iter().map(|v| v.amount))
}

#[derive(Clone)]
pub struct BalanceAggregator {
    wallet: WalletHandle,
}

impl BalanceAggregator {
    pub fn new(wallet: WalletHandle) -> Self { Self { wallet } }

    pub async fn utxos(&self) -> GatewayResult<Vec<Utxo>> {
        let set = self.wallet.shared("list_vtxos", |e| async move { e.list_vtxos().await }).await?;
        Ok(unify(&set))
    }

    /// Both reads happen under one read guard, so no mutation lands between them.
    pub async fn balance(&self) -> GatewayResult<BalanceSnapshot> {
        let snapshot = self
            .wallet
            .shared("balance", |e| async move {
                let set = e.list_vtxos().await?;
                let onchain = e.onchain_balance().await?;
                Ok::<_, EngineError>(BalanceSnapshot {
                    offchain_balance: spendable_total(&set)?,
                    onchain_balance: onchain.spendable,
                })
            })
            .await?;
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{CallPolicy, MemoryEngine, Op, Vtxo};
    use std::sync::Arc;

    fn aggregator(engine: &MemoryEngine) -> BalanceAggregator {
        BalanceAggregator::new(WalletHandle::new(Arc::new(engine.clone()), CallPolicy::default()))
    }

    #[test]
    fn unify_orders_spendable_first_and_tags_exclusively() {
        let set = VtxoSet {
            spendable: vec![Vtxo { amount: 5 }, Vtxo { amount: 7 }],
            spent: vec![Vtxo { amount: 3 }],
        };
        let utxos = unify(&set);
        assert_eq!(
            utxos,
            vec![Utxo::Spendable { amount: 5 }, Utxo::Spendable { amount: 7 }, Utxo::Locked { amount: 3 }]
        );
        let wire = serde_json::to_value(&utxos).unwrap();
        for entry in wire.as_array().unwrap() {
            assert_ne!(entry["locked"], entry["spendable"]);
        }
        assert_eq!(wire[2], serde_json::json!({"amount": 3, "locked": true, "spendable": false}));
    }

    #[test]
    fn empty_set_is_empty_list() {
        assert!(unify(&VtxoSet::default()).is_empty());
        assert_eq!(spendable_total(&VtxoSet::default()).unwrap(), 0);
    }

    #[tokio::test]
    async fn balance_sums_spendable_only() {
        let engine = MemoryEngine::new().with_spendable(vec![1000, 2500]).with_spent(vec![9999]).with_onchain(4200);
        let snapshot = aggregator(&engine).balance().await.unwrap();
        assert_eq!(snapshot, BalanceSnapshot { offchain_balance: 3500, onchain_balance: 4200 });

        let utxos = aggregator(&engine).utxos().await.unwrap();
        let spendable_sum: u64 = utxos.iter().filter(|u| u.is_spendable()).map(Utxo::amount).sum();
        assert_eq!(spendable_sum, snapshot.offchain_balance);
    }

    #[tokio::test]
    async fn overflowing_vtxo_amounts_are_rejected() {
        let set = VtxoSet { spendable: vec![Vtxo { amount: u64::MAX }, Vtxo { amount: 1 }], spent: vec![] };
        assert!(matches!(spendable_total(&set), Err(EngineError::Protocol(_))));

        let engine = MemoryEngine::new().with_spendable(vec![u64::MAX, 1]);
        let err = aggregator(&engine).balance().await.unwrap_err();
        assert!(!err.is_client_error());
        assert_eq!(engine.count(Op::OnchainBalance), 1);
    }

    #[tokio::test]
    async fn onchain_failure_aborts_balance() {
        let engine = MemoryEngine::new().with_spendable(vec![1000]);
        engine.fail(Op::OnchainBalance, "explorer offline");
        let err = aggregator(&engine).balance().await.unwrap_err();
        assert_eq!(err.to_string(), "explorer offline");
    }

    #[tokio::test]
    async fn list_failure_aborts_before_onchain_query() {
        let engine = MemoryEngine::new();
        engine.fail(Op::ListVtxos, "indexer error");
        assert!(aggregator(&engine).balance().await.is_err());
        assert_eq!(engine.count(Op::OnchainBalance), 0);
        assert!(aggregator(&engine).utxos().await.is_err());
    }
}
