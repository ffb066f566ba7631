//! Wallet operations exposed by the gateway
//!
//! Three components share one [`WalletHandle`](crate::engine::WalletHandle):
//!
//! | Component | Operations | Gate |
//! |-----------|------------|------|
//! | [`PaymentRouter`] | receive | shared |
//! | [`PaymentRouter`] | send, settle, withdraw | exclusive |
//! | [`BalanceAggregator`] | utxos, balance | shared |
//! | [`FeeEstimator`] | estimate (engine config + explorer) | shared |

mod balance;
mod fees;
mod payments;

pub use balance::{spendable_total, unify, BalanceAggregator, BalanceSnapshot, Utxo};
pub use fees::{
    EsploraFeeOracle, FeeBreakdown, FeeEstimate, FeeEstimator, FeeOracle, FeePolicy, DEFAULT_ASSUMED_VBYTES,
    DEFAULT_NETWORK_SHARE_PERCENT,
};
pub use payments::{PaymentRouter, SendRequest, Settlement};
