//! Route constants for the HTTP surface
//!
//! Centralized registry so the router and its tests agree on every path.

pub const HEALTH: &str = "/health";

/// Wallet paths
pub mod wallet {
    pub const CREATE: &str = "/wallet/create";
    pub const UTXOS: &str = "/wallet/utxos";
    pub const DEPOSIT: &str = "/wallet/deposit";
    pub const FAUCET: &str = "/wallet/faucet";
    pub const BALANCE: &str = "/wallet/balance";
    pub const WITHDRAW: &str = "/wallet/withdraw";

    pub const ALL: &[&str] = &[CREATE, UTXOS, DEPOSIT, FAUCET, BALANCE, WITHDRAW];
}

/// Payment paths
pub mod payment {
    pub const SEND: &str = "/payment/send";
    pub const ESTIMATE: &str = "/payment/estimate";

    pub const ALL: &[&str] = &[SEND, ESTIMATE];
}
