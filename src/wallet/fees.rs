//! Fee estimation from the explorer's live fee rate
//!
//! total = floor(rate * assumed_vbytes), split network/service by a fixed percentage.
//! The flat transaction size is a known simplification; both numbers live in [`FeePolicy`].

use crate::engine::{EngineError, EngineResult, NetworkConfig, WalletHandle};
use crate::error::GatewayResult;
use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_ASSUMED_VBYTES: u64 = 100;
pub const DEFAULT_NETWORK_SHARE_PERCENT: u64 = 80;

/// Confirmation target (blocks) read from the explorer's estimate map.
const TARGET_BLOCKS: &str = "1";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeePolicy {
    pub assumed_vbytes: u64,
    /// Share of the total that goes to the network, in percent (0..=100). The rest is the service fee.
    pub network_share_percent: u64,
}

impl Default for FeePolicy {
    fn default() -> Self {
        Self { assumed_vbytes: DEFAULT_ASSUMED_VBYTES, network_share_percent: DEFAULT_NETWORK_SHARE_PERCENT }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FeeBreakdown {
    pub network_fee: u64,
    pub service_fee: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FeeEstimate {
    pub total_fee: u64,
    pub breakdown: FeeBreakdown,
}

impl FeePolicy {
    pub fn new(assumed_vbytes: u64, network_share_percent: u64) -> Option<Self> {
        (network_share_percent <= 100).then_some(Self { assumed_vbytes, network_share_percent })
    }

    /// `fee_rate` is in sat/vB.
    pub fn estimate(&self, fee_rate: f64) -> EngineResult<FeeEstimate> {
        if !fee_rate.is_finite() || fee_rate < 0.0 {
            return Err(EngineError::Protocol(format!("invalid fee rate: {}", fee_rate)));
        }
        let total_fee = (fee_rate * self.assumed_vbytes as f64).floor() as u64;
        let network_fee = (total_fee as u128 * self.network_share_percent as u128 / 100) as u64;
        Ok(FeeEstimate {
            total_fee,
            breakdown: FeeBreakdown { network_fee, service_fee: total_fee - network_fee },
        })
    }
}

#[async_trait]
pub trait FeeOracle: Send + Sync {
    async fn fee_rate(&self, config: &NetworkConfig) -> EngineResult<f64>;
}

/// Esplora `GET /fee-estimates`.
pub struct EsploraFeeOracle {
    client: reqwest::Client,
}

impl EsploraFeeOracle {
    pub fn new(timeout: Duration) -> EngineResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| EngineError::Failed(format!("fee oracle client: {}", e)))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl FeeOracle for EsploraFeeOracle {
    async fn fee_rate(&self, config: &NetworkConfig) -> EngineResult<f64> {
        let url = format!("{}/fee-estimates", config.explorer_url.trim_end_matches('/'));
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| EngineError::Failed(format!("fee oracle: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(EngineError::Failed(format!("fee oracle returned {}: {}", status, body.trim())));
        }

        let estimates: HashMap<String, f64> = response
            .json()
            .await
            .map_err(|e| EngineError::Protocol(format!("fee estimates: {}", e)))?;
        // Regtest explorers answer with an empty map.
        if estimates.is_empty() {
            return Ok(1.0);
        }
        estimates
            .get(TARGET_BLOCKS)
            .copied()
            .ok_or_else(|| EngineError::Protocol(format!("no {}-block fee estimate", TARGET_BLOCKS)))
    }
}

#[derive(Clone)]
pub struct FeeEstimator {
    wallet: WalletHandle,
    oracle: Arc<dyn FeeOracle>,
    policy: FeePolicy,
}

impl FeeEstimator {
    pub fn new(wallet: WalletHandle, oracle: Arc<dyn FeeOracle>, policy: FeePolicy) -> Self {
        Self { wallet, oracle, policy }
    }

    pub fn policy(&self) -> FeePolicy { self.policy }

    pub async fn estimate(&self) -> GatewayResult<FeeEstimate> {
        let config = self.wallet.shared("config_data", |e| async move { e.config_data().await }).await?;
        let rate = self.oracle.fee_rate(&config).await?;
        let estimate = self.policy.estimate(rate)?;
        debug!(network = %config.network, rate, total = estimate.total_fee, "fee estimate");
        Ok(estimate)
    }
}
