//! Payment routing between the Ark (off-chain) and on-chain settlement paths

use crate::engine::{AddressPair, Receiver, WalletHandle};
use crate::error::{GatewayError, GatewayResult};
use serde::Deserialize;
use std::str::FromStr;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settlement {
    Ark,
    Onchain,
}

impl Settlement {
    pub fn as_str(&self) -> &'static str {
        match self {
            Settlement::Ark => "ark",
            Settlement::Onchain => "onchain",
        }
    }
}

impl FromStr for Settlement {
    type Err = GatewayError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "ark" => Ok(Settlement::Ark),
            "onchain" => Ok(Settlement::Onchain),
            _ => Err(GatewayError::InvalidArgument(format!("invalid network: {:?}", value))),
        }
    }
}

/// Body of `/payment/send` and `/wallet/withdraw`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SendRequest {
    #[serde(default)]
    pub network: String,
    #[serde(alias = "recipient")]
    pub to: String,
    pub amount: u64,
}

#[derive(Clone)]
pub struct PaymentRouter {
    wallet: WalletHandle,
}

impl PaymentRouter {
    pub fn new(wallet: WalletHandle) -> Self { Self { wallet } }

    pub async fn receive(&self) -> GatewayResult<AddressPair> {
        Ok(self.wallet.shared("receive", |e| async move { e.receive().await }).await?)
    }

    /// Dispatch on `network`. An unknown network never reaches the engine.
    pub async fn send(&self, req: &SendRequest) -> GatewayResult<String> {
        let settlement: Settlement = req.network.parse()?;
        let (to, amount) = (req.to.clone(), req.amount);
        let txid = match settlement {
            Settlement::Ark => {
                self.wallet
                    .exclusive("send_offchain", move |e| async move {
                        e.send_offchain(&[Receiver::new(to, amount)], true).await
                    })
                    .await?
            }
            Settlement::Onchain => {
                self.wallet
                    .exclusive("collaborative_exit", move |e| async move { e.collaborative_exit(&to, amount).await })
                    .await?
            }
        };
        info!(network = settlement.as_str(), amount, %txid, "payment sent");
        Ok(txid)
    }

    pub async fn settle(&self) -> GatewayResult<String> {
        let txid = self.wallet.exclusive("settle", |e| async move { e.settle().await }).await?;
        info!(%txid, "settled");
        Ok(txid)
    }

    /// Settle, then exit on-chain. Both steps run under one exclusive hold; the exit is
    /// only attempted once the settle has succeeded. `network` is not consulted.
    pub async fn withdraw(&self, req: &SendRequest) -> GatewayResult<String> {
        let (to, amount) = (req.to.clone(), req.amount);
        let txid = self
            .wallet
            .exclusive("withdraw", move |e| async move {
                let round = e.settle().await?;
                info!(%round, "settled before withdrawal");
                e.collaborative_exit(&to, amount).await
            })
            .await?;
        info!(amount, %txid, "withdrawal sent");
        Ok(txid)
    }
}
