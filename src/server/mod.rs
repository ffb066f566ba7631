//! HTTP server - startup composition and the axum router
//!
//! [`bootstrap`] brings the wallet session to `Ready` and wires every component onto the one
//! handle it yields. [`serve`] runs the router until the shutdown token fires.

pub mod routes;

pub use routes::{create_router, FaucetRequest, GatewayState, JsonBody, MessageResponse, TxidResponse};

use crate::engine::{ArkCliBackend, MemoryBackend, WalletBackend};
use crate::error::{GatewayError, GatewayResult};
use crate::session::{EngineKind, GatewayConfig, SessionManager};
use crate::wallet::EsploraFeeOracle;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Pick the wallet backend named by the configuration.
pub fn backend(config: &GatewayConfig) -> GatewayResult<Arc<dyn WalletBackend>> {
    match config.engine {
        EngineKind::Cli => {
            let (program, base_args) = config
                .ark_command
                .split_first()
                .ok_or_else(|| GatewayError::FatalStartup("empty wallet command".into()))?;
            Ok(Arc::new(ArkCliBackend::new(program, config.data_dir.clone()).with_base_args(base_args.to_vec())))
        }
        EngineKind::Memory => Ok(Arc::new(MemoryBackend::new())),
    }
}

/// Start the wallet session against `backend` and build the request state around it.
pub async fn bootstrap(
    config: &GatewayConfig,
    backend: Arc<dyn WalletBackend>,
    cancel: CancellationToken,
) -> GatewayResult<GatewayState> {
    let policy = config.call_policy().with_cancel(cancel);
    let mut session = SessionManager::new(backend, config.session.clone(), policy);
    let wallet = session.start().await?;

    let oracle = EsploraFeeOracle::new(config.call_timeout)?;
    let state = GatewayState::new(wallet, Arc::new(oracle), config.fees, config.app.clone());

    #[cfg(feature = "faucet")]
    let state = if config.faucet.enabled {
        state.with_faucet(crate::faucet::Faucet::new(config.faucet.program.clone()))
    } else {
        state
    };

    Ok(state)
}

/// Serve until `shutdown` is cancelled. In-flight requests are allowed to finish.
pub async fn serve(listener: TcpListener, state: GatewayState, shutdown: CancellationToken) -> std::io::Result<()> {
    let router = create_router(state);
    info!(addr = ?listener.local_addr().ok(), "gateway listening");
    axum::serve(listener, router)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
}
