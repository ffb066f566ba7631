//! HTTP routes for wallet operations

use axum::{
    body::Bytes,
    extract::{FromRequest, Request, State},
    http::{header, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::core::paths;
use crate::engine::{AddressPair, WalletHandle};
use crate::error::{GatewayError, GatewayResult};
#[cfg(feature = "faucet")]
use crate::faucet::Faucet;
use crate::wallet::{
    BalanceAggregator, BalanceSnapshot, FeeEstimate, FeeEstimator, FeeOracle, FeePolicy, PaymentRouter, SendRequest,
    Utxo,
};

/// Everything a handler can reach. All components share one wallet handle.
#[derive(Clone)]
pub struct GatewayState {
    pub app_name: String,
    pub payments: PaymentRouter,
    pub balances: BalanceAggregator,
    pub fees: FeeEstimator,
    #[cfg(feature = "faucet")]
    pub faucet: Option<Faucet>,
}

impl GatewayState {
    pub fn new(wallet: WalletHandle, oracle: Arc<dyn FeeOracle>, fees: FeePolicy, app_name: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
            payments: PaymentRouter::new(wallet.clone()),
            balances: BalanceAggregator::new(wallet.clone()),
            fees: FeeEstimator::new(wallet, oracle, fees),
            #[cfg(feature = "faucet")]
            faucet: None,
        }
    }

    #[cfg(feature = "faucet")]
    pub fn with_faucet(mut self, faucet: Faucet) -> Self { self.faucet = Some(faucet); self }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TxidResponse { pub txid: String }

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse { pub message: String }

#[derive(Debug, Deserialize)]
pub struct FaucetRequest { pub address: String }

/// JSON body extractor that ignores `Content-Type`. Undecodable bodies are 400s; failures to
/// read the body (size limit, broken stream) keep their own status.
pub struct JsonBody<T>(pub T);

#[axum::async_trait]
impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|e| (e.status(), Json(serde_json::json!({ "error": e.body_text() }))).into_response())?;
        serde_json::from_slice(&bytes)
            .map(JsonBody)
            .map_err(|e| GatewayError::MalformedRequest(e.to_string()).into_response())
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = if self.is_client_error() { StatusCode::BAD_REQUEST } else { StatusCode::INTERNAL_SERVER_ERROR };
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

pub fn create_router(state: GatewayState) -> Router {
    let router = Router::new()
        .route(paths::HEALTH, get(health))
        .route(paths::wallet::CREATE, post(create_wallet))
        .route(paths::payment::SEND, post(send_payment))
        .route(paths::payment::ESTIMATE, get(estimate_fee))
        .route(paths::wallet::UTXOS, get(list_utxos))
        .route(paths::wallet::DEPOSIT, post(deposit))
        .route(paths::wallet::BALANCE, get(balance))
        .route(paths::wallet::WITHDRAW, post(withdraw));

    #[cfg(feature = "faucet")]
    let router = if state.faucet.is_some() { router.route(paths::wallet::FAUCET, post(faucet)) } else { router };

    router
        .layer(cors())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
}

async fn health(State(s): State<GatewayState>) -> impl IntoResponse {
    Json(serde_json::json!({"status": "ok", "service": s.app_name}))
}

async fn create_wallet(State(s): State<GatewayState>) -> GatewayResult<Json<AddressPair>> {
    Ok(Json(s.payments.receive().await?))
}

async fn send_payment(
    State(s): State<GatewayState>,
    JsonBody(req): JsonBody<SendRequest>,
) -> GatewayResult<Json<TxidResponse>> {
    let txid = s.payments.send(&req).await?;
    Ok(Json(TxidResponse { txid }))
}

async fn estimate_fee(State(s): State<GatewayState>) -> GatewayResult<Json<FeeEstimate>> {
    Ok(Json(s.fees.estimate().await?))
}

async fn list_utxos(State(s): State<GatewayState>) -> GatewayResult<Json<Vec<Utxo>>> {
    Ok(Json(s.balances.utxos().await?))
}

async fn deposit(State(s): State<GatewayState>) -> GatewayResult<Json<TxidResponse>> {
    let txid = s.payments.settle().await?;
    Ok(Json(TxidResponse { txid }))
}

#[cfg(feature = "faucet")]
async fn faucet(
    State(s): State<GatewayState>,
    JsonBody(req): JsonBody<FaucetRequest>,
) -> GatewayResult<Json<MessageResponse>> {
    let faucet = s.faucet.as_ref().ok_or_else(|| GatewayError::Faucet("faucet error: disabled".into()))?;
    let message = faucet.fund(&req.address).await?;
    Ok(Json(MessageResponse { message }))
}

async fn balance(State(s): State<GatewayState>) -> GatewayResult<Json<BalanceSnapshot>> {
    Ok(Json(s.balances.balance().await?))
}

async fn withdraw(
    State(s): State<GatewayState>,
    JsonBody(req): JsonBody<SendRequest>,
) -> GatewayResult<Json<TxidResponse>> {
    let txid = s.payments.withdraw(&req).await?;
    Ok(Json(TxidResponse { txid }))
}
