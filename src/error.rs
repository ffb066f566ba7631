//! Gateway error taxonomy

use crate::engine::EngineError;

pub type GatewayResult<T> = Result<T, GatewayError>;

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Request body did not parse.
    #[error("{0}")]
    MalformedRequest(String),
    #[error("{0}")]
    InvalidArgument(String),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error("{0}")]
    Faucet(String),
    /// Session could not reach `Ready`. The process must not serve traffic.
    #[error("wallet startup failed: {0}")]
    FatalStartup(String),
}

impl GatewayError {
    pub fn is_client_error(&self) -> bool {
        matches!(self, GatewayError::MalformedRequest(_) | GatewayError::InvalidArgument(_))
    }
}
