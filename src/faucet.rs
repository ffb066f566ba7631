//! Regtest faucet - shells out to the test-network funding tool
//!
//! Test-only. Never touches the wallet engine.

use crate::error::{GatewayError, GatewayResult};
use std::path::PathBuf;
use tokio::process::Command;
use tracing::info;

#[derive(Debug, Clone)]
pub struct Faucet {
    program: PathBuf,
}

impl Faucet {
    pub fn new(program: impl Into<PathBuf>) -> Self { Self { program: program.into() } }

    /// Run `<program> faucet <address>` and return its combined output.
    pub async fn fund(&self, address: &str) -> GatewayResult<String> {
        let output = Command::new(&self.program)
            .arg("faucet")
            .arg(address)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| GatewayError::Faucet(format!("faucet error: {}", e)))?;

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));

        if !output.status.success() {
            return Err(GatewayError::Faucet(format!("faucet error: {}: {}", output.status, combined)));
        }
        info!(address, "faucet funded address");
        Ok(combined)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn returns_combined_output() {
        let faucet = Faucet::new("echo");
        assert_eq!(faucet.fund("bcrt1qabc").await.unwrap(), "faucet bcrt1qabc\n");
    }

    #[tokio::test]
    async fn failing_tool_is_an_error() {
        let err = Faucet::new("false").fund("bcrt1qabc").await.unwrap_err();
        assert!(matches!(err, GatewayError::Faucet(ref m) if m.starts_with("faucet error: exit status: 1")));
    }

    #[tokio::test]
    async fn missing_tool_is_an_error() {
        let err = Faucet::new("/nonexistent/nigiri").fund("bcrt1qabc").await.unwrap_err();
        assert!(err.to_string().starts_with("faucet error:"));
    }
}
