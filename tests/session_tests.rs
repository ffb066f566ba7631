//! Integration Tests: startup composition
//!
//! These tests verify:
//! 1. A fresh backend is initialized and a restart unlocks the same wallet
//! 2. Startup failures are fatal and name the cause
//! 3. The configured engine kind selects the backend

use arkgate::engine::{MemoryBackend, MemoryEngine, Op};
use arkgate::session::FaucetConfig;
use arkgate::{backend, bootstrap, EngineKind, GatewayConfig, GatewayError, SessionConfig, Shutdown};
use std::sync::Arc;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

fn config(password: &str) -> GatewayConfig {
    GatewayConfig::new(SessionConfig::new(password, "http://localhost:7070"))
        .with_engine(EngineKind::Memory)
        .with_faucet(FaucetConfig { enabled: false, ..Default::default() })
}

/// Test: First start initializes, second start unlocks the same wallet
#[tokio::test]
async fn restart_unlocks_existing_wallet() {
    let memory = MemoryBackend::new();
    let cfg = config("hunter2");

    let first = bootstrap(&cfg, Arc::new(memory.clone()), CancellationToken::new()).await.expect("first start");
    let addresses = first.payments.receive().await.expect("receive");
    assert!(addresses.offchain_address.starts_with("tark1q"));

    let engine = memory.wallet().expect("wallet created");
    assert_eq!(engine.count(Op::Init), 1);
    assert_eq!(engine.count(Op::Unlock), 0);

    let second = bootstrap(&cfg, Arc::new(memory.clone()), CancellationToken::new()).await.expect("second start");
    assert!(second.balances.balance().await.is_ok());
    assert_eq!(engine.count(Op::Init), 1);
    assert_eq!(engine.count(Op::Unlock), 1);
    assert!(!engine.is_locked());
}

/// Test: Restart with the wrong secret refuses to serve
#[tokio::test]
async fn wrong_secret_is_fatal() {
    let memory = MemoryBackend::with_wallet(MemoryEngine::new().with_password("hunter2"));
    let result = bootstrap(&config("letmein"), Arc::new(memory), CancellationToken::new()).await;

    match result {
        Err(GatewayError::FatalStartup(reason)) => assert_eq!(reason, "invalid password"),
        Err(other) => panic!("unexpected error: {}", other),
        Ok(_) => panic!("startup should fail"),
    }
}

/// Test: Shutdown before the session is ready aborts startup
#[tokio::test]
async fn shutdown_during_startup_is_fatal() {
    let shutdown = Shutdown::new();
    shutdown.trigger();

    let memory = MemoryBackend::new();
    let result = bootstrap(&config("hunter2"), Arc::new(memory.clone()), shutdown.token()).await;

    assert!(matches!(result, Err(GatewayError::FatalStartup(ref m)) if m.contains("cancelled")));
    let engine = memory.wallet().expect("engine created before init");
    assert!(!engine.is_initialized());
}

/// Test: Memory engine kind starts without touching the filesystem
#[tokio::test]
async fn memory_backend_from_config() {
    let cfg = config("hunter2");
    let state = bootstrap(&cfg, backend(&cfg).expect("backend"), CancellationToken::new()).await.expect("start");
    assert_eq!(state.app_name, "arkgate");
    assert_eq!(state.fees.policy(), cfg.fees);
}

/// Test: CLI engine with a missing program fails at startup, not at first request
#[cfg(unix)]
#[tokio::test]
async fn missing_wallet_program_is_fatal() {
    let dir = TempDir::new().expect("tempdir");
    let cfg = config("hunter2")
        .with_engine(EngineKind::Cli)
        .with_data_dir(dir.path().join("data"))
        .with_ark_command(vec!["/nonexistent/ark".into()]);

    let result = bootstrap(&cfg, backend(&cfg).expect("backend"), CancellationToken::new()).await;
    assert!(matches!(result, Err(GatewayError::FatalStartup(_))));
}

/// Test: Empty wallet command is rejected
#[test]
fn empty_wallet_command_is_rejected() {
    let cfg = config("hunter2").with_engine(EngineKind::Cli).with_ark_command(Vec::new());
    assert!(backend(&cfg).is_err());
}
