//! Arkgate CLI - starts the HTTP gateway
//!
//!   arkgate [serve] [--port <port>] [--data-dir <path>] [--engine cli|memory]
//!
//! Configuration comes from the environment (a `.env` file in the working directory is
//! loaded first and never overrides variables that are already set). Flags win over env.

use anyhow::{bail, Context, Result};
use arkgate::engine::ClientType;
use arkgate::logging::init_logging;
use arkgate::session::FaucetConfig;
use arkgate::{backend, bootstrap, install_signal_handlers, serve, EngineKind, FeePolicy, GatewayConfig, SessionConfig};
use serde_json::json;
use std::env;
use std::time::Duration;
use tracing::{info, warn};

const DEFAULT_SERVER_URL: &str = "http://localhost:7070";

fn main() {
    let args: Vec<String> = env::args().collect();
    let opts = ParsedArgs::parse(&args[1..]);
    init_logging();

    if opts.help {
        print_usage();
        return;
    }

    if opts.version {
        println!("arkgate {}", env!("CARGO_PKG_VERSION"));
        return;
    }

    let result = match opts.command.as_deref() {
        None | Some("serve") => cmd_serve(&opts),
        Some(cmd) => Err(anyhow::anyhow!("Unknown command: {}", cmd)),
    };

    if let Err(e) = result {
        eprintln!("{}", json!({"error": format!("{:#}", e)}));
        std::process::exit(1);
    }
}

#[derive(Default)]
struct ParsedArgs {
    command: Option<String>,
    port: Option<u16>,
    data_dir: Option<String>,
    engine: Option<String>,
    help: bool,
    version: bool,
}

impl ParsedArgs {
    fn parse(args: &[String]) -> Self {
        // Load .env file if present
        if let Ok(contents) = std::fs::read_to_string(".env") {
            for line in contents.lines() {
                let line = line.trim();
                if line.is_empty() || line.starts_with('#') {
                    continue;
                }
                if let Some((key, value)) = line.split_once('=') {
                    let value = value.trim().trim_matches('"');
                    if !value.is_empty() && env::var(key.trim()).is_err() {
                        env::set_var(key.trim(), value);
                    }
                }
            }
        }

        let mut opts = ParsedArgs::default();
        let mut i = 0;

        while i < args.len() {
            let arg = &args[i];
            match arg.as_str() {
                "--help" | "-h" => opts.help = true,
                "--version" | "-V" => opts.version = true,
                "--port" | "-p" => {
                    if i + 1 < args.len() {
                        opts.port = args[i + 1].parse().ok();
                        i += 1;
                    }
                }
                "--data-dir" | "-d" => {
                    if i + 1 < args.len() {
                        opts.data_dir = Some(args[i + 1].clone());
                        i += 1;
                    }
                }
                "--engine" | "-e" => {
                    if i + 1 < args.len() {
                        opts.engine = Some(args[i + 1].clone());
                        i += 1;
                    }
                }
                _ if !arg.starts_with('-') && opts.command.is_none() => opts.command = Some(arg.clone()),
                _ => {}
            }
            i += 1;
        }

        opts
    }
}

fn print_usage() {
    println!(
        r#"arkgate - HTTP gateway for an Ark + on-chain Bitcoin wallet

USAGE:
    arkgate [serve] [options]

OPTIONS:
    --port, -p <port>       Listen port (default: 8080, env: ARKGATE_PORT)
    --data-dir, -d <path>   Wallet data directory (env: ARKGATE_DATA_DIR)
    --engine, -e <kind>     Wallet engine: cli|memory (env: ARKGATE_ENGINE)
    --version, -V           Print version

ENVIRONMENT:
    WALLET_PASSWORD             Wallet secret (required)
    ARK_SERVER_URL              Ark server (default: {server})
    ARKGATE_BIND                Listen address (default: 0.0.0.0)
    ARKGATE_ARK_BIN             Wallet program and leading args (default: ark)
    ARKGATE_CLIENT_TYPE         grpc|rest (default: grpc)
    ARKGATE_CALL_TIMEOUT_SECS   Per-call engine timeout (default: 120)
    ARKGATE_FEE_VBYTES          Assumed transaction size (default: 100)
    ARKGATE_FEE_NETWORK_SHARE   Network share of the fee in percent (default: 80)
    ARKGATE_FAUCET              0 disables /wallet/faucet
    ARKGATE_FAUCET_BIN          Faucet program (default: nigiri)
    ARKGATE_LOG_JSON            1 for JSON logs
"#,
        server = DEFAULT_SERVER_URL
    );
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Result<Option<T>> {
    match env_opt(key) {
        Some(raw) => raw.parse().map(Some).map_err(|_| anyhow::anyhow!("{} has an invalid value: {}", key, raw)),
        None => Ok(None),
    }
}

fn load_config(opts: &ParsedArgs) -> Result<GatewayConfig> {
    let password = env_opt("WALLET_PASSWORD").context("WALLET_PASSWORD must be set")?;
    let server_url = env_opt("ARK_SERVER_URL").unwrap_or_else(|| {
        warn!("ARK_SERVER_URL not set, using {}", DEFAULT_SERVER_URL);
        DEFAULT_SERVER_URL.to_string()
    });

    let mut session = SessionConfig::new(password, server_url);
    if let Some(raw) = env_opt("ARKGATE_CLIENT_TYPE") {
        let client_type = ClientType::from_str(&raw).with_context(|| format!("unknown client type: {}", raw))?;
        session = session.with_client_type(client_type);
    }

    let mut config = GatewayConfig::new(session);

    if let Some(bind) = env_opt("ARKGATE_BIND") {
        config = config.with_bind(bind);
    }
    if let Some(port) = opts.port.or(env_parse("ARKGATE_PORT")?) {
        config = config.with_port(port);
    }
    if let Some(dir) = opts.data_dir.clone().or_else(|| env_opt("ARKGATE_DATA_DIR")) {
        config = config.with_data_dir(dir);
    }
    if let Some(raw) = opts.engine.clone().or_else(|| env_opt("ARKGATE_ENGINE")) {
        let engine = EngineKind::from_str(&raw).with_context(|| format!("unknown engine: {}", raw))?;
        config = config.with_engine(engine);
    }
    if let Some(raw) = env_opt("ARKGATE_ARK_BIN") {
        config = config.with_ark_command(raw.split_whitespace().map(String::from).collect());
    }
    if let Some(secs) = env_parse::<u64>("ARKGATE_CALL_TIMEOUT_SECS")? {
        if secs == 0 {
            bail!("ARKGATE_CALL_TIMEOUT_SECS must be positive");
        }
        config = config.with_call_timeout(Duration::from_secs(secs));
    }

    let defaults = FeePolicy::default();
    let vbytes = env_parse::<u64>("ARKGATE_FEE_VBYTES")?.unwrap_or(defaults.assumed_vbytes);
    let share = env_parse::<u64>("ARKGATE_FEE_NETWORK_SHARE")?.unwrap_or(defaults.network_share_percent);
    let fees = FeePolicy::new(vbytes, share).context("ARKGATE_FEE_NETWORK_SHARE must be at most 100")?;
    config = config.with_fees(fees);

    let mut faucet = FaucetConfig::default();
    if env_opt("ARKGATE_FAUCET").as_deref() == Some("0") {
        faucet.enabled = false;
    }
    if let Some(program) = env_opt("ARKGATE_FAUCET_BIN") {
        faucet.program = program.into();
    }
    Ok(config.with_faucet(faucet))
}

fn cmd_serve(opts: &ParsedArgs) -> Result<()> {
    let config = load_config(opts)?;
    info!(?config, "starting gateway");

    let rt = tokio::runtime::Runtime::new().context("Failed to create runtime")?;

    rt.block_on(async {
        // Install signal handlers for graceful shutdown
        let shutdown = install_signal_handlers();

        let state = bootstrap(&config, backend(&config)?, shutdown.token()).await?;

        let addr = config.listen_addr();
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .with_context(|| format!("Failed to bind {}", addr))?;

        info!("Arkgate listening on http://{}", addr);
        info!("Endpoints:");
        info!("  GET  /health              - Health check");
        info!("  POST /wallet/create       - Wallet addresses");
        info!("  POST /payment/send        - Send (ark|onchain)");
        info!("  GET  /payment/estimate    - Fee estimate");
        info!("  GET  /wallet/utxos        - Coin list");
        info!("  POST /wallet/deposit      - Settle boarding funds");
        info!("  GET  /wallet/balance      - Balances");
        info!("  POST /wallet/withdraw     - Exit to on-chain");
        if cfg!(feature = "faucet") && config.faucet.enabled {
            info!("  POST /wallet/faucet       - Regtest faucet");
        }

        serve(listener, state, shutdown.token()).await.context("Server error")?;
        info!("Server stopped");
        Ok::<(), anyhow::Error>(())
    })
}
