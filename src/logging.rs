//! Log setup for the binary: `RUST_LOG` filtering (default `info`), output on stderr.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub const LOG_JSON_ENV: &str = "ARKGATE_LOG_JSON";

/// Pretty output, or JSON lines when `ARKGATE_LOG_JSON=1`. Safe to call twice.
pub fn init_logging() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = wants_json(std::env::var(LOG_JSON_ENV).ok().as_deref());

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(json.then(|| fmt::layer().json().with_writer(std::io::stderr)))
        .with((!json).then(|| fmt::layer().pretty().with_writer(std::io::stderr)))
        .try_init();
}

fn wants_json(value: Option<&str>) -> bool { value.map(str::trim) == Some("1") }
