//! Structured logging foundation.
//!
//! Dual-mode output on stderr: human-readable for interactive use,
//! JSONL for scripted and supervised runs. stdout stays reserved for
//! command payloads (summaries, CSV exports).
//!
//! Session tokens and token hashes must never be logged; log call sites
//! carry ids and counts instead.

use std::io::IsTerminal;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Env var holding the filter directive (falls back to `RUST_LOG`).
pub const ENV_LOG: &str = "ANTHOLOGY_LOG";
/// Env var selecting the output format: `human` (default) or `jsonl`.
pub const ENV_LOG_FORMAT: &str = "ANTHOLOGY_LOG_FORMAT";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Human,
    Jsonl,
}

#[derive(Debug, Clone, Default)]
pub struct LogConfig {
    pub format: LogFormat,
    /// Default filter when neither env var is set.
    pub default_filter: Option<String>,
}

impl LogConfig {
    pub fn from_env() -> Self {
        let format = match std::env::var(ENV_LOG_FORMAT).as_deref() {
            Ok("jsonl") | Ok("json") => LogFormat::Jsonl,
            _ => LogFormat::Human,
        };
        LogConfig {
            format,
            default_filter: None,
        }
    }
}

/// Initialize the logging subsystem. Call once at startup.
pub fn init_logging(config: &LogConfig) {
    let fallback = config
        .default_filter
        .clone()
        .unwrap_or_else(|| "anthology_core=info,anthology_store=info".to_string());
    let filter = EnvFilter::try_from_env(ENV_LOG)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(fallback));

    match config.format {
        LogFormat::Human => {
            let use_ansi = std::io::stderr().is_terminal();
            let fmt_layer = fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_ansi(use_ansi);
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt_layer)
                .init();
        }
        LogFormat::Jsonl => {
            let fmt_layer = fmt::layer()
                .with_writer(std::io::stderr)
                .json()
                .flatten_event(true);
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt_layer)
                .init();
        }
    }
}
