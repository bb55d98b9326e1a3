//! `tracing-subscriber` installation.
//!
//! The level filter comes from `RUST_LOG` (default `info`); the output format
//! from `ADSTORE_LOG_FORMAT` (`json`, the default, or `compact`).

use tracing_subscriber::EnvFilter;

pub const LOG_FORMAT_ENV: &str = "ADSTORE_LOG_FORMAT";
pub const DEFAULT_DIRECTIVE: &str = "info";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Json,
    Compact,
}

impl LogFormat {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "json" => Some(LogFormat::Json),
            "compact" => Some(LogFormat::Compact),
            _ => None,
        }
    }

    pub fn from_env() -> Self {
        match std::env::var(LOG_FORMAT_ENV) {
            Ok(value) => Self::parse(&value).unwrap_or_else(|| {
                eprintln!("{LOG_FORMAT_ENV}='{value}' is not a log format; using json");
                LogFormat::Json
            }),
            Err(_) => LogFormat::Json,
        }
    }
}

/// Install the global subscriber. Later calls are no-ops.
pub fn init() {
    init_with(LogFormat::from_env());
}

pub fn init_with(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(false);

    // Another subscriber may already be installed (tests, embedding hosts).
    let installed = match format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Compact => builder.compact().try_init(),
    };
    if installed.is_ok() {
        tracing::debug!(?format, "log subscriber installed");
    }
}
