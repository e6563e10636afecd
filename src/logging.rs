//! `tracing` subscriber setup.
//!
//! Timestamped, levelled console lines by default; JSON lines when
//! `VOLUME_LOG_JSON` is set. `RUST_LOG` overrides the configured level.

use tracing_subscriber::{fmt, EnvFilter};

use crate::config::LogLevel;

/// Env var that switches output to JSON lines.
pub const JSON_LOG_ENV: &str = "VOLUME_LOG_JSON";

/// Filter applied when `RUST_LOG` is unset: the configured level for this
/// crate, HTTP internals kept at warn.
pub fn filter_directive(level: LogLevel) -> String {
    format!(
        "{},hyperion_volume={},hyper=warn,hyper_util=warn,reqwest=warn,h2=warn",
        level.as_str(),
        level.as_str()
    )
}

pub fn init_logging(level: LogLevel) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directive(level)));

    if std::env::var(JSON_LOG_ENV).is_ok() {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .init();
    }
}
