//! Logging setup for the operator binary

use tracing::level_filters::LevelFilter;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::error::{Error, Result};

/// Install the global tracing subscriber
///
/// `level` is the default directive; `RUST_LOG` still overrides it per target.
pub fn init_logging(level: &str, json: bool) -> Result<()> {
    let default_level: LevelFilter = level
        .parse()
        .map_err(|_| Error::ConfigError(format!("invalid log level: {level}")))?;

    let env_filter = EnvFilter::builder()
        .with_default_directive(default_level.into())
        .from_env_lossy();

    let registry = tracing_subscriber::registry().with(env_filter);
    let result = if json {
        registry
            .with(fmt::layer().json().with_target(true))
            .try_init()
    } else {
        registry.with(fmt::layer().with_target(true)).try_init()
    };

    result.map_err(|e| Error::ConfigError(format!("failed to install logger: {e}")))
}
