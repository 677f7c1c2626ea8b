use tracing::Span;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};
use crate::config::{LogFormat, LoggingConfig};
use crate::error::{Error, Result};
use crate::price_infra::ProviderId;
use crate::types::{JobId, Symbol};

/// Installs the global subscriber. `RUST_LOG` overrides `logging.level`.
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| Error::ConfigError(format!("log filter: {}", e)))?;

    let registry = tracing_subscriber::registry().with(filter);
    let result = match config.format {
        LogFormat::Json => registry.with(fmt::layer().json().with_current_span(true)).try_init(),
        LogFormat::Pretty => registry.with(fmt::layer().with_target(true)).try_init(),
    };

    result.map_err(|e| Error::ConfigError(format!("tracing init: {}", e)))
}

pub fn polling_job_span(job_id: &JobId, provider: ProviderId) -> Span {
    tracing::info_span!(
        "polling_job",
        job_id = %job_id,
        provider = %provider,
    )
}

pub fn price_event_span(symbol: &Symbol) -> Span {
    tracing::info_span!(
        "price_event",
        symbol = %symbol,
    )
}
