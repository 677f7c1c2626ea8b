use thiserror::Error;
use crate::types::ids::JobId;

#[derive(Error, Debug)]
pub enum Error {
    // Job lifecycle errors
    #[error("Invalid job config: {0}")]
    InvalidJobConfig(String),

    #[error("Job already running: {0}")]
    AlreadyRunning(JobId),

    #[error("Job not found: {0}")]
    JobNotFound(JobId),

    #[error("Unknown provider: {0}")]
    UnknownProvider(String),

    // Price provider errors
    #[error(transparent)]
    Provider(#[from] ProviderError),

    // Event log errors
    #[error("Kafka error: {0}")]
    KafkaError(String),

    #[error("Malformed event: {0}")]
    MalformedEvent(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    // Storage errors
    #[error("Persistence error: {0}")]
    Persistence(String),

    // System errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Failures reported by a single provider call. These are transient from the
/// scheduler's point of view: the symbol is skipped and retried next cycle.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("{provider}: invalid symbol {symbol}")]
    InvalidSymbol { provider: &'static str, symbol: String },

    #[error("{provider}: rate limit reached")]
    RateLimited { provider: &'static str },

    #[error("{provider}: network error: {message}")]
    Network { provider: &'static str, message: String },

    #[error("{provider}: unexpected HTTP status {status}")]
    HttpStatus { provider: &'static str, status: u16 },

    #[error("{provider}: no price data for {symbol}")]
    NoData { provider: &'static str, symbol: String },

    #[error("{provider}: malformed response: {message}")]
    MalformedResponse { provider: &'static str, message: String },

    #[error("{provider}: not configured: {message}")]
    NotConfigured { provider: &'static str, message: String },
}

impl ProviderError {
    pub fn provider(&self) -> &'static str {
        match self {
            ProviderError::InvalidSymbol { provider, .. }
            | ProviderError::RateLimited { provider }
            | ProviderError::Network { provider, .. }
            | ProviderError::HttpStatus { provider, .. }
            | ProviderError::NoData { provider, .. }
            | ProviderError::MalformedResponse { provider, .. }
            | ProviderError::NotConfigured { provider, .. } => provider,
        }
    }

    pub(crate) fn network(provider: &'static str, err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => ProviderError::HttpStatus { provider, status: status.as_u16() },
            None => ProviderError::Network { provider, message: err.to_string() },
        }
    }
}
