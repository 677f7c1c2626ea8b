pub mod alpha_vantage;
pub mod yahoo;

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use crate::config::ProvidersConfig;
use crate::error::{Error, ProviderError, Result};
use crate::price_infra::{PriceQuote, ProviderId};
use crate::types::Symbol;

pub use alpha_vantage::AlphaVantageProvider;
pub use yahoo::YahooFinanceProvider;

#[async_trait]
pub trait PriceProvider: Send + Sync {
    fn id(&self) -> ProviderId;

    /// Pure syntactic check; no network access.
    fn validate_symbol(&self, symbol: &Symbol) -> bool;

    async fn fetch_latest(&self, symbol: &Symbol) -> std::result::Result<PriceQuote, ProviderError>;
}

/// Providers available to the service, looked up by [`ProviderId`].
#[derive(Clone, Default)]
pub struct ProviderSet {
    providers: HashMap<ProviderId, Arc<dyn PriceProvider>>,
}

impl ProviderSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &ProvidersConfig) -> Result<Self> {
        let timeout = Duration::from_secs(config.request_timeout_secs);

        let yahoo = YahooFinanceProvider::new(&config.yahoo_base_url, timeout)?;
        let alpha_vantage = AlphaVantageProvider::new(
            &config.alpha_vantage_base_url,
            config.alpha_vantage_api_key.clone(),
            timeout,
            config.rate_limit_calls,
            Duration::from_secs(config.rate_limit_period_secs),
        )?;

        Ok(ProviderSet::new()
            .with(Arc::new(yahoo))
            .with(Arc::new(alpha_vantage)))
    }

    pub fn with(mut self, provider: Arc<dyn PriceProvider>) -> Self {
        self.providers.insert(provider.id(), provider);
        self
    }

    pub fn get(&self, id: ProviderId) -> Result<&Arc<dyn PriceProvider>> {
        self.providers
            .get(&id)
            .ok_or_else(|| Error::UnknownProvider(id.to_string()))
    }
}

pub(crate) fn http_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("market-pulse/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| Error::ConfigError(format!("HTTP client: {}", e)))
}
