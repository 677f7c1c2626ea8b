//! Alpha Vantage `GLOBAL_QUOTE` provider.
//!
//! The free tier allows 5 calls per minute. Calls over the local budget are
//! refused before they reach the network.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;
use crate::error::{ProviderError, Result};
use crate::price_infra::connectors::{http_client, PriceProvider};
use crate::price_infra::rate_limiter::RateLimiter;
use crate::price_infra::{PriceQuote, ProviderId};
use crate::types::{Price, Symbol};

const PROVIDER: &str = "alpha_vantage";

pub struct AlphaVantageProvider {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    limiter: Mutex<RateLimiter>,
}

impl AlphaVantageProvider {
    pub fn new(
        base_url: &str,
        api_key: Option<String>,
        timeout: Duration,
        max_calls: usize,
        period: Duration,
    ) -> Result<Self> {
        Ok(AlphaVantageProvider {
            client: http_client(timeout)?,
            base_url: base_url.to_string(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            limiter: Mutex::new(RateLimiter::new(max_calls, period)),
        })
    }
}

#[async_trait]
impl PriceProvider for AlphaVantageProvider {
    fn id(&self) -> ProviderId {
        ProviderId::AlphaVantage
    }

    fn validate_symbol(&self, symbol: &Symbol) -> bool {
        let s = symbol.as_str();
        (1..=5).contains(&s.len()) && s.chars().all(|c| c.is_ascii_uppercase())
    }

    async fn fetch_latest(&self, symbol: &Symbol) -> std::result::Result<PriceQuote, ProviderError> {
        let api_key = self.api_key.as_deref().ok_or_else(|| ProviderError::NotConfigured {
            provider: PROVIDER,
            message: "API key missing (providers.alpha_vantage_api_key)".to_string(),
        })?;

        if !self.limiter.lock().await.check_and_record() {
            return Err(ProviderError::RateLimited { provider: PROVIDER });
        }

        let body: serde_json::Value = self.client
            .get(&self.base_url)
            .query(&[("function", "GLOBAL_QUOTE"), ("symbol", symbol.as_str()), ("apikey", api_key)])
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| ProviderError::network(PROVIDER, e))?
            .json()
            .await
            .map_err(|e| ProviderError::MalformedResponse { provider: PROVIDER, message: e.to_string() })?;

        let response: GlobalQuoteResponse = serde_json::from_value(body.clone())
            .map_err(|e| ProviderError::MalformedResponse { provider: PROVIDER, message: e.to_string() })?;

        if let Some(note) = response.note.or(response.information) {
            tracing::warn!(symbol = %symbol, %note, "Alpha Vantage API limit");
            return Err(ProviderError::RateLimited { provider: PROVIDER });
        }

        if response.error_message.is_some() {
            return Err(ProviderError::InvalidSymbol { provider: PROVIDER, symbol: symbol.to_string() });
        }

        let quote = response.global_quote
            .filter(|q| !q.is_empty())
            .ok_or_else(|| ProviderError::NoData { provider: PROVIDER, symbol: symbol.to_string() })?;

        let price = quote.get("05. price")
            .and_then(|p| p.trim().parse::<f64>().ok())
            .and_then(|p| Price::new(p).ok())
            .ok_or_else(|| ProviderError::NoData { provider: PROVIDER, symbol: symbol.to_string() })?;

        let quoted_symbol = quote.get("01. symbol")
            .and_then(|s| Symbol::parse(s).ok())
            .unwrap_or_else(|| symbol.clone());

        Ok(PriceQuote {
            symbol: quoted_symbol,
            price,
            timestamp: Utc::now(),
            raw_payload: body,
        })
    }
}

#[derive(Deserialize)]
struct GlobalQuoteResponse {
    #[serde(rename = "Global Quote")]
    global_quote: Option<HashMap<String, String>>,
    #[serde(rename = "Error Message")]
    error_message: Option<String>,
    #[serde(rename = "Note")]
    note: Option<String>,
    #[serde(rename = "Information")]
    information: Option<String>,
}
