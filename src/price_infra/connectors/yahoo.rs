use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use crate::error::{ProviderError, Result};
use crate::price_infra::connectors::{http_client, PriceProvider};
use crate::price_infra::{PriceQuote, ProviderId};
use crate::types::{Price, Symbol};

const PROVIDER: &str = "yfinance";

/// Yahoo Finance chart API. No key required, loosely rate limited upstream.
pub struct YahooFinanceProvider {
    client: Client,
    base_url: String,
}

impl YahooFinanceProvider {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        Ok(YahooFinanceProvider {
            client: http_client(timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl PriceProvider for YahooFinanceProvider {
    fn id(&self) -> ProviderId {
        ProviderId::YFinance
    }

    fn validate_symbol(&self, symbol: &Symbol) -> bool {
        let s = symbol.as_str();
        !s.is_empty()
            && s.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || ".-^=".contains(c))
    }

    async fn fetch_latest(&self, symbol: &Symbol) -> std::result::Result<PriceQuote, ProviderError> {
        let url = format!("{}/v8/finance/chart/{}", self.base_url, symbol);
        let response = self.client
            .get(&url)
            .query(&[("interval", "1d"), ("range", "1d")])
            .send()
            .await
            .map_err(|e| ProviderError::network(PROVIDER, e))?;

        match response.status() {
            status if status.is_success() => {}
            StatusCode::NOT_FOUND => {
                return Err(ProviderError::InvalidSymbol { provider: PROVIDER, symbol: symbol.to_string() });
            }
            StatusCode::TOO_MANY_REQUESTS => {
                return Err(ProviderError::RateLimited { provider: PROVIDER });
            }
            status => {
                return Err(ProviderError::HttpStatus { provider: PROVIDER, status: status.as_u16() });
            }
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ProviderError::MalformedResponse { provider: PROVIDER, message: e.to_string() })?;

        let envelope: ChartEnvelope = serde_json::from_value(body.clone())
            .map_err(|e| ProviderError::MalformedResponse { provider: PROVIDER, message: e.to_string() })?;

        if let Some(err) = envelope.chart.error {
            tracing::debug!(symbol = %symbol, code = %err.code, "Yahoo chart error");
            return Err(ProviderError::NoData { provider: PROVIDER, symbol: symbol.to_string() });
        }

        let result = envelope.chart.result
            .and_then(|mut results| if results.is_empty() { None } else { Some(results.remove(0)) })
            .ok_or_else(|| ProviderError::NoData { provider: PROVIDER, symbol: symbol.to_string() })?;

        // Prefer the live market price; fall back to the last close of the day.
        let price = result.meta.regular_market_price
            .or_else(|| result.last_close())
            .and_then(|p| Price::new(p).ok())
            .ok_or_else(|| ProviderError::NoData { provider: PROVIDER, symbol: symbol.to_string() })?;

        Ok(PriceQuote {
            symbol: symbol.clone(),
            price,
            timestamp: Utc::now(),
            raw_payload: body,
        })
    }
}

#[derive(Deserialize)]
struct ChartEnvelope {
    chart: Chart,
}

#[derive(Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(Deserialize)]
struct ChartError {
    code: String,
}

#[derive(Deserialize)]
struct ChartResult {
    meta: ChartMeta,
    #[serde(default)]
    indicators: Option<Indicators>,
}

impl ChartResult {
    fn last_close(&self) -> Option<f64> {
        self.indicators
            .as_ref()?
            .quote
            .first()?
            .close
            .iter()
            .rev()
            .find_map(|c| *c)
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    regular_market_price: Option<f64>,
}

#[derive(Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<QuoteSeries>,
}

#[derive(Deserialize)]
struct QuoteSeries {
    #[serde(default)]
    close: Vec<Option<f64>>,
}
