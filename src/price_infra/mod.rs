pub mod connectors;
pub mod rate_limiter;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use crate::error::Error;
use crate::types::{Price, Symbol};

/// Closed set of supported price providers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderId {
    #[serde(rename = "yfinance")]
    YFinance,
    AlphaVantage,
}

impl ProviderId {
    pub const ALL: [ProviderId; 2] = [ProviderId::YFinance, ProviderId::AlphaVantage];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::YFinance => "yfinance",
            ProviderId::AlphaVantage => "alpha_vantage",
        }
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProviderId::ALL
            .into_iter()
            .find(|id| id.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::UnknownProvider(s.to_string()))
    }
}

/// Latest price as returned by a provider, before persistence.
#[derive(Clone, Debug)]
pub struct PriceQuote {
    pub symbol: Symbol,
    pub price: Price,
    pub timestamp: DateTime<Utc>,
    pub raw_payload: serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_ids_round_trip_through_their_names() {
        for id in ProviderId::ALL {
            assert_eq!(id.as_str().parse::<ProviderId>().unwrap(), id);
            let json = serde_json::to_string(&id).unwrap();
            assert_eq!(json, format!("\"{}\"", id.as_str()));
        }
        assert_eq!("YFINANCE".parse::<ProviderId>().unwrap(), ProviderId::YFinance);
    }

    #[test]
    fn unknown_provider_fails_at_the_boundary() {
        assert!(matches!("finnhub".parse::<ProviderId>(), Err(Error::UnknownProvider(_))));
        assert!(serde_json::from_str::<ProviderId>("\"finnhub\"").is_err());
    }
}
