use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use crate::error::{Error, Result};
use crate::types::{Price, RawRecordId, Symbol};

/// A successful fetch, as carried on the price-events topic.
///
/// Wire format (JSON, keyed by symbol):
/// `{"symbol": "AAPL", "price": 187.2, "timestamp": "...", "source": "yfinance", "raw_response_id": "..."|null}`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PriceObservedEvent {
    pub symbol: Symbol,
    pub price: Price,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub timestamp: DateTime<Utc>,
    pub source: String,
    #[serde(default)]
    pub raw_response_id: Option<RawRecordId>,
}

impl PriceObservedEvent {
    pub fn to_json(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| Error::SerializationError(e.to_string()))
    }

    pub fn from_json(payload: &[u8]) -> Result<Self> {
        serde_json::from_slice(payload).map_err(|e| Error::MalformedEvent(e.to_string()))
    }

    /// Partition key: all events for a symbol land on the same partition.
    pub fn key(&self) -> &str {
        self.symbol.as_str()
    }
}

// Older producers emitted naive ISO-8601 timestamps with no offset; those are UTC.
fn deserialize_timestamp<'de, D>(deserializer: D) -> std::result::Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    if let Ok(ts) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(serde::de::Error::custom)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn encodes_wire_field_names() {
        let event = PriceObservedEvent {
            symbol: Symbol::parse("AAPL").unwrap(),
            price: Price::new(187.5).unwrap(),
            timestamp: Utc.with_ymd_and_hms(2024, 3, 1, 14, 30, 0).unwrap(),
            source: "yfinance".to_string(),
            raw_response_id: None,
        };
        let value: serde_json::Value = serde_json::from_slice(&event.to_json().unwrap()).unwrap();
        assert_eq!(value["symbol"], "AAPL");
        assert_eq!(value["price"], 187.5);
        assert_eq!(value["source"], "yfinance");
        assert!(value["raw_response_id"].is_null());
        assert!(value["timestamp"].as_str().unwrap().starts_with("2024-03-01T14:30:00"));
    }

    #[test]
    fn accepts_naive_timestamps_as_utc() {
        let payload = br#"{"symbol":"msft","price":410.1,"timestamp":"2024-03-01T14:30:00.123456","source":"alpha_vantage","raw_response_id":"6f1c2a9e-3b5d-4c1e-9a7f-2d8e4b6c1a30"}"#;
        let event = PriceObservedEvent::from_json(payload).unwrap();
        assert_eq!(event.symbol.as_str(), "MSFT");
        assert_eq!(event.timestamp.timestamp(), Utc.with_ymd_and_hms(2024, 3, 1, 14, 30, 0).unwrap().timestamp());
        assert!(event.raw_response_id.is_some());
    }

    #[test]
    fn rejects_malformed_payloads() {
        assert!(matches!(PriceObservedEvent::from_json(b"not json"), Err(Error::MalformedEvent(_))));
        let negative = br#"{"symbol":"AAPL","price":-1,"timestamp":"2024-03-01T14:30:00Z","source":"yfinance"}"#;
        assert!(matches!(PriceObservedEvent::from_json(negative), Err(Error::MalformedEvent(_))));
        let missing_symbol = br#"{"price":1.0,"timestamp":"2024-03-01T14:30:00Z","source":"yfinance"}"#;
        assert!(PriceObservedEvent::from_json(missing_symbol).is_err());
    }
}
