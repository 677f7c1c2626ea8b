use serde::{Deserialize, Serialize};
use std::time::Duration;

pub mod loader;

pub use loader::AppConfig;

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,
    pub service_name: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            bind_address: "0.0.0.0:8000".to_string(),
            service_name: "Market Data Service".to_string(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct KafkaConfig {
    pub brokers: String,
    pub topic: String,
    pub group_id: String,
    pub client_id: String,
    pub message_timeout_ms: u64,
}

impl Default for KafkaConfig {
    fn default() -> Self {
        KafkaConfig {
            brokers: "localhost:9092".to_string(),
            topic: "price-events".to_string(),
            group_id: "moving-average-consumer".to_string(),
            client_id: "market-data-producer".to_string(),
            message_timeout_ms: 5000,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct ProvidersConfig {
    pub default_provider: String,
    pub alpha_vantage_api_key: Option<String>,
    pub alpha_vantage_base_url: String,
    pub yahoo_base_url: String,
    pub request_timeout_secs: u64,
    // Alpha Vantage free tier: 5 calls per minute
    pub rate_limit_calls: usize,
    pub rate_limit_period_secs: u64,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        ProvidersConfig {
            default_provider: "yfinance".to_string(),
            alpha_vantage_api_key: None,
            alpha_vantage_base_url: "https://www.alphavantage.co/query".to_string(),
            yahoo_base_url: "https://query1.finance.yahoo.com".to_string(),
            request_timeout_secs: 10,
            rate_limit_calls: 5,
            rate_limit_period_secs: 60,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Pause after each symbol fetch inside a cycle.
    pub symbol_delay_ms: u64,
    /// How long `stop` waits for an in-flight fetch before aborting the task.
    pub stop_grace_secs: u64,
}

impl SchedulerConfig {
    pub fn symbol_delay(&self) -> Duration {
        Duration::from_millis(self.symbol_delay_ms)
    }

    pub fn stop_grace(&self) -> Duration {
        Duration::from_secs(self.stop_grace_secs)
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        SchedulerConfig {
            symbol_delay_ms: 1000,
            stop_grace_secs: 15,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct MovingAverageConfig {
    pub period: usize,
    pub retry_backoff_ms: u64,
}

impl MovingAverageConfig {
    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

impl Default for MovingAverageConfig {
    fn default() -> Self {
        MovingAverageConfig {
            period: 5,
            retry_backoff_ms: 1000,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive; `RUST_LOG` takes precedence when set.
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: "info,rdkafka=warn,hyper=warn,reqwest=warn".to_string(),
            format: LogFormat::Pretty,
        }
    }
}
