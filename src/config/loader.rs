use crate::config::*;
use crate::error::{Error, Result};
use crate::price_infra::ProviderId;
use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub kafka: KafkaConfig,
    pub providers: ProvidersConfig,
    pub scheduler: SchedulerConfig,
    pub moving_average: MovingAverageConfig,
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Layers `config/default`, `config/{env}` and `MARKET_PULSE__*` variables.
    pub fn load(env: &str) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(Environment::with_prefix("MARKET_PULSE").separator("__"))
            .build()
            .map_err(|e| Error::ConfigError(e.to_string()))?;

        Self::from_config(config)
    }

    pub fn from_toml(toml: &str) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()
            .map_err(|e| Error::ConfigError(e.to_string()))?;

        Self::from_config(config)
    }

    fn from_config(config: Config) -> Result<Self> {
        let app: AppConfig = config.try_deserialize()
            .map_err(|e| Error::ConfigError(e.to_string()))?;
        app.validate()?;
        Ok(app)
    }

    pub fn validate(&self) -> Result<()> {
        if self.moving_average.period == 0 {
            return Err(Error::ConfigError("moving_average.period must be at least 1".to_string()));
        }
        self.default_provider()?;
        Ok(())
    }

    pub fn default_provider(&self) -> Result<ProviderId> {
        self.providers.default_provider.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_source_yields_defaults() {
        let config = AppConfig::from_toml("").unwrap();
        assert_eq!(config.kafka.topic, "price-events");
        assert_eq!(config.moving_average.period, 5);
        assert_eq!(config.scheduler.symbol_delay_ms, 1000);
        assert_eq!(config.default_provider().unwrap(), ProviderId::YFinance);
    }

    #[test]
    fn sections_override_defaults() {
        let config = AppConfig::from_toml(
            r#"
            [kafka]
            brokers = "kafka-1:9092,kafka-2:9092"

            [providers]
            default_provider = "alpha_vantage"
            alpha_vantage_api_key = "secret"

            [moving_average]
            period = 20

            [logging]
            format = "json"
            "#,
        )
        .unwrap();

        assert_eq!(config.kafka.brokers, "kafka-1:9092,kafka-2:9092");
        assert_eq!(config.kafka.group_id, "moving-average-consumer");
        assert_eq!(config.default_provider().unwrap(), ProviderId::AlphaVantage);
        assert_eq!(config.providers.alpha_vantage_api_key.as_deref(), Some("secret"));
        assert_eq!(config.moving_average.period, 20);
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn rejects_zero_period_and_unknown_provider() {
        assert!(matches!(
            AppConfig::from_toml("[moving_average]\nperiod = 0"),
            Err(Error::ConfigError(_))
        ));
        assert!(matches!(
            AppConfig::from_toml("[providers]\ndefault_provider = \"finnhub\""),
            Err(Error::UnknownProvider(_))
        ));
    }
}
