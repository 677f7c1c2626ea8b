pub mod api;
pub mod app;
pub mod config;
pub mod error;
pub mod event_log;
pub mod events;
pub mod interfaces;
pub mod moving_average;
pub mod observability;
pub mod price_infra;
pub mod scheduler;
pub mod service;
pub mod shutdown;
pub mod storage;
pub mod types;

// Environment selecting `config/{env}.toml`
pub const ENV_VAR: &str = "MARKET_PULSE_ENV";
