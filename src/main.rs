use anyhow::Context;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use market_pulse::api::create_router;
use market_pulse::app::App;
use market_pulse::config::AppConfig;
use market_pulse::event_log::{KafkaPricePublisher, MovingAverageConsumer};
use market_pulse::interfaces::PriceStore;
use market_pulse::observability::{metrics, tracing::init_tracing};
use market_pulse::price_infra::connectors::ProviderSet;
use market_pulse::shutdown;
use market_pulse::storage::InMemoryPriceStore;

const REAP_INTERVAL: Duration = Duration::from_secs(30);
const FLUSH_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env = std::env::var(market_pulse::ENV_VAR).unwrap_or_else(|_| "development".to_string());
    let config = AppConfig::load(&env).context("loading configuration")?;

    init_tracing(&config.logging)?;
    metrics::register_metrics()?;

    tracing::info!(env = %env, bind = %config.server.bind_address, "Starting {}", config.server.service_name);

    let store: Arc<dyn PriceStore> = Arc::new(InMemoryPriceStore::new());
    let publisher = Arc::new(KafkaPricePublisher::new(&config.kafka).context("creating Kafka producer")?);
    let providers = ProviderSet::from_config(&config.providers)?;

    let App { state, scheduler, processor } = App::assemble(&config, store, publisher.clone(), providers)?;

    let consumer = MovingAverageConsumer::new(&config.kafka, processor, config.moving_average.retry_backoff())
        .context("creating Kafka consumer")?;
    let consumer_shutdown = CancellationToken::new();
    let consumer_task = {
        let token = consumer_shutdown.clone();
        tokio::spawn(async move { consumer.run(token).await })
    };

    let reaper = {
        let scheduler = scheduler.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(REAP_INTERVAL);
            loop {
                ticker.tick().await;
                scheduler.reap_finished();
            }
        })
    };

    let listener = tokio::net::TcpListener::bind(&config.server.bind_address)
        .await
        .with_context(|| format!("binding {}", config.server.bind_address))?;

    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(shutdown::signal())
        .await
        .context("HTTP server")?;

    reaper.abort();
    scheduler.shutdown().await;
    if let Err(e) = publisher.flush(FLUSH_TIMEOUT) {
        tracing::warn!(error = %e, "Kafka flush incomplete");
    }

    consumer_shutdown.cancel();
    match consumer_task.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::error!(error = %e, "Moving average consumer failed"),
        Err(e) => tracing::error!(error = %e, "Moving average consumer task ended abnormally"),
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
