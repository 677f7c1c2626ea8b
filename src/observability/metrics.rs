use lazy_static::lazy_static;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use crate::error::{Error, Result};

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    // Fetch metrics
    pub static ref PRICE_FETCHES: IntCounterVec = IntCounterVec::new(
        Opts::new("price_fetches_total", "Provider fetch attempts by outcome"),
        &["provider", "outcome"]
    ).expect("valid metric definition");

    pub static ref PRICE_FETCH_LATENCY: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "price_fetch_latency_seconds",
            "Provider fetch latency"
        ).buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
        &["provider"]
    ).expect("valid metric definition");

    // Event stream metrics
    pub static ref PRICE_EVENTS_PUBLISHED: IntCounter = IntCounter::new(
        "price_events_published_total",
        "Price events handed to the event stream"
    ).expect("valid metric definition");

    pub static ref PRICE_EVENT_PUBLISH_FAILURES: IntCounter = IntCounter::new(
        "price_event_publish_failures_total",
        "Price events that could not be published (best-effort delivery)"
    ).expect("valid metric definition");

    // Scheduler metrics
    pub static ref POLLING_JOBS_ACTIVE: IntGauge = IntGauge::new(
        "polling_jobs_active",
        "Polling jobs with a live execution context"
    ).expect("valid metric definition");

    // Consumer metrics
    pub static ref MOVING_AVERAGES_RECORDED: IntCounter = IntCounter::new(
        "moving_averages_recorded_total",
        "Moving-average records written"
    ).expect("valid metric definition");

    pub static ref PRICE_EVENTS_MALFORMED: IntCounter = IntCounter::new(
        "price_events_malformed_total",
        "Consumed price events skipped as undecodable"
    ).expect("valid metric definition");

    pub static ref PRICE_EVENTS_INSUFFICIENT_DATA: IntCounter = IntCounter::new(
        "price_events_insufficient_data_total",
        "Consumed price events with too few points for a moving average"
    ).expect("valid metric definition");
}

/// Registers every collector with [`REGISTRY`]. Safe to call more than once.
pub fn register_metrics() -> Result<()> {
    let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(PRICE_FETCHES.clone()),
        Box::new(PRICE_FETCH_LATENCY.clone()),
        Box::new(PRICE_EVENTS_PUBLISHED.clone()),
        Box::new(PRICE_EVENT_PUBLISH_FAILURES.clone()),
        Box::new(POLLING_JOBS_ACTIVE.clone()),
        Box::new(MOVING_AVERAGES_RECORDED.clone()),
        Box::new(PRICE_EVENTS_MALFORMED.clone()),
        Box::new(PRICE_EVENTS_INSUFFICIENT_DATA.clone()),
    ];

    for collector in collectors {
        match REGISTRY.register(collector) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(Error::ConfigError(format!("metrics registration: {}", e))),
        }
    }
    Ok(())
}

/// Prometheus text exposition of [`REGISTRY`].
pub fn render() -> Result<String> {
    let mut buffer = Vec::new();
    TextEncoder::new()
        .encode(&REGISTRY.gather(), &mut buffer)
        .map_err(|e| Error::SerializationError(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| Error::SerializationError(e.to_string()))
}
