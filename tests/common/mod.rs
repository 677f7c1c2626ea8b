#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use market_pulse::config::SchedulerConfig;
use market_pulse::error::{Error, ProviderError, Result};
use market_pulse::events::PriceObservedEvent;
use market_pulse::interfaces::{PricePublisher, PriceStore};
use market_pulse::moving_average::{MovingAverageProcessor, Outcome};
use market_pulse::price_infra::connectors::{PriceProvider, ProviderSet};
use market_pulse::price_infra::{PriceQuote, ProviderId};
use market_pulse::scheduler::PollingScheduler;
use market_pulse::service::MarketDataService;
use market_pulse::storage::models::{
    JobStatus, MovingAverageRecord, NewMovingAverage, NewPricePoint, NewRawRecord, PollingJob,
    PricePoint, RawPriceRecord,
};
use market_pulse::storage::InMemoryPriceStore;
use market_pulse::types::{JobId, Price, Symbol};

pub fn sym(s: &str) -> Symbol {
    Symbol::parse(s).unwrap()
}

pub fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 14, 30, 0).unwrap()
}

/// Deterministic provider: the n-th call for a symbol returns `base + n`
/// stamped `epoch + n * 30s`. Selected calls can fail, panic or hang.
#[derive(Default)]
pub struct ScriptedProvider {
    base: HashMap<String, f64>,
    failures: HashSet<(String, usize)>,
    panics: HashSet<(String, usize)>,
    hang: bool,
    calls: Mutex<HashMap<String, usize>>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn price(mut self, symbol: &str, base: f64) -> Self {
        self.base.insert(symbol.to_string(), base);
        self
    }

    /// `call` is 1-based.
    pub fn fail_on(mut self, symbol: &str, call: usize) -> Self {
        self.failures.insert((symbol.to_string(), call));
        self
    }

    pub fn panic_on(mut self, symbol: &str, call: usize) -> Self {
        self.panics.insert((symbol.to_string(), call));
        self
    }

    pub fn hanging(mut self) -> Self {
        self.hang = true;
        self
    }

    pub fn calls(&self, symbol: &str) -> usize {
        self.calls.lock().unwrap().get(symbol).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }

    /// Price returned by the given 1-based call.
    pub fn price_at(&self, symbol: &str, call: usize) -> f64 {
        self.base.get(symbol).copied().unwrap_or(100.0) + call as f64
    }
}

#[async_trait]
impl PriceProvider for ScriptedProvider {
    fn id(&self) -> ProviderId {
        ProviderId::YFinance
    }

    fn validate_symbol(&self, symbol: &Symbol) -> bool {
        symbol.as_str().chars().all(|c| c.is_ascii_alphabetic())
    }

    async fn fetch_latest(&self, symbol: &Symbol) -> std::result::Result<PriceQuote, ProviderError> {
        let call = {
            let mut calls = self.calls.lock().unwrap();
            let n = calls.entry(symbol.to_string()).or_insert(0);
            *n += 1;
            *n
        };

        if self.hang {
            std::future::pending::<()>().await;
        }
        let key = (symbol.to_string(), call);
        if self.panics.contains(&key) {
            panic!("scripted panic for {} call {}", symbol, call);
        }
        if self.failures.contains(&key) {
            return Err(ProviderError::Network { provider: "yfinance", message: "scripted failure".into() });
        }

        let price = self.price_at(symbol.as_str(), call);
        Ok(PriceQuote {
            symbol: symbol.clone(),
            price: Price::new(price).unwrap(),
            timestamp: epoch() + ChronoDuration::seconds(30 * call as i64),
            raw_payload: serde_json::json!({ "symbol": symbol.as_str(), "price": price }),
        })
    }
}

/// Keeps every published event. With a processor attached, each event is
/// also consumed on the spot, the way the stream consumer would see it.
#[derive(Default)]
pub struct RecordingPublisher {
    events: Mutex<Vec<PriceObservedEvent>>,
    outcomes: Mutex<Vec<Outcome>>,
    processor: Option<MovingAverageProcessor>,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn streaming_to(processor: MovingAverageProcessor) -> Self {
        RecordingPublisher { processor: Some(processor), ..Self::default() }
    }

    pub fn events(&self) -> Vec<PriceObservedEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn outcomes(&self) -> Vec<Outcome> {
        self.outcomes.lock().unwrap().clone()
    }
}

#[async_trait]
impl PricePublisher for RecordingPublisher {
    async fn publish(&self, event: &PriceObservedEvent) -> Result<()> {
        self.events.lock().unwrap().push(event.clone());
        if let Some(processor) = &self.processor {
            let outcome = processor.on_event(event).await?;
            self.outcomes.lock().unwrap().push(outcome);
        }
        Ok(())
    }
}

/// Wraps an in-memory store and fails selected writes with `Persistence`.
#[derive(Default)]
pub struct FaultyStore {
    inner: Arc<InMemoryPriceStore>,
    failed_observations: HashSet<(String, usize)>,
    observations: Mutex<HashMap<String, usize>>,
    averages_fail: bool,
    taken_ids: Mutex<usize>,
}

impl FaultyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// `call` counts `record_observation` attempts for the symbol, 1-based.
    pub fn fail_observation(mut self, symbol: &str, call: usize) -> Self {
        self.failed_observations.insert((symbol.to_string(), call));
        self
    }

    pub fn fail_averages(mut self) -> Self {
        self.averages_fail = true;
        self
    }

    /// The next `n` job inserts report their id as already taken.
    pub fn taken_ids(self, n: usize) -> Self {
        *self.taken_ids.lock().unwrap() = n;
        self
    }

    pub fn inner(&self) -> Arc<InMemoryPriceStore> {
        self.inner.clone()
    }
}

fn unavailable() -> Error {
    Error::Persistence("database unavailable".to_string())
}

#[async_trait]
impl PriceStore for FaultyStore {
    async fn insert_job(&self, job: PollingJob) -> Result<bool> {
        {
            let mut taken = self.taken_ids.lock().unwrap();
            if *taken > 0 {
                *taken -= 1;
                return Ok(false);
            }
        }
        self.inner.insert_job(job).await
    }

    async fn job(&self, job_id: &JobId) -> Result<Option<PollingJob>> {
        self.inner.job(job_id).await
    }

    async fn set_job_status(&self, job_id: &JobId, status: JobStatus) -> Result<bool> {
        self.inner.set_job_status(job_id, status).await
    }

    async fn record_observation(&self, raw: NewRawRecord, point: NewPricePoint) -> Result<(RawPriceRecord, PricePoint)> {
        let call = {
            let mut calls = self.observations.lock().unwrap();
            let n = calls.entry(point.symbol.to_string()).or_insert(0);
            *n += 1;
            *n
        };
        if self.failed_observations.contains(&(point.symbol.to_string(), call)) {
            return Err(unavailable());
        }
        self.inner.record_observation(raw, point).await
    }

    async fn recent_price_points(&self, symbol: &Symbol, limit: usize) -> Result<Vec<PricePoint>> {
        self.inner.recent_price_points(symbol, limit).await
    }

    async fn insert_moving_average(&self, record: NewMovingAverage) -> Result<MovingAverageRecord> {
        if self.averages_fail {
            return Err(unavailable());
        }
        self.inner.insert_moving_average(record).await
    }

    async fn latest_moving_average(&self, symbol: &Symbol) -> Result<Option<MovingAverageRecord>> {
        self.inner.latest_moving_average(symbol).await
    }

    async fn moving_averages(&self, symbol: &Symbol) -> Result<Vec<MovingAverageRecord>> {
        self.inner.moving_averages(symbol).await
    }
}

pub struct Harness {
    /// Backing tables, for assertions.
    pub store: Arc<InMemoryPriceStore>,
    /// What the service, scheduler and API write through.
    pub backing: Arc<dyn PriceStore>,
    pub provider: Arc<ScriptedProvider>,
    pub publisher: Arc<RecordingPublisher>,
    pub service: Arc<MarketDataService>,
    pub scheduler: Arc<PollingScheduler>,
}

impl Harness {
    pub fn new(provider: ScriptedProvider) -> Self {
        let store = Arc::new(InMemoryPriceStore::new());
        Self::assemble(store.clone(), store, provider, RecordingPublisher::new())
    }

    /// Writes go through `faulty`; `store` still exposes its tables.
    pub fn over(faulty: FaultyStore, provider: ScriptedProvider) -> Self {
        let store = faulty.inner();
        Self::assemble(store, Arc::new(faulty), provider, RecordingPublisher::new())
    }

    /// Published events run through a moving-average processor of `period`.
    pub fn streaming(provider: ScriptedProvider, period: usize) -> Self {
        let store = Arc::new(InMemoryPriceStore::new());
        let processor = MovingAverageProcessor::new(store.clone(), period).unwrap();
        Self::assemble(store.clone(), store, provider, RecordingPublisher::streaming_to(processor))
    }

    fn assemble(
        store: Arc<InMemoryPriceStore>,
        backing: Arc<dyn PriceStore>,
        provider: ScriptedProvider,
        publisher: RecordingPublisher,
    ) -> Self {
        let provider = Arc::new(provider);
        let publisher = Arc::new(publisher);
        let providers = ProviderSet::new().with(provider.clone());
        let service = Arc::new(MarketDataService::new(providers, backing.clone(), publisher.clone()));
        let scheduler = Arc::new(PollingScheduler::new(service.clone(), &SchedulerConfig::default()));
        Harness { store, backing, provider, publisher, service, scheduler }
    }

    pub fn providers(&self) -> ProviderSet {
        self.service.providers().clone()
    }
}
