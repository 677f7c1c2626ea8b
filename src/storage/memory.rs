use async_trait::async_trait;
use chrono::Utc;
use std::cmp::Reverse;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use tokio::sync::RwLock;
use crate::error::Result;
use crate::interfaces::price_store::PriceStore;
use crate::storage::models::{
    JobStatus, MovingAverageRecord, NewMovingAverage, NewPricePoint, NewRawRecord, PollingJob,
    PricePoint, RawPriceRecord,
};
use crate::types::{JobId, RawRecordId, Symbol};

/// Process-local [`PriceStore`]. Every write happens under one lock, so a
/// multi-row write is observed all-or-nothing.
#[derive(Default)]
pub struct InMemoryPriceStore {
    tables: RwLock<Tables>,
}

#[derive(Default)]
struct Tables {
    jobs: HashMap<JobId, PollingJob>,
    raw_records: HashMap<RawRecordId, RawPriceRecord>,
    price_points: HashMap<Symbol, Vec<PricePoint>>,
    moving_averages: HashMap<Symbol, Vec<MovingAverageRecord>>,
    next_point_id: u64,
    next_average_id: u64,
}

impl InMemoryPriceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn raw_record(&self, id: RawRecordId) -> Option<RawPriceRecord> {
        self.tables.read().await.raw_records.get(&id).cloned()
    }

    pub async fn price_point_count(&self, symbol: &Symbol) -> usize {
        self.tables.read().await.price_points.get(symbol).map_or(0, Vec::len)
    }
}

#[async_trait]
impl PriceStore for InMemoryPriceStore {
    async fn insert_job(&self, job: PollingJob) -> Result<bool> {
        match self.tables.write().await.jobs.entry(job.job_id.clone()) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                slot.insert(job);
                Ok(true)
            }
        }
    }

    async fn job(&self, job_id: &JobId) -> Result<Option<PollingJob>> {
        Ok(self.tables.read().await.jobs.get(job_id).cloned())
    }

    async fn set_job_status(&self, job_id: &JobId, status: JobStatus) -> Result<bool> {
        let mut tables = self.tables.write().await;
        match tables.jobs.get_mut(job_id) {
            Some(job) => {
                job.status = status;
                job.updated_at = Some(Utc::now());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn record_observation(
        &self,
        raw: NewRawRecord,
        point: NewPricePoint,
    ) -> Result<(RawPriceRecord, PricePoint)> {
        let now = Utc::now();
        let mut tables = self.tables.write().await;

        let raw = RawPriceRecord {
            id: RawRecordId::new(),
            symbol: raw.symbol,
            provider: raw.provider,
            payload: raw.payload,
            created_at: now,
        };

        tables.next_point_id += 1;
        let point = PricePoint {
            id: tables.next_point_id,
            symbol: point.symbol,
            price: point.price,
            timestamp: point.timestamp,
            provider: point.provider,
            raw_record_id: Some(raw.id),
            created_at: now,
        };

        tables.raw_records.insert(raw.id, raw.clone());
        tables.price_points
            .entry(point.symbol.clone())
            .or_default()
            .push(point.clone());

        Ok((raw, point))
    }

    async fn recent_price_points(&self, symbol: &Symbol, limit: usize) -> Result<Vec<PricePoint>> {
        let tables = self.tables.read().await;
        let mut points = tables.price_points.get(symbol).cloned().unwrap_or_default();
        points.sort_by_key(|p| Reverse((p.timestamp, p.id)));
        points.truncate(limit);
        Ok(points)
    }

    async fn insert_moving_average(&self, record: NewMovingAverage) -> Result<MovingAverageRecord> {
        let mut tables = self.tables.write().await;
        tables.next_average_id += 1;
        let record = MovingAverageRecord {
            id: tables.next_average_id,
            symbol: record.symbol,
            average_price: record.average_price,
            period: record.period,
            calculated_at: Utc::now(),
        };
        tables.moving_averages
            .entry(record.symbol.clone())
            .or_default()
            .push(record.clone());
        Ok(record)
    }

    async fn latest_moving_average(&self, symbol: &Symbol) -> Result<Option<MovingAverageRecord>> {
        let tables = self.tables.read().await;
        Ok(tables.moving_averages.get(symbol).and_then(|v| v.last()).cloned())
    }

    async fn moving_averages(&self, symbol: &Symbol) -> Result<Vec<MovingAverageRecord>> {
        let tables = self.tables.read().await;
        Ok(tables.moving_averages.get(symbol).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::price_infra::ProviderId;
    use crate::scheduler::job::JobSpec;
    use crate::types::Price;
    use chrono::{DateTime, TimeZone};

    fn sym(s: &str) -> Symbol {
        Symbol::parse(s).unwrap()
    }

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    async fn observe(store: &InMemoryPriceStore, symbol: &str, price: f64, ts: DateTime<Utc>) -> PricePoint {
        let (_, point) = store
            .record_observation(
                NewRawRecord { symbol: sym(symbol), provider: ProviderId::YFinance, payload: serde_json::json!({ "p": price }) },
                NewPricePoint { symbol: sym(symbol), price: Price::new(price).unwrap(), timestamp: ts, provider: ProviderId::YFinance },
            )
            .await
            .unwrap();
        point
    }

    #[tokio::test]
    async fn observation_links_point_to_raw_record() {
        let store = InMemoryPriceStore::new();
        let point = observe(&store, "AAPL", 101.0, at(0)).await;

        let raw = store.raw_record(point.raw_record_id.unwrap()).await.unwrap();
        assert_eq!(raw.symbol, sym("AAPL"));
        assert_eq!(raw.payload["p"], 101.0);
        assert_eq!(store.price_point_count(&sym("AAPL")).await, 1);
    }

    #[tokio::test]
    async fn recent_points_newest_first_with_id_tiebreak() {
        let store = InMemoryPriceStore::new();
        let a = observe(&store, "AAPL", 1.0, at(10)).await;
        let b = observe(&store, "AAPL", 2.0, at(30)).await;
        let c = observe(&store, "AAPL", 3.0, at(30)).await;
        let _ = observe(&store, "MSFT", 9.0, at(99)).await;
        let d = observe(&store, "AAPL", 4.0, at(20)).await;

        let ids: Vec<u64> = store
            .recent_price_points(&sym("AAPL"), 10)
            .await
            .unwrap()
            .iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(ids, vec![c.id, b.id, d.id, a.id]);

        assert_eq!(store.recent_price_points(&sym("AAPL"), 2).await.unwrap().len(), 2);
        assert!(store.recent_price_points(&sym("GOOG"), 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn job_status_updates_only_known_jobs() {
        let store = InMemoryPriceStore::new();
        let spec = JobSpec::new(["AAPL"], 30, ProviderId::YFinance).unwrap();
        store.insert_job(PollingJob::accepted(JobId::from("job1"), spec)).await.unwrap();

        assert!(store.set_job_status(&JobId::from("job1"), JobStatus::Running).await.unwrap());
        assert!(!store.set_job_status(&JobId::from("ghost"), JobStatus::Running).await.unwrap());

        let job = store.job(&JobId::from("job1")).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Running);
        assert!(job.updated_at.is_some());
        assert!(store.job(&JobId::from("ghost")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn taken_job_id_is_not_overwritten() {
        let store = InMemoryPriceStore::new();
        let live = JobSpec::new(["AAPL"], 30, ProviderId::YFinance).unwrap();
        let other = JobSpec::new(["MSFT"], 60, ProviderId::YFinance).unwrap();

        assert!(store.insert_job(PollingJob::accepted(JobId::from("poll_1"), live)).await.unwrap());
        store.set_job_status(&JobId::from("poll_1"), JobStatus::Running).await.unwrap();
        assert!(!store.insert_job(PollingJob::accepted(JobId::from("poll_1"), other)).await.unwrap());

        let job = store.job(&JobId::from("poll_1")).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Running);
        assert_eq!(job.spec.symbols, vec![sym("AAPL")]);
    }

    #[tokio::test]
    async fn moving_averages_append_in_order() {
        let store = InMemoryPriceStore::new();
        for avg in [10.0, 11.0] {
            store
                .insert_moving_average(NewMovingAverage { symbol: sym("AAPL"), average_price: avg, period: 5 })
                .await
                .unwrap();
        }
        let all = store.moving_averages(&sym("AAPL")).await.unwrap();
        assert_eq!(all.iter().map(|r| r.average_price).collect::<Vec<_>>(), vec![10.0, 11.0]);
        assert_eq!(store.latest_moving_average(&sym("AAPL")).await.unwrap().unwrap().average_price, 11.0);
        assert!(store.latest_moving_average(&sym("MSFT")).await.unwrap().is_none());
    }
}
