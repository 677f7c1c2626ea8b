use async_trait::async_trait;
use crate::error::Result;
use crate::storage::models::{
    JobStatus, MovingAverageRecord, NewMovingAverage, NewPricePoint, NewRawRecord, PollingJob,
    PricePoint, RawPriceRecord,
};
use crate::types::{JobId, Symbol};

/// Durable state shared by the scheduler, the API and the moving-average consumer.
///
/// Implementations must tolerate concurrent use from many polling jobs.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PriceStore: Send + Sync {
    /// Returns `false`, writing nothing, when the job id is already taken.
    async fn insert_job(&self, job: PollingJob) -> Result<bool>;

    async fn job(&self, job_id: &JobId) -> Result<Option<PollingJob>>;

    /// Returns `false` when no such job exists.
    async fn set_job_status(&self, job_id: &JobId, status: JobStatus) -> Result<bool>;

    /// Stores the raw payload and the derived price point in one transaction.
    async fn record_observation(
        &self,
        raw: NewRawRecord,
        point: NewPricePoint,
    ) -> Result<(RawPriceRecord, PricePoint)>;

    /// Newest first: timestamp descending, then insertion order descending.
    async fn recent_price_points(&self, symbol: &Symbol, limit: usize) -> Result<Vec<PricePoint>>;

    async fn insert_moving_average(&self, record: NewMovingAverage) -> Result<MovingAverageRecord>;

    async fn latest_moving_average(&self, symbol: &Symbol) -> Result<Option<MovingAverageRecord>>;

    /// Oldest first.
    async fn moving_averages(&self, symbol: &Symbol) -> Result<Vec<MovingAverageRecord>>;
}
