use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use crate::price_infra::ProviderId;
use crate::scheduler::job::JobSpec;
use crate::types::{JobId, Price, RawRecordId, Symbol};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Accepted,
    Running,
    Cancelled,
    Stopped,
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobStatus::Accepted => "accepted",
            JobStatus::Running => "running",
            JobStatus::Cancelled => "cancelled",
            JobStatus::Stopped => "stopped",
        };
        f.write_str(s)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PollingJob {
    pub job_id: JobId,
    #[serde(flatten)]
    pub spec: JobSpec,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl PollingJob {
    pub fn accepted(job_id: JobId, spec: JobSpec) -> Self {
        PollingJob {
            job_id,
            spec,
            status: JobStatus::Accepted,
            created_at: Utc::now(),
            updated_at: None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct NewRawRecord {
    pub symbol: Symbol,
    pub provider: ProviderId,
    pub payload: serde_json::Value,
}

#[derive(Clone, Debug, Serialize)]
pub struct RawPriceRecord {
    pub id: RawRecordId,
    pub symbol: Symbol,
    pub provider: ProviderId,
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug)]
pub struct NewPricePoint {
    pub symbol: Symbol,
    pub price: Price,
    pub timestamp: DateTime<Utc>,
    pub provider: ProviderId,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PricePoint {
    /// Insertion order; breaks timestamp ties in the moving-average window.
    pub id: u64,
    pub symbol: Symbol,
    pub price: Price,
    pub timestamp: DateTime<Utc>,
    pub provider: ProviderId,
    pub raw_record_id: Option<RawRecordId>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug)]
pub struct NewMovingAverage {
    pub symbol: Symbol,
    pub average_price: f64,
    pub period: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MovingAverageRecord {
    pub id: u64,
    pub symbol: Symbol,
    pub average_price: f64,
    pub period: usize,
    pub calculated_at: DateTime<Utc>,
}
