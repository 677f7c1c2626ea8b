use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};
use crate::error::{Error, ProviderError, Result};
use crate::interfaces::PriceStore;
use crate::price_infra::connectors::ProviderSet;
use crate::price_infra::ProviderId;
use crate::scheduler::job::JobSpec;
use crate::scheduler::registry::PollingScheduler;
use crate::storage::{JobStatus, PollingJob};
use crate::types::JobId;

const ID_ATTEMPTS: usize = 5;

/// Operator request for a new polling job, before normalization.
#[derive(Clone, Debug, Deserialize)]
pub struct PollRequest {
    pub symbols: Vec<String>,
    pub interval: u64,
    #[serde(default = "default_request_provider")]
    pub provider: ProviderId,
}

fn default_request_provider() -> ProviderId {
    ProviderId::YFinance
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StopJobResponse {
    pub stopped: bool,
}

/// Job lifecycle operations exposed to operators.
pub struct JobControl {
    scheduler: Arc<PollingScheduler>,
    store: Arc<dyn PriceStore>,
    providers: ProviderSet,
}

impl JobControl {
    pub fn new(scheduler: Arc<PollingScheduler>, store: Arc<dyn PriceStore>, providers: ProviderSet) -> Self {
        JobControl { scheduler, store, providers }
    }

    pub fn scheduler(&self) -> &Arc<PollingScheduler> {
        &self.scheduler
    }

    pub async fn create_job(&self, request: PollRequest) -> Result<PollingJob> {
        let spec = JobSpec::new(&request.symbols, request.interval, request.provider)?;

        let provider = self.providers.get(spec.provider)?;
        if let Some(symbol) = spec.symbols.iter().find(|s| !provider.validate_symbol(s)) {
            return Err(ProviderError::InvalidSymbol {
                provider: spec.provider.as_str(),
                symbol: symbol.to_string(),
            }
            .into());
        }

        let job = self.register(spec.clone()).await?;

        if let Err(e) = self.scheduler.start(job.job_id.clone(), spec) {
            if let Err(mark_err) = self.store.set_job_status(&job.job_id, JobStatus::Stopped).await {
                error!(job_id = %job.job_id, error = %mark_err, "Failed to mark unstarted job stopped");
            }
            return Err(e);
        }

        info!(job_id = %job.job_id, symbols = job.spec.symbols.len(), "Polling job accepted");
        Ok(job)
    }

    /// Stores an accepted job under a fresh id, drawing again on collision.
    async fn register(&self, spec: JobSpec) -> Result<PollingJob> {
        for _ in 0..ID_ATTEMPTS {
            let job = PollingJob::accepted(JobId::generate(), spec.clone());
            if self.store.insert_job(job.clone()).await? {
                return Ok(job);
            }
            warn!(job_id = %job.job_id, "Generated job id already taken");
        }
        Err(Error::Persistence(format!("no free job id after {} attempts", ID_ATTEMPTS)))
    }

    /// The stored job, including its current status.
    pub async fn get_job_status(&self, job_id: &JobId) -> Result<PollingJob> {
        self.store
            .job(job_id)
            .await?
            .ok_or_else(|| Error::JobNotFound(job_id.clone()))
    }

    pub async fn stop_job(&self, job_id: &JobId) -> StopJobResponse {
        StopJobResponse { stopped: self.scheduler.stop(job_id).await }
    }

    /// Live job ids, sorted.
    pub fn active_jobs(&self) -> Vec<JobId> {
        let mut ids: Vec<JobId> = self.scheduler.list_active().into_iter().collect();
        ids.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        ids
    }
}
