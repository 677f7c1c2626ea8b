use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use crate::config::SchedulerConfig;
use crate::error::{Error, Result};
use crate::interfaces::PriceStore;
use crate::observability::metrics::POLLING_JOBS_ACTIVE;
use crate::scheduler::job::JobSpec;
use crate::scheduler::poll_loop::PollLoop;
use crate::service::MarketDataService;
use crate::storage::JobStatus;
use crate::types::JobId;

struct JobHandle {
    token: CancellationToken,
    /// Taken by `stop` while it joins the task; the entry stays registered
    /// until then so the id cannot be started twice.
    task: Option<JoinHandle<()>>,
}

impl JobHandle {
    fn is_live(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    fn is_finished(&self) -> bool {
        self.task.as_ref().is_some_and(JoinHandle::is_finished)
    }

    fn is_stopping(&self) -> bool {
        self.task.is_none()
    }
}

/// Polling Scheduler - owns the execution context of every live polling job
///
/// One tokio task per job. Registration is keyed by [`JobId`]; a job id maps
/// to at most one live task. Stopping cancels the task's token, lets an
/// in-flight fetch finish within the grace period, and aborts after that.
pub struct PollingScheduler {
    jobs: DashMap<JobId, JobHandle>,
    service: Arc<MarketDataService>,
    store: Arc<dyn PriceStore>,
    symbol_delay: Duration,
    stop_grace: Duration,
}

impl PollingScheduler {
    pub fn new(service: Arc<MarketDataService>, config: &SchedulerConfig) -> Self {
        PollingScheduler {
            jobs: DashMap::new(),
            store: service.store().clone(),
            service,
            symbol_delay: config.symbol_delay(),
            stop_grace: config.stop_grace(),
        }
    }

    /// Spawns the job's execution context and returns immediately.
    pub fn start(&self, job_id: JobId, spec: JobSpec) -> Result<()> {
        spec.validate()?;

        match self.jobs.entry(job_id.clone()) {
            Entry::Occupied(mut entry) => {
                if !entry.get().is_finished() {
                    return Err(Error::AlreadyRunning(job_id));
                }
                warn!(job_id = %job_id, "Replacing terminated polling job");
                entry.insert(self.spawn(job_id, spec));
            }
            Entry::Vacant(entry) => {
                info!(job_id = %job_id, provider = %spec.provider, "Starting polling job");
                entry.insert(self.spawn(job_id, spec));
                POLLING_JOBS_ACTIVE.inc();
            }
        }
        Ok(())
    }

    fn spawn(&self, job_id: JobId, spec: JobSpec) -> JobHandle {
        let token = CancellationToken::new();
        let poll_loop = PollLoop {
            job_id,
            spec,
            service: self.service.clone(),
            store: self.store.clone(),
            symbol_delay: self.symbol_delay,
            token: token.clone(),
        };
        JobHandle { token, task: Some(tokio::spawn(poll_loop.run())) }
    }

    /// Returns `false` unless a live context was registered for `job_id`.
    ///
    /// The entry stays in the registry, marked stopping, until the task has
    /// been joined. A `start` for the same id in that window is rejected.
    pub async fn stop(&self, job_id: &JobId) -> bool {
        let task = {
            let Some(mut handle) = self.jobs.get_mut(job_id) else {
                return false;
            };
            if handle.is_stopping() {
                debug!(job_id = %job_id, "Stop already in progress");
                return false;
            }
            if handle.is_finished() {
                drop(handle);
                self.reap(job_id);
                return false;
            }
            handle.token.cancel();
            handle.task.take()
        };
        let Some(task) = task else {
            return false;
        };

        self.wait_or_abort(job_id, task).await;

        if let Err(e) = self.store.set_job_status(job_id, JobStatus::Stopped).await {
            error!(job_id = %job_id, error = %e, "Failed to mark job stopped");
        }
        if self.jobs.remove_if(job_id, |_, handle| handle.is_stopping()).is_some() {
            POLLING_JOBS_ACTIVE.dec();
        }
        info!(job_id = %job_id, "Stopped polling job");
        true
    }

    pub fn list_active(&self) -> HashSet<JobId> {
        self.jobs
            .iter()
            .filter(|entry| entry.is_live())
            .map(|entry| entry.key().clone())
            .collect()
    }

    /// Same population as [`list_active`](Self::list_active).
    pub fn active_count(&self) -> usize {
        self.jobs.iter().filter(|entry| entry.is_live()).count()
    }

    /// Drops entries whose task ended without being stopped.
    pub fn reap_finished(&self) -> Vec<JobId> {
        let finished: Vec<JobId> = self.jobs
            .iter()
            .filter(|entry| entry.is_finished())
            .map(|entry| entry.key().clone())
            .collect();

        finished.into_iter().filter(|job_id| self.reap(job_id)).collect()
    }

    fn reap(&self, job_id: &JobId) -> bool {
        if self.jobs.remove_if(job_id, |_, handle| handle.is_finished()).is_none() {
            return false;
        }
        POLLING_JOBS_ACTIVE.dec();
        error!(job_id = %job_id, "Polling job terminated unexpectedly");
        true
    }

    /// Cancels every job. Each loop records its own `cancelled` status.
    pub async fn shutdown(&self) {
        let ids: Vec<JobId> = self.jobs.iter().map(|entry| entry.key().clone()).collect();
        let handles: Vec<(JobId, JobHandle)> = ids
            .into_iter()
            .filter_map(|id| self.jobs.remove(&id))
            .collect();

        info!("Shutting down {} polling jobs", handles.len());

        for (_, handle) in &handles {
            handle.token.cancel();
        }
        for (job_id, handle) in handles {
            POLLING_JOBS_ACTIVE.dec();
            // A stopping entry is joined by its own `stop` call.
            if let Some(task) = handle.task {
                self.wait_or_abort(&job_id, task).await;
            }
        }
    }

    async fn wait_or_abort(&self, job_id: &JobId, mut task: JoinHandle<()>) {
        match tokio::time::timeout(self.stop_grace, &mut task).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(job_id = %job_id, error = %e, "Polling task ended abnormally"),
            Err(_) => {
                warn!(job_id = %job_id, grace = ?self.stop_grace, "Polling task did not stop in time, aborting");
                task.abort();
                let _ = task.await;
            }
        }
    }
}
