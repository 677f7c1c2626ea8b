use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn, Instrument};
use crate::interfaces::PriceStore;
use crate::observability::tracing::polling_job_span;
use crate::scheduler::job::JobSpec;
use crate::service::MarketDataService;
use crate::storage::JobStatus;
use crate::types::JobId;

enum CycleEnd {
    Completed,
    Cancelled,
}

/// Execution context of one polling job. Owned by its spawned task.
pub(crate) struct PollLoop {
    pub(crate) job_id: JobId,
    pub(crate) spec: JobSpec,
    pub(crate) service: Arc<MarketDataService>,
    pub(crate) store: Arc<dyn PriceStore>,
    pub(crate) symbol_delay: Duration,
    pub(crate) token: CancellationToken,
}

impl PollLoop {
    pub(crate) async fn run(self) {
        let span = polling_job_span(&self.job_id, self.spec.provider);

        async move {
            info!(
                symbols = ?self.spec.symbols,
                interval_secs = self.spec.interval_secs,
                "Polling job started"
            );

            loop {
                match AssertUnwindSafe(self.run_cycle()).catch_unwind().await {
                    Ok(CycleEnd::Completed) => {}
                    Ok(CycleEnd::Cancelled) => break,
                    Err(panic) => {
                        error!(panic = %panic_message(panic.as_ref()), "Poll cycle panicked");
                    }
                }

                if !self.pause(self.spec.interval()).await {
                    break;
                }
            }

            self.mark(JobStatus::Cancelled).await;
            info!("Polling job cancelled");
        }
        .instrument(span)
        .await
    }

    async fn run_cycle(&self) -> CycleEnd {
        self.mark(JobStatus::Running).await;

        let mut failures = 0usize;
        for symbol in &self.spec.symbols {
            if self.token.is_cancelled() {
                return CycleEnd::Cancelled;
            }

            match self.service.fetch_and_record(symbol, self.spec.provider).await {
                Ok(recorded) => debug!(
                    symbol = %symbol,
                    price = %recorded.point.price,
                    published = recorded.published,
                    "Polled symbol"
                ),
                Err(e) => {
                    failures += 1;
                    warn!(symbol = %symbol, error = %e, "Failed to poll symbol");
                }
            }

            if !self.pause(self.symbol_delay).await {
                return CycleEnd::Cancelled;
            }
        }

        if failures > 0 {
            warn!(failures, total = self.spec.symbols.len(), "Poll cycle finished with failures");
        }
        CycleEnd::Completed
    }

    /// Sleeps unless cancelled first. Returns `false` on cancellation.
    async fn pause(&self, duration: Duration) -> bool {
        tokio::select! {
            biased;
            _ = self.token.cancelled() => false,
            _ = tokio::time::sleep(duration) => true,
        }
    }

    async fn mark(&self, status: JobStatus) {
        if let Err(e) = self.store.set_job_status(&self.job_id, status).await {
            warn!(status = %status, error = %e, "Failed to update job status");
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
