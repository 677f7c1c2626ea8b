use std::sync::Arc;
use crate::api::ApiState;
use crate::config::AppConfig;
use crate::error::Result;
use crate::interfaces::{PricePublisher, PriceStore};
use crate::moving_average::MovingAverageProcessor;
use crate::price_infra::connectors::ProviderSet;
use crate::scheduler::{JobControl, PollingScheduler};
use crate::service::MarketDataService;

/// The service process: polling, the HTTP state and the moving-average
/// processor, all reading and writing one store.
pub struct App {
    pub state: Arc<ApiState>,
    pub scheduler: Arc<PollingScheduler>,
    pub processor: MovingAverageProcessor,
}

impl App {
    pub fn assemble(
        config: &AppConfig,
        store: Arc<dyn PriceStore>,
        publisher: Arc<dyn PricePublisher>,
        providers: ProviderSet,
    ) -> Result<Self> {
        let service = Arc::new(MarketDataService::new(providers.clone(), store.clone(), publisher));
        let scheduler = Arc::new(PollingScheduler::new(service.clone(), &config.scheduler));
        let control = Arc::new(JobControl::new(scheduler.clone(), store.clone(), providers));
        let processor = MovingAverageProcessor::new(store.clone(), config.moving_average.period)?;

        let state = Arc::new(ApiState {
            control,
            service,
            store,
            default_provider: config.default_provider()?,
            service_name: config.server.service_name.clone(),
        });

        Ok(App { state, scheduler, processor })
    }
}
