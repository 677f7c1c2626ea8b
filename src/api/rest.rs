use axum::{
    Router,
    routing::get,
    extract::{Path, Query, State, Json},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use crate::error::{Error, ProviderError};
use crate::interfaces::PriceStore;
use crate::observability::metrics;
use crate::price_infra::ProviderId;
use crate::scheduler::{JobControl, JobSpec, PollRequest, StopJobResponse};
use crate::service::MarketDataService;
use crate::storage::{JobStatus, MovingAverageRecord, PollingJob};
use crate::types::{JobId, Price, Symbol};

pub struct ApiState {
    pub control: Arc<JobControl>,
    pub service: Arc<MarketDataService>,
    pub store: Arc<dyn PriceStore>,
    pub default_provider: ProviderId,
    pub service_name: String,
}

pub fn create_router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/", get(health_check))
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_text))
        .route("/prices/latest", get(latest_price))
        .route("/prices/poll", get(list_jobs).post(create_job))
        .route("/prices/poll/:job_id", get(job_status).delete(stop_job))
        .route("/prices/moving-average/:symbol", get(latest_moving_average))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// JSON error body: `{error, detail, timestamp}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    error: &'static str,
    detail: String,
}

#[derive(Serialize)]
struct ErrorResponse<'a> {
    error: &'a str,
    detail: &'a str,
    timestamp: DateTime<Utc>,
}

impl ApiError {
    fn not_found(detail: impl Into<String>) -> Self {
        ApiError { status: StatusCode::NOT_FOUND, error: "not_found", detail: detail.into() }
    }
}

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        let (status, error) = match &e {
            Error::InvalidJobConfig(_) => (StatusCode::BAD_REQUEST, "invalid_job_config"),
            Error::UnknownProvider(_) => (StatusCode::BAD_REQUEST, "unknown_provider"),
            Error::Provider(ProviderError::InvalidSymbol { .. }) => (StatusCode::BAD_REQUEST, "invalid_symbol"),
            Error::Provider(ProviderError::RateLimited { .. }) => (StatusCode::TOO_MANY_REQUESTS, "rate_limited"),
            Error::Provider(_) => (StatusCode::BAD_GATEWAY, "provider_error"),
            Error::JobNotFound(_) => (StatusCode::NOT_FOUND, "job_not_found"),
            Error::AlreadyRunning(_) => (StatusCode::CONFLICT, "already_running"),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        };
        if status.is_server_error() {
            tracing::error!(error = %e, "Request failed");
        }
        ApiError { status, error, detail: e.to_string() }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: self.error,
            detail: &self.detail,
            timestamp: Utc::now(),
        };
        (self.status, Json(body)).into_response()
    }
}

type ApiResult<T> = std::result::Result<T, ApiError>;

#[derive(Serialize)]
struct HealthResponse {
    service: String,
    version: &'static str,
    status: &'static str,
}

async fn health_check(State(state): State<Arc<ApiState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        service: state.service_name.clone(),
        version: env!("CARGO_PKG_VERSION"),
        status: "healthy",
    })
}

async fn metrics_text() -> ApiResult<impl IntoResponse> {
    let body = metrics::render()?;
    Ok(([(header::CONTENT_TYPE, "text/plain; version=0.0.4")], body))
}

#[derive(Deserialize)]
struct LatestPriceQuery {
    symbol: String,
    provider: Option<String>,
}

#[derive(Serialize)]
struct PriceResponse {
    symbol: Symbol,
    price: Price,
    timestamp: DateTime<Utc>,
    provider: ProviderId,
}

async fn latest_price(
    State(state): State<Arc<ApiState>>,
    Query(query): Query<LatestPriceQuery>,
) -> ApiResult<Json<PriceResponse>> {
    let provider = match query.provider.as_deref() {
        Some(name) => name.parse::<ProviderId>()?,
        None => state.default_provider,
    };
    let symbol = Symbol::parse(&query.symbol).map_err(|_| {
        Error::from(ProviderError::InvalidSymbol { provider: provider.as_str(), symbol: query.symbol.clone() })
    })?;

    let recorded = state.service.fetch_and_record(&symbol, provider).await?;

    Ok(Json(PriceResponse {
        symbol: recorded.point.symbol,
        price: recorded.point.price,
        timestamp: recorded.point.timestamp,
        provider,
    }))
}

#[derive(Serialize)]
struct JobResponse {
    job_id: JobId,
    status: JobStatus,
    config: JobSpec,
}

impl From<PollingJob> for JobResponse {
    fn from(job: PollingJob) -> Self {
        JobResponse { job_id: job.job_id, status: job.status, config: job.spec }
    }
}

async fn create_job(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<PollRequest>,
) -> ApiResult<(StatusCode, Json<JobResponse>)> {
    let job = state.control.create_job(request).await?;
    Ok((StatusCode::ACCEPTED, Json(job.into())))
}

#[derive(Serialize)]
struct ActiveJobsResponse {
    active_jobs: Vec<JobId>,
}

async fn list_jobs(State(state): State<Arc<ApiState>>) -> Json<ActiveJobsResponse> {
    Json(ActiveJobsResponse { active_jobs: state.control.active_jobs() })
}

async fn job_status(
    State(state): State<Arc<ApiState>>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<JobResponse>> {
    let job = state.control.get_job_status(&JobId::new(job_id)).await?;
    Ok(Json(job.into()))
}

async fn stop_job(
    State(state): State<Arc<ApiState>>,
    Path(job_id): Path<String>,
) -> Json<StopJobResponse> {
    Json(state.control.stop_job(&JobId::new(job_id)).await)
}

async fn latest_moving_average(
    State(state): State<Arc<ApiState>>,
    Path(symbol): Path<String>,
) -> ApiResult<Json<MovingAverageRecord>> {
    let symbol = Symbol::parse(&symbol)
        .map_err(|e| ApiError { status: StatusCode::BAD_REQUEST, error: "invalid_symbol", detail: e.to_string() })?;

    state.store
        .latest_moving_average(&symbol)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("no moving average for {}", symbol)))
}
