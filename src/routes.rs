use axum::{
    extract::State,
    response::Json,
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, info_span};
use uuid::Uuid;

use crate::{
    engine::ScoringEngine,
    error::AppError,
    fees::FeePredictor,
    types::{FeeRequest, FeeResponse, HealthResponse, ScoreRequest, ScoreResponse},
};

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<ScoringEngine>,
    pub fees: FeePredictor,
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(engine: ScoringEngine, fees: FeePredictor) -> Self {
        Self {
            engine: Arc::new(engine),
            fees,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/ml/anomaly", post(anomaly))
        .route("/ml/predict_fee", post(predict_fee))
        .route("/metrics", get(metrics_endpoint))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

pub async fn anomaly(
    State(state): State<AppState>,
    Json(request): Json<ScoreRequest>,
) -> Result<Json<ScoreResponse>, AppError> {
    let request_id = Uuid::new_v4();
    let span = info_span!("anomaly", %request_id, tx_hash = request.tx_hash.as_deref());

    let result = span.in_scope(|| state.engine.score(&request.features))?;
    span.in_scope(|| debug!("Responding {} ({:?}, {})", result.score, result.label, result.tier));

    Ok(Json(result.into()))
}

pub async fn predict_fee(
    State(state): State<AppState>,
    Json(request): Json<FeeRequest>,
) -> Result<Json<FeeResponse>, AppError> {
    metrics::counter!("fee_requests_total").increment(1);
    let predicted_gwei = state
        .fees
        .predict(request.recent_gas.as_deref(), &mut rand::thread_rng())?;
    Ok(Json(FeeResponse { predicted_gwei }))
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ml_service running".to_string(),
        model_loaded: state.engine.model_loaded(),
        model: state.engine.model_info().cloned(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

pub async fn metrics_endpoint(State(state): State<AppState>) -> Result<String, AppError> {
    state
        .metrics
        .as_ref()
        .map(PrometheusHandle::render)
        .ok_or(AppError::NotFound)
}
