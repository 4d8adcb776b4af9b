//! HTTP API
//!
//! - `POST /api/predict`: forecast one horizon for one instrument
//! - `GET /api/trading-codes`: instruments with per-instrument models
//! - `GET /health`: liveness

use crate::error::ForecastError;
use crate::forecast::ForecastService;
use crate::types::{ForecastHorizon, ForecastResult, ModelFamily, Observation};
use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{error, info_span, warn, Instrument};
use uuid::Uuid;


const INTERNAL_ERROR_DETAIL: &str = "An unexpected error occurred during prediction.";

/// Forecast request body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictRequest {
    #[serde(rename = "tradingCode")]
    pub trading_code: String,
    /// Days to forecast
    pub nhead: u32,
    pub history: Vec<Observation>,
    /// Model family name
    pub model: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictResponse {
    pub success: bool,
    #[serde(rename = "tradingCode")]
    pub trading_code: String,
    /// Keyed `"<n>_day"`
    pub predictions: BTreeMap<String, ForecastResult>,
    pub data_points_used: usize,
    pub prediction_dates: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct CodesQuery {
    limit: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CodesResponse {
    pub trading_codes: Vec<String>,
}

/// Error response carrying a `{"detail": ...}` body
#[derive(Debug)]
pub struct ApiError(pub ForecastError);

impl From<ForecastError> for ApiError {
    fn from(e: ForecastError) -> Self {
        Self(e)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(ForecastError::InvalidRequest(rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match &self.0 {
            e if e.is_client_error() => (StatusCode::BAD_REQUEST, e.to_string()),
            e @ ForecastError::ArtifactNotFound(_) => (StatusCode::NOT_FOUND, e.to_string()),
            e => {
                error!("Error during prediction: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR_DETAIL.to_string())
            }
        };
        (status, Json(json!({ "detail": detail }))).into_response()
    }
}

/// Validate and serve one forecast request
pub async fn predict(
    service: &ForecastService,
    request: PredictRequest,
) -> Result<PredictResponse, ForecastError> {
    let horizon = ForecastHorizon::try_from(request.nhead)?;
    let family: ModelFamily = request.model.parse()?;
    let data_points_used = request.history.len();

    let result = service
        .forecast(&request.trading_code, request.history, horizon, family)
        .await?;

    let prediction_dates = result.dates.clone();
    let mut predictions = BTreeMap::new();
    predictions.insert(format!("{}_day", horizon), result);

    Ok(PredictResponse {
        success: true,
        trading_code: request.trading_code,
        predictions,
        data_points_used,
        prediction_dates,
    })
}

async fn predict_handler(
    State(service): State<Arc<ForecastService>>,
    body: Result<Json<PredictRequest>, JsonRejection>,
) -> Result<Json<PredictResponse>, ApiError> {
    let Json(request) = body.map_err(|e| {
        warn!("Rejected predict request: {}", e.body_text());
        ApiError::from(e)
    })?;

    let span = info_span!(
        "forecast",
        request_id = %Uuid::new_v4(),
        trading_code = %request.trading_code,
        nhead = request.nhead
    );
    let response = predict(&service, request).instrument(span).await?;
    Ok(Json(response))
}

async fn trading_codes(
    State(service): State<Arc<ForecastService>>,
    Query(query): Query<CodesQuery>,
) -> Json<CodesResponse> {
    Json(CodesResponse {
        trading_codes: service.list_trading_codes(query.limit).await,
    })
}

async fn health_check() -> &'static str {
    "OK"
}

/// Create the API router
pub fn create_router(service: Arc<ForecastService>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/predict", post(predict_handler))
        .route("/api/trading-codes", get(trading_codes))
        .with_state(service)
}

/// Bind and serve until the process exits
pub async fn serve(service: Arc<ForecastService>, host: &str, port: u16) -> std::io::Result<()> {
    let app = create_router(service);
    let listener = tokio::net::TcpListener::bind((host, port)).await?;
    tracing::info!("Forecast API listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await
}
