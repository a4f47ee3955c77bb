//! HTTP layer for the prediction service.

use std::sync::Arc;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use finviz_client::FinvizClient;
use openai_client::OpenAiClient;
use perplexity_client::PerplexityClient;
use polygon_client::PolygonClient;
use prediction_core::{MarketData, PredictionError};
use prediction_pipeline::{JobTracker, PredictionService};
use serde::Serialize;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::EnvFilter;

pub mod auth;
pub mod prediction_routes;
pub mod screener_routes;

/// Standard response envelope: `data` on success, `error` on failure
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Error type for all route handlers
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    pub fn with_status(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::with_status(StatusCode::NOT_FOUND, message)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.status, Json(ApiResponse::<()>::error(self.message))).into_response()
    }
}

impl From<PredictionError> for AppError {
    fn from(err: PredictionError) -> Self {
        let status = match &err {
            e if e.is_validation() => StatusCode::BAD_REQUEST,
            PredictionError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_GATEWAY,
        };
        Self::with_status(status, err.to_string())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::with_status(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
    }
}

/// Shared application state available to all handlers
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<PredictionService>,
    pub tracker: Arc<JobTracker>,
}

impl AppState {
    pub fn new(service: Arc<PredictionService>) -> Self {
        let tracker = Arc::new(JobTracker::new(Arc::clone(&service)));
        Self { service, tracker }
    }

    /// Build the provider stack from environment variables. Market data is
    /// optional; the rest of the pipeline works without it.
    pub fn from_env() -> Result<Self, PredictionError> {
        let generator = Arc::new(OpenAiClient::from_env()?);
        let research = Arc::new(PerplexityClient::from_env()?);
        let market_data: Option<Arc<dyn MarketData>> = match PolygonClient::from_env() {
            Ok(client) => Some(Arc::new(client)),
            Err(e) => {
                tracing::warn!("market data disabled: {e}");
                None
            }
        };
        let screener = Arc::new(FinvizClient::new());

        let service = Arc::new(PredictionService::new(
            generator, research, market_data, screener,
        ));
        Ok(Self::new(service))
    }
}

async fn health() -> Json<ApiResponse<serde_json::Value>> {
    Json(ApiResponse::success(serde_json::json!({
        "status": "ok",
        "service": "prediction-api",
    })))
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health))
        .merge(prediction_routes::prediction_routes())
        .merge(screener_routes::screener_routes())
        .layer(axum::middleware::from_fn(auth::auth_middleware))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run_server() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let state = AppState::from_env()?;
    let app = build_router(state);

    let addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8000".to_string());
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("prediction API listening on {addr}");
    axum::serve(listener, app).await?;
    Ok(())
}
