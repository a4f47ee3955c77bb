use std::collections::HashMap;

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use prediction_core::{industries::INDUSTRIES, GeneratedFilters, PredictionAnalysis};
use serde::{Deserialize, Serialize};

use crate::{ApiResponse, AppError, AppState};

pub fn screener_routes() -> Router<AppState> {
    Router::new()
        .route("/api/v1/ai/generate-filters", post(generate_filters))
        .route("/api/v1/ai/run-screener", post(run_screener))
        .route("/api/v1/ai/industries", get(list_industries))
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

#[derive(Debug, Deserialize)]
struct GenerateFiltersRequest {
    prediction_text: String,
    analysis: Option<PredictionAnalysis>,
    #[serde(default = "default_model")]
    model: String,
}

async fn generate_filters(
    State(state): State<AppState>,
    Json(req): Json<GenerateFiltersRequest>,
) -> Result<Json<ApiResponse<GeneratedFilters>>, AppError> {
    let text = req.prediction_text.trim();
    if text.is_empty() {
        return Err(AppError::with_status(
            axum::http::StatusCode::BAD_REQUEST,
            "prediction_text must not be empty",
        ));
    }
    let generated = state
        .service
        .generate_screener_filters(text, req.analysis, &req.model)
        .await?;
    Ok(Json(ApiResponse::success(generated)))
}

#[derive(Debug, Deserialize)]
struct RunScreenerRequest {
    filters: HashMap<String, String>,
}

#[derive(Debug, Serialize)]
struct ScreenerResult {
    tickers: Vec<String>,
    count: usize,
}

async fn run_screener(
    State(state): State<AppState>,
    Json(req): Json<RunScreenerRequest>,
) -> Result<Json<ApiResponse<ScreenerResult>>, AppError> {
    if req.filters.is_empty() {
        return Err(AppError::with_status(
            axum::http::StatusCode::BAD_REQUEST,
            "at least one filter is required",
        ));
    }
    let tickers = state.service.run_screener(&req.filters).await?;
    let count = tickers.len();
    Ok(Json(ApiResponse::success(ScreenerResult { tickers, count })))
}

#[derive(Debug, Serialize)]
struct Industry {
    value: &'static str,
    name: &'static str,
}

async fn list_industries() -> Json<ApiResponse<Vec<Industry>>> {
    let industries = INDUSTRIES
        .iter()
        .map(|(value, name)| Industry { value, name })
        .collect();
    Json(ApiResponse::success(industries))
}
