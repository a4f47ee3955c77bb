use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use prediction_core::{
    InvestmentStrategy, Job, PredictionAnalysis, PredictionOptions, PredictionOutcome,
    RelevantTickers,
};
use prediction_pipeline::{NoopObserver, StrategyRequest};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{ApiResponse, AppError, AppState};

pub fn prediction_routes() -> Router<AppState> {
    Router::new()
        .route("/api/v1/ai/predict", post(predict))
        .route("/api/v1/ai/analyze-prediction", post(analyze_prediction))
        .route("/api/v1/ai/market-research", post(market_research))
        .route("/api/v1/ai/find-tickers", post(find_tickers))
        .route("/api/v1/ai/create-strategy", post(create_strategy))
        .route(
            "/api/v1/ai/predict/async",
            post(submit_prediction).get(list_predictions),
        )
        .route("/api/v1/ai/predict/async/:id", get(get_prediction))
}

#[derive(Debug, Deserialize)]
struct PredictRequest {
    prediction_text: String,
    #[serde(flatten)]
    options: PredictionOptions,
}

fn require_text(text: &str) -> Result<&str, AppError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(AppError::with_status(
            axum::http::StatusCode::BAD_REQUEST,
            "prediction_text must not be empty",
        ));
    }
    Ok(trimmed)
}

async fn predict(
    State(state): State<AppState>,
    Json(req): Json<PredictRequest>,
) -> Result<Json<ApiResponse<PredictionOutcome>>, AppError> {
    let text = require_text(&req.prediction_text)?;
    let outcome = state
        .service
        .run_pipeline(text, &req.options, &NoopObserver)
        .await?;
    Ok(Json(ApiResponse::success(outcome)))
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_search_model() -> String {
    "sonar".to_string()
}

#[derive(Debug, Deserialize)]
struct AnalyzeRequest {
    prediction_text: String,
    #[serde(default = "default_model")]
    model: String,
}

async fn analyze_prediction(
    State(state): State<AppState>,
    Json(req): Json<AnalyzeRequest>,
) -> Result<Json<ApiResponse<PredictionAnalysis>>, AppError> {
    let text = require_text(&req.prediction_text)?;
    let analysis = state.service.analyze_prediction(text, &req.model).await?;
    Ok(Json(ApiResponse::success(analysis)))
}

#[derive(Debug, Deserialize)]
struct MarketResearchRequest {
    prediction_text: String,
    #[serde(default)]
    industries: Vec<String>,
    timeframe: Option<String>,
    #[serde(default = "default_search_model")]
    search_model: String,
}

#[derive(Debug, Serialize)]
struct MarketResearchResult {
    research: String,
}

async fn market_research(
    State(state): State<AppState>,
    Json(req): Json<MarketResearchRequest>,
) -> Result<Json<ApiResponse<MarketResearchResult>>, AppError> {
    let text = require_text(&req.prediction_text)?;
    let research = state
        .service
        .get_market_research(
            text,
            &req.industries,
            req.timeframe.as_deref(),
            &req.search_model,
        )
        .await?;
    Ok(Json(ApiResponse::success(MarketResearchResult { research })))
}

#[derive(Debug, Deserialize)]
struct FindTickersRequest {
    prediction_text: String,
    analysis: Option<PredictionAnalysis>,
    #[serde(default)]
    use_web_search: bool,
    #[serde(default = "default_search_model")]
    search_model: String,
    #[serde(default = "default_model")]
    model: String,
}

async fn find_tickers(
    State(state): State<AppState>,
    Json(req): Json<FindTickersRequest>,
) -> Result<Json<ApiResponse<RelevantTickers>>, AppError> {
    let text = require_text(&req.prediction_text)?;
    let tickers = state
        .service
        .find_relevant_tickers(
            text,
            req.analysis,
            req.use_web_search,
            &req.search_model,
            &req.model,
        )
        .await?;
    Ok(Json(ApiResponse::success(tickers)))
}

#[derive(Debug, Deserialize)]
struct CreateStrategyRequest {
    prediction_text: String,
    analysis: Option<PredictionAnalysis>,
    relevant_tickers: Option<RelevantTickers>,
    market_research: Option<String>,
    #[serde(default)]
    include_stock_data: bool,
    #[serde(default)]
    include_year_data: bool,
    #[serde(default)]
    include_week_data: bool,
    #[serde(default = "default_model")]
    model: String,
}

async fn create_strategy(
    State(state): State<AppState>,
    Json(req): Json<CreateStrategyRequest>,
) -> Result<Json<ApiResponse<InvestmentStrategy>>, AppError> {
    let text = require_text(&req.prediction_text)?.to_string();
    let strategy = state
        .service
        .create_investment_strategy(StrategyRequest {
            prediction_text: text,
            analysis: req.analysis,
            relevant_tickers: req.relevant_tickers,
            market_research: req.market_research,
            include_stock_data: req.include_stock_data,
            include_year_data: req.include_year_data,
            include_week_data: req.include_week_data,
            model: req.model,
        })
        .await?;
    Ok(Json(ApiResponse::success(strategy)))
}

#[derive(Debug, Serialize)]
struct SubmittedJob {
    job_id: Uuid,
}

async fn submit_prediction(
    State(state): State<AppState>,
    Json(req): Json<PredictRequest>,
) -> Result<Json<ApiResponse<SubmittedJob>>, AppError> {
    let text = require_text(&req.prediction_text)?.to_string();
    let job_id = state.tracker.submit(text, req.options);
    Ok(Json(ApiResponse::success(SubmittedJob { job_id })))
}

async fn get_prediction(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Job>>, AppError> {
    let job = state
        .tracker
        .get(id)
        .ok_or_else(|| AppError::not_found(format!("prediction job {id} not found")))?;
    Ok(Json(ApiResponse::success(job)))
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    #[serde(default = "default_limit")]
    limit: usize,
}

fn default_limit() -> usize {
    10
}

async fn list_predictions(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ApiResponse<Vec<Job>>>, AppError> {
    Ok(Json(ApiResponse::success(state.tracker.list(query.limit))))
}
