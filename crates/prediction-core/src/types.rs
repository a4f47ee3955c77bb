use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// OHLCV bar data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Company reference data from the market data provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TickerDetails {
    pub ticker: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub market_cap: Option<f64>,
    pub homepage_url: Option<String>,
    pub currency_name: Option<String>,
    pub primary_exchange: Option<String>,
}

/// Summary of an OHLC window (e.g. 1-year daily or 1-week hourly)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OhlcSummary {
    pub timeframe: String,
    pub current_price: Option<f64>,
    pub change_pct: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub start_date: String,
    pub end_date: String,
}

/// Per-ticker data bundle used to enrich the strategy prompt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockData {
    pub ticker: String,
    pub name: String,
    pub description: String,
    pub market_cap: Option<f64>,
    pub website: String,
    pub currency: String,
    pub exchange: String,
    pub ohlc: Vec<OhlcSummary>,
}

/// Timespan for bar aggregation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Timespan {
    Minute,
    Hour,
    Day,
    Week,
    Month,
}

impl Timespan {
    pub fn as_str(&self) -> &'static str {
        match self {
            Timespan::Minute => "minute",
            Timespan::Hour => "hour",
            Timespan::Day => "day",
            Timespan::Week => "week",
            Timespan::Month => "month",
        }
    }
}

/// Lifecycle of a tracked prediction job.
///
/// Transitions are strictly forward (Researching may be skipped) and the
/// two terminal states absorb.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictionStatus {
    Pending,
    Analyzing,
    Researching,
    FindingTickers,
    CreatingStrategy,
    Completed,
    Failed,
}

impl PredictionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PredictionStatus::Completed | PredictionStatus::Failed)
    }

    /// Ordering rank used to reject regressions. Both terminal states share
    /// the highest rank.
    pub fn rank(&self) -> u8 {
        match self {
            PredictionStatus::Pending => 0,
            PredictionStatus::Analyzing => 1,
            PredictionStatus::Researching => 2,
            PredictionStatus::FindingTickers => 3,
            PredictionStatus::CreatingStrategy => 4,
            PredictionStatus::Completed | PredictionStatus::Failed => 5,
        }
    }
}

/// One tracked invocation of the prediction pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub status: PredictionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub message: String,
    /// Progress percentage (0-100), non-decreasing
    pub progress: f64,
    /// Populated only when status is Completed
    pub result: Option<PredictionOutcome>,
}

/// Structured analysis extracted from a prediction statement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionAnalysis {
    /// In how many days, months or years the prediction will come true
    pub timing: String,
    /// Confidence level (0.0-1.0)
    pub confidence: f64,
    /// Risk tolerance level (0.0-1.0)
    pub tolerance: f64,
    pub related_industries: Vec<String>,
    /// Short name summarizing the prediction
    pub name: String,
    /// Type of prediction (climate, political, invention, ...)
    pub category: String,
    pub best_case_scenario: String,
    pub worst_case_scenario: String,
}

/// Tickers relevant to a prediction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelevantTickers {
    pub tickers: Vec<String>,
}

/// A single trade inside an investment strategy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyTrade {
    pub ticker: String,
    /// Target price for the trade
    pub price: f64,
    /// Percentage of total capital to allocate
    pub volume: f64,
    /// buy, sell, option, ...
    #[serde(rename = "type")]
    pub trade_type: String,
    /// Date of transaction, possibly relative to the current date
    pub date: String,
}

/// Investment strategy built from a prediction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvestmentStrategy {
    pub name: String,
    pub description: String,
    pub pros: Vec<String>,
    pub cons: Vec<String>,
    pub timing: String,
    /// Risk level (0.0-1.0)
    pub risk: f64,
    /// Estimated percentage return
    pub estimated_return: f64,
    pub involved_tickers: Vec<String>,
    pub trades: Vec<StrategyTrade>,
}

/// Screener filter categories chosen for a prediction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterSelection {
    pub selected_filters: Vec<String>,
    /// Explanation per selected filter id
    pub reasoning: std::collections::HashMap<String, String>,
}

/// Concrete screener filter values chosen for a prediction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterValueSelection {
    /// Filter id -> selected option id
    pub filters: std::collections::HashMap<String, String>,
    /// Explanation per filter value
    pub selections: std::collections::HashMap<String, String>,
}

/// A screener filter category, formatted for prompt use
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterInfo {
    pub id: String,
    pub name: String,
    pub description: String,
}

/// One selectable option of a screener filter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterOption {
    pub id: String,
    pub value: String,
    pub display_name: String,
}

/// Options accepted when running the pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionOptions {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default)]
    pub use_web_search: bool,
    #[serde(default = "default_search_model")]
    pub search_model: String,
    #[serde(default)]
    pub include_stock_data: bool,
    #[serde(default)]
    pub include_year_data: bool,
    #[serde(default)]
    pub include_week_data: bool,
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_search_model() -> String {
    "sonar".to_string()
}

impl Default for PredictionOptions {
    fn default() -> Self {
        Self {
            model: default_model(),
            use_web_search: false,
            search_model: default_search_model(),
            include_stock_data: false,
            include_year_data: false,
            include_week_data: false,
        }
    }
}

/// Final payload of a completed pipeline run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionOutcome {
    pub prediction_text: String,
    pub analysis: PredictionAnalysis,
    /// Absent when web search was disabled or research failed (non-fatal)
    pub market_research: Option<String>,
    pub relevant_tickers: RelevantTickers,
    pub investment_strategy: InvestmentStrategy,
}

/// Combined screener filter generation output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedFilters {
    pub filters: std::collections::HashMap<String, String>,
    pub reasoning: serde_json::Value,
}
