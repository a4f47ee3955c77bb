use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;

use crate::templates::Template;
use crate::{Bar, FilterInfo, FilterOption, PredictionError, TickerDetails, Timespan};

/// Variables substituted into a template's user prompt
pub type TemplateVars = HashMap<String, String>;

/// AI provider that constrains its output to a template's JSON schema.
///
/// One outbound call per invocation, no retry; the caller decides whether
/// to retry. Template validation failures must return before any network I/O.
#[async_trait]
pub trait StructuredGenerator: Send + Sync {
    async fn generate(
        &self,
        template: Template,
        variables: TemplateVars,
        model: &str,
    ) -> Result<serde_json::Value, PredictionError>;
}

/// AI provider that answers with web-search-augmented free text
#[async_trait]
pub trait ResearchProvider: Send + Sync {
    async fn research(&self, query: &str, model: &str) -> Result<String, PredictionError>;
}

/// Market data provider used for best-effort strategy enrichment
#[async_trait]
pub trait MarketData: Send + Sync {
    async fn get_aggregates(
        &self,
        ticker: &str,
        multiplier: u32,
        timespan: Timespan,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Bar>, PredictionError>;

    async fn get_ticker_details(&self, ticker: &str) -> Result<TickerDetails, PredictionError>;
}

/// Stock screener used by the filter-generation flow
#[async_trait]
pub trait Screener: Send + Sync {
    /// Available filter categories, formatted for prompt use
    fn filter_info(&self) -> Vec<FilterInfo>;

    /// Options for the selected filter categories
    fn filter_options(&self, selected: &[String]) -> HashMap<String, Vec<FilterOption>>;

    /// Run the screener with concrete filter id -> option id pairs
    async fn run_screener(
        &self,
        filters: &HashMap<String, String>,
    ) -> Result<Vec<String>, PredictionError>;
}
