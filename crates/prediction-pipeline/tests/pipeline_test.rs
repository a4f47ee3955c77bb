//! End-to-end pipeline tests against mock providers.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use prediction_core::{
    Bar, FilterInfo, FilterOption, MarketData, PredictionError, PredictionOptions,
    PredictionStatus, ResearchProvider, Screener, StructuredGenerator, Template, TemplateVars,
    TickerDetails, Timespan,
};
use prediction_pipeline::{JobTracker, NoopObserver, PredictionService, StrategyRequest};
use serde_json::{json, Value};

#[derive(Default)]
struct MockGenerator {
    responses: HashMap<Template, Result<Value, String>>,
    calls: Mutex<Vec<Template>>,
}

impl MockGenerator {
    fn with(mut self, template: Template, response: Result<Value, String>) -> Self {
        self.responses.insert(template, response);
        self
    }

    fn calls(&self) -> Vec<Template> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl StructuredGenerator for MockGenerator {
    async fn generate(
        &self,
        template: Template,
        _variables: TemplateVars,
        _model: &str,
    ) -> Result<Value, PredictionError> {
        self.calls.lock().unwrap().push(template);
        match self.responses.get(&template) {
            Some(Ok(value)) => Ok(value.clone()),
            Some(Err(msg)) => Err(PredictionError::Provider(msg.clone())),
            None => panic!("unexpected template invocation: {template}"),
        }
    }
}

struct MockResearch {
    response: Result<String, String>,
    calls: AtomicUsize,
}

impl MockResearch {
    fn ok(content: &str) -> Self {
        Self {
            response: Ok(content.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    fn failing(msg: &str) -> Self {
        Self {
            response: Err(msg.to_string()),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl ResearchProvider for MockResearch {
    async fn research(&self, _query: &str, _model: &str) -> Result<String, PredictionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.response
            .clone()
            .map_err(PredictionError::Provider)
    }
}

struct MockMarket;

#[async_trait]
impl MarketData for MockMarket {
    async fn get_aggregates(
        &self,
        _ticker: &str,
        _multiplier: u32,
        _timespan: Timespan,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Bar>, PredictionError> {
        Ok(vec![
            Bar {
                timestamp: from,
                open: 100.0,
                high: 101.0,
                low: 99.0,
                close: 100.0,
                volume: 10_000.0,
            },
            Bar {
                timestamp: to,
                open: 104.0,
                high: 106.0,
                low: 103.0,
                close: 105.0,
                volume: 12_000.0,
            },
        ])
    }

    async fn get_ticker_details(&self, ticker: &str) -> Result<TickerDetails, PredictionError> {
        Ok(TickerDetails {
            ticker: ticker.to_string(),
            name: Some(format!("{ticker} Inc.")),
            description: Some("A test company".to_string()),
            market_cap: Some(1_000_000_000.0),
            homepage_url: None,
            currency_name: Some("usd".to_string()),
            primary_exchange: Some("XNAS".to_string()),
        })
    }
}

#[derive(Default)]
struct MockScreener {
    requested_options: Mutex<Vec<Vec<String>>>,
}

#[async_trait]
impl Screener for MockScreener {
    fn filter_info(&self) -> Vec<FilterInfo> {
        vec![FilterInfo {
            id: "cap".to_string(),
            name: "Market Cap.".to_string(),
            description: "Company market capitalization".to_string(),
        }]
    }

    fn filter_options(&self, selected: &[String]) -> HashMap<String, Vec<FilterOption>> {
        self.requested_options
            .lock()
            .unwrap()
            .push(selected.to_vec());
        selected
            .iter()
            .map(|id| {
                (
                    id.clone(),
                    vec![FilterOption {
                        id: format!("{id}_large"),
                        value: "large".to_string(),
                        display_name: "Large".to_string(),
                    }],
                )
            })
            .collect()
    }

    async fn run_screener(
        &self,
        _filters: &HashMap<String, String>,
    ) -> Result<Vec<String>, PredictionError> {
        Ok(vec!["AAPL".to_string(), "MSFT".to_string()])
    }
}

fn analysis_value() -> Value {
    json!({
        "timing": "6 months",
        "confidence": 0.7,
        "tolerance": 0.5,
        "related_industries": ["Semiconductors"],
        "name": "Chip demand surge",
        "category": "technology",
        "best_case_scenario": "Suppliers rally",
        "worst_case_scenario": "Demand stalls"
    })
}

fn tickers_value() -> Value {
    json!({ "tickers": ["NVDA", "AMD"] })
}

fn strategy_value() -> Value {
    json!({
        "name": "Semiconductor momentum",
        "description": "Buy leading chipmakers",
        "pros": ["Exposure to demand growth"],
        "cons": ["Valuation risk"],
        "timing": "6 months",
        "risk": 0.5,
        "estimated_return": 12.0,
        "involved_tickers": ["NVDA", "AMD"],
        "trades": [{
            "ticker": "NVDA",
            "price": 130.0,
            "volume": 10.0,
            "type": "buy",
            "date": "within 1 month"
        }]
    })
}

fn happy_generator() -> MockGenerator {
    MockGenerator::default()
        .with(Template::PredictionAnalysis, Ok(analysis_value()))
        .with(Template::TickerFinder, Ok(tickers_value()))
        .with(Template::InvestmentStrategy, Ok(strategy_value()))
}

fn service_with(generator: MockGenerator, research: MockResearch) -> PredictionService {
    PredictionService::new(
        Arc::new(generator),
        Arc::new(research),
        Some(Arc::new(MockMarket)),
        Arc::new(MockScreener::default()),
    )
}

async fn wait_terminal(tracker: &JobTracker, id: uuid::Uuid) -> prediction_core::Job {
    for _ in 0..500 {
        if let Some(job) = tracker.get(id) {
            if job.status.is_terminal() {
                return job;
            }
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("job never reached a terminal state");
}

#[tokio::test]
async fn full_pipeline_produces_outcome() {
    let service = service_with(happy_generator(), MockResearch::ok("research notes"));
    let options = PredictionOptions {
        use_web_search: true,
        ..Default::default()
    };

    let outcome = service
        .run_pipeline("chip demand will double", &options, &NoopObserver)
        .await
        .unwrap();

    assert_eq!(outcome.prediction_text, "chip demand will double");
    assert_eq!(outcome.analysis.timing, "6 months");
    assert_eq!(outcome.market_research.as_deref(), Some("research notes"));
    assert_eq!(outcome.relevant_tickers.tickers, vec!["NVDA", "AMD"]);
    assert_eq!(outcome.investment_strategy.trades.len(), 1);
}

#[tokio::test]
async fn research_failure_is_tolerated() {
    let service = service_with(happy_generator(), MockResearch::failing("search offline"));
    let options = PredictionOptions {
        use_web_search: true,
        ..Default::default()
    };

    let outcome = service
        .run_pipeline("chip demand will double", &options, &NoopObserver)
        .await
        .unwrap();

    assert!(outcome.market_research.is_none());
    assert_eq!(outcome.relevant_tickers.tickers, vec!["NVDA", "AMD"]);
}

#[tokio::test]
async fn web_search_disabled_skips_research_provider() {
    let research = MockResearch::ok("should not be called");
    let calls = Arc::new(research);
    let service = PredictionService::new(
        Arc::new(happy_generator()),
        Arc::clone(&calls) as Arc<dyn ResearchProvider>,
        None,
        Arc::new(MockScreener::default()),
    );

    let outcome = service
        .run_pipeline(
            "chip demand will double",
            &PredictionOptions::default(),
            &NoopObserver,
        )
        .await
        .unwrap();

    assert!(outcome.market_research.is_none());
    assert_eq!(calls.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn async_job_completes_with_result() {
    let service = service_with(happy_generator(), MockResearch::ok("notes"));
    let tracker = JobTracker::new(Arc::new(service));

    let id = tracker.submit(
        "chip demand will double".to_string(),
        PredictionOptions::default(),
    );
    let job = wait_terminal(&tracker, id).await;

    assert_eq!(job.status, PredictionStatus::Completed);
    assert_eq!(job.progress, 100.0);
    let result = job.result.expect("completed job must carry a result");
    assert_eq!(result.relevant_tickers.tickers, vec!["NVDA", "AMD"]);
}

#[tokio::test]
async fn analysis_failure_fails_job_and_skips_later_stages() {
    let generator = Arc::new(
        MockGenerator::default()
            .with(Template::PredictionAnalysis, Err("model quota hit".into())),
    );
    let service = PredictionService::new(
        Arc::clone(&generator) as Arc<dyn StructuredGenerator>,
        Arc::new(MockResearch::ok("notes")),
        None,
        Arc::new(MockScreener::default()),
    );
    let tracker = JobTracker::new(Arc::new(service));

    let id = tracker.submit("doomed".to_string(), PredictionOptions::default());
    let job = wait_terminal(&tracker, id).await;

    assert_eq!(job.status, PredictionStatus::Failed);
    assert!(job.message.contains("model quota hit"));
    assert!(job.result.is_none());
    assert_eq!(generator.calls(), vec![Template::PredictionAnalysis]);
}

#[tokio::test]
async fn strategy_failure_fails_job() {
    let generator = MockGenerator::default()
        .with(Template::PredictionAnalysis, Ok(analysis_value()))
        .with(Template::TickerFinder, Ok(tickers_value()))
        .with(Template::InvestmentStrategy, Err("strategy refused".into()));
    let service = service_with(generator, MockResearch::ok("notes"));
    let tracker = JobTracker::new(Arc::new(service));

    let id = tracker.submit("half way".to_string(), PredictionOptions::default());
    let job = wait_terminal(&tracker, id).await;

    assert_eq!(job.status, PredictionStatus::Failed);
    assert!(job.message.contains("strategy refused"));
}

#[tokio::test]
async fn unknown_job_is_none_and_list_respects_limit() {
    let service = service_with(happy_generator(), MockResearch::ok("notes"));
    let tracker = JobTracker::new(Arc::new(service));

    assert!(tracker.get(uuid::Uuid::new_v4()).is_none());

    let mut ids = Vec::new();
    for _ in 0..3 {
        ids.push(tracker.submit("p".to_string(), PredictionOptions::default()));
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    for id in &ids {
        wait_terminal(&tracker, *id).await;
    }

    let listed = tracker.list(2);
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].id, ids[2]);
    assert_eq!(listed[1].id, ids[1]);
}

#[tokio::test]
async fn strategy_with_stock_data_enrichment() {
    let service = service_with(happy_generator(), MockResearch::ok("notes"));
    let strategy = service
        .create_investment_strategy(StrategyRequest {
            prediction_text: "chip demand will double".to_string(),
            include_stock_data: true,
            include_year_data: true,
            include_week_data: true,
            model: "gpt-4o-mini".to_string(),
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(strategy.name, "Semiconductor momentum");
}

#[tokio::test]
async fn screener_filter_generation_combines_reasoning() {
    let generator = MockGenerator::default()
        .with(Template::PredictionAnalysis, Ok(analysis_value()))
        .with(
            Template::FinvizFilterSelection,
            Ok(json!({
                "selected_filters": ["cap"],
                "reasoning": { "cap": "large caps dominate the sector" }
            })),
        )
        .with(
            Template::FinvizFilterValues,
            Ok(json!({
                "filters": { "cap": "cap_large" },
                "selections": { "cap": "large caps fit the thesis" }
            })),
        );
    let screener = Arc::new(MockScreener::default());
    let service = PredictionService::new(
        Arc::new(generator),
        Arc::new(MockResearch::ok("notes")),
        None,
        Arc::clone(&screener) as Arc<dyn Screener>,
    );

    let generated = service
        .generate_screener_filters("chip demand will double", None, "gpt-4o-mini")
        .await
        .unwrap();

    assert_eq!(generated.filters.get("cap"), Some(&"cap_large".to_string()));
    assert_eq!(
        generated.reasoning["filter_selection"]["cap"],
        "large caps dominate the sector"
    );
    assert_eq!(
        generated.reasoning["value_selection"]["cap"],
        "large caps fit the thesis"
    );
    assert_eq!(
        screener.requested_options.lock().unwrap().as_slice(),
        &[vec!["cap".to_string()]]
    );
}

#[tokio::test]
async fn missing_industry_value_is_seeded_from_analysis() {
    let generator = MockGenerator::default()
        .with(Template::PredictionAnalysis, Ok(analysis_value()))
        .with(
            Template::FinvizFilterSelection,
            Ok(json!({
                "selected_filters": ["cap"],
                "reasoning": { "cap": "large caps dominate the sector" }
            })),
        )
        .with(
            Template::FinvizFilterValues,
            Ok(json!({
                "filters": { "cap": "cap_large" },
                "selections": { "cap": "large caps fit the thesis" }
            })),
        );
    let service = service_with(generator, MockResearch::ok("notes"));

    let generated = service
        .generate_screener_filters("chip demand will double", None, "gpt-4o-mini")
        .await
        .unwrap();

    // Analysis reports "Semiconductors"; the screener gets its industry
    // filter even though the model selected none.
    assert_eq!(
        generated.filters.get("ind"),
        Some(&"ind_semiconductors".to_string())
    );
    assert!(generated.reasoning["value_selection"]["ind"]
        .as_str()
        .unwrap()
        .contains("related industries"));
}

#[tokio::test]
async fn model_selected_industry_value_is_kept() {
    let generator = MockGenerator::default()
        .with(Template::PredictionAnalysis, Ok(analysis_value()))
        .with(
            Template::FinvizFilterSelection,
            Ok(json!({
                "selected_filters": ["ind"],
                "reasoning": { "ind": "industry exposure matters" }
            })),
        )
        .with(
            Template::FinvizFilterValues,
            Ok(json!({
                "filters": { "ind": "ind_gold" },
                "selections": { "ind": "gold miners benefit" }
            })),
        );
    let service = service_with(generator, MockResearch::ok("notes"));

    let generated = service
        .generate_screener_filters("gold will double", None, "gpt-4o-mini")
        .await
        .unwrap();

    assert_eq!(generated.filters.get("ind"), Some(&"ind_gold".to_string()));
    assert_eq!(generated.reasoning["value_selection"]["ind"], "gold miners benefit");
}

#[tokio::test]
async fn finished_job_handles_are_released() {
    let service = service_with(happy_generator(), MockResearch::ok("notes"));
    let tracker = JobTracker::new(Arc::new(service));

    let id = tracker.submit(
        "chip demand will double".to_string(),
        PredictionOptions::default(),
    );
    wait_terminal(&tracker, id).await;

    for _ in 0..500 {
        if tracker.active_tasks() == 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(tracker.active_tasks(), 0);
    assert!(tracker.get(id).is_some());
}

#[tokio::test]
async fn empty_filter_selection_is_an_error() {
    let generator = MockGenerator::default()
        .with(Template::PredictionAnalysis, Ok(analysis_value()))
        .with(
            Template::FinvizFilterSelection,
            Ok(json!({ "selected_filters": [], "reasoning": {} })),
        );
    let service = service_with(generator, MockResearch::ok("notes"));

    let err = service
        .generate_screener_filters("nothing fits", None, "gpt-4o-mini")
        .await
        .unwrap_err();
    assert!(matches!(err, PredictionError::Screener(_)));
}
