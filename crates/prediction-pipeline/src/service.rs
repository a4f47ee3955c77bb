use std::collections::HashMap;
use std::sync::Arc;

use prediction_core::industries::{industry_filter_for, INDUSTRY_FILTER_ID};
use prediction_core::{
    GeneratedFilters, InvestmentStrategy, MarketData, PredictionAnalysis, PredictionError,
    PredictionOptions, PredictionOutcome, PredictionStatus, RelevantTickers, ResearchProvider,
    Screener, StructuredGenerator, Template, TemplateVars,
};
use serde_json::json;

use crate::enrichment;

/// Observer for stage transitions of a pipeline run.
///
/// The job tracker implements this to mirror progress into the store; the
/// synchronous endpoints run with [`NoopObserver`].
pub trait StageObserver: Send + Sync {
    fn on_transition(&self, status: PredictionStatus, message: &str, progress: f64);
}

pub struct NoopObserver;

impl StageObserver for NoopObserver {
    fn on_transition(&self, _status: PredictionStatus, _message: &str, _progress: f64) {}
}

/// Inputs for building an investment strategy.
///
/// Upstream artifacts are optional; the service computes any that are
/// missing before invoking the strategy template.
#[derive(Default)]
pub struct StrategyRequest {
    pub prediction_text: String,
    pub analysis: Option<PredictionAnalysis>,
    pub relevant_tickers: Option<RelevantTickers>,
    pub market_research: Option<String>,
    pub include_stock_data: bool,
    pub include_year_data: bool,
    pub include_week_data: bool,
    pub model: String,
}

/// Orchestrates the structured-output templates, the research provider and
/// the screener into prediction workflows.
pub struct PredictionService {
    generator: Arc<dyn StructuredGenerator>,
    research: Arc<dyn ResearchProvider>,
    market_data: Option<Arc<dyn MarketData>>,
    screener: Arc<dyn Screener>,
}

impl PredictionService {
    pub fn new(
        generator: Arc<dyn StructuredGenerator>,
        research: Arc<dyn ResearchProvider>,
        market_data: Option<Arc<dyn MarketData>>,
        screener: Arc<dyn Screener>,
    ) -> Self {
        Self {
            generator,
            research,
            market_data,
            screener,
        }
    }

    pub fn screener(&self) -> &dyn Screener {
        self.screener.as_ref()
    }

    /// Extract structured analysis (timing, confidence, industries, ...)
    /// from a prediction statement.
    pub async fn analyze_prediction(
        &self,
        prediction_text: &str,
        model: &str,
    ) -> Result<PredictionAnalysis, PredictionError> {
        let mut vars = TemplateVars::new();
        vars.insert("prediction_text".to_string(), prediction_text.to_string());

        let value = self
            .generator
            .generate(Template::PredictionAnalysis, vars, model)
            .await?;
        parse_payload(Template::PredictionAnalysis, value)
    }

    /// Gather free-text market research for a prediction via the
    /// web-search provider.
    pub async fn get_market_research(
        &self,
        prediction_text: &str,
        industries: &[String],
        timeframe: Option<&str>,
        search_model: &str,
    ) -> Result<String, PredictionError> {
        let mut vars = TemplateVars::new();
        vars.insert("prediction_text".to_string(), prediction_text.to_string());
        if !industries.is_empty() {
            vars.insert("industries".to_string(), industries.join(", "));
        }
        if let Some(tf) = timeframe {
            vars.insert("timeframe".to_string(), tf.to_string());
        }

        let query = Template::MarketResearch.render(&vars)?;
        self.research.research(&query, search_model).await
    }

    /// Find tickers relevant to a prediction. Computes the analysis (and,
    /// when requested, the research) if the caller did not supply them.
    pub async fn find_relevant_tickers(
        &self,
        prediction_text: &str,
        analysis: Option<PredictionAnalysis>,
        use_web_search: bool,
        search_model: &str,
        model: &str,
    ) -> Result<RelevantTickers, PredictionError> {
        let analysis = match analysis {
            Some(a) => a,
            None => self.analyze_prediction(prediction_text, model).await?,
        };

        let research = if use_web_search {
            match self
                .get_market_research(
                    prediction_text,
                    &analysis.related_industries,
                    Some(&analysis.timing),
                    search_model,
                )
                .await
            {
                Ok(content) => Some(content),
                Err(e) => {
                    tracing::warn!("market research for ticker finding failed: {e}");
                    None
                }
            }
        } else {
            None
        };

        self.tickers_from(prediction_text, &analysis, research.as_deref(), model)
            .await
    }

    async fn tickers_from(
        &self,
        prediction_text: &str,
        analysis: &PredictionAnalysis,
        research: Option<&str>,
        model: &str,
    ) -> Result<RelevantTickers, PredictionError> {
        let mut vars = TemplateVars::new();
        vars.insert("prediction_text".to_string(), prediction_text.to_string());
        vars.insert("prediction_analysis".to_string(), to_json_var(analysis)?);
        if let Some(content) = research {
            vars.insert(
                "web_research".to_string(),
                format!("Web Research Results:\n\n{content}"),
            );
        }

        let value = self
            .generator
            .generate(Template::TickerFinder, vars, model)
            .await?;
        parse_payload(Template::TickerFinder, value)
    }

    /// Build an investment strategy, computing any missing upstream
    /// artifacts first. Stock-data enrichment is best effort.
    pub async fn create_investment_strategy(
        &self,
        req: StrategyRequest,
    ) -> Result<InvestmentStrategy, PredictionError> {
        let analysis = match req.analysis {
            Some(a) => a,
            None => {
                self.analyze_prediction(&req.prediction_text, &req.model)
                    .await?
            }
        };
        let tickers = match req.relevant_tickers {
            Some(t) => t,
            None => {
                self.tickers_from(&req.prediction_text, &analysis, None, &req.model)
                    .await?
            }
        };

        self.strategy_from(
            &req.prediction_text,
            &analysis,
            &tickers,
            req.market_research.as_deref(),
            req.include_stock_data,
            req.include_year_data,
            req.include_week_data,
            &req.model,
        )
        .await
    }

    #[allow(clippy::too_many_arguments)]
    async fn strategy_from(
        &self,
        prediction_text: &str,
        analysis: &PredictionAnalysis,
        tickers: &RelevantTickers,
        market_research: Option<&str>,
        include_stock_data: bool,
        include_year_data: bool,
        include_week_data: bool,
        model: &str,
    ) -> Result<InvestmentStrategy, PredictionError> {
        let mut vars = TemplateVars::new();
        vars.insert("prediction_text".to_string(), prediction_text.to_string());
        vars.insert("prediction_analysis".to_string(), to_json_var(analysis)?);
        vars.insert("relevant_tickers".to_string(), to_json_var(tickers)?);
        if let Some(content) = market_research {
            vars.insert(
                "market_research".to_string(),
                format!("Market Research:\n\n{content}"),
            );
        }

        if include_stock_data {
            if let Some(market) = &self.market_data {
                let data = enrichment::collect_stock_data(
                    market.as_ref(),
                    &tickers.tickers,
                    include_year_data,
                    include_week_data,
                )
                .await;
                if !data.is_empty() {
                    vars.insert(
                        "stock_data".to_string(),
                        format!("Stock Data:\n\n{}", to_json_var(&data)?),
                    );
                }
            } else {
                tracing::warn!("stock data requested but no market data provider configured");
            }
        }

        let value = self
            .generator
            .generate(Template::InvestmentStrategy, vars, model)
            .await?;
        parse_payload(Template::InvestmentStrategy, value)
    }

    /// Run the full pipeline: analyze, optionally research, find tickers,
    /// build a strategy. Research failures are tolerated; every other
    /// stage failure aborts the run.
    pub async fn run_pipeline(
        &self,
        prediction_text: &str,
        options: &PredictionOptions,
        observer: &dyn StageObserver,
    ) -> Result<PredictionOutcome, PredictionError> {
        observer.on_transition(
            PredictionStatus::Analyzing,
            "Analyzing prediction text",
            10.0,
        );
        let analysis = self
            .analyze_prediction(prediction_text, &options.model)
            .await?;

        let mut market_research = None;
        if options.use_web_search {
            observer.on_transition(
                PredictionStatus::Researching,
                "Gathering market research",
                30.0,
            );
            match self
                .get_market_research(
                    prediction_text,
                    &analysis.related_industries,
                    Some(&analysis.timing),
                    &options.search_model,
                )
                .await
            {
                Ok(content) => market_research = Some(content),
                Err(e) => tracing::warn!("market research failed, continuing without it: {e}"),
            }
        }

        observer.on_transition(
            PredictionStatus::FindingTickers,
            "Finding relevant tickers",
            50.0,
        );
        let relevant_tickers = self
            .tickers_from(
                prediction_text,
                &analysis,
                market_research.as_deref(),
                &options.model,
            )
            .await?;

        observer.on_transition(
            PredictionStatus::CreatingStrategy,
            "Creating investment strategy",
            70.0,
        );
        let investment_strategy = self
            .strategy_from(
                prediction_text,
                &analysis,
                &relevant_tickers,
                market_research.as_deref(),
                options.include_stock_data,
                options.include_year_data,
                options.include_week_data,
                &options.model,
            )
            .await?;

        Ok(PredictionOutcome {
            prediction_text: prediction_text.to_string(),
            analysis,
            market_research,
            relevant_tickers,
            investment_strategy,
        })
    }

    /// Turn a prediction into concrete screener filters via two structured
    /// calls: pick relevant filter categories, then pick a value for each.
    pub async fn generate_screener_filters(
        &self,
        prediction_text: &str,
        analysis: Option<PredictionAnalysis>,
        model: &str,
    ) -> Result<GeneratedFilters, PredictionError> {
        let analysis = match analysis {
            Some(a) => a,
            None => self.analyze_prediction(prediction_text, model).await?,
        };
        let analysis_var = to_json_var(&analysis)?;

        let mut vars = TemplateVars::new();
        vars.insert("prediction_text".to_string(), prediction_text.to_string());
        vars.insert("prediction_analysis".to_string(), analysis_var.clone());
        vars.insert(
            "filter_info".to_string(),
            to_json_var(&self.screener.filter_info())?,
        );

        let value = self
            .generator
            .generate(Template::FinvizFilterSelection, vars, model)
            .await?;
        let selection: prediction_core::FilterSelection =
            parse_payload(Template::FinvizFilterSelection, value)?;

        if selection.selected_filters.is_empty() {
            return Err(PredictionError::Screener(
                "no screener filters were selected for the prediction".to_string(),
            ));
        }

        let options = self.screener.filter_options(&selection.selected_filters);

        let mut vars = TemplateVars::new();
        vars.insert("prediction_text".to_string(), prediction_text.to_string());
        vars.insert("prediction_analysis".to_string(), analysis_var);
        vars.insert("filter_options".to_string(), to_json_var(&options)?);

        let value = self
            .generator
            .generate(Template::FinvizFilterValues, vars, model)
            .await?;
        let values: prediction_core::FilterValueSelection =
            parse_payload(Template::FinvizFilterValues, value)?;

        let mut filters = values.filters;
        let mut selections = values.selections;

        // When the model picked no industry value, seed one from the
        // analysis' related industries.
        if !filters.contains_key(INDUSTRY_FILTER_ID) {
            if let Some(industry) = industry_filter_for(&analysis.related_industries) {
                filters.insert(INDUSTRY_FILTER_ID.to_string(), industry.to_string());
                selections.insert(
                    INDUSTRY_FILTER_ID.to_string(),
                    "Matched from the prediction's related industries".to_string(),
                );
            }
        }

        Ok(GeneratedFilters {
            filters,
            reasoning: json!({
                "filter_selection": selection.reasoning,
                "value_selection": selections,
            }),
        })
    }

    /// Run the screener with concrete filter values
    pub async fn run_screener(
        &self,
        filters: &HashMap<String, String>,
    ) -> Result<Vec<String>, PredictionError> {
        self.screener.run_screener(filters).await
    }
}

fn to_json_var<T: serde::Serialize>(value: &T) -> Result<String, PredictionError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| PredictionError::InvalidData(format!("failed to serialize prompt data: {e}")))
}

fn parse_payload<T: serde::de::DeserializeOwned>(
    template: Template,
    value: serde_json::Value,
) -> Result<T, PredictionError> {
    serde_json::from_value(value).map_err(|e| {
        PredictionError::Provider(format!(
            "{template} completion did not match the expected shape: {e}"
        ))
    })
}
