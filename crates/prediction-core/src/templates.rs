//! Template registry driving the structured AI calls.
//!
//! Each template pairs a system prompt and a user-prompt skeleton with the
//! JSON schema the provider must constrain its output to. Templates are a
//! closed enumeration so an unknown template cannot survive compilation.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::PredictionError;
use crate::industries::industry_prompt_list;
use crate::traits::TemplateVars;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Template {
    PredictionAnalysis,
    TickerFinder,
    InvestmentStrategy,
    MarketResearch,
    FinvizFilterSelection,
    FinvizFilterValues,
}

impl Template {
    pub fn name(&self) -> &'static str {
        match self {
            Template::PredictionAnalysis => "prediction_analysis",
            Template::TickerFinder => "ticker_finder",
            Template::InvestmentStrategy => "investment_strategy",
            Template::MarketResearch => "market_research",
            Template::FinvizFilterSelection => "finviz_filter_selection",
            Template::FinvizFilterValues => "finviz_filter_values",
        }
    }

    pub fn system_prompt(&self) -> &'static str {
        match self {
            Template::PredictionAnalysis => {
                "You are a financial prediction analyst with expertise in extracting key details \
                 from prediction statements. Analyze the prediction carefully, looking for explicit \
                 or implicit information about timing, confidence, risk tolerance, industries, and \
                 potential outcomes. When information is not explicitly stated, make reasonable \
                 inferences based on the context. For confidence and tolerance values, use a scale \
                 from 0.0 (lowest) to 1.0 (highest) in 0.1 increments.\n\n\
                 When identifying related industries, select from the standardized industry list \
                 provided to ensure compatibility with stock screening tools."
            }
            Template::TickerFinder => {
                "You are a financial research assistant specializing in finding relevant stock \
                 tickers based on predictions. Your task is to extract and identify the most \
                 relevant publicly traded companies (with their ticker symbols) from the provided \
                 market research.\n\n\
                 Focus on these criteria:\n\
                 1. Companies directly mentioned in the market research with their ticker symbols\n\
                 2. Companies highly likely to be impacted by the prediction (positively or negatively)\n\
                 3. Industry leaders in the affected sectors\n\n\
                 Be precise and focus on quality over quantity - include only tickers with clear \
                 relevance to the prediction. Include at least 5-10 tickers if possible, but \
                 prioritize relevance over quantity."
            }
            Template::InvestmentStrategy => {
                "You are an investment advisor creating actionable trading strategies based on \
                 market predictions. Design a comprehensive investment strategy that leverages the \
                 prediction, market research, and stock data provided.\n\n\
                 Your strategy should:\n\
                 1. Align with the prediction's timeframe and risk profile\n\
                 2. Include specific trades with price targets and allocation percentages\n\
                 3. Be based on concrete data from the market research and stock analysis\n\
                 4. Present a balanced assessment of potential risks and rewards\n\
                 5. Consider current market conditions and recent price movements\n\n\
                 Be realistic and precise - focus on actionable trades that directly relate to the \
                 prediction. For each trade, explain the rationale and how it aligns with the \
                 overall strategy."
            }
            Template::MarketResearch => {
                "You are a financial market researcher specializing in gathering relevant \
                 information about market predictions. Your task is to extract key insights and \
                 data points that provide context for a prediction about market movements, \
                 industry trends, or company performance. Focus on factual information and avoid \
                 speculative content."
            }
            Template::FinvizFilterSelection => {
                "You are a financial screening assistant that helps create stock screeners based \
                 on predictions. Your task is to analyze a prediction and select the most relevant \
                 screener filter categories to use. Focus on understanding each filter's purpose \
                 and selecting ones that would best identify stocks related to the prediction."
            }
            Template::FinvizFilterValues => {
                "You are a financial screening assistant that helps create stock screeners based \
                 on predictions. Your task is to analyze a prediction and select the most \
                 appropriate values for screener filters. For each filter, select the option that \
                 would best help identify stocks related to the prediction."
            }
        }
    }

    pub fn user_prompt(&self) -> &'static str {
        match self {
            Template::PredictionAnalysis => {
                "Analyze this prediction and extract key details: {prediction_text}\n\n\
                 Available Industry Categories for Related Industries:\n{industry_list}"
            }
            Template::TickerFinder => {
                "Extract relevant stock tickers from the following market research related to \
                 this prediction:\n\n\
                 Prediction: {prediction_text}\n\n\
                 Prediction Analysis: {prediction_analysis}\n\n\
                 {web_research}\n\n\
                 Available Industry Categories for Stock Screening:\n{industry_list}"
            }
            Template::InvestmentStrategy => {
                "Create a detailed investment strategy based on this prediction and market \
                 information:\n\n\
                 Prediction: {prediction_text}\n\n\
                 Prediction Analysis: {prediction_analysis}\n\n\
                 Relevant Tickers: {relevant_tickers}\n\n\
                 {market_research}\n\n\
                 {stock_data}"
            }
            Template::MarketResearch => {
                "Provide market research information about this prediction:\n\
                 \"{prediction_text}\"\n\n\
                 Focus on these industries: {industries}\n\
                 Timeframe: {timeframe}\n\n\
                 Include information about:\n\
                 - Public companies that might be affected (include stock tickers)\n\
                 - Specific stock tickers directly related to this prediction\n\
                 - Industry trends and recent developments\n\
                 - Market analysis and predictions\n\
                 - The likelihood of the prediction being correct\n\n\
                 IMPORTANT: Always include stock tickers when mentioning companies, and explain \
                 why each company/ticker is relevant to the prediction."
            }
            Template::FinvizFilterSelection => {
                "Select the most relevant screener filter categories for this prediction:\n\n\
                 Prediction: {prediction_text}\n\n\
                 Prediction Analysis: {prediction_analysis}\n\n\
                 Available Filters:\n{filter_info}\n\n\
                 Select 3-5 of the most relevant filters that would help find stocks related to \
                 this prediction.\n\n\
                 Important: Use the \"id\" field as the filter identifier in your response, not \
                 the \"name\" field."
            }
            Template::FinvizFilterValues => {
                "Select the most appropriate values for these screener filters based on this \
                 prediction:\n\n\
                 Prediction: {prediction_text}\n\n\
                 Prediction Analysis: {prediction_analysis}\n\n\
                 Filter Options:\n{filter_options}\n\n\
                 For each filter, select the SINGLE most appropriate option value that aligns \
                 with the prediction.\n\n\
                 Important: Use the full \"id\" field from the options as the value in your \
                 \"filters\" object."
            }
        }
    }

    pub fn required_vars(&self) -> &'static [&'static str] {
        match self {
            Template::PredictionAnalysis => &["prediction_text"],
            Template::TickerFinder => &["prediction_text", "prediction_analysis"],
            Template::InvestmentStrategy => {
                &["prediction_text", "prediction_analysis", "relevant_tickers"]
            }
            Template::MarketResearch => &["prediction_text"],
            Template::FinvizFilterSelection => {
                &["prediction_text", "prediction_analysis", "filter_info"]
            }
            Template::FinvizFilterValues => {
                &["prediction_text", "prediction_analysis", "filter_options"]
            }
        }
    }

    /// Defaults substituted for optional variables the caller did not supply
    pub fn optional_defaults(&self) -> Vec<(&'static str, String)> {
        match self {
            Template::PredictionAnalysis => {
                vec![("industry_list", industry_prompt_list().to_string())]
            }
            Template::TickerFinder => vec![
                ("web_research", String::new()),
                ("industry_list", industry_prompt_list().to_string()),
            ],
            Template::InvestmentStrategy => vec![
                ("market_research", String::new()),
                ("stock_data", String::new()),
            ],
            Template::MarketResearch => vec![
                ("industries", "relevant industries".to_string()),
                ("timeframe", "relevant timeframe".to_string()),
            ],
            Template::FinvizFilterSelection | Template::FinvizFilterValues => vec![],
        }
    }

    /// JSON schema the provider constrains its output to.
    ///
    /// None for templates that drive the free-text research provider.
    pub fn response_schema(&self) -> Option<Value> {
        let schema = match self {
            Template::PredictionAnalysis => json!({
                "type": "object",
                "properties": {
                    "timing": {
                        "type": "string",
                        "description": "In how many days, months, or years the prediction will come true"
                    },
                    "confidence": {
                        "type": "number",
                        "description": "Confidence level (0.0-1.0 in 0.1 intervals)"
                    },
                    "tolerance": {
                        "type": "number",
                        "description": "Risk tolerance level (0.0-1.0 in 0.1 intervals)"
                    },
                    "related_industries": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "List of industries related to the prediction"
                    },
                    "name": {
                        "type": "string",
                        "description": "Short name summarizing the prediction (5 words or less)"
                    },
                    "category": {
                        "type": "string",
                        "description": "Type of prediction (e.g., climate, political, invention)"
                    },
                    "best_case_scenario": { "type": "string" },
                    "worst_case_scenario": { "type": "string" }
                },
                "required": [
                    "timing", "confidence", "tolerance", "related_industries",
                    "name", "category", "best_case_scenario", "worst_case_scenario"
                ],
                "additionalProperties": false
            }),
            Template::TickerFinder => json!({
                "type": "object",
                "properties": {
                    "tickers": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "List of relevant ticker symbols"
                    }
                },
                "required": ["tickers"],
                "additionalProperties": false
            }),
            Template::InvestmentStrategy => json!({
                "type": "object",
                "properties": {
                    "name": {
                        "type": "string",
                        "description": "Short name summarizing the strategy (5 words or less)"
                    },
                    "description": { "type": "string" },
                    "pros": { "type": "array", "items": { "type": "string" } },
                    "cons": { "type": "array", "items": { "type": "string" } },
                    "timing": { "type": "string" },
                    "risk": {
                        "type": "number",
                        "description": "Risk level (0.0-1.0 in 0.1 intervals)"
                    },
                    "estimated_return": {
                        "type": "number",
                        "description": "Estimated percentage return"
                    },
                    "involved_tickers": { "type": "array", "items": { "type": "string" } },
                    "trades": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "ticker": { "type": "string" },
                                "price": { "type": "number" },
                                "volume": {
                                    "type": "number",
                                    "description": "Percentage of total capital to allocate"
                                },
                                "type": { "type": "string" },
                                "date": { "type": "string" }
                            },
                            "required": ["ticker", "price", "volume", "type", "date"],
                            "additionalProperties": false
                        }
                    }
                },
                "required": [
                    "name", "description", "pros", "cons", "timing", "risk",
                    "estimated_return", "involved_tickers", "trades"
                ],
                "additionalProperties": false
            }),
            Template::MarketResearch => return None,
            Template::FinvizFilterSelection => json!({
                "type": "object",
                "properties": {
                    "selected_filters": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "List of selected filter IDs"
                    },
                    "reasoning": {
                        "type": "object",
                        "additionalProperties": { "type": "string" },
                        "description": "Explanation for each selected filter"
                    }
                },
                "required": ["selected_filters", "reasoning"],
                "additionalProperties": false
            }),
            Template::FinvizFilterValues => json!({
                "type": "object",
                "properties": {
                    "filters": {
                        "type": "object",
                        "additionalProperties": { "type": "string" },
                        "description": "Mapping of filter ids to selected option IDs"
                    },
                    "selections": {
                        "type": "object",
                        "additionalProperties": { "type": "string" },
                        "description": "Explanation for each filter value selection"
                    }
                },
                "required": ["filters", "selections"],
                "additionalProperties": false
            }),
        };
        Some(schema)
    }

    /// Render the user prompt, filling defaults for absent optional variables.
    ///
    /// Fails before any substitution when a required variable is missing, and
    /// fails on any placeholder the completed variable set does not cover.
    pub fn render(&self, variables: &TemplateVars) -> Result<String, PredictionError> {
        let missing: Vec<&str> = self
            .required_vars()
            .iter()
            .filter(|v| !variables.contains_key(**v))
            .copied()
            .collect();
        if !missing.is_empty() {
            return Err(PredictionError::MissingVariables(missing.join(", ")));
        }

        let mut complete = variables.clone();
        for (name, default) in self.optional_defaults() {
            complete.entry(name.to_string()).or_insert(default);
        }

        substitute(self.user_prompt(), &complete)
    }
}

impl std::fmt::Display for Template {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Replace every `{name}` token in the skeleton with its variable value
fn substitute(skeleton: &str, vars: &TemplateVars) -> Result<String, PredictionError> {
    let mut out = String::with_capacity(skeleton.len());
    let mut rest = skeleton;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let Some(close) = after.find('}') else {
            // No closing brace: keep the tail verbatim
            out.push_str(&rest[open..]);
            return Ok(out);
        };
        let name = &after[..close];
        match vars.get(name) {
            Some(value) => out.push_str(value),
            None => return Err(PredictionError::PlaceholderMismatch(name.to_string())),
        }
        rest = &after[close + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> TemplateVars {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn render_fills_optional_defaults() {
        let rendered = Template::MarketResearch
            .render(&vars(&[("prediction_text", "oil will hit $100")]))
            .unwrap();
        assert!(rendered.contains("oil will hit $100"));
        assert!(rendered.contains("relevant industries"));
        assert!(rendered.contains("relevant timeframe"));
        assert!(!rendered.contains('{'));
    }

    #[test]
    fn render_missing_required_fails() {
        let err = Template::TickerFinder
            .render(&vars(&[("prediction_text", "x")]))
            .unwrap_err();
        match err {
            PredictionError::MissingVariables(names) => {
                assert!(names.contains("prediction_analysis"))
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn render_is_deterministic() {
        let v = vars(&[("prediction_text", "rates rise")]);
        let a = Template::PredictionAnalysis.render(&v).unwrap();
        let b = Template::PredictionAnalysis.render(&v).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn substitute_rejects_unknown_placeholder() {
        let err = substitute("hello {nobody}", &HashMap::new()).unwrap_err();
        assert!(matches!(err, PredictionError::PlaceholderMismatch(name) if name == "nobody"));
    }

    #[test]
    fn substitute_keeps_unterminated_brace() {
        let out = substitute("left {", &HashMap::new()).unwrap();
        assert_eq!(out, "left {");
    }

    #[test]
    fn research_template_has_no_schema() {
        assert!(Template::MarketResearch.response_schema().is_none());
        for t in [
            Template::PredictionAnalysis,
            Template::TickerFinder,
            Template::InvestmentStrategy,
            Template::FinvizFilterSelection,
            Template::FinvizFilterValues,
        ] {
            assert!(t.response_schema().is_some(), "{t} should have a schema");
        }
    }

    #[test]
    fn analysis_render_includes_industry_catalogue() {
        let rendered = Template::PredictionAnalysis
            .render(&vars(&[("prediction_text", "banks fall")]))
            .unwrap();
        assert!(rendered.contains("- Banks - Regional"));
    }
}
