//! Web-search-augmented research client for the Perplexity API.
//!
//! Single call per query, no retry; failures surface as
//! `PredictionError::Provider` and the caller decides what to do with them
//! (the pipeline treats research failures as non-fatal).

use async_trait::async_trait;
use prediction_core::{PredictionError, ResearchProvider};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const BASE_URL: &str = "https://api.perplexity.ai/chat/completions";
const REQUEST_TIMEOUT_SECS: u64 = 30;

const SYSTEM_PROMPT: &str = "Be precise and concise. Provide comprehensive and accurate \
     information based on web search results.";

/// Instructional wrapper applied to every market query so the provider
/// always cites ticker symbols for the companies it mentions.
const MARKET_QUERY_WRAPPER: &str = "Provide detailed market research information about:\n\
     {query}\n\n\
     Focus on:\n\
     - Public companies that might be affected (ALWAYS include stock tickers)\n\
     - List several specific stock tickers directly related to this topic\n\
     - Industry trends and recent market developments\n\
     - Analyst opinions and market forecasts\n\
     - Current market conditions related to this topic\n\n\
     IMPORTANT: For every company you mention, include its stock ticker symbol in parentheses.\n\
     Be specific about why each company/ticker is relevant to the query.";

#[derive(Clone)]
pub struct PerplexityClient {
    api_key: String,
    client: Client,
}

impl PerplexityClient {
    /// Build a client from the `PERPLEXITY_API_KEY` environment variable.
    pub fn from_env() -> Result<Self, PredictionError> {
        let api_key = std::env::var("PERPLEXITY_API_KEY").map_err(|_| {
            PredictionError::Configuration("Perplexity API key not configured".into())
        })?;
        Ok(Self::new(api_key))
    }

    pub fn new(api_key: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self { api_key, client }
    }

    /// Raw web search, returning the first choice's text content.
    pub async fn search(&self, query: &str, model: &str) -> Result<String, PredictionError> {
        let request = SearchRequest {
            model,
            messages: vec![
                Message {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                Message {
                    role: "user",
                    content: query,
                },
            ],
            max_tokens: 1024,
            temperature: 0.2,
            top_p: 0.9,
            return_images: false,
            return_related_questions: false,
            stream: false,
            web_search_options: WebSearchOptions {
                search_context_size: "high",
            },
        };

        tracing::debug!(model, "issuing research query");

        let response = self
            .client
            .post(BASE_URL)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| PredictionError::Provider(e.to_string()))?;

        if !response.status().is_success() {
            return Err(PredictionError::Provider(format!(
                "HTTP {}: {}",
                response.status(),
                response.text().await.unwrap_or_default()
            )));
        }

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| PredictionError::Provider(e.to_string()))?;

        body.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| PredictionError::Provider("empty research response".to_string()))
    }

    /// Market-focused search with the always-cite-tickers wrapper.
    pub async fn search_market_info(
        &self,
        query: &str,
        model: &str,
    ) -> Result<String, PredictionError> {
        let wrapped = MARKET_QUERY_WRAPPER.replace("{query}", query);
        self.search(&wrapped, model).await
    }
}

#[async_trait]
impl ResearchProvider for PerplexityClient {
    async fn research(&self, query: &str, model: &str) -> Result<String, PredictionError> {
        self.search_market_info(query, model).await
    }
}

// Wire types

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    max_tokens: u32,
    temperature: f32,
    top_p: f32,
    return_images: bool,
    return_related_questions: bool,
    stream: bool,
    web_search_options: WebSearchOptions,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct WebSearchOptions {
    search_context_size: &'static str,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn market_wrapper_embeds_query_and_ticker_instruction() {
        let wrapped = MARKET_QUERY_WRAPPER.replace("{query}", "lithium demand doubles by 2027");
        assert!(wrapped.contains("lithium demand doubles by 2027"));
        assert!(wrapped.contains("ALWAYS include stock tickers"));
    }

    #[test]
    fn response_parses_first_choice_content() {
        let body = r#"{
            "id": "abc",
            "choices": [
                {"message": {"role": "assistant", "content": "Banks (JPM, BAC) would fall."}}
            ]
        }"#;
        let parsed: SearchResponse = serde_json::from_str(body).unwrap();
        assert_eq!(
            parsed.choices[0].message.content.as_deref(),
            Some("Banks (JPM, BAC) would fall.")
        );
    }

    #[test]
    fn request_carries_web_search_options() {
        let request = SearchRequest {
            model: "sonar",
            messages: vec![],
            max_tokens: 1024,
            temperature: 0.2,
            top_p: 0.9,
            return_images: false,
            return_related_questions: false,
            stream: false,
            web_search_options: WebSearchOptions {
                search_context_size: "high",
            },
        };
        let wire = serde_json::to_value(&request).unwrap();
        assert_eq!(wire["web_search_options"]["search_context_size"], "high");
        assert_eq!(wire["stream"], false);
    }
}
