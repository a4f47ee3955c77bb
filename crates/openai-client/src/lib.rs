//! Structured-output client for the OpenAI chat completions API.
//!
//! Each invocation renders one registry template and issues exactly one
//! request with a `json_schema` response format, so the provider constrains
//! its reply to the template's expected shape. Template validation failures
//! return before any network I/O; provider and parse failures surface as
//! `PredictionError::Provider`. Retrying is left to the caller.

use async_trait::async_trait;
use prediction_core::{PredictionError, StructuredGenerator, Template, TemplateVars};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

const BASE_URL: &str = "https://api.openai.com/v1/chat/completions";
const REQUEST_TIMEOUT_SECS: u64 = 60;

#[derive(Clone)]
pub struct OpenAiClient {
    api_key: String,
    client: Client,
}

impl OpenAiClient {
    /// Build a client from the `OPENAI_API_KEY` environment variable.
    pub fn from_env() -> Result<Self, PredictionError> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| PredictionError::Configuration("OpenAI API key not configured".into()))?;
        Ok(Self::new(api_key))
    }

    pub fn new(api_key: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self { api_key, client }
    }

    /// Render a template and request a schema-constrained completion.
    pub async fn process_template(
        &self,
        template: Template,
        variables: TemplateVars,
        model: &str,
    ) -> Result<Value, PredictionError> {
        let schema = template.response_schema().ok_or_else(|| {
            PredictionError::InvalidData(format!(
                "template '{template}' has no structured output shape"
            ))
        })?;

        let user_prompt = template.render(&variables)?;

        let request = ChatRequest {
            model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: template.system_prompt().to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: user_prompt,
                },
            ],
            response_format: ResponseFormat {
                format_type: "json_schema",
                json_schema: JsonSchemaFormat {
                    name: template.name(),
                    schema,
                    strict: true,
                },
            },
        };

        tracing::debug!(template = %template, model, "requesting structured completion");

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

        let completion: ChatResponse = response
            .json()
            .await
            .map_err(|e| PredictionError::Provider(e.to_string()))?;

        let message = completion
            .choices
            .into_iter()
            .next()
            .map(|c| c.message)
            .ok_or_else(|| PredictionError::Provider("empty completion choices".to_string()))?;

        if let Some(refusal) = message.refusal {
            return Err(PredictionError::Provider(format!(
                "model refused the request: {refusal}"
            )));
        }

        let content = message
            .content
            .ok_or_else(|| PredictionError::Provider("completion had no content".to_string()))?;

        serde_json::from_str(&content).map_err(|e| {
            PredictionError::Provider(format!("completion did not match expected shape: {e}"))
        })
    }
}

#[async_trait]
impl StructuredGenerator for OpenAiClient {
    async fn generate(
        &self,
        template: Template,
        variables: TemplateVars,
        model: &str,
    ) -> Result<Value, PredictionError> {
        self.process_template(template, variables, model).await
    }
}

// Wire types

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    response_format: ResponseFormat<'a>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ResponseFormat<'a> {
    #[serde(rename = "type")]
    format_type: &'static str,
    json_schema: JsonSchemaFormat<'a>,
}

#[derive(Debug, Serialize)]
struct JsonSchemaFormat<'a> {
    name: &'a str,
    schema: Value,
    strict: bool,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    refusal: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn request_serializes_json_schema_format() {
        let request = ChatRequest {
            model: "gpt-4o-mini",
            messages: vec![ChatMessage {
                role: "system",
                content: "be brief".into(),
            }],
            response_format: ResponseFormat {
                format_type: "json_schema",
                json_schema: JsonSchemaFormat {
                    name: "prediction_analysis",
                    schema: Template::PredictionAnalysis.response_schema().unwrap(),
                    strict: true,
                },
            },
        };
        let wire = serde_json::to_value(&request).unwrap();
        assert_eq!(wire["response_format"]["type"], "json_schema");
        assert_eq!(
            wire["response_format"]["json_schema"]["name"],
            "prediction_analysis"
        );
        assert_eq!(wire["response_format"]["json_schema"]["strict"], true);
    }

    #[test]
    fn response_parses_assistant_content() {
        let body = r#"{
            "choices": [
                {"message": {"role": "assistant", "content": "{\"tickers\": [\"JPM\"]}"}}
            ]
        }"#;
        let parsed: ChatResponse = serde_json::from_str(body).unwrap();
        let content = parsed.choices[0].message.content.as_deref().unwrap();
        let value: Value = serde_json::from_str(content).unwrap();
        assert_eq!(value["tickers"][0], "JPM");
    }

    #[tokio::test]
    async fn missing_variable_fails_before_any_request() {
        let client = OpenAiClient::new("test-key".into());
        let err = client
            .process_template(Template::TickerFinder, HashMap::new(), "gpt-4o-mini")
            .await
            .unwrap_err();
        assert!(matches!(err, PredictionError::MissingVariables(_)));
    }

    #[tokio::test]
    async fn research_template_is_rejected() {
        let client = OpenAiClient::new("test-key".into());
        let mut vars = HashMap::new();
        vars.insert("prediction_text".to_string(), "oil up".to_string());
        let err = client
            .process_template(Template::MarketResearch, vars, "gpt-4o-mini")
            .await
            .unwrap_err();
        assert!(matches!(err, PredictionError::InvalidData(_)));
    }
}
