//! OpenAI Responses-API client
//!
//! Two call shapes: a web-search run that produces the raw answer text, and
//! a JSON-mode call used by the classifier for structured extraction.

use crate::config::OpenAiConfig;
use crate::error::AppError;
use crate::providers::Provider;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

#[derive(Clone)]
pub struct OpenAiClient {
    http: reqwest::Client,
    config: OpenAiConfig,
}

#[derive(Deserialize)]
struct ResponsesApiResponse {
    output: Vec<OutputItem>,
}

#[derive(Deserialize)]
struct OutputItem {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    content: Vec<ContentItem>,
}

#[derive(Deserialize)]
struct ContentItem {
    text: Option<String>,
}

impl OpenAiClient {
    pub fn new(config: OpenAiConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    /// Web-search run: the model answers the prompt grounded in live search
    /// results. Returns the raw answer text.
    pub async fn web_search(&self, user_content: &str) -> Result<String, AppError> {
        let body = json!({
            "model": self.config.model,
            "input": [{ "role": "user", "content": user_content }],
            "reasoning": { "effort": "low" },
            "max_output_tokens": 1400,
            "tools": [{ "type": "web_search" }],
        });
        self.call(&self.config.web_search_api_key, body).await
    }

    /// Plain completion without search grounding; used as the fallback when
    /// the web-search endpoint is unavailable.
    pub async fn completion(&self, user_content: &str) -> Result<String, AppError> {
        let body = json!({
            "model": self.config.model,
            "input": [{ "role": "user", "content": user_content }],
            "max_output_tokens": 1400,
        });
        self.call(&self.config.api_key, body).await
    }

    /// JSON-mode call: the model must reply with a single JSON object.
    pub async fn json_completion(
        &self,
        system_content: &str,
        user_content: &str,
    ) -> Result<String, AppError> {
        let body = json!({
            "model": self.config.model,
            "input": [
                { "role": "system", "content": system_content },
                { "role": "user", "content": user_content },
            ],
            "text": { "format": { "type": "json_object" } },
        });
        self.call(&self.config.api_key, body).await
    }

    async fn call(&self, api_key: &str, body: serde_json::Value) -> Result<String, AppError> {
        if api_key.is_empty() {
            return Err(AppError::Provider("OpenAI API key is not set".to_string()));
        }

        let response = self
            .http
            .post(format!("{}/responses", self.config.base_url))
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Provider(format!("OpenAI request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(AppError::Provider(format!(
                "OpenAI error {}: {}",
                status, text
            )));
        }

        let parsed: ResponsesApiResponse = response
            .json()
            .await
            .map_err(|e| AppError::Provider(format!("OpenAI response decode failed: {}", e)))?;

        extract_output_text(parsed)
    }
}

fn extract_output_text(response: ResponsesApiResponse) -> Result<String, AppError> {
    response
        .output
        .into_iter()
        .find(|item| item.kind == "message")
        .and_then(|item| item.content.into_iter().next())
        .and_then(|content| content.text)
        .ok_or_else(|| {
            AppError::Provider("OpenAI response did not contain output text".to_string())
        })
}

/// Web-search-grounded provider, the primary half of the openai-gpt pair
pub struct OpenAiWebSearchProvider {
    client: Arc<OpenAiClient>,
}

impl OpenAiWebSearchProvider {
    pub fn new(client: Arc<OpenAiClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Provider for OpenAiWebSearchProvider {
    fn name(&self) -> &'static str {
        "openai-gpt"
    }

    async fn run(&self, prompt: &str) -> Result<String, AppError> {
        self.client.web_search(prompt).await
    }
}

/// Plain-completion provider, the fallback half of the openai-gpt pair
pub struct OpenAiCompletionProvider {
    client: Arc<OpenAiClient>,
}

impl OpenAiCompletionProvider {
    pub fn new(client: Arc<OpenAiClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Provider for OpenAiCompletionProvider {
    fn name(&self) -> &'static str {
        "openai-gpt"
    }

    async fn run(&self, prompt: &str) -> Result<String, AppError> {
        self.client.completion(prompt).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response_from(json: serde_json::Value) -> ResponsesApiResponse {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_extract_output_text_finds_message_item() {
        let response = response_from(serde_json::json!({
            "output": [
                { "type": "reasoning" },
                { "type": "message", "content": [{ "text": "the answer" }] }
            ]
        }));
        assert_eq!(extract_output_text(response).unwrap(), "the answer");
    }

    #[test]
    fn test_extract_output_text_errors_without_message() {
        let response = response_from(serde_json::json!({
            "output": [{ "type": "reasoning" }]
        }));
        let err = extract_output_text(response).unwrap_err();
        assert!(err.to_string().contains("did not contain output text"));
    }

    #[tokio::test]
    async fn test_missing_api_key_is_an_error() {
        let client = OpenAiClient::new(crate::config::Config::default().openai);
        let err = client.web_search("prompt").await.unwrap_err();
        assert!(err.to_string().contains("API key is not set"));
    }
}
