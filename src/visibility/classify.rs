//! Structured extraction of brand visibility from raw provider answers
//!
//! The classifier contract is strict JSON: `{ sentiment, cited: [...] }`.
//! Any non-conforming output is a fatal classification error for that
//! prompt; it never stops the rest of the batch.

use crate::error::AppError;
use crate::providers::OpenAiClient;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Overall sentiment towards the main brand
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

impl Sentiment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Positive => "positive",
            Sentiment::Neutral => "neutral",
            Sentiment::Negative => "negative",
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Relationship of a cited page to the main brand
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceType {
    Competitor,
    Owned,
    Publisher,
    Community,
    Other,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::Competitor => "Competitor",
            SourceType::Owned => "Owned",
            SourceType::Publisher => "Publisher",
            SourceType::Community => "Community",
            SourceType::Other => "Other",
        }
    }
}

/// One cited page from the provider answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CitedSource {
    pub url: String,
    #[serde(default)]
    pub domain: String,
    #[serde(default)]
    pub brand_name: String,
    pub is_mentioned: bool,
    #[serde(rename = "type")]
    pub source_type: SourceType,
}

/// Classifier output for one prompt run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub sentiment: Sentiment,
    #[serde(default)]
    pub cited: Vec<CitedSource>,
}

/// Parse the raw classifier reply against the strict contract
pub fn parse_classification(raw: &str) -> Result<Classification, AppError> {
    serde_json::from_str(raw).map_err(|e| {
        AppError::Classification(format!("output does not match contract: {}", e))
    })
}

/// Turns a raw provider answer into a structured classification
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(
        &self,
        brand_name: &str,
        response_text: &str,
    ) -> Result<Classification, AppError>;
}

fn system_prompt(brand_name: &str) -> String {
    format!(
        r#"You are "BrandVisibilityScorer," a strict analyst.
ONLY use the provided result from web search. Do not fetch or assume anything. The main brand name: {brand_name}
Respond ONLY in JSON format
Example of JSON output:
{{
  "sentiment": "positive",
  "cited": [
    {{
        "url": "https://amazon.com/kindle-dbs/ku/sign-up",
        "domain": "amazon.com",
        "brandName": "Amazon",
        "isMentioned": true,
        "type": "Competitor"
    }},
    {{
        "url": "https://reddit.com/plus",
        "domain": "reddit.com",
        "brandName": "Reddit",
        "isMentioned": true,
        "type": "Community"
    }}
  ]
}}
"url" must be the full url of the source where the information was found.
"isMentioned" is whether {brand_name} is mentioned on that page.
"type" is one of Competitor, Owned, Publisher, Community, Other.
Make analysis of the text in the prompt, which may be a search result snippet.
When given a single prompt, return:
- response in JSON with these fields:
- sentiment: overall sentiment towards the MAIN BRAND in the prompt (one of "positive", "neutral", "negative").
Keep it concise."#
    )
}

/// OpenAI-backed classifier using the JSON-mode extraction call
pub struct OpenAiClassifier {
    client: Arc<OpenAiClient>,
}

impl OpenAiClassifier {
    pub fn new(client: Arc<OpenAiClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Classifier for OpenAiClassifier {
    async fn classify(
        &self,
        brand_name: &str,
        response_text: &str,
    ) -> Result<Classification, AppError> {
        let raw = self
            .client
            .json_completion(&system_prompt(brand_name), response_text)
            .await?;
        parse_classification(&raw)
    }
}
