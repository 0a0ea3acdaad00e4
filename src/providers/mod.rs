//! AI provider adapters
//!
//! A provider takes a prompt and returns raw answer text or fails. The set
//! of providers is closed: names parse into `ProviderKind`, and anything
//! unknown becomes an explicit `Unsupported` variant instead of a silent
//! default branch.

use crate::error::AppError;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use tracing::warn;

pub mod openai;

pub use openai::OpenAiClient;

/// Provider capability: name plus a single run operation
#[async_trait]
pub trait Provider: Send + Sync {
    fn name(&self) -> &'static str;

    /// Run the prompt, returning raw answer text
    async fn run(&self, prompt: &str) -> Result<String, AppError>;
}

/// Closed set of provider identifiers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderKind {
    OpenAiGpt,
    PerplexityAi,
    Unsupported(String),
}

impl ProviderKind {
    pub fn parse(name: &str) -> Self {
        match name {
            "openai-gpt" => ProviderKind::OpenAiGpt,
            "perplexity-ai" => ProviderKind::PerplexityAi,
            other => ProviderKind::Unsupported(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ProviderKind::OpenAiGpt => "openai-gpt",
            ProviderKind::PerplexityAi => "perplexity-ai",
            ProviderKind::Unsupported(name) => name,
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Primary/fallback pair. The fallback only runs after the primary failed;
/// if both fail the fallback's error propagates.
pub struct FallbackProvider {
    primary: Arc<dyn Provider>,
    fallback: Arc<dyn Provider>,
}

impl FallbackProvider {
    pub fn new(primary: Arc<dyn Provider>, fallback: Arc<dyn Provider>) -> Self {
        Self { primary, fallback }
    }
}

#[async_trait]
impl Provider for FallbackProvider {
    fn name(&self) -> &'static str {
        self.primary.name()
    }

    async fn run(&self, prompt: &str) -> Result<String, AppError> {
        match self.primary.run(prompt).await {
            Ok(text) => Ok(text),
            Err(err) => {
                warn!(
                    primary = self.primary.name(),
                    fallback = self.fallback.name(),
                    error = %err,
                    "primary provider failed, trying fallback"
                );
                self.fallback.run(prompt).await
            }
        }
    }
}

/// Static table of implemented providers. Requested kinds without an entry
/// are skipped by the batch runner, not failed.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    openai: Option<Arc<dyn Provider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_openai(mut self, provider: Arc<dyn Provider>) -> Self {
        self.openai = Some(provider);
        self
    }

    pub fn get(&self, kind: &ProviderKind) -> Option<Arc<dyn Provider>> {
        match kind {
            ProviderKind::OpenAiGpt => self.openai.clone(),
            // Not implemented yet; the runner logs and skips it
            ProviderKind::PerplexityAi => None,
            ProviderKind::Unsupported(_) => None,
        }
    }
}
