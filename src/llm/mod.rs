//! LLM integration for LeadFlow.
//!
//! The pipeline talks to a text-completion backend through the
//! [`TextCompletion`] trait so tests can substitute a scripted fake.
//! The production backend speaks the OpenAI-compatible chat-completions
//! API over HTTP.

pub mod decode;
pub mod provider;

pub use provider::{
    ChatMessage, CompletionRequest, CompletionResponse, OpenAiProvider, Role, TextCompletion,
};

use std::sync::Arc;

use crate::error::LlmError;

/// Configuration for creating an LLM provider.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: secrecy::SecretString,
    pub model: String,
    /// Override the API base URL (for proxies or compatible servers).
    pub base_url: Option<String>,
}

impl LlmConfig {
    /// Build config from environment variables.
    /// Returns `None` if `OPENAI_API_KEY` is not set.
    pub fn from_env() -> Option<Self> {
        let api_key = std::env::var("OPENAI_API_KEY").ok()?;
        let model =
            std::env::var("LEADFLOW_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string());
        let base_url = std::env::var("OPENAI_BASE_URL").ok();

        Some(Self {
            api_key: secrecy::SecretString::from(api_key),
            model,
            base_url,
        })
    }
}

/// Create an LLM provider from configuration.
pub fn create_provider(config: &LlmConfig) -> Result<Arc<dyn TextCompletion>, LlmError> {
    let provider = OpenAiProvider::new(config.clone());
    tracing::info!("Using OpenAI-compatible backend (model: {})", config.model);
    Ok(Arc::new(provider))
}
