//! OpenAI-compatible client configuration.
//!
//! Both the embedder and the chat model talk to an OpenAI-compatible endpoint.
//! By default this is a local Ollama server, but any server that implements
//! `/v1/embeddings` and `/v1/chat/completions` works.

use crate::config::LlmSettings;
use crate::error::{Result, SporError};
use async_openai::{config::OpenAIConfig, Client};
use std::time::Duration;

/// Shared client type for all model calls.
pub type OpenAIClient = Client<OpenAIConfig>;

/// Create a client for the configured endpoint.
///
/// The API key falls back to `OPENAI_API_KEY`; local servers accept any key.
pub fn create_client(settings: &LlmSettings) -> Result<OpenAIClient> {
    let mut config = OpenAIConfig::new().with_api_base(settings.api_base.trim_end_matches('/'));

    if let Some(key) = settings.resolved_api_key() {
        config = config.with_api_key(key);
    }

    let mut builder = reqwest::Client::builder();
    if let Some(secs) = settings.timeout_secs {
        builder = builder.timeout(Duration::from_secs(secs));
    }

    let http_client = builder
        .build()
        .map_err(|e| SporError::Config(format!("Failed to create HTTP client: {}", e)))?;

    Ok(Client::with_config(config).with_http_client(http_client))
}
