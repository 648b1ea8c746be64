//! Chat completions over an OpenAI-compatible endpoint.

use super::LanguageModel;
use crate::config::LlmSettings;
use crate::error::{Result, SporError};
use crate::openai::{create_client, OpenAIClient};
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestUserMessageArgs,
    CreateChatCompletionRequestArgs,
};
use async_trait::async_trait;
use tracing::{debug, instrument};

/// OpenAI-compatible chat model.
pub struct OpenAIChatModel {
    client: OpenAIClient,
    model: String,
    temperature: Option<f32>,
}

impl OpenAIChatModel {
    /// Create a chat model for the configured endpoint.
    pub fn new(settings: &LlmSettings) -> Result<Self> {
        Ok(Self::with_client(create_client(settings)?, &settings.model, settings.temperature))
    }

    /// Create a chat model from an existing client.
    pub fn with_client(client: OpenAIClient, model: &str, temperature: Option<f32>) -> Self {
        Self {
            client,
            model: model.to_string(),
            temperature,
        }
    }

    /// The chat model name.
    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl LanguageModel for OpenAIChatModel {
    #[instrument(skip(self, prompt), fields(model = %self.model, prompt_len = prompt.len()))]
    async fn complete(&self, prompt: &str) -> Result<String> {
        let message = ChatCompletionRequestUserMessageArgs::default()
            .content(prompt)
            .build()
            .map_err(|e| SporError::Llm(e.to_string()))?;

        let messages: Vec<ChatCompletionRequestMessage> = vec![message.into()];

        let mut args = CreateChatCompletionRequestArgs::default();
        args.model(&self.model).messages(messages);
        if let Some(temperature) = self.temperature {
            args.temperature(temperature);
        }
        let request = args.build().map_err(|e| SporError::Llm(e.to_string()))?;

        let response = self.client.chat().create(request).await.map_err(|e| {
            SporError::OpenAI(format!("Failed to generate response: {}", e))
        })?;

        let answer = response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| SporError::Llm("Empty response from model".to_string()))?;

        debug!("Model returned {} characters", answer.len());
        Ok(answer)
    }
}
