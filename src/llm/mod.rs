//! Language model access.

mod openai;

pub use openai::OpenAIChatModel;

use crate::error::Result;
use async_trait::async_trait;

/// Trait for text completion.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Send a prompt and return the model's raw text output.
    async fn complete(&self, prompt: &str) -> Result<String>;
}
