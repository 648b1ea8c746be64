//! RAG response generation.

use crate::config::Prompts;
use crate::error::Result;
use crate::llm::LanguageModel;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Fills the answer template and asks the language model.
///
/// The template tells the model to answer from the context only and to say
/// so when the context is not enough. The output is not checked against the
/// context.
pub struct Responder {
    model: Arc<dyn LanguageModel>,
    prompts: Prompts,
}

impl Responder {
    /// Create a responder with the default prompts.
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self {
            model,
            prompts: Prompts::default(),
        }
    }

    /// Set custom prompts (with user-defined variables).
    pub fn with_prompts(mut self, prompts: Prompts) -> Self {
        self.prompts = prompts;
        self
    }

    /// Render the answer prompt for a question and its context.
    pub fn render_prompt(&self, question: &str, context: &str) -> String {
        let mut vars = HashMap::new();
        vars.insert("question".to_string(), question.to_string());
        vars.insert("context".to_string(), context.to_string());

        self.prompts.render_with_custom(&self.prompts.rag.answer, &vars)
    }

    /// Answer a question from the composed context.
    ///
    /// Returns the model output unmodified.
    #[instrument(skip(self, context), fields(question = %question))]
    pub async fn respond(&self, question: &str, context: &str) -> Result<String> {
        info!("Generating answer");

        let prompt = self.render_prompt(question, context);
        let answer = self.model.complete(&prompt).await?;

        debug!("Answer has {} characters", answer.len());
        Ok(answer)
    }
}
