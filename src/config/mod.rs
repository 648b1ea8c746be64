//! Configuration module for Spor.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{Prompts, RagPrompts};
pub use settings::{
    ChunkingSettings, EmbeddingSettings, GeneralSettings, HistorySettings, LlmSettings,
    PromptSettings, RetrievalSettings, Settings, SourceSettings,
};
