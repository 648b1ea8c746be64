//! Error types for Spor.

use thiserror::Error;

/// Library-level error type for Spor operations.
#[derive(Error, Debug)]
pub enum SporError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to load source: {0}")]
    SourceLoad(String),

    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    #[error("Language model error: {0}")]
    Llm(String),

    #[error("OpenAI API error: {0}")]
    OpenAI(String),

    #[error("Chat history error: {0}")]
    History(String),

    #[error("No source loaded. Load a video or documents first.")]
    NoSourceLoaded,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("External tool not found: {0}. Please install it and ensure it's in your PATH.")]
    ToolNotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type alias for Spor operations.
pub type Result<T> = std::result::Result<T, SporError>;
