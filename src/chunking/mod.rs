//! Text chunking strategies for breaking source text into searchable pieces.
//!
//! Sizes are counted in characters (Unicode scalar values), never bytes, so a
//! chunk boundary never splits a code point.

mod recursive;
mod window;

pub use recursive::RecursiveChunker;
pub use window::WindowChunker;

use crate::error::{Result, SporError};
use crate::source::SourceDocument;
use serde::{Deserialize, Serialize};

/// A chunk of text from a loaded source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextChunk {
    /// Text content of this chunk.
    pub content: String,
    /// Name of the document (or video) the chunk came from.
    pub source_name: String,
    /// Position of this chunk across the whole source.
    pub order: usize,
}

/// Chunking strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ChunkingStrategy {
    /// Fixed-size sliding window with exact overlap.
    #[default]
    Window,
    /// Separator-aware recursive splitting (paragraphs, lines, words).
    Recursive,
}

impl std::str::FromStr for ChunkingStrategy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "window" => Ok(ChunkingStrategy::Window),
            "recursive" => Ok(ChunkingStrategy::Recursive),
            _ => Err(format!("Unknown chunking strategy: {}", s)),
        }
    }
}

impl std::fmt::Display for ChunkingStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChunkingStrategy::Window => write!(f, "window"),
            ChunkingStrategy::Recursive => write!(f, "recursive"),
        }
    }
}

/// Configuration for chunking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkingConfig {
    /// Maximum chunk size in characters.
    pub chunk_size: usize,
    /// Characters shared between neighbouring chunks.
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1500,
            chunk_overlap: 100,
        }
    }
}

impl ChunkingConfig {
    /// Create a validated chunking configuration.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        let config = Self {
            chunk_size,
            chunk_overlap,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check that the window advances on every step.
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(SporError::Config("chunk_size must be greater than 0".to_string()));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(SporError::Config(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        Ok(())
    }
}

/// Trait for text splitting implementations.
pub trait Chunker: Send + Sync {
    /// Split raw text into ordered pieces no larger than the configured size.
    fn split(&self, text: &str) -> Vec<String>;

    /// Split every document, in order, into chunks tagged with their source.
    fn chunk_documents(&self, documents: &[SourceDocument]) -> Vec<TextChunk> {
        let mut chunks = Vec::new();

        for doc in documents {
            for content in self.split(&doc.text) {
                chunks.push(TextChunk {
                    content,
                    source_name: doc.name.clone(),
                    order: chunks.len(),
                });
            }
        }

        chunks
    }
}

/// Create a chunker for the strategy.
pub fn create_chunker(
    strategy: ChunkingStrategy,
    config: ChunkingConfig,
) -> Result<Box<dyn Chunker>> {
    config.validate()?;
    Ok(match strategy {
        ChunkingStrategy::Window => Box::new(WindowChunker::new(config)),
        ChunkingStrategy::Recursive => Box::new(RecursiveChunker::new(config)),
    })
}

/// Number of characters in a string.
pub(crate) fn char_len(s: &str) -> usize {
    s.chars().count()
}
