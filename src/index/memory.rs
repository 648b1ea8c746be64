//! In-memory flat index.

use super::{cosine_similarity, IndexedChunk, SearchResult};
use crate::chunking::TextChunk;
use crate::embedding::Embedder;
use crate::error::{Result, SporError};
use tracing::{debug, info, instrument};

/// In-memory index holding one embedding per chunk.
#[derive(Debug, Clone, Default)]
pub struct MemoryIndex {
    entries: Vec<IndexedChunk>,
}

impl MemoryIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Embed every chunk and build an index over them.
    ///
    /// Embedding failures are returned as-is; nothing is retried.
    #[instrument(skip_all, fields(chunks = chunks.len()))]
    pub async fn build(chunks: Vec<TextChunk>, embedder: &dyn Embedder) -> Result<Self> {
        if chunks.is_empty() {
            return Ok(Self::new());
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let embeddings = embedder.embed_batch(&texts).await?;

        if embeddings.len() != chunks.len() {
            return Err(SporError::Embedding(format!(
                "Expected {} embeddings, got {}",
                chunks.len(),
                embeddings.len()
            )));
        }

        let entries = chunks
            .into_iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| IndexedChunk { chunk, embedding })
            .collect::<Vec<_>>();

        info!("Indexed {} chunks", entries.len());
        Ok(Self { entries })
    }

    /// Create an index from precomputed embeddings.
    pub fn from_entries(entries: Vec<IndexedChunk>) -> Self {
        Self { entries }
    }

    /// Number of indexed chunks.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index holds no chunks.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Indexed chunks in insertion order.
    pub fn entries(&self) -> &[IndexedChunk] {
        &self.entries
    }

    /// Return the `k` chunks most similar to the query embedding.
    ///
    /// Results are ordered by descending score; equal scores keep insertion
    /// order. A `k` larger than the index returns every chunk.
    pub fn search(&self, query_embedding: &[f32], k: usize) -> Vec<SearchResult> {
        let mut results: Vec<SearchResult> = self
            .entries
            .iter()
            .map(|entry| SearchResult {
                chunk: entry.chunk.clone(),
                score: cosine_similarity(query_embedding, &entry.embedding),
            })
            .collect();

        results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        results.truncate(k);

        debug!("Found {} matching chunks", results.len());
        results
    }
}
