//! Semantic index over embedded chunks.
//!
//! The index lives for one session and is rebuilt from scratch whenever the
//! source changes. Lookup is an exact cosine-similarity scan.

mod memory;

pub use memory::MemoryIndex;

use crate::chunking::TextChunk;

/// A chunk together with its embedding.
#[derive(Debug, Clone)]
pub struct IndexedChunk {
    pub chunk: TextChunk,
    pub embedding: Vec<f32>,
}

/// A search result with score.
#[derive(Debug, Clone)]
pub struct SearchResult {
    /// The matched chunk.
    pub chunk: TextChunk,
    /// Similarity score (higher is better).
    pub score: f32,
}

/// Compute cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}
