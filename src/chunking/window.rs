//! Fixed-size sliding window chunking.

use super::{Chunker, ChunkingConfig};

/// Sliding window chunker.
///
/// Every window holds at most `chunk_size` characters and starts
/// `chunk_size - chunk_overlap` characters after the previous one, so
/// neighbours share exactly `chunk_overlap` characters. Only the last window
/// may be shorter.
pub struct WindowChunker {
    config: ChunkingConfig,
}

impl WindowChunker {
    pub fn new(config: ChunkingConfig) -> Self {
        Self { config }
    }
}

impl Chunker for WindowChunker {
    fn split(&self, text: &str) -> Vec<String> {
        let mut chunks = Vec::new();

        if text.trim().is_empty() {
            return chunks;
        }

        // Byte offset of every character boundary, including the end.
        let boundaries: Vec<usize> = text
            .char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(text.len()))
            .collect();
        let total_chars = boundaries.len() - 1;

        let step = self.config.chunk_size.saturating_sub(self.config.chunk_overlap).max(1);
        let mut start = 0;

        loop {
            let end = (start + self.config.chunk_size).min(total_chars);
            chunks.push(text[boundaries[start]..boundaries[end]].to_string());

            if end == total_chars {
                break;
            }
            start += step;
        }

        chunks
    }
}
