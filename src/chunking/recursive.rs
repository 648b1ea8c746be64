//! Separator-aware recursive chunking.
//!
//! Splits on the coarsest separator present (paragraphs, then lines, then
//! words, then characters), recursing into pieces that are still too large,
//! and merges small pieces back together up to the chunk size. Trailing
//! pieces of a finished chunk are carried into the next one as overlap.

use super::{char_len, Chunker, ChunkingConfig};
use std::collections::VecDeque;

/// Separators in order of preference. The empty separator splits characters.
const SEPARATORS: &[&str] = &["\n\n", "\n", " ", ""];

/// Recursive character chunker.
pub struct RecursiveChunker {
    config: ChunkingConfig,
}

impl RecursiveChunker {
    pub fn new(config: ChunkingConfig) -> Self {
        Self { config }
    }

    fn split_recursive(&self, text: &str, separators: &[&str]) -> Vec<String> {
        let position = separators
            .iter()
            .position(|sep| sep.is_empty() || text.contains(sep))
            .unwrap_or(separators.len().saturating_sub(1));
        let separator = separators.get(position).copied().unwrap_or("");
        let finer = separators.get(position + 1..).unwrap_or(&[]);

        let pieces: Vec<&str> = if separator.is_empty() {
            text.char_indices()
                .map(|(i, c)| &text[i..i + c.len_utf8()])
                .collect()
        } else {
            text.split(separator).filter(|p| !p.is_empty()).collect()
        };

        let mut result = Vec::new();
        let mut pending: Vec<&str> = Vec::new();

        for piece in pieces {
            if char_len(piece) < self.config.chunk_size {
                pending.push(piece);
                continue;
            }

            if !pending.is_empty() {
                result.extend(self.merge(&pending, separator));
                pending.clear();
            }

            if finer.is_empty() {
                result.push(piece.to_string());
            } else {
                result.extend(self.split_recursive(piece, finer));
            }
        }

        if !pending.is_empty() {
            result.extend(self.merge(&pending, separator));
        }

        result
    }

    /// Merge pieces into chunks no larger than the chunk size.
    fn merge(&self, pieces: &[&str], separator: &str) -> Vec<String> {
        let size = self.config.chunk_size;
        let overlap = self.config.chunk_overlap;
        let sep_len = char_len(separator);

        let mut chunks = Vec::new();
        let mut current: VecDeque<&str> = VecDeque::new();
        let mut total = 0usize;

        for &piece in pieces {
            let len = char_len(piece);
            let joiner = if current.is_empty() { 0 } else { sep_len };

            if total + len + joiner > size && !current.is_empty() {
                push_joined(&mut chunks, &current, separator);

                // Drop leading pieces until what remains fits as overlap and
                // leaves room for the incoming piece.
                while total > overlap || (total > 0 && total + len + sep_len > size) {
                    let Some(front) = current.pop_front() else {
                        break;
                    };
                    let removed_sep = if current.is_empty() { 0 } else { sep_len };
                    total -= char_len(front) + removed_sep;
                }
            }

            let joiner = if current.is_empty() { 0 } else { sep_len };
            total += len + joiner;
            current.push_back(piece);
        }

        push_joined(&mut chunks, &current, separator);
        chunks
    }
}

fn push_joined(chunks: &mut Vec<String>, pieces: &VecDeque<&str>, separator: &str) {
    let joined = pieces.iter().copied().collect::<Vec<_>>().join(separator);
    let trimmed = joined.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
}

impl Default for RecursiveChunker {
    fn default() -> Self {
        Self::new(ChunkingConfig::default())
    }
}

impl Chunker for RecursiveChunker {
    fn split(&self, text: &str) -> Vec<String> {
        if text.trim().is_empty() {
            return Vec::new();
        }
        self.split_recursive(text, SEPARATORS)
    }
}
