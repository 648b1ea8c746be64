//! Context retrieval and composition for RAG responses.

use crate::embedding::Embedder;
use crate::error::Result;
use crate::index::{MemoryIndex, SearchResult};
use tracing::{debug, instrument};

/// Retrieved context ready to be placed in a prompt.
#[derive(Debug, Clone)]
pub struct ComposedContext {
    /// Chunk contents joined by the separator, in result order.
    pub text: String,
    /// The chunks that make up `text`.
    pub sources: Vec<SearchResult>,
}

/// Builds context from the session index for a query.
#[derive(Debug, Clone)]
pub struct ContextBuilder {
    k: usize,
    separator: String,
}

impl Default for ContextBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ContextBuilder {
    /// Create a new context builder.
    pub fn new() -> Self {
        Self {
            k: 2,
            separator: " ".to_string(),
        }
    }

    /// Set the number of chunks to retrieve.
    pub fn with_k(mut self, k: usize) -> Self {
        self.k = k;
        self
    }

    /// Set the separator placed between chunks.
    pub fn with_separator(mut self, separator: &str) -> Self {
        self.separator = separator.to_string();
        self
    }

    /// Find the `k` chunks nearest to the query.
    #[instrument(skip(self, index, embedder), fields(k = self.k))]
    pub async fn retrieve(
        &self,
        query: &str,
        index: &MemoryIndex,
        embedder: &dyn Embedder,
    ) -> Result<Vec<SearchResult>> {
        let query_embedding = embedder.embed(query).await?;
        Ok(index.search(&query_embedding, self.k))
    }

    /// Retrieve and concatenate context for a query.
    pub async fn build(
        &self,
        query: &str,
        index: &MemoryIndex,
        embedder: &dyn Embedder,
    ) -> Result<ComposedContext> {
        let sources = self.retrieve(query, index, embedder).await?;
        let text = self.compose(&sources);

        debug!("Composed {} characters of context from {} chunks", text.len(), sources.len());
        Ok(ComposedContext { text, sources })
    }

    /// Join chunk contents with the separator, in result order.
    pub fn compose(&self, results: &[SearchResult]) -> String {
        results
            .iter()
            .map(|r| r.chunk.content.as_str())
            .collect::<Vec<_>>()
            .join(&self.separator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunking::TextChunk;
    use crate::index::IndexedChunk;
    use crate::test_support::{FailingEmbedder, HashEmbedder};

    async fn index_of(texts: &[&str]) -> MemoryIndex {
        let chunks = texts
            .iter()
            .enumerate()
            .map(|(order, t)| TextChunk {
                content: t.to_string(),
                source_name: "doc.txt".to_string(),
                order,
            })
            .collect();
        MemoryIndex::build(chunks, &HashEmbedder::default()).await.unwrap()
    }

    #[tokio::test]
    async fn test_build_joins_in_result_order() {
        let index = index_of(&["cats purr softly", "the sky is blue", "dogs bark loudly"]).await;
        let builder = ContextBuilder::new().with_k(2).with_separator(" | ");

        let context = builder
            .build("what color is the sky", &index, &HashEmbedder::default())
            .await
            .unwrap();

        assert_eq!(context.sources.len(), 2);
        assert_eq!(context.sources[0].chunk.content, "the sky is blue");
        let expected = format!(
            "{} | {}",
            context.sources[0].chunk.content, context.sources[1].chunk.content
        );
        assert_eq!(context.text, expected);
    }

    #[tokio::test]
    async fn test_k_larger_than_index_returns_all() {
        let index = index_of(&["one", "two", "three"]).await;
        let builder = ContextBuilder::new().with_k(10);

        let results = builder.retrieve("one", &index, &HashEmbedder::default()).await.unwrap();
        assert_eq!(results.len(), 3);

        let mut contents: Vec<&str> = results.iter().map(|r| r.chunk.content.as_str()).collect();
        contents.sort();
        assert_eq!(contents, vec!["one", "three", "two"]);
    }

    #[tokio::test]
    async fn test_empty_index_gives_empty_context() {
        let builder = ContextBuilder::default();
        let context = builder
            .build("anything", &MemoryIndex::new(), &HashEmbedder::default())
            .await
            .unwrap();
        assert!(context.text.is_empty());
        assert!(context.sources.is_empty());
    }

    #[tokio::test]
    async fn test_query_embedding_failure_is_surfaced() {
        let index = MemoryIndex::from_entries(vec![IndexedChunk {
            chunk: TextChunk {
                content: "x".to_string(),
                source_name: "doc.txt".to_string(),
                order: 0,
            },
            embedding: vec![1.0],
        }]);
        let result = ContextBuilder::new().build("q", &index, &FailingEmbedder).await;
        assert!(result.is_err());
    }
}
