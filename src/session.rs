//! Chat session for Spor.
//!
//! Ties the pipeline together: load a source, chunk and index it, then answer
//! questions against it while recording every exchange.

use crate::chunking::{create_chunker, Chunker, ChunkingConfig};
use crate::config::{Prompts, Settings};
use crate::embedding::{Embedder, OpenAIEmbedder};
use crate::error::{Result, SporError};
use crate::history::{ChatMessage, HistoryStore};
use crate::index::{MemoryIndex, SearchResult};
use crate::llm::{LanguageModel, OpenAIChatModel};
use crate::rag::{ContextBuilder, Responder};
use crate::source::{DefaultSourceLoader, Source, SourceLoader, SourceRef};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No source loaded yet.
    Empty,
    /// A source is being loaded and indexed.
    Loading,
    /// A source is indexed and questions can be asked.
    Ready,
    /// A question is being answered.
    Answering,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::Empty => write!(f, "empty"),
            SessionState::Loading => write!(f, "loading"),
            SessionState::Ready => write!(f, "ready"),
            SessionState::Answering => write!(f, "answering"),
        }
    }
}

/// Result of loading a source.
#[derive(Debug, Clone)]
pub struct LoadResult {
    /// The source that is now active.
    pub source: Source,
    /// Number of documents read.
    pub documents: usize,
    /// Number of chunks indexed.
    pub chunks: usize,
    /// Exchanges restored from history.
    pub exchanges: usize,
    /// Whether the source was already active and nothing was rebuilt.
    pub skipped: bool,
}

/// An answer with the chunks it was generated from.
#[derive(Debug, Clone)]
pub struct Answer {
    /// Raw model output.
    pub answer: String,
    /// Retrieved chunks, most similar first.
    pub sources: Vec<SearchResult>,
}

struct Active {
    source: Source,
    index: MemoryIndex,
    transcript: Vec<ChatMessage>,
}

/// A single-user chat session over one source at a time.
pub struct Session {
    loader: Arc<dyn SourceLoader>,
    chunker: Box<dyn Chunker>,
    embedder: Arc<dyn Embedder>,
    context: ContextBuilder,
    responder: Responder,
    history: Arc<HistoryStore>,
    state: SessionState,
    active: Option<Active>,
}

impl Session {
    /// Create a session from settings, talking to the configured endpoint.
    pub fn new(settings: &Settings) -> Result<Self> {
        let prompts = Prompts::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )?;

        let embedder = OpenAIEmbedder::new(&settings.llm, &settings.embedding)?;
        let model = OpenAIChatModel::new(&settings.llm)?;
        info!(
            "Using {} at {} (embeddings: {})",
            model.model(),
            settings.llm.api_base,
            embedder.model()
        );

        let loader = Arc::new(DefaultSourceLoader::new(&settings.source));
        let history = Arc::new(HistoryStore::open(&settings.sqlite_path())?);

        Self::with_components(
            settings,
            prompts,
            loader,
            Arc::new(embedder),
            Arc::new(model),
            history,
        )
    }

    /// Create a session with custom components.
    pub fn with_components(
        settings: &Settings,
        prompts: Prompts,
        loader: Arc<dyn SourceLoader>,
        embedder: Arc<dyn Embedder>,
        model: Arc<dyn LanguageModel>,
        history: Arc<HistoryStore>,
    ) -> Result<Self> {
        let config =
            ChunkingConfig::new(settings.chunking.chunk_size, settings.chunking.chunk_overlap)?;
        let chunker = create_chunker(settings.chunking.strategy, config)?;

        let context = ContextBuilder::new()
            .with_k(settings.retrieval.k)
            .with_separator(&settings.retrieval.separator);

        Ok(Self {
            loader,
            chunker,
            embedder,
            context,
            responder: Responder::new(model).with_prompts(prompts),
            history,
            state: SessionState::Empty,
            active: None,
        })
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The active source, if any.
    pub fn source(&self) -> Option<&Source> {
        self.active.as_ref().map(|a| &a.source)
    }

    /// The conversation so far for the active source.
    pub fn transcript(&self) -> &[ChatMessage] {
        self.active.as_ref().map(|a| a.transcript.as_slice()).unwrap_or(&[])
    }

    /// The index of the active source.
    pub fn index(&self) -> Option<&MemoryIndex> {
        self.active.as_ref().map(|a| &a.index)
    }

    /// Load a source, replacing the active one.
    ///
    /// On failure the session keeps whatever it had before.
    #[instrument(skip(self))]
    pub async fn load_source(&mut self, reference: &SourceRef) -> Result<LoadResult> {
        let source = reference.source();

        if let Some(active) = self.active.as_ref().filter(|a| a.source == source) {
            info!("Source {} is already loaded, skipping", source);
            return Ok(LoadResult {
                source,
                documents: 0,
                chunks: active.index.len(),
                exchanges: active.transcript.len() / 2,
                skipped: true,
            });
        }

        let previous = self.state;
        self.state = SessionState::Loading;

        match self.build(reference).await {
            Ok((active, documents)) => {
                let result = LoadResult {
                    source: active.source.clone(),
                    documents,
                    chunks: active.index.len(),
                    exchanges: active.transcript.len() / 2,
                    skipped: false,
                };
                info!(
                    "Loaded {} ({} documents, {} chunks, {} prior exchanges)",
                    result.source, result.documents, result.chunks, result.exchanges
                );
                self.active = Some(active);
                self.state = SessionState::Ready;
                Ok(result)
            }
            Err(e) => {
                warn!("Failed to load {}: {}", source, e);
                self.state = previous;
                Err(e)
            }
        }
    }

    async fn build(&self, reference: &SourceRef) -> Result<(Active, usize)> {
        let loaded = self.loader.load(reference).await?;
        let chunks = self.chunker.chunk_documents(&loaded.documents);
        let index = MemoryIndex::build(chunks, self.embedder.as_ref()).await?;
        let transcript = self
            .history
            .load_transcript(&loaded.source.id, loaded.source.kind)?;

        Ok((
            Active {
                source: loaded.source,
                index,
                transcript,
            },
            loaded.documents.len(),
        ))
    }

    /// Answer a question about the active source and record the exchange.
    #[instrument(skip(self))]
    pub async fn ask(&mut self, question: &str) -> Result<Answer> {
        if self.state != SessionState::Ready || self.active.is_none() {
            return Err(SporError::NoSourceLoaded);
        }

        if question.trim().is_empty() {
            return Err(SporError::InvalidInput("Question is empty".to_string()));
        }

        self.state = SessionState::Answering;
        let result = self.answer(question).await;
        self.state = SessionState::Ready;

        let answer = result?;
        if let Some(active) = self.active.as_mut() {
            active.transcript.push(ChatMessage::user(question));
            active.transcript.push(ChatMessage::assistant(answer.answer.clone()));
        }

        Ok(answer)
    }

    async fn answer(&self, question: &str) -> Result<Answer> {
        let active = self.active.as_ref().ok_or(SporError::NoSourceLoaded)?;

        let context = self
            .context
            .build(question, &active.index, self.embedder.as_ref())
            .await?;

        let answer = self.responder.respond(question, &context.text).await?;

        self.history
            .record(&active.source.id, active.source.kind, question, &answer)?;

        Ok(Answer {
            answer,
            sources: context.sources,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{LoadedSource, SourceDocument, SourceKind};
    use crate::test_support::{FailingEmbedder, FailingModel, HashEmbedder, ScriptedModel};
    use async_trait::async_trait;
    use std::path::Path;

    struct StaticLoader {
        text: String,
    }

    #[async_trait]
    impl SourceLoader for StaticLoader {
        async fn load(&self, reference: &SourceRef) -> Result<LoadedSource> {
            Ok(LoadedSource {
                source: reference.source(),
                documents: vec![SourceDocument::new("captions", self.text.clone())],
            })
        }
    }

    fn session_with(
        model: Arc<dyn LanguageModel>,
        embedder: Arc<dyn Embedder>,
        history: Arc<HistoryStore>,
    ) -> Session {
        Session::with_components(
            &Settings::default(),
            Prompts::default(),
            Arc::new(DefaultSourceLoader::default()),
            embedder,
            model,
            history,
        )
        .unwrap()
    }

    fn write(dir: &Path, name: &str, text: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, text).unwrap();
        path
    }

    #[tokio::test]
    async fn test_ask_about_document_records_exchange() {
        let dir = tempfile::tempdir().unwrap();
        let doc = write(dir.path(), "doc.txt", "The sky is blue.");

        let model = Arc::new(ScriptedModel::new("The sky is blue."));
        let history = Arc::new(HistoryStore::in_memory().unwrap());
        let mut session = session_with(
            model.clone(),
            Arc::new(HashEmbedder::default()),
            history.clone(),
        );
        assert_eq!(session.state(), SessionState::Empty);

        let loaded = session.load_source(&SourceRef::documents([doc])).await.unwrap();
        assert_eq!(loaded.source, Source::new("doc.txt", SourceKind::Document));
        assert_eq!(loaded.chunks, 1);
        assert_eq!(session.state(), SessionState::Ready);

        let answer = session.ask("What color is the sky?").await.unwrap();
        assert!(!answer.answer.is_empty());
        assert_eq!(answer.sources.len(), 1);
        assert!(model.prompts()[0].contains("The sky is blue."));

        let pairs = history.load("doc.txt", SourceKind::Document).unwrap();
        assert_eq!(
            pairs,
            vec![("What color is the sky?".to_string(), "The sky is blue.".to_string())]
        );
        assert_eq!(session.transcript().len(), 2);
        assert_eq!(session.state(), SessionState::Ready);
    }

    #[tokio::test]
    async fn test_unsupported_files_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let txt = write(dir.path(), "notes.txt", "Rust has no garbage collector.");
        let csv = write(dir.path(), "data.csv", "a,b,c\n1,2,3");

        let mut session = session_with(
            Arc::new(ScriptedModel::new("ok")),
            Arc::new(HashEmbedder::default()),
            Arc::new(HistoryStore::in_memory().unwrap()),
        );

        let loaded = session.load_source(&SourceRef::documents([txt, csv])).await.unwrap();

        assert_eq!(loaded.documents, 1);
        assert_eq!(loaded.source.id, "notes.txt-data.csv");
        let index = session.index().unwrap();
        assert!(!index.is_empty());
        assert!(index.entries().iter().all(|e| e.chunk.source_name == "notes.txt"));
    }

    #[tokio::test]
    async fn test_ask_before_load_fails() {
        let mut session = session_with(
            Arc::new(ScriptedModel::new("ok")),
            Arc::new(HashEmbedder::default()),
            Arc::new(HistoryStore::in_memory().unwrap()),
        );

        let result = session.ask("Anything?").await;
        assert!(matches!(result, Err(SporError::NoSourceLoaded)));
        assert_eq!(session.state(), SessionState::Empty);
    }

    #[tokio::test]
    async fn test_blank_question_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let doc = write(dir.path(), "doc.txt", "Some text.");
        let history = Arc::new(HistoryStore::in_memory().unwrap());
        let mut session = session_with(
            Arc::new(ScriptedModel::new("ok")),
            Arc::new(HashEmbedder::default()),
            history.clone(),
        );
        session.load_source(&SourceRef::documents([doc])).await.unwrap();

        let result = session.ask("   ").await;
        assert!(matches!(result, Err(SporError::InvalidInput(_))));
        assert_eq!(history.count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_failed_load_keeps_previous_source() {
        let dir = tempfile::tempdir().unwrap();
        let doc = write(dir.path(), "doc.txt", "The sky is blue.");
        let mut session = session_with(
            Arc::new(ScriptedModel::new("ok")),
            Arc::new(HashEmbedder::default()),
            Arc::new(HistoryStore::in_memory().unwrap()),
        );
        session.load_source(&SourceRef::documents([doc])).await.unwrap();

        let missing = dir.path().join("missing.pdf");
        assert!(session.load_source(&SourceRef::documents([missing])).await.is_err());

        assert_eq!(session.state(), SessionState::Ready);
        assert_eq!(session.source().unwrap().id, "doc.txt");
        assert!(session.ask("What color is the sky?").await.is_ok());
    }

    #[tokio::test]
    async fn test_failed_first_load_returns_to_empty() {
        let dir = tempfile::tempdir().unwrap();
        let doc = write(dir.path(), "doc.txt", "The sky is blue.");
        let mut session = session_with(
            Arc::new(ScriptedModel::new("ok")),
            Arc::new(FailingEmbedder),
            Arc::new(HistoryStore::in_memory().unwrap()),
        );

        assert!(session.load_source(&SourceRef::documents([doc])).await.is_err());
        assert_eq!(session.state(), SessionState::Empty);
        assert!(session.source().is_none());
    }

    #[tokio::test]
    async fn test_failed_ask_persists_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let doc = write(dir.path(), "doc.txt", "The sky is blue.");
        let history = Arc::new(HistoryStore::in_memory().unwrap());
        let mut session = session_with(
            Arc::new(FailingModel),
            Arc::new(HashEmbedder::default()),
            history.clone(),
        );
        session.load_source(&SourceRef::documents([doc])).await.unwrap();

        assert!(session.ask("What color is the sky?").await.is_err());

        assert_eq!(session.state(), SessionState::Ready);
        assert!(session.transcript().is_empty());
        assert_eq!(history.count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_reloading_active_source_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let doc = write(dir.path(), "doc.txt", "The sky is blue.");
        let mut session = session_with(
            Arc::new(ScriptedModel::new("Blue.")),
            Arc::new(HashEmbedder::default()),
            Arc::new(HistoryStore::in_memory().unwrap()),
        );

        let first = session.load_source(&SourceRef::documents([doc.clone()])).await.unwrap();
        assert!(!first.skipped);
        session.ask("What color is the sky?").await.unwrap();

        let second = session.load_source(&SourceRef::documents([doc])).await.unwrap();
        assert!(second.skipped);
        assert_eq!(second.exchanges, 1);
        assert_eq!(session.transcript().len(), 2);
    }

    #[tokio::test]
    async fn test_transcript_is_restored_from_history() {
        let history = Arc::new(HistoryStore::in_memory().unwrap());
        let url = "https://www.youtube.com/watch?v=dQw4w9WgXcQ";
        history.record(url, SourceKind::Video, "Who sings?", "Rick Astley.").unwrap();
        // Same id under the other kind must not leak in.
        history.record(url, SourceKind::Document, "x", "y").unwrap();

        let mut session = Session::with_components(
            &Settings::default(),
            Prompts::default(),
            Arc::new(StaticLoader {
                text: "Never gonna give you up, never gonna let you down.".to_string(),
            }),
            Arc::new(HashEmbedder::default()),
            Arc::new(ScriptedModel::new("Rick Astley.")),
            history.clone(),
        )
        .unwrap();

        let loaded = session.load_source(&SourceRef::video(url)).await.unwrap();
        assert_eq!(loaded.source.kind, SourceKind::Video);
        assert_eq!(loaded.exchanges, 1);
        assert_eq!(session.transcript(), history.load_transcript(url, SourceKind::Video).unwrap());

        session.ask("What is never given up?").await.unwrap();
        assert_eq!(history.load(url, SourceKind::Video).unwrap().len(), 2);
        assert_eq!(session.transcript().len(), 4);
    }

    #[tokio::test]
    async fn test_switching_sources_swaps_index() {
        let dir = tempfile::tempdir().unwrap();
        let a = write(dir.path(), "a.txt", "Apples are red.");
        let b = write(dir.path(), "b.txt", "Bananas are yellow.");
        let model = Arc::new(ScriptedModel::new("ok"));
        let mut session = session_with(
            model.clone(),
            Arc::new(HashEmbedder::default()),
            Arc::new(HistoryStore::in_memory().unwrap()),
        );

        session.load_source(&SourceRef::documents([a])).await.unwrap();
        session.load_source(&SourceRef::documents([b])).await.unwrap();
        assert_eq!(session.source().unwrap().id, "b.txt");

        session.ask("What color are bananas?").await.unwrap();
        let prompt = &model.prompts()[0];
        assert!(prompt.contains("Bananas are yellow."));
        assert!(!prompt.contains("Apples"));
    }
}
