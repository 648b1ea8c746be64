//! Content sources for Spor.
//!
//! A source is either a YouTube video (its caption transcript) or a set of
//! uploaded documents. Loading turns a [`SourceRef`] into plain-text
//! [`SourceDocument`]s plus the [`Source`] identity used for chat history.

mod document;
mod youtube;

pub use document::{document_set_id, is_supported_document, DocumentSource, SUPPORTED_EXTENSIONS};
pub use youtube::{parse_vtt, YoutubeSource};

use crate::config::SourceSettings;
use crate::error::{Result, SporError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Kind of content source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Video,
    Document,
}

impl SourceKind {
    /// Tag persisted in the chat history.
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Video => "video",
            SourceKind::Document => "document",
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SourceKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "video" | "youtube" => Ok(SourceKind::Video),
            "document" | "documents" => Ok(SourceKind::Document),
            _ => Err(format!("Unknown source kind: {}", s)),
        }
    }
}

/// Identity of a loaded source.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Source {
    /// Video URL, or the uploaded file names joined with `-`.
    pub id: String,
    pub kind: SourceKind,
}

impl Source {
    pub fn new(id: impl Into<String>, kind: SourceKind) -> Self {
        Self {
            id: id.into(),
            kind,
        }
    }
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.id, self.kind)
    }
}

/// A request to load content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceRef {
    /// A YouTube video URL or bare video ID.
    Video { url: String },
    /// Uploaded document files.
    Documents { paths: Vec<PathBuf> },
}

impl SourceRef {
    pub fn video(url: impl Into<String>) -> Self {
        SourceRef::Video { url: url.into() }
    }

    pub fn documents<P: Into<PathBuf>>(paths: impl IntoIterator<Item = P>) -> Self {
        SourceRef::Documents {
            paths: paths.into_iter().map(Into::into).collect(),
        }
    }

    /// The source identity this reference will load as.
    pub fn source(&self) -> Source {
        match self {
            SourceRef::Video { url } => Source::new(url.trim(), SourceKind::Video),
            SourceRef::Documents { paths } => {
                Source::new(document_set_id(paths), SourceKind::Document)
            }
        }
    }
}

/// Plain text of one loaded document or transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDocument {
    /// File name or video ID.
    pub name: String,
    /// Extracted text.
    pub text: String,
}

impl SourceDocument {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
        }
    }
}

/// Result of loading a source.
#[derive(Debug, Clone)]
pub struct LoadedSource {
    pub source: Source,
    pub documents: Vec<SourceDocument>,
}

/// Trait for turning source references into text.
#[async_trait]
pub trait SourceLoader: Send + Sync {
    /// Load the referenced content.
    async fn load(&self, reference: &SourceRef) -> Result<LoadedSource>;
}

/// Loader that dispatches videos to yt-dlp and documents to local extraction.
pub struct DefaultSourceLoader {
    youtube: YoutubeSource,
    documents: DocumentSource,
}

impl DefaultSourceLoader {
    pub fn new(settings: &SourceSettings) -> Self {
        Self {
            youtube: YoutubeSource::new().with_caption_lang(&settings.caption_lang),
            documents: DocumentSource::new(),
        }
    }
}

impl Default for DefaultSourceLoader {
    fn default() -> Self {
        Self::new(&SourceSettings::default())
    }
}

#[async_trait]
impl SourceLoader for DefaultSourceLoader {
    async fn load(&self, reference: &SourceRef) -> Result<LoadedSource> {
        let source = reference.source();
        let documents = match reference {
            SourceRef::Video { url } => vec![self.youtube.fetch_transcript(url).await?],
            SourceRef::Documents { paths } => {
                if paths.is_empty() {
                    return Err(SporError::InvalidInput("No documents given".to_string()));
                }
                self.documents.load_all(paths)?
            }
        };

        Ok(LoadedSource { source, documents })
    }
}
