//! Spor - chat with a video or a set of documents
//!
//! A local-first assistant that answers questions about one source at a time:
//! a YouTube video (through its captions) or a set of PDF, DOCX, and text files.
//!
//! The name "Spor" is Norwegian for "track" or "trace."
//!
//! # Overview
//!
//! Loading a source splits its text into overlapping chunks and embeds them
//! into an in-memory index. Each question retrieves the nearest chunks, fills
//! a prompt with them, and asks a language model. Every exchange is kept in
//! SQLite under the source it was asked about, so returning to a source
//! restores the conversation.
//!
//! # Architecture
//!
//! - `config` - Settings and prompt templates
//! - `source` - Video captions and document text extraction
//! - `chunking` - Window and recursive text splitters
//! - `embedding` - Embedding generation
//! - `index` - In-memory cosine-similarity index
//! - `llm` - Language model access
//! - `rag` - Context composition and answer generation
//! - `history` - Persistent chat history
//! - `session` - The load/ask lifecycle tying it together
//!
//! # Example
//!
//! ```rust,no_run
//! use spor::config::Settings;
//! use spor::session::Session;
//! use spor::source::SourceRef;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let mut session = Session::new(&settings)?;
//!
//!     session.load_source(&SourceRef::documents(["notes.pdf"])).await?;
//!     let answer = session.ask("What are the main points?").await?;
//!     println!("{}", answer.answer);
//!
//!     Ok(())
//! }
//! ```

pub mod chunking;
pub mod cli;
pub mod config;
pub mod embedding;
pub mod error;
pub mod history;
pub mod index;
pub mod llm;
pub mod openai;
pub mod rag;
pub mod session;
pub mod source;

#[cfg(test)]
pub(crate) mod test_support;

pub use error::{Result, SporError};
