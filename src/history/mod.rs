//! Persistent chat history.
//!
//! An append-only record of question/answer exchanges keyed by source. Rows
//! are never updated or deleted.

mod sqlite;

pub use sqlite::HistoryStore;

use crate::source::SourceKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One persisted question/answer exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRecord {
    pub id: i64,
    pub source_id: String,
    pub source_kind: SourceKind,
    pub question: String,
    pub answer: String,
    pub created_at: DateTime<Utc>,
}

/// Speaker of a transcript message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

impl std::fmt::Display for ChatRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChatRole::User => write!(f, "user"),
            ChatRole::Assistant => write!(f, "assistant"),
        }
    }
}

/// A message in the chat transcript shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// Summary of the history kept for one source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceSummary {
    pub source_id: String,
    pub source_kind: SourceKind,
    /// Number of recorded exchanges.
    pub exchanges: u32,
    /// Time of the most recent exchange.
    pub last_activity: DateTime<Utc>,
}

/// Expand records into alternating user/assistant messages.
pub fn transcript_from_records(records: &[ChatRecord]) -> Vec<ChatMessage> {
    records
        .iter()
        .flat_map(|r| [ChatMessage::user(&r.question), ChatMessage::assistant(&r.answer)])
        .collect()
}
