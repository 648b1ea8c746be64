//! SQLite-backed chat history store.

use super::{transcript_from_records, ChatMessage, ChatRecord, SourceSummary};
use crate::error::{Result, SporError};
use crate::source::SourceKind;
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, instrument};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS chat_history (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    source_id TEXT NOT NULL,
    source_kind TEXT NOT NULL,
    question TEXT NOT NULL,
    answer TEXT NOT NULL,
    created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
);

CREATE INDEX IF NOT EXISTS idx_chat_history_source ON chat_history(source_id, source_kind);
"#;

/// Append-only chat history in SQLite.
pub struct HistoryStore {
    conn: Mutex<Connection>,
}

impl HistoryStore {
    /// Open (or create) the history database at `path`.
    ///
    /// Schema creation is idempotent, so opening an existing database is safe.
    #[instrument(skip_all)]
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(SCHEMA)?;

        info!("Opened chat history at {:?}", path);

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory history store (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| SporError::History(format!("Failed to acquire lock: {}", e)))
    }

    /// Append one exchange. Returns the new row id.
    #[instrument(skip(self, question, answer))]
    pub fn record(
        &self,
        source_id: &str,
        source_kind: SourceKind,
        question: &str,
        answer: &str,
    ) -> Result<i64> {
        let conn = self.lock()?;

        conn.execute(
            "INSERT INTO chat_history (source_id, source_kind, question, answer) \
             VALUES (?1, ?2, ?3, ?4)",
            params![source_id, source_kind.as_str(), question, answer],
        )?;

        let id = conn.last_insert_rowid();
        debug!("Recorded exchange {} for {} ({})", id, source_id, source_kind);
        Ok(id)
    }

    /// All (question, answer) pairs for the exact source, in insertion order.
    pub fn load(&self, source_id: &str, source_kind: SourceKind) -> Result<Vec<(String, String)>> {
        Ok(self
            .load_records(source_id, source_kind)?
            .into_iter()
            .map(|r| (r.question, r.answer))
            .collect())
    }

    /// All records for the exact source, in insertion order.
    #[instrument(skip(self))]
    pub fn load_records(
        &self,
        source_id: &str,
        source_kind: SourceKind,
    ) -> Result<Vec<ChatRecord>> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT id, source_id, source_kind, question, answer, created_at
            FROM chat_history
            WHERE source_id = ?1 AND source_kind = ?2
            ORDER BY id
            "#,
        )?;

        let records = stmt
            .query_map(params![source_id, source_kind.as_str()], row_to_record)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        debug!("Loaded {} exchanges for {} ({})", records.len(), source_id, source_kind);
        Ok(records)
    }

    /// The stored exchanges as alternating user/assistant messages.
    pub fn load_transcript(
        &self,
        source_id: &str,
        source_kind: SourceKind,
    ) -> Result<Vec<ChatMessage>> {
        let records = self.load_records(source_id, source_kind)?;
        Ok(transcript_from_records(&records))
    }

    /// Every source with recorded history, most recently active first.
    pub fn list_sources(&self) -> Result<Vec<SourceSummary>> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT source_id, source_kind, COUNT(*) AS exchanges, MAX(created_at) AS last_activity
            FROM chat_history
            GROUP BY source_id, source_kind
            ORDER BY last_activity DESC, source_id
            "#,
        )?;

        let sources = stmt
            .query_map([], |row| {
                Ok(SourceSummary {
                    source_id: row.get(0)?,
                    source_kind: parse_kind(row, 1)?,
                    exchanges: row.get(2)?,
                    last_activity: parse_timestamp(row, 3)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(sources)
    }

    /// Total number of recorded exchanges.
    pub fn count(&self) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM chat_history", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<ChatRecord> {
    Ok(ChatRecord {
        id: row.get(0)?,
        source_id: row.get(1)?,
        source_kind: parse_kind(row, 2)?,
        question: row.get(3)?,
        answer: row.get(4)?,
        created_at: parse_timestamp(row, 5)?,
    })
}

fn parse_kind(row: &Row<'_>, idx: usize) -> rusqlite::Result<SourceKind> {
    let kind: String = row.get(idx)?;
    kind.parse().map_err(|e: String| {
        rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, e.into())
    })
}

fn parse_timestamp(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let value: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::ChatRole;

    #[test]
    fn test_record_then_load_in_insertion_order() {
        let store = HistoryStore::in_memory().unwrap();

        for i in 0..5 {
            store
                .record("doc.txt", SourceKind::Document, &format!("q{}", i), &format!("a{}", i))
                .unwrap();
        }

        let pairs = store.load("doc.txt", SourceKind::Document).unwrap();
        assert_eq!(pairs.len(), 5);
        for (i, (q, a)) in pairs.iter().enumerate() {
            assert_eq!(q, &format!("q{}", i));
            assert_eq!(a, &format!("a{}", i));
        }
    }

    #[test]
    fn test_load_keeps_insertion_order_when_clock_goes_back() {
        let store = HistoryStore::in_memory().unwrap();
        store.record("doc.txt", SourceKind::Document, "q0", "a0").unwrap();
        store.record("doc.txt", SourceKind::Document, "q1", "a1").unwrap();

        store
            .lock()
            .unwrap()
            .execute(
                "UPDATE chat_history SET created_at = '2099-01-01T00:00:00.000Z' \
                 WHERE question = 'q0'",
                [],
            )
            .unwrap();

        let pairs = store.load("doc.txt", SourceKind::Document).unwrap();
        assert_eq!(
            pairs,
            vec![
                ("q0".to_string(), "a0".to_string()),
                ("q1".to_string(), "a1".to_string()),
            ]
        );
    }

    #[test]
    fn test_load_unknown_source_is_empty() {
        let store = HistoryStore::in_memory().unwrap();
        store.record("doc.txt", SourceKind::Document, "q", "a").unwrap();

        assert!(store.load("other.txt", SourceKind::Document).unwrap().is_empty());
        // Same id, different kind.
        assert!(store.load("doc.txt", SourceKind::Video).unwrap().is_empty());
    }

    #[test]
    fn test_load_records_and_transcript() {
        let store = HistoryStore::in_memory().unwrap();
        let id = store
            .record("https://youtu.be/dQw4w9WgXcQ", SourceKind::Video, "Who sings?", "Rick Astley.")
            .unwrap();

        let records = store
            .load_records("https://youtu.be/dQw4w9WgXcQ", SourceKind::Video)
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, id);
        assert_eq!(records[0].source_kind, SourceKind::Video);
        assert!(records[0].created_at <= Utc::now());

        let transcript = store
            .load_transcript("https://youtu.be/dQw4w9WgXcQ", SourceKind::Video)
            .unwrap();
        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript[0].role, ChatRole::User);
        assert_eq!(transcript[0].content, "Who sings?");
        assert_eq!(transcript[1].role, ChatRole::Assistant);
        assert_eq!(transcript[1].content, "Rick Astley.");
    }

    #[test]
    fn test_list_sources() {
        let store = HistoryStore::in_memory().unwrap();
        store.record("a.txt", SourceKind::Document, "q1", "a1").unwrap();
        store.record("a.txt", SourceKind::Document, "q2", "a2").unwrap();
        store.record("https://youtu.be/x", SourceKind::Video, "q", "a").unwrap();

        let sources = store.list_sources().unwrap();
        assert_eq!(sources.len(), 2);

        let docs = sources.iter().find(|s| s.source_id == "a.txt").unwrap();
        assert_eq!(docs.exchanges, 2);
        assert_eq!(docs.source_kind, SourceKind::Document);
        assert_eq!(store.count().unwrap(), 3);
    }

    #[test]
    fn test_open_is_idempotent_and_persistent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("history.db");

        {
            let store = HistoryStore::open(&path).unwrap();
            store.record("doc.txt", SourceKind::Document, "q", "a").unwrap();
        }

        let store = HistoryStore::open(&path).unwrap();
        let pairs = store.load("doc.txt", SourceKind::Document).unwrap();
        assert_eq!(pairs, vec![("q".to_string(), "a".to_string())]);
    }
}
