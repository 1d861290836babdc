//! SQLite-backed store for conversations, memories, and their embeddings.

use crate::error::MemoryError;
use crate::model::{ConversationRecord, MemoryRecord, SimilarMemory};
use chrono::{DateTime, Utc};
use log::debug;
use rusqlite::ffi::sqlite3_auto_extension;
use rusqlite::{params, Connection, OptionalExtension};
use sqlite_vec::sqlite3_vec_init;
use std::path::Path;
use std::sync::{Mutex, Once};

/// Register the sqlite-vec extension globally (once per process).
fn ensure_sqlite_vec_registered() {
    static INIT: Once = Once::new();
    INIT.call_once(|| unsafe {
        #[allow(clippy::missing_transmute_annotations)]
        sqlite3_auto_extension(Some(std::mem::transmute(sqlite3_vec_init as *const ())));
    });
}

/// Conversation and memory persistence with in-store similarity ranking.
pub struct MemoryStore {
    conn: Mutex<Connection>,
    embedding_dimension: usize,
}

impl MemoryStore {
    /// Open (or create) the store at `path`.
    pub fn open(path: &str, embedding_dimension: usize) -> Result<Self, MemoryError> {
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        ensure_sqlite_vec_registered();
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;

        let store = Self {
            conn: Mutex::new(conn),
            embedding_dimension,
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Open an in-memory store, used by tests.
    pub fn open_in_memory(embedding_dimension: usize) -> Result<Self, MemoryError> {
        ensure_sqlite_vec_registered();
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;

        let store = Self {
            conn: Mutex::new(conn),
            embedding_dimension,
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<(), MemoryError> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS conversations (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_question TEXT NOT NULL,
                chatbot_answer TEXT NOT NULL,
                analysis TEXT NOT NULL DEFAULT '',
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS memories (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                conv_id INTEGER NOT NULL REFERENCES conversations(id),
                ques_analysis TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_memories_conv ON memories(conv_id);",
        )?;

        let dim = self.embedding_dimension;
        conn.execute_batch(&format!(
            "CREATE VIRTUAL TABLE IF NOT EXISTS memories_vec USING vec0(
                id INTEGER PRIMARY KEY,
                embedding float[{dim}] distance_metric=cosine
            );"
        ))?;

        Ok(())
    }

    /// Fixed dimensionality of the vector column.
    pub fn embedding_dimension(&self) -> usize {
        self.embedding_dimension
    }

    /// Append a conversation record and return its store-generated id.
    pub fn insert_conversation(
        &self,
        user_question: &str,
        chatbot_answer: &str,
        analysis: &str,
    ) -> Result<i64, MemoryError> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO conversations (user_question, chatbot_answer, analysis, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                user_question,
                chatbot_answer,
                analysis,
                Utc::now().to_rfc3339()
            ],
        )?;
        let id = conn.last_insert_rowid();
        debug!("inserted conversation (id={id})");
        Ok(id)
    }

    /// Append a memory record with its embedding; both rows land in one
    /// transaction. `conv_id` must reference an existing conversation.
    pub fn insert_memory(
        &self,
        conv_id: i64,
        ques_analysis: &str,
        embedding: &[f32],
    ) -> Result<i64, MemoryError> {
        self.check_dimension(embedding)?;

        let conn = self.conn.lock().unwrap();
        let tx = conn.unchecked_transaction()?;

        tx.execute(
            "INSERT INTO memories (conv_id, ques_analysis, created_at) VALUES (?1, ?2, ?3)",
            params![conv_id, ques_analysis, Utc::now().to_rfc3339()],
        )?;
        let id = tx.last_insert_rowid();

        tx.execute(
            "INSERT INTO memories_vec (id, embedding) VALUES (?1, ?2)",
            params![id, embedding_to_bytes(embedding)],
        )?;

        tx.commit()?;
        debug!("inserted memory (id={id}, conv_id={conv_id})");
        Ok(id)
    }

    /// Top-k most similar memories to `query_embedding`.
    ///
    /// Ranking happens inside the store: the vec0 virtual table orders by
    /// cosine distance and caps the row count, and this function drops rows
    /// past the similarity threshold before they reach the caller.
    pub fn find_similar(
        &self,
        query_embedding: &[f32],
        similarity_threshold: f32,
        match_count: usize,
    ) -> Result<Vec<SimilarMemory>, MemoryError> {
        self.check_dimension(query_embedding)?;

        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, distance FROM memories_vec
             WHERE embedding MATCH ?1 ORDER BY distance LIMIT ?2",
        )?;
        let rows = stmt.query_map(
            params![embedding_to_bytes(query_embedding), match_count as i64],
            |row| Ok((row.get::<_, i64>(0)?, row.get::<_, f32>(1)?)),
        )?;

        let mut hits = Vec::new();
        for row in rows {
            let (id, distance) = row?;
            let similarity = 1.0 - distance;
            if similarity < similarity_threshold {
                continue;
            }
            let ques_analysis: String = conn.query_row(
                "SELECT ques_analysis FROM memories WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )?;
            hits.push(SimilarMemory {
                similarity,
                ques_analysis,
            });
        }
        Ok(hits)
    }

    /// Fetch a conversation by id.
    pub fn conversation(&self, id: i64) -> Result<Option<ConversationRecord>, MemoryError> {
        let conn = self.conn.lock().unwrap();
        let record = conn
            .query_row(
                "SELECT id, user_question, chatbot_answer, analysis, created_at
                 FROM conversations WHERE id = ?1",
                params![id],
                |row| {
                    Ok(ConversationRecord {
                        id: row.get(0)?,
                        user_question: row.get(1)?,
                        chatbot_answer: row.get(2)?,
                        analysis: row.get(3)?,
                        created_at: parse_timestamp(&row.get::<_, String>(4)?),
                    })
                },
            )
            .optional()?;
        Ok(record)
    }

    /// Memories derived from one conversation, oldest first.
    pub fn memories_for_conversation(
        &self,
        conv_id: i64,
    ) -> Result<Vec<MemoryRecord>, MemoryError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, conv_id, ques_analysis, created_at
             FROM memories WHERE conv_id = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map(params![conv_id], |row| {
            Ok(MemoryRecord {
                id: row.get(0)?,
                conv_id: row.get(1)?,
                ques_analysis: row.get(2)?,
                created_at: parse_timestamp(&row.get::<_, String>(3)?),
            })
        })?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }

    /// Number of stored memories.
    pub fn count_memories(&self) -> Result<usize, MemoryError> {
        let conn = self.conn.lock().unwrap();
        let count: usize = conn.query_row("SELECT COUNT(*) FROM memories", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Number of stored conversations.
    pub fn count_conversations(&self) -> Result<usize, MemoryError> {
        let conn = self.conn.lock().unwrap();
        let count: usize =
            conn.query_row("SELECT COUNT(*) FROM conversations", [], |row| row.get(0))?;
        Ok(count)
    }

    fn check_dimension(&self, embedding: &[f32]) -> Result<(), MemoryError> {
        if embedding.len() != self.embedding_dimension {
            return Err(MemoryError::DimensionMismatch {
                expected: self.embedding_dimension,
                actual: embedding.len(),
            });
        }
        Ok(())
    }
}

fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
}

fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}
