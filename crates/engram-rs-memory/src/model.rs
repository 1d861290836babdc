//! Record models owned by the memory store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Persisted record of one turn.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConversationRecord {
    /// Store-generated identifier.
    pub id: i64,
    /// Raw user input for the turn.
    pub user_question: String,
    /// Final answer shown to the user.
    pub chatbot_answer: String,
    /// Structured analysis payload; empty when the turn was not PR-related.
    pub analysis: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// Persisted memory derived from a conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MemoryRecord {
    /// Store-generated identifier.
    pub id: i64,
    /// Conversation this memory was derived from.
    pub conv_id: i64,
    /// Combined question+analysis or question+answer text.
    pub ques_analysis: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// One similarity-search hit.
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarMemory {
    /// Cosine similarity against the query embedding.
    pub similarity: f32,
    /// Stored memory text.
    pub ques_analysis: String,
}
