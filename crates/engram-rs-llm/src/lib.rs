//! Chat-completion and embedding clients for Engram.
//!
//! Both clients are trait objects so the turn processor and memory tools can
//! be exercised against fakes in tests.

mod chat;
mod embedding;
mod error;

pub use chat::{ChatClient, ChatResponse, OpenAiChatClient};
pub use embedding::{EmbeddingClient, OpenAiEmbeddingClient};
pub use error::LlmError;
