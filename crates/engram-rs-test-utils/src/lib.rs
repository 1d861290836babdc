//! Shared fakes for exercising Engram components without network or
//! subprocess dependencies.

mod embedding;
mod llm;
mod tools;

pub use embedding::{FailingEmbeddingClient, HashEmbeddingClient};
pub use llm::ScriptedChatClient;
pub use tools::{EchoTool, FixedTool};
