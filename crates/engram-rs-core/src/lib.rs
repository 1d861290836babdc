//! Turn orchestration for Engram: the bounded agent loop, memory-augmented
//! prompt assembly, answer/analysis extraction, and transcript rendering.

mod agent;
mod classify;
mod error;
mod prompt;
mod registry;
mod transcript;
mod turn;

pub use agent::AgentRuntime;
pub use classify::is_pr_question;
pub use error::EngramCoreError;
pub use prompt::build_system_prompt;
pub use registry::ToolRegistry;
pub use transcript::render_transcript;
pub use turn::{TurnOutcome, TurnProcessor};
