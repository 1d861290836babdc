//! Wire types shared across the Engram crates: the per-turn message trace
//! and the tool-call request shape consumed from the chat model.

mod tool;

pub use tool::{Tool, ToolError};

use serde::{Deserialize, Serialize};

/// Tool metadata advertised to the chat model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolSpec {
    /// Tool name.
    pub name: String,
    /// Tool description.
    pub description: String,
    /// JSON schema for tool arguments.
    pub args_schema: serde_json::Value,
}

/// A model-issued request to invoke a named tool.
///
/// `arguments` stays a raw JSON-encoded string: that is the shape the chat
/// completion API emits, and consumers decide whether and how to parse it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToolCall {
    /// Provider-assigned id correlating the call with its result message.
    pub id: String,
    /// Name of the tool to invoke.
    pub name: String,
    /// JSON-encoded argument payload, unparsed.
    pub arguments: String,
}

impl ToolCall {
    /// Create a tool call request.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        arguments: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments: arguments.into(),
        }
    }

    /// Parse the argument payload as JSON.
    pub fn parse_arguments(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::from_str(&self.arguments)
    }
}

/// One unit of the agent's conversational trace for a single turn.
///
/// The trace is transient: it is rendered and mined for persistence at the
/// end of a turn, then discarded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum TraceMessage {
    /// Injected context, e.g. recalled memories.
    System {
        /// Message content.
        content: String,
    },
    /// User input for this turn.
    Human {
        /// Message content.
        content: String,
    },
    /// Model output, possibly carrying tool-call requests.
    Ai {
        /// Message content (may be empty when the model only calls tools).
        content: String,
        /// Tool-call requests issued alongside the content.
        #[serde(default)]
        tool_calls: Vec<ToolCall>,
    },
    /// Result of one dispatched tool call.
    Tool {
        /// Raw tool output.
        content: String,
        /// Name of the tool that produced the output.
        tool_name: String,
        /// Id of the tool call this result answers.
        tool_call_id: String,
    },
}

impl TraceMessage {
    /// Build a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::System {
            content: content.into(),
        }
    }

    /// Build a human message.
    pub fn human(content: impl Into<String>) -> Self {
        Self::Human {
            content: content.into(),
        }
    }

    /// Build an AI message without tool calls.
    pub fn ai(content: impl Into<String>) -> Self {
        Self::Ai {
            content: content.into(),
            tool_calls: Vec::new(),
        }
    }

    /// Build an AI message carrying tool-call requests.
    pub fn ai_with_tool_calls(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self::Ai {
            content: content.into(),
            tool_calls,
        }
    }

    /// Build a tool-result message.
    pub fn tool(
        content: impl Into<String>,
        tool_name: impl Into<String>,
        tool_call_id: impl Into<String>,
    ) -> Self {
        Self::Tool {
            content: content.into(),
            tool_name: tool_name.into(),
            tool_call_id: tool_call_id.into(),
        }
    }

    /// Variant label used in transcript rendering.
    pub fn label(&self) -> &'static str {
        match self {
            TraceMessage::System { .. } => "System",
            TraceMessage::Human { .. } => "Human",
            TraceMessage::Ai { .. } => "AI",
            TraceMessage::Tool { .. } => "Tool",
        }
    }

    /// Message content, regardless of variant.
    pub fn content(&self) -> &str {
        match self {
            TraceMessage::System { content }
            | TraceMessage::Human { content }
            | TraceMessage::Ai { content, .. }
            | TraceMessage::Tool { content, .. } => content,
        }
    }

    /// Tool-call requests carried by this message, if any.
    pub fn tool_calls(&self) -> &[ToolCall] {
        match self {
            TraceMessage::Ai { tool_calls, .. } => tool_calls,
            _ => &[],
        }
    }
}
