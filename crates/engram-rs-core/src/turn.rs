//! Per-turn orchestration: recall, agent run, extraction, persistence.

use crate::agent::AgentRuntime;
use crate::classify::is_pr_question;
use crate::error::EngramCoreError;
use crate::prompt::build_system_prompt;
use engram_rs_memory::{MemoryStore, MemoryTools};
use engram_rs_protocol::TraceMessage;
use log::{debug, error, info};
use serde_json::Value;
use std::sync::Arc;

/// Remote tool whose argument payload carries the PR analysis.
const ANALYSIS_TOOL: &str = "create_notion_page";

/// Everything a finished turn produced.
#[derive(Debug)]
pub struct TurnOutcome {
    /// Final answer shown to the user.
    pub answer: String,
    /// Extracted analysis payload, possibly empty.
    pub analysis: String,
    /// Whether the turn was classified as PR-related.
    pub pr_related: bool,
    /// Id of the persisted conversation, `None` when persistence failed.
    pub conv_id: Option<i64>,
    /// Full message trace for transcript rendering.
    pub trace: Vec<TraceMessage>,
}

/// Orchestrates one user-input-to-persisted-response cycle.
pub struct TurnProcessor {
    runtime: AgentRuntime,
    memory_tools: Arc<MemoryTools>,
    store: Arc<MemoryStore>,
}

impl TurnProcessor {
    /// Create a processor over the agent runtime and the memory layer.
    pub fn new(
        runtime: AgentRuntime,
        memory_tools: Arc<MemoryTools>,
        store: Arc<MemoryStore>,
    ) -> Self {
        Self {
            runtime,
            memory_tools,
            store,
        }
    }

    /// Process one turn.
    ///
    /// Store failures are logged and abandon the affected persistence step;
    /// the textual answer is still returned.
    pub async fn process(&self, user_text: &str) -> Result<TurnOutcome, EngramCoreError> {
        info!("processing turn (text_len={})", user_text.len());

        let memories = self.memory_tools.search_memories_default(user_text).await;
        let system = TraceMessage::system(build_system_prompt(&memories));
        let trace = self
            .runtime
            .run(vec![system, TraceMessage::human(user_text)])
            .await?;

        let answer = final_answer(&trace);
        let analysis = extract_analysis(&trace);
        let pr_related = is_pr_question(user_text);

        let stored_analysis = if pr_related { analysis.as_str() } else { "" };
        let conv_id = match self
            .store
            .insert_conversation(user_text, &answer, stored_analysis)
        {
            Ok(id) => Some(id),
            Err(err) => {
                error!("failed to persist conversation: {err}");
                None
            }
        };

        // The derived memory references the conversation row; without one
        // there is nothing valid to save.
        if let Some(conv_id) = conv_id {
            let combined = if pr_related {
                format!("Question: {user_text}\nAnalysis: {analysis}")
            } else {
                format!("Question: {user_text}\nAnswer: {answer}")
            };
            let saved = self.memory_tools.save_memory(&combined, conv_id).await;
            debug!("memory save result (conv_id={conv_id}): {saved}");
        }

        Ok(TurnOutcome {
            answer,
            analysis,
            pr_related,
            conv_id,
            trace,
        })
    }
}

/// Content of the last AI message in the trace.
fn final_answer(trace: &[TraceMessage]) -> String {
    trace
        .iter()
        .rev()
        .find_map(|message| match message {
            TraceMessage::Ai { content, .. } => Some(content.clone()),
            _ => None,
        })
        .unwrap_or_default()
}

/// Analysis payload from the first `create_notion_page` tool call.
///
/// The parsed `content` field wins; a payload that cannot be parsed (or
/// lacks the field) falls back to the raw argument text; no matching call
/// means no analysis.
fn extract_analysis(trace: &[TraceMessage]) -> String {
    for message in trace {
        for call in message.tool_calls() {
            if call.name != ANALYSIS_TOOL {
                continue;
            }
            return match call.parse_arguments() {
                Ok(value) => value
                    .get("content")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .unwrap_or_else(|| call.arguments.clone()),
                Err(_) => call.arguments.clone(),
            };
        }
    }
    String::new()
}

#[cfg(test)]
mod tests {
    use super::{extract_analysis, final_answer};
    use engram_rs_protocol::{ToolCall, TraceMessage};
    use pretty_assertions::assert_eq;

    #[test]
    fn final_answer_takes_last_ai_message() {
        let trace = vec![
            TraceMessage::human("q"),
            TraceMessage::ai("first"),
            TraceMessage::tool("out", "echo", "call_1"),
            TraceMessage::ai("second"),
        ];
        assert_eq!(final_answer(&trace), "second");
    }

    #[test]
    fn final_answer_is_empty_without_ai_messages() {
        assert_eq!(final_answer(&[TraceMessage::human("q")]), "");
    }

    #[test]
    fn analysis_comes_from_first_matching_call() {
        let trace = vec![
            TraceMessage::ai_with_tool_calls(
                "",
                vec![
                    ToolCall::new("call_1", "analyze_pr", "{}"),
                    ToolCall::new("call_2", "create_notion_page", r#"{"content": "X did Y"}"#),
                ],
            ),
            TraceMessage::ai_with_tool_calls(
                "",
                vec![ToolCall::new(
                    "call_3",
                    "create_notion_page",
                    r#"{"content": "later"}"#,
                )],
            ),
        ];
        assert_eq!(extract_analysis(&trace), "X did Y");
    }

    #[test]
    fn malformed_payload_falls_back_to_raw_text() {
        let trace = vec![TraceMessage::ai_with_tool_calls(
            "",
            vec![ToolCall::new("call_1", "create_notion_page", "not json")],
        )];
        assert_eq!(extract_analysis(&trace), "not json");
    }

    #[test]
    fn payload_without_content_falls_back_to_raw_text() {
        let trace = vec![TraceMessage::ai_with_tool_calls(
            "",
            vec![ToolCall::new("call_1", "create_notion_page", r#"{"title": "t"}"#)],
        )];
        assert_eq!(extract_analysis(&trace), r#"{"title": "t"}"#);
    }

    #[test]
    fn no_matching_call_means_empty_analysis() {
        let trace = vec![TraceMessage::ai("plain answer")];
        assert_eq!(extract_analysis(&trace), "");
    }
}
