//! The model-call/tool-dispatch loop, run as an explicit bounded state
//! machine.

use crate::error::EngramCoreError;
use crate::registry::ToolRegistry;
use engram_rs_llm::ChatClient;
use engram_rs_protocol::{ToolCall, ToolError, TraceMessage};
use log::{debug, info, warn};
use serde_json::Value;
use std::sync::Arc;

/// Loop states for one turn.
enum AgentState {
    /// Invoke the model with the accumulated trace.
    ModelCall,
    /// Dispatch the model's pending tool-call requests.
    Dispatch(Vec<ToolCall>),
    /// The model produced a final answer.
    Done,
}

/// Runs the tool-use loop for a single turn.
pub struct AgentRuntime {
    chat: Arc<dyn ChatClient>,
    registry: ToolRegistry,
    max_tool_rounds: usize,
}

impl AgentRuntime {
    /// Create a runtime over a chat client and the tools it may call.
    pub fn new(chat: Arc<dyn ChatClient>, registry: ToolRegistry, max_tool_rounds: usize) -> Self {
        Self {
            chat,
            registry,
            max_tool_rounds,
        }
    }

    /// Run the loop until the model answers without tool calls, returning
    /// the full accumulated trace.
    ///
    /// Rounds of tool dispatch are bounded by `max_tool_rounds`; a model
    /// that keeps requesting tools past the bound fails the turn.
    pub async fn run(
        &self,
        messages: Vec<TraceMessage>,
    ) -> Result<Vec<TraceMessage>, EngramCoreError> {
        let specs = self.registry.specs();
        let mut trace = messages;
        let mut dispatch_rounds = 0usize;
        let mut state = AgentState::ModelCall;

        loop {
            match state {
                AgentState::ModelCall => {
                    let response = self.chat.chat(&trace, &specs).await?;
                    if response.tool_calls.is_empty() {
                        trace.push(TraceMessage::ai(response.content));
                        state = AgentState::Done;
                    } else {
                        if dispatch_rounds >= self.max_tool_rounds {
                            warn!(
                                "model still requesting tools after {} rounds",
                                dispatch_rounds
                            );
                            return Err(EngramCoreError::ToolRoundLimit(self.max_tool_rounds));
                        }
                        dispatch_rounds += 1;
                        trace.push(TraceMessage::ai_with_tool_calls(
                            response.content,
                            response.tool_calls.clone(),
                        ));
                        state = AgentState::Dispatch(response.tool_calls);
                    }
                }
                AgentState::Dispatch(calls) => {
                    for call in calls {
                        let result = self.dispatch(&call).await?;
                        trace.push(TraceMessage::tool(result, call.name, call.id));
                    }
                    state = AgentState::ModelCall;
                }
                AgentState::Done => {
                    info!(
                        "turn finished (messages={}, dispatch_rounds={})",
                        trace.len(),
                        dispatch_rounds
                    );
                    return Ok(trace);
                }
            }
        }
    }

    /// Run one tool call. Ordinary failures become the tool result text so
    /// the model can read them; a failed tool session fails the turn.
    async fn dispatch(&self, call: &ToolCall) -> Result<String, EngramCoreError> {
        debug!("dispatching tool call (name={}, id={})", call.name, call.id);

        let Some(tool) = self.registry.get(&call.name) else {
            warn!("model requested unknown tool (name={})", call.name);
            return Ok(format!("Error: tool not found: {}", call.name));
        };

        let args = match call.parse_arguments() {
            Ok(args) => args,
            Err(err) => {
                warn!("unparseable arguments for tool (name={}): {err}", call.name);
                return Ok(format!("Error: invalid arguments: {err}"));
            }
        };

        match tool.call(args).await {
            Ok(value) => Ok(value_to_text(value)),
            Err(ToolError::SessionFailed(message)) => Err(EngramCoreError::ToolSession(message)),
            Err(err) => Ok(format!("Error: {err}")),
        }
    }
}

/// Flatten a tool result value to text for the trace.
fn value_to_text(value: Value) -> String {
    match value {
        Value::String(text) => text,
        other => other.to_string(),
    }
}
