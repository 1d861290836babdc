//! Scripted chat client fake.

use async_trait::async_trait;
use engram_rs_llm::{ChatClient, ChatResponse, LlmError};
use engram_rs_protocol::{ToolSpec, TraceMessage};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

/// Chat client that replays a fixed script of responses.
///
/// Each `chat` call pops the next scripted response; once the script is
/// exhausted the last response repeats. Received message traces and tool
/// names are recorded for assertions.
pub struct ScriptedChatClient {
    script: Mutex<VecDeque<ChatResponse>>,
    last: ChatResponse,
    seen_messages: Arc<Mutex<Vec<Vec<TraceMessage>>>>,
    seen_tools: Arc<Mutex<Vec<String>>>,
}

impl ScriptedChatClient {
    pub fn new(responses: Vec<ChatResponse>) -> Self {
        let last = responses
            .last()
            .cloned()
            .unwrap_or_else(|| ChatResponse {
                content: String::new(),
                tool_calls: Vec::new(),
            });
        Self {
            script: Mutex::new(responses.into()),
            last,
            seen_messages: Arc::new(Mutex::new(Vec::new())),
            seen_tools: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// All message traces passed to `chat`, in call order.
    pub fn seen_messages(&self) -> Vec<Vec<TraceMessage>> {
        self.seen_messages.lock().clone()
    }

    /// Tool names offered on the most recent `chat` call.
    pub fn seen_tools(&self) -> Vec<String> {
        self.seen_tools.lock().clone()
    }

    /// Number of `chat` calls made so far.
    pub fn calls(&self) -> usize {
        self.seen_messages.lock().len()
    }
}

#[async_trait]
impl ChatClient for ScriptedChatClient {
    async fn chat(
        &self,
        messages: &[TraceMessage],
        tools: &[ToolSpec],
    ) -> Result<ChatResponse, LlmError> {
        self.seen_messages.lock().push(messages.to_vec());
        *self.seen_tools.lock() = tools.iter().map(|tool| tool.name.clone()).collect();
        Ok(self.script.lock().pop_front().unwrap_or_else(|| self.last.clone()))
    }

    fn model(&self) -> &str {
        "scripted"
    }
}
