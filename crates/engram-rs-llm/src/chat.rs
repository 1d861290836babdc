//! OpenAI-compatible chat completion client with tool calling.

use crate::error::LlmError;
use async_trait::async_trait;
use engram_rs_config::LlmConfig;
use engram_rs_protocol::{ToolCall, ToolSpec, TraceMessage};
use log::debug;
use serde::{Deserialize, Serialize};

/// One model response: final text and any tool-call requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatResponse {
    /// Assistant text content (empty when the model only calls tools).
    pub content: String,
    /// Tool-call requests issued by the model.
    pub tool_calls: Vec<ToolCall>,
}

impl ChatResponse {
    /// Whether the model requested any tool calls.
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// Interface for chat-completion providers.
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Invoke the model with the accumulated trace and available tools.
    async fn chat(
        &self,
        messages: &[TraceMessage],
        tools: &[ToolSpec],
    ) -> Result<ChatResponse, LlmError>;

    /// Model name used by this client.
    fn model(&self) -> &str;
}

/// Chat client for the OpenAI chat completions API.
pub struct OpenAiChatClient {
    client: reqwest::Client,
    config: LlmConfig,
}

impl OpenAiChatClient {
    /// Create a client from config.
    pub fn new(config: LlmConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    fn build_request(&self, messages: &[TraceMessage], tools: &[ToolSpec]) -> WireRequest {
        WireRequest {
            model: self.config.model.clone(),
            messages: messages.iter().map(convert_message).collect(),
            tools: if tools.is_empty() {
                None
            } else {
                Some(tools.iter().map(convert_tool).collect())
            },
            temperature: self.config.temperature,
        }
    }
}

#[async_trait]
impl ChatClient for OpenAiChatClient {
    async fn chat(
        &self,
        messages: &[TraceMessage],
        tools: &[ToolSpec],
    ) -> Result<ChatResponse, LlmError> {
        let request = self.build_request(messages, tools);
        let url = format!("{}/v1/chat/completions", self.config.api_base);
        debug!(
            "chat request (model={}, messages={}, tools={})",
            self.config.model,
            messages.len(),
            tools.len()
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let body: WireResponse = response.json().await?;
        convert_response(body)
    }

    fn model(&self) -> &str {
        &self.config.model
    }
}

fn convert_message(message: &TraceMessage) -> WireMessage {
    match message {
        TraceMessage::System { content } => WireMessage {
            role: "system",
            content: Some(content.clone()),
            tool_calls: None,
            tool_call_id: None,
        },
        TraceMessage::Human { content } => WireMessage {
            role: "user",
            content: Some(content.clone()),
            tool_calls: None,
            tool_call_id: None,
        },
        TraceMessage::Ai {
            content,
            tool_calls,
        } => WireMessage {
            role: "assistant",
            content: if content.is_empty() {
                None
            } else {
                Some(content.clone())
            },
            tool_calls: if tool_calls.is_empty() {
                None
            } else {
                Some(
                    tool_calls
                        .iter()
                        .map(|call| WireToolCall {
                            id: call.id.clone(),
                            kind: "function".to_string(),
                            function: WireFunctionCall {
                                name: call.name.clone(),
                                arguments: call.arguments.clone(),
                            },
                        })
                        .collect(),
                )
            },
            tool_call_id: None,
        },
        TraceMessage::Tool {
            content,
            tool_call_id,
            ..
        } => WireMessage {
            role: "tool",
            content: Some(content.clone()),
            tool_calls: None,
            tool_call_id: Some(tool_call_id.clone()),
        },
    }
}

fn convert_tool(spec: &ToolSpec) -> WireTool {
    WireTool {
        kind: "function".to_string(),
        function: WireFunction {
            name: spec.name.clone(),
            description: spec.description.clone(),
            parameters: spec.args_schema.clone(),
        },
    }
}

fn convert_response(response: WireResponse) -> Result<ChatResponse, LlmError> {
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| LlmError::InvalidResponse("response carried no choices".to_string()))?;

    let tool_calls = choice
        .message
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .map(|call| ToolCall::new(call.id, call.function.name, call.function.arguments))
        .collect();

    Ok(ChatResponse {
        content: choice.message.content.unwrap_or_default(),
        tool_calls,
    })
}

#[derive(Debug, Serialize)]
struct WireRequest {
    model: String,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<WireTool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize)]
struct WireMessage {
    role: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<WireToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct WireTool {
    #[serde(rename = "type")]
    kind: String,
    function: WireFunction,
}

#[derive(Debug, Serialize)]
struct WireFunction {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireToolCall {
    id: String,
    #[serde(rename = "type")]
    kind: String,
    function: WireFunctionCall,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireFunctionCall {
    name: String,
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct WireResponse {
    choices: Vec<WireChoice>,
}

#[derive(Debug, Deserialize)]
struct WireChoice {
    message: WireResponseMessage,
}

#[derive(Debug, Default, Deserialize)]
struct WireResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<WireToolCall>>,
}
