//! Adapts discovered MCP tools into the shared `Tool` interface.

use crate::error::McpError;
use crate::session::{DiscoveredTool, McpSession};
use async_trait::async_trait;
use engram_rs_protocol::{Tool, ToolError};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// A remote tool bound to the live session that discovered it.
#[derive(Clone)]
pub struct McpTool {
    session: Arc<McpSession>,
    descriptor: DiscoveredTool,
}

impl McpTool {
    /// Bind a discovered tool to its session.
    pub fn new(session: Arc<McpSession>, descriptor: DiscoveredTool) -> Self {
        Self {
            session,
            descriptor,
        }
    }
}

impl fmt::Debug for McpTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("McpTool")
            .field("name", &self.descriptor.name)
            .finish()
    }
}

#[async_trait]
impl Tool for McpTool {
    fn name(&self) -> &str {
        &self.descriptor.name
    }

    fn description(&self) -> &str {
        &self.descriptor.description
    }

    fn args_schema(&self) -> Value {
        self.descriptor.input_schema.clone()
    }

    async fn call(&self, args: Value) -> Result<Value, ToolError> {
        let text = self
            .session
            .call_tool(&self.descriptor.name, args)
            .await
            .map_err(|err| match err {
                McpError::SpawnFailed { .. } | McpError::TransportClosed | McpError::Timeout { .. } => {
                    ToolError::SessionFailed(err.to_string())
                }
                other => ToolError::ExecutionFailed(other.to_string()),
            })?;
        Ok(Value::String(text))
    }
}

/// Discover the server's tools and wrap each for the agent runtime.
pub async fn remote_tools(session: Arc<McpSession>) -> Result<Vec<Arc<dyn Tool>>, McpError> {
    let discovered = session.list_tools().await?;
    Ok(discovered
        .into_iter()
        .map(|descriptor| Arc::new(McpTool::new(session.clone(), descriptor)) as Arc<dyn Tool>)
        .collect())
}
