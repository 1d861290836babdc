//! Tool fakes for agent loop tests.

use async_trait::async_trait;
use engram_rs_protocol::{Tool, ToolError};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::Arc;

/// Tool that echoes its arguments back and records every invocation.
#[derive(Debug, Default)]
pub struct EchoTool {
    calls: Arc<Mutex<Vec<Value>>>,
}

impl EchoTool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arguments received so far, in call order.
    pub fn calls(&self) -> Vec<Value> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl Tool for EchoTool {
    fn name(&self) -> &str {
        "echo"
    }

    fn description(&self) -> &str {
        "echoes its arguments"
    }

    fn args_schema(&self) -> Value {
        json!({ "type": "object" })
    }

    async fn call(&self, args: Value) -> Result<Value, ToolError> {
        self.calls.lock().push(args.clone());
        Ok(args)
    }
}

/// Tool that always returns the same value under a configurable name.
#[derive(Debug)]
pub struct FixedTool {
    name: String,
    result: Value,
}

impl FixedTool {
    pub fn new(name: impl Into<String>, result: Value) -> Self {
        Self {
            name: name.into(),
            result,
        }
    }
}

#[async_trait]
impl Tool for FixedTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "returns a fixed result"
    }

    fn args_schema(&self) -> Value {
        json!({ "type": "object" })
    }

    async fn call(&self, _args: Value) -> Result<Value, ToolError> {
        Ok(self.result.clone())
    }
}
