//! Registry for tool implementations.

use engram_rs_protocol::{Tool, ToolSpec};
use log::debug;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// In-memory registry for tool implementations.
#[derive(Default, Clone)]
pub struct ToolRegistry {
    /// Map of tool name to implementation.
    tools: Arc<RwLock<HashMap<String, Arc<dyn Tool>>>>,
}

impl ToolRegistry {
    /// Create an empty tool registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool by name.
    pub fn register(&self, tool: Arc<dyn Tool>) {
        debug!("registering tool (name={})", tool.name());
        self.tools.write().insert(tool.name().to_string(), tool);
    }

    /// Fetch a tool by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.read().get(name).cloned()
    }

    /// List all registered tool names.
    pub fn list(&self) -> Vec<String> {
        self.tools.read().keys().cloned().collect()
    }

    /// Return tool specs for all registered tools.
    pub fn specs(&self) -> Vec<ToolSpec> {
        self.tools.read().values().map(|tool| tool.spec()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::ToolRegistry;
    use engram_rs_test_utils::{EchoTool, FixedTool};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::Arc;

    #[test]
    fn registry_tracks_tools_and_specs() {
        let registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool::new()));
        registry.register(Arc::new(FixedTool::new("analyze_pr", json!("ok"))));

        let mut names = registry.list();
        names.sort();
        assert_eq!(names, vec!["analyze_pr", "echo"]);

        let mut spec_names = registry
            .specs()
            .into_iter()
            .map(|spec| spec.name)
            .collect::<Vec<_>>();
        spec_names.sort();
        assert_eq!(spec_names, vec!["analyze_pr", "echo"]);
        assert!(registry.get("echo").is_some());
        assert!(registry.get("missing").is_none());
    }
}
