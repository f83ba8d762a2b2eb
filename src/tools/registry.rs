//! Registry that runs the guard in front of every tool.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use super::tool::{Tool, ToolError, ToolOutput};
use crate::safety::Guard;

/// Named tools plus the guard checked before each of them.
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
    guard: Guard,
}

impl ToolRegistry {
    pub fn new(guard: Guard) -> Self {
        Self {
            tools: HashMap::new(),
            guard,
        }
    }

    /// Register a tool under its declared name, replacing any previous one.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        if self.tools.insert(name.clone(), tool).is_some() {
            debug!(tool = %name, "replaced registered tool");
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn guard(&self) -> &Guard {
        &self.guard
    }

    /// Run a tool. A guard denial is returned as [`ToolError::Denied`] and
    /// the tool body is never entered.
    pub async fn execute(
        &self,
        name: &str,
        params: serde_json::Value,
    ) -> Result<ToolOutput, ToolError> {
        let tool = self
            .get(name)
            .ok_or_else(|| ToolError::NotFound(name.to_string()))?;

        self.guard.check(name, &params)?;

        tool.execute(params).await
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new(Guard::new())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use serde_json::json;

    use super::*;
    use crate::safety::Denial;

    struct RecordingTool {
        name: &'static str,
        ran: AtomicBool,
    }

    impl RecordingTool {
        fn new(name: &'static str) -> Arc<Self> {
            Arc::new(Self {
                name,
                ran: AtomicBool::new(false),
            })
        }
    }

    #[async_trait]
    impl Tool for RecordingTool {
        fn name(&self) -> &str {
            self.name
        }

        fn description(&self) -> &str {
            "records whether it ran"
        }

        fn parameters_schema(&self) -> serde_json::Value {
            json!({"type": "object"})
        }

        async fn execute(&self, _params: serde_json::Value) -> Result<ToolOutput, ToolError> {
            self.ran.store(true, Ordering::SeqCst);
            Ok(ToolOutput::text("ok", Duration::ZERO))
        }
    }

    #[tokio::test]
    async fn test_denied_call_never_runs_tool() {
        let shell = RecordingTool::new("shell");
        let mut registry = ToolRegistry::default();
        registry.register(shell.clone());

        let err = registry
            .execute("shell", json!({"action": "exec", "command": "sudo reboot"}))
            .await
            .unwrap_err();

        assert!(matches!(err, ToolError::Denied(Denial::Command { rule: "sudo", .. })));
        assert!(!shell.ran.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_allowed_call_runs_tool() {
        let shell = RecordingTool::new("shell");
        let mut registry = ToolRegistry::default();
        registry.register(shell.clone());

        let output = registry
            .execute("shell", json!({"action": "exec", "command": "ls -la"}))
            .await
            .unwrap();

        assert_eq!(output.text, "ok");
        assert!(shell.ran.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_unguarded_tool_runs() {
        let http = RecordingTool::new("http");
        let mut registry = ToolRegistry::default();
        registry.register(http.clone());

        registry
            .execute("http", json!({"action": "exec", "command": "rm -rf /"}))
            .await
            .unwrap();
        assert!(http.ran.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let registry = ToolRegistry::default();
        let err = registry.execute("missing", json!({})).await.unwrap_err();
        assert!(matches!(err, ToolError::NotFound(name) if name == "missing"));
    }

    #[test]
    fn test_denial_message_passes_through() {
        let denial = Denial::ProtectedPath {
            action: "write".to_string(),
            path: "/etc/hosts".to_string(),
            reason: "system configuration".to_string(),
        };
        let err = ToolError::from(denial.clone());
        assert_eq!(err.to_string(), denial.to_string());
    }

    #[test]
    fn test_names_sorted() {
        let mut registry = ToolRegistry::default();
        registry.register(RecordingTool::new("shell"));
        registry.register(RecordingTool::new("file"));
        assert_eq!(registry.names(), vec!["file", "shell"]);
    }
}
