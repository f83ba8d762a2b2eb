//! Tool trait and result types.

use std::time::Duration;

use async_trait::async_trait;

use crate::safety::Denial;

/// Error returned by a tool call.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("tool not found: {0}")]
    NotFound(String),

    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("execution failed: {0}")]
    ExecutionFailed(String),

    /// Refused by the safety guard before the tool ran.
    #[error(transparent)]
    Denied(#[from] Denial),
}

/// Successful tool output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    pub text: String,
    pub duration: Duration,
}

impl ToolOutput {
    pub fn text(text: impl Into<String>, duration: Duration) -> Self {
        Self {
            text: text.into(),
            duration,
        }
    }
}

/// A capability the agent can invoke by name.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Declared name; also the key the guard routes on.
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON schema of the parameters.
    fn parameters_schema(&self) -> serde_json::Value;

    async fn execute(&self, params: serde_json::Value) -> Result<ToolOutput, ToolError>;
}
