//! Guard for the shell tool.

use serde::Deserialize;

use super::command_guard::{CommandClassifier, CommandVerdict, truncate};
use super::denial::Denial;

/// Resource identifier of the shell tool.
pub const SHELL_RESOURCE: &str = "shell";

/// Action names that mean "run this command".
const EXEC_ACTIONS: &[&str] = &["exec", "execute"];

/// The part of a shell tool call the guard looks at.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ShellRequest {
    #[serde(default)]
    pub resource: String,
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub command: String,
}

impl ShellRequest {
    /// Whether this request executes a command and must be classified.
    fn executes(&self) -> bool {
        (self.resource.is_empty() || self.resource == SHELL_RESOURCE)
            && EXEC_ACTIONS.contains(&self.action.as_str())
            && !self.command.trim().is_empty()
    }
}

/// Refuses shell commands matched by the destructive catalog.
#[derive(Debug, Clone)]
pub struct ShellGuard {
    commands: CommandClassifier,
}

impl ShellGuard {
    pub fn new(commands: CommandClassifier) -> Self {
        Self { commands }
    }

    pub fn check(&self, request: &ShellRequest) -> Result<(), Denial> {
        if !request.executes() {
            tracing::debug!(
                resource = %request.resource,
                action = %request.action,
                "shell call does not execute a command; skipping"
            );
            return Ok(());
        }

        match self.commands.classify(&request.command) {
            CommandVerdict::Allow => Ok(()),
            CommandVerdict::Destructive { rule, reason } => {
                tracing::warn!(
                    guard = "shell",
                    rule,
                    target = truncate(&request.command, 120),
                    "shell command denied"
                );
                Err(Denial::Command {
                    rule,
                    command: request.command.clone(),
                    reason: reason.to_string(),
                })
            }
            CommandVerdict::ProtectedTarget {
                program,
                target,
                reason,
            } => {
                tracing::warn!(
                    guard = "shell",
                    rule = "protected-target",
                    program = %program,
                    target = %target,
                    "shell command denied"
                );
                Err(Denial::CommandTarget {
                    command: request.command.clone(),
                    target,
                    reason: reason.to_string(),
                })
            }
        }
    }
}
