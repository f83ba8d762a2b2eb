//! Routes a tool call to the guard for its capability.
//!
//! The name-to-guard table is built once at startup and never changes.
//! Tools not in the table carry no privileged capability and pass through.

use std::collections::HashMap;
use std::sync::LazyLock;

use serde::de::DeserializeOwned;
use serde_json::Value;

use super::command_guard::CommandClassifier;
use super::denial::Denial;
use super::file_guard::{FileGuard, FileRequest};
use super::paths::PathClassifier;
use super::shell_guard::{ShellGuard, ShellRequest};
use crate::settings::GuardSettings;

/// Which guard a tool name is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardKind {
    File,
    Shell,
}

/// Immutable mapping from declared tool name to guard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardTable {
    routes: HashMap<String, GuardKind>,
}

impl GuardTable {
    /// `file` to the file guard, `shell` to the shell guard.
    pub fn standard() -> Self {
        Self::from_settings(&GuardSettings::default())
    }

    pub fn from_settings(settings: &GuardSettings) -> Self {
        let file = settings.tools.file.iter().map(|name| (name.clone(), GuardKind::File));
        let shell = settings.tools.shell.iter().map(|name| (name.clone(), GuardKind::Shell));
        Self {
            routes: file.chain(shell).collect(),
        }
    }

    pub fn route(&self, tool_name: &str) -> Option<GuardKind> {
        self.routes.get(tool_name).copied()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl Default for GuardTable {
    fn default() -> Self {
        Self::standard()
    }
}

/// The unconditional pre-execution check for tool calls.
///
/// Cheap to share: holds no mutable state, so one instance can serve every
/// concurrent call.
#[derive(Debug, Clone)]
pub struct Guard {
    table: GuardTable,
    file: FileGuard,
    shell: ShellGuard,
}

impl Guard {
    /// Guard with default settings for the host platform.
    pub fn new() -> Self {
        Self::from_settings(&GuardSettings::default())
    }

    pub fn from_settings(settings: &GuardSettings) -> Self {
        Self::with_classifier(
            GuardTable::from_settings(settings),
            PathClassifier::new(settings.identity.clone()),
        )
    }

    /// Guard over an explicit table and path classifier.
    pub fn with_classifier(table: GuardTable, paths: PathClassifier) -> Self {
        Self {
            table,
            file: FileGuard::new(paths.clone()),
            shell: ShellGuard::new(CommandClassifier::new(paths)),
        }
    }

    pub fn table(&self) -> &GuardTable {
        &self.table
    }

    /// Check a tool call before it runs.
    ///
    /// A payload that does not have the expected shape is allowed; the
    /// tool's own validation rejects it.
    pub fn check(&self, tool_name: &str, payload: &Value) -> Result<(), Denial> {
        match self.table.route(tool_name) {
            Some(GuardKind::File) => match parse::<FileRequest>(tool_name, payload) {
                Some(request) => self.file.check(&request),
                None => Ok(()),
            },
            Some(GuardKind::Shell) => match parse::<ShellRequest>(tool_name, payload) {
                Some(request) => self.shell.check(&request),
                None => Ok(()),
            },
            None => Ok(()),
        }
    }

    /// Like [`Guard::check`], for a payload still in JSON text form.
    pub fn check_json(&self, tool_name: &str, raw: &str) -> Result<(), Denial> {
        if self.table.route(tool_name).is_none() {
            return Ok(());
        }
        match serde_json::from_str::<Value>(raw) {
            Ok(payload) => self.check(tool_name, &payload),
            Err(e) => {
                tracing::debug!(tool = tool_name, error = %e, "unparseable tool payload; skipping guard");
                Ok(())
            }
        }
    }
}

impl Default for Guard {
    fn default() -> Self {
        Self::new()
    }
}

fn parse<T: DeserializeOwned>(tool_name: &str, payload: &Value) -> Option<T> {
    match T::deserialize(payload) {
        Ok(request) => Some(request),
        Err(e) => {
            tracing::debug!(tool = tool_name, error = %e, "malformed tool payload; skipping guard");
            None
        }
    }
}

static DEFAULT_GUARD: LazyLock<Guard> = LazyLock::new(Guard::new);

/// Check a tool call with the default guard.
pub fn check(tool_name: &str, payload: &Value) -> Result<(), Denial> {
    DEFAULT_GUARD.check(tool_name, payload)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::safety::paths::Platform;
    use crate::settings::AgentIdentity;

    fn guard() -> Guard {
        Guard::with_classifier(
            GuardTable::standard(),
            PathClassifier::for_platform(Platform::Linux, AgentIdentity::default()),
        )
    }

    #[test]
    fn test_standard_table() {
        let table = GuardTable::standard();
        assert_eq!(table.route("file"), Some(GuardKind::File));
        assert_eq!(table.route("shell"), Some(GuardKind::Shell));
        assert_eq!(table.route("http"), None);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_aliases_from_settings() {
        let mut settings = GuardSettings::default();
        settings.tools.shell.push("bash".to_string());
        settings.tools.file.push("write_file".to_string());
        let table = GuardTable::from_settings(&settings);
        assert_eq!(table.route("bash"), Some(GuardKind::Shell));
        assert_eq!(table.route("write_file"), Some(GuardKind::File));
    }

    #[test]
    fn test_shell_routed() {
        let g = guard();
        let payload = json!({"resource": "shell", "action": "exec", "command": "sudo ls"});
        assert!(g.check("shell", &payload).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_file_routed() {
        let g = guard();
        assert!(g.check("file", &json!({"action": "write", "path": "/etc/hosts"})).is_err());
        assert!(g.check("file", &json!({"action": "read", "path": "/etc/hosts"})).is_ok());
    }

    #[test]
    fn test_unknown_tool_allowed() {
        let g = guard();
        let payload = json!({"action": "exec", "command": "rm -rf /"});
        assert!(g.check("http", &payload).is_ok());
        assert!(g.check("", &payload).is_ok());
    }

    #[test]
    fn test_malformed_payload_allowed() {
        let g = guard();
        assert!(g.check("shell", &Value::Null).is_ok());
        assert!(g.check("shell", &json!("rm -rf /")).is_ok());
        assert!(g.check("shell", &json!({"command": 42})).is_ok());
        assert!(g.check("file", &json!([1, 2, 3])).is_ok());
    }

    #[test]
    fn test_missing_fields_default() {
        let g = guard();
        // No action means nothing is executed.
        assert!(g.check("shell", &json!({"command": "rm -rf /"})).is_ok());
        assert!(g.check("shell", &json!({"action": "exec", "command": "rm -rf /"})).is_err());
    }

    #[test]
    fn test_check_json() {
        let g = guard();
        assert!(g.check_json("shell", r#"{"action":"exec","command":"rm -rf /"}"#).is_err());
        assert!(g.check_json("shell", "{not json").is_ok());
        assert!(g.check_json("http", "{not json").is_ok());
    }

    #[test]
    fn test_free_check_uses_default_guard() {
        let payload = json!({"action": "exec", "command": ":(){ :|:& };:"});
        assert!(check("shell", &payload).is_err());
        assert!(check("shell", &json!({"action": "exec", "command": "ls"})).is_ok());
    }
}
