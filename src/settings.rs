//! Guard settings.
//!
//! These settings describe *who* the guard is protecting (which directory
//! holds the agent's own state) and *which* tool names are routed to which
//! guard. They never describe *whether* a rule applies: every rule is always
//! on, and there is no `enabled` switch or fail mode.
//!
//! A host application usually embeds [`GuardSettings`] inside its own
//! settings file; [`GuardSettings::load_from`] covers the standalone case.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Settings consumed when the guard is built at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardSettings {
    /// Identity of the agent whose data directory is self-protected.
    #[serde(default)]
    pub identity: AgentIdentity,

    /// Tool names routed to the file and shell guards.
    #[serde(default)]
    pub tools: GuardedToolNames,
}

/// Where the agent keeps its persisted state (database, config).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentIdentity {
    /// Directory name under the platform application-data directory
    /// (`~/.local/share/<name>`, `~/Library/Application Support/<name>`,
    /// `%APPDATA%\<name>`).
    #[serde(default = "default_app_dir_name")]
    pub app_dir_name: String,

    /// Environment variable that overrides the data directory root.
    #[serde(default = "default_data_dir_env")]
    pub data_dir_env: String,
}

fn default_app_dir_name() -> String {
    "hardline".to_string()
}

fn default_data_dir_env() -> String {
    "HARDLINE_DATA_DIR".to_string()
}

impl Default for AgentIdentity {
    fn default() -> Self {
        Self {
            app_dir_name: default_app_dir_name(),
            data_dir_env: default_data_dir_env(),
        }
    }
}

impl AgentIdentity {
    /// Resolve the agent's data directory right now.
    ///
    /// The override variable wins when set to a non-empty value; otherwise
    /// the platform application-data convention applies. Nothing is cached,
    /// so a changed environment is picked up on the next call. Returns
    /// `None` when neither source yields a directory.
    pub fn data_dir(&self) -> Option<PathBuf> {
        if let Some(value) = std::env::var_os(&self.data_dir_env)
            && !value.is_empty()
        {
            let dir = PathBuf::from(value);
            return Some(std::path::absolute(&dir).unwrap_or(dir));
        }
        dirs::data_dir().map(|base| base.join(&self.app_dir_name))
    }
}

/// Declared tool names that carry the two privileged capabilities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardedToolNames {
    /// Names of tools that write or edit files.
    #[serde(default = "default_file_tools")]
    pub file: Vec<String>,

    /// Names of tools that execute shell commands.
    #[serde(default = "default_shell_tools")]
    pub shell: Vec<String>,
}

fn default_file_tools() -> Vec<String> {
    vec!["file".to_string()]
}

fn default_shell_tools() -> Vec<String> {
    vec!["shell".to_string()]
}

impl Default for GuardedToolNames {
    fn default() -> Self {
        Self {
            file: default_file_tools(),
            shell: default_shell_tools(),
        }
    }
}

impl GuardSettings {
    /// Load settings from a JSON file, returning defaults if it is missing
    /// or unreadable.
    pub fn load_from(path: &Path) -> Self {
        let data = match std::fs::read_to_string(path) {
            Ok(data) => data,
            Err(_) => return Self::default(),
        };
        match serde_json::from_str(&data) {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!(
                    "Invalid guard settings at {}: {}; using defaults",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = GuardSettings::default();
        assert_eq!(settings.identity.app_dir_name, "hardline");
        assert_eq!(settings.identity.data_dir_env, "HARDLINE_DATA_DIR");
        assert_eq!(settings.tools.file, vec!["file"]);
        assert_eq!(settings.tools.shell, vec!["shell"]);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let settings: GuardSettings =
            serde_json::from_str(r#"{"identity": {"app_dir_name": "acme"}}"#).unwrap();
        assert_eq!(settings.identity.app_dir_name, "acme");
        assert_eq!(settings.identity.data_dir_env, "HARDLINE_DATA_DIR");
        assert_eq!(settings.tools, GuardedToolNames::default());
    }

    #[test]
    fn test_load_from_missing_file() {
        let settings = GuardSettings::load_from(Path::new("/nonexistent/hardline/settings.json"));
        assert_eq!(settings, GuardSettings::default());
    }

    #[test]
    fn test_load_from_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{not json").unwrap();
        assert_eq!(GuardSettings::load_from(&path), GuardSettings::default());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"tools": {"shell": ["shell", "bash"]}}"#).unwrap();
        let settings = GuardSettings::load_from(&path);
        assert_eq!(settings.tools.shell, vec!["shell", "bash"]);
        assert_eq!(settings.tools.file, vec!["file"]);
    }

    #[test]
    fn test_data_dir_env_override() {
        let identity = AgentIdentity {
            app_dir_name: "hardline".to_string(),
            data_dir_env: "HARDLINE_TEST_SETTINGS_DATA_DIR".to_string(),
        };
        // SAFETY: the variable name is unique to this test.
        unsafe { std::env::set_var("HARDLINE_TEST_SETTINGS_DATA_DIR", "/srv/agent-state") };
        assert_eq!(identity.data_dir(), Some(PathBuf::from("/srv/agent-state")));

        // SAFETY: as above.
        unsafe { std::env::set_var("HARDLINE_TEST_SETTINGS_DATA_DIR", "") };
        let fallback = identity.data_dir();
        assert_ne!(fallback, Some(PathBuf::from("")));
        if let Some(dir) = fallback {
            assert!(dir.ends_with("hardline"));
        }

        // SAFETY: as above.
        unsafe { std::env::remove_var("HARDLINE_TEST_SETTINGS_DATA_DIR") };
    }
}
