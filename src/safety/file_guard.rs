//! Guard for the file tool's mutating actions.

use std::path::Path;

use serde::Deserialize;

use super::denial::Denial;
use super::paths::{PathClassifier, resolve_symlinks};

/// The part of a file tool call the guard looks at.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileRequest {
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub path: String,
}

/// Actions that modify the target file.
const MUTATING_ACTIONS: &[&str] = &["write", "edit"];

/// Refuses writes and edits that land in a protected region.
#[derive(Debug, Clone)]
pub struct FileGuard {
    paths: PathClassifier,
}

impl FileGuard {
    pub fn new(paths: PathClassifier) -> Self {
        Self { paths }
    }

    pub fn check(&self, request: &FileRequest) -> Result<(), Denial> {
        let action = request.action.to_lowercase();
        if !MUTATING_ACTIONS.contains(&action.as_str()) {
            return Ok(());
        }
        if request.path.is_empty() {
            return Ok(());
        }

        let literal = Path::new(&request.path);
        let absolute = std::path::absolute(literal).unwrap_or_else(|_| literal.to_path_buf());

        if let Some(reason) = self.paths.is_protected(&absolute) {
            return Err(self.deny(&action, request, reason, false));
        }

        // A symlink under a harmless name can point into a protected tree.
        match resolve_symlinks(&absolute) {
            Some(resolved) if resolved != absolute => {
                if let Some(reason) = self.paths.is_protected(&resolved) {
                    return Err(self.deny(&action, request, reason, true));
                }
            }
            Some(_) => {}
            None => tracing::debug!(path = %request.path, "symlink resolution failed; skipping"),
        }

        Ok(())
    }

    fn deny(&self, action: &str, request: &FileRequest, reason: &str, via_symlink: bool) -> Denial {
        let rule = if via_symlink {
            "protected-path-symlink"
        } else {
            "protected-path"
        };
        tracing::warn!(
            guard = "file",
            rule,
            target = %request.path,
            action,
            "file call denied"
        );
        Denial::ProtectedPath {
            action: action.to_string(),
            path: request.path.clone(),
            reason: reason.to_string(),
        }
    }
}
