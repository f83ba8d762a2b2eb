//! Protected-path classification.
//!
//! [`PathClassifier::is_protected`] answers one question: may a mutating
//! operation touch this absolute path? Three sources are consulted, in order:
//!
//! 1. The filesystem root and the host OS table ([`Platform::rules`]).
//! 2. Credential directories under the current user's home.
//! 3. The agent's own data directory (see [`AgentIdentity::data_dir`]).
//!
//! Sources 2 and 3 are resolved on every call. Nothing is cached, so the
//! classifier has no state a previous call could have weakened.

mod platform;

use std::path::{Path, PathBuf};

pub use platform::{Platform, RuleSet};

use crate::settings::AgentIdentity;

/// A system directory prefix that must never be written, deleted or have its
/// permissions changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtectedPathRule {
    pub prefix: &'static str,
    pub reason: &'static str,
}

/// A credential location, relative to the user's home directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensitiveUserRule {
    /// `/`-separated path under the home directory.
    pub relative_path: &'static str,
    pub reason: &'static str,
}

pub static SENSITIVE_USER_RULES: &[SensitiveUserRule] = &[
    SensitiveUserRule {
        relative_path: ".ssh",
        reason: "SSH keys and configuration",
    },
    SensitiveUserRule {
        relative_path: ".gnupg",
        reason: "the GPG keyring",
    },
    SensitiveUserRule {
        relative_path: ".aws/credentials",
        reason: "AWS credentials",
    },
    SensitiveUserRule {
        relative_path: ".aws/config",
        reason: "AWS configuration",
    },
    SensitiveUserRule {
        relative_path: ".config/gcloud",
        reason: "Google Cloud credentials",
    },
    SensitiveUserRule {
        relative_path: ".azure",
        reason: "Azure CLI credentials",
    },
    SensitiveUserRule {
        relative_path: ".kube/config",
        reason: "Kubernetes cluster credentials",
    },
    SensitiveUserRule {
        relative_path: ".docker/config.json",
        reason: "container registry credentials",
    },
];

pub const ROOT_REASON: &str = "the filesystem root";

pub const SELF_DATA_REASON: &str = "the agent's own data directory; \
     deleting or overwriting it would destroy the agent's database and configuration";

/// Decides whether an absolute path lies inside a protected region.
#[derive(Debug, Clone)]
pub struct PathClassifier {
    platform: Platform,
    rules: &'static dyn RuleSet,
    identity: AgentIdentity,
}

impl PathClassifier {
    /// Classifier for the host platform.
    pub fn new(identity: AgentIdentity) -> Self {
        Self::for_platform(Platform::current(), identity)
    }

    /// Classifier using another platform's table and path syntax.
    pub fn for_platform(platform: Platform, identity: AgentIdentity) -> Self {
        Self {
            platform,
            rules: platform.rules(),
            identity,
        }
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn identity(&self) -> &AgentIdentity {
        &self.identity
    }

    /// Return the reason `path` is protected, or `None` if it is not.
    ///
    /// `path` should be absolute; it is cleaned lexically before matching.
    /// Failing home or data directory lookups skip the corresponding rules.
    pub fn is_protected(&self, path: &Path) -> Option<&'static str> {
        let cleaned = self.rules.clean(&path.to_string_lossy());
        if self.rules.is_root(&cleaned) {
            return Some(ROOT_REASON);
        }

        let key = self.rules.fold(cleaned);
        let sep = self.rules.separator();

        if let Some(rule) = self
            .rules
            .system_rules()
            .iter()
            .find(|rule| within(&key, rule.prefix, sep))
        {
            return Some(rule.reason);
        }

        if let Some(reason) = self.sensitive_user_reason(&key) {
            return Some(reason);
        }

        if self.is_self_data(&key) {
            return Some(SELF_DATA_REASON);
        }

        None
    }

    fn sensitive_user_reason(&self, key: &str) -> Option<&'static str> {
        let Some(home) = dirs::home_dir() else {
            tracing::debug!("Home directory unavailable; skipping credential path rules");
            return None;
        };
        let home = home.to_string_lossy();
        let sep = self.rules.separator();
        let sep_str = sep.to_string();

        SENSITIVE_USER_RULES
            .iter()
            .find(|rule| {
                let relative = rule.relative_path.replace('/', &sep_str);
                let prefix = self.rules.normalize(&format!("{home}{sep}{relative}"));
                within(key, &prefix, sep)
            })
            .map(|rule| rule.reason)
    }

    fn is_self_data(&self, key: &str) -> bool {
        let Some(dir) = self.identity.data_dir() else {
            tracing::debug!("Agent data directory unavailable; skipping self-protection rule");
            return false;
        };
        let sep = self.rules.separator();

        let mut candidates = vec![self.rules.normalize(&dir.to_string_lossy())];
        if let Ok(real) = std::fs::canonicalize(&dir)
            && real != dir
        {
            candidates.push(self.rules.normalize(&real.to_string_lossy()));
        }

        candidates.iter().any(|prefix| within(key, prefix, sep))
    }
}

/// `path` equals `prefix` or continues it past a separator.
fn within(path: &str, prefix: &str, sep: char) -> bool {
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with(sep),
        None => false,
    }
}

/// Resolve every symlink in `path`.
///
/// A path that does not exist yet is resolved through its deepest existing
/// ancestor, with the missing tail re-attached. Returns `None` when nothing
/// along the path can be resolved.
pub fn resolve_symlinks(path: &Path) -> Option<PathBuf> {
    if let Ok(real) = std::fs::canonicalize(path) {
        return Some(real);
    }

    for ancestor in path.ancestors().skip(1) {
        if ancestor.as_os_str().is_empty() {
            break;
        }
        if let Ok(real) = std::fs::canonicalize(ancestor) {
            let tail = path.strip_prefix(ancestor).ok()?;
            return Some(real.join(tail));
        }
    }

    None
}
