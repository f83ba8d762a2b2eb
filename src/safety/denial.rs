//! The refusal value every guard returns.

/// A definitive refusal of one tool call.
///
/// The rendered message is shown verbatim to the agent as the tool's error
/// result, so every template reads as non-negotiable. Callers treat any
/// denial as fatal to the call and never retry it automatically.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Denial {
    /// A file write or edit aimed at a protected path.
    #[error("cannot {action} {path} — {reason}. This is a hard safety limit that cannot be overridden.")]
    ProtectedPath {
        action: String,
        /// The path exactly as the caller supplied it.
        path: String,
        reason: String,
    },

    /// A shell command matched an entry of the destructive-pattern catalog.
    #[error(
        "command blocked — {reason}. This is a hard safety limit that cannot be overridden; \
         if it is truly intended, do it manually in a terminal."
    )]
    Command {
        /// Catalog entry that matched.
        rule: &'static str,
        command: String,
        reason: String,
    },

    /// An `rm`, `chmod` or `chown` argument resolved into a protected path.
    #[error(
        "cannot delete/modify permissions on {target} — {reason}. This is a hard safety limit \
         that cannot be overridden; if it is truly intended, do it manually in a terminal."
    )]
    CommandTarget {
        command: String,
        /// The argument token as written in the command.
        target: String,
        reason: String,
    },
}

impl Denial {
    /// The action that was refused (`write`, `edit`, `execute`).
    pub fn action(&self) -> &str {
        match self {
            Self::ProtectedPath { action, .. } => action,
            Self::Command { .. } | Self::CommandTarget { .. } => "execute",
        }
    }

    /// The literal target: the path, the whole command, or the offending
    /// command argument.
    pub fn target(&self) -> &str {
        match self {
            Self::ProtectedPath { path, .. } => path,
            Self::Command { command, .. } => command,
            Self::CommandTarget { target, .. } => target,
        }
    }

    /// Human-readable reason the target is off limits.
    pub fn reason(&self) -> &str {
        match self {
            Self::ProtectedPath { reason, .. }
            | Self::Command { reason, .. }
            | Self::CommandTarget { reason, .. } => reason,
        }
    }
}
