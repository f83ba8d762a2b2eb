//! Command classifier for blocking catastrophic shell commands.
//!
//! Evaluation walks a fixed, ordered catalog and stops at the first hit:
//!
//! 1. `sudo` in command position
//! 2. `su` in command position
//! 3. recursive delete of `/` or `/*`
//! 4. `dd` writing to a block device
//! 5. disk formatting and partitioning tools
//! 6. the classic fork bomb
//! 7. redirection into a device file
//! 8. `rm`, `chmod` or `chown` aimed at a protected path
//!
//! Stages 1-7 are pure text heuristics over the lowercased command. Stage 8
//! tokenizes each pipeline segment and asks the [`PathClassifier`] about
//! every non-flag argument.
//!
//! The list is short on purpose; broader policy (git, databases, cloud
//! CLIs) belongs to a configurable layer above this one.

use std::path::{Component, Path, PathBuf};
use std::sync::LazyLock;

use aho_corasick::AhoCorasick;
use regex::Regex;

use super::paths::PathClassifier;

/// Result of classifying a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandVerdict {
    /// Nothing in the catalog matched.
    Allow,
    /// A catalog entry matched.
    Destructive {
        rule: &'static str,
        reason: &'static str,
    },
    /// An `rm`/`chmod`/`chown` argument lies inside a protected region.
    ProtectedTarget {
        program: String,
        /// The argument as written, quotes removed.
        target: String,
        reason: &'static str,
    },
}

impl CommandVerdict {
    pub fn is_blocked(&self) -> bool {
        !matches!(self, Self::Allow)
    }
}

enum Matcher {
    Regex(&'static LazyLock<Regex>),
    /// Called with the trimmed command and its lowercase form.
    Predicate(fn(&str, &str) -> bool),
}

/// A single entry of the destructive catalog.
pub struct DestructivePattern {
    pub name: &'static str,
    matcher: Matcher,
    pub reason: &'static str,
}

impl DestructivePattern {
    fn matches(&self, raw: &str, lower: &str) -> bool {
        match &self.matcher {
            Matcher::Regex(re) => re.is_match(lower),
            Matcher::Predicate(f) => f(raw, lower),
        }
    }
}

// ---------------------------------------------------------------------------
// Macro helpers for pattern definitions
// ---------------------------------------------------------------------------

macro_rules! lazy_re {
    ($pat:expr) => {{
        static RE: LazyLock<Regex> =
            LazyLock::new(|| Regex::new($pat).expect("catalog regex must compile"));
        &RE
    }};
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// Destructive patterns in evaluation order.
pub static CATALOG: &[DestructivePattern] = &[
    DestructivePattern {
        name: "sudo",
        matcher: Matcher::Regex(lazy_re!(r"(?:^|\|\||&&|\||;|\$\(|`)[ \t]*sudo[ \t]")),
        reason: "privilege escalation with sudo is not allowed",
    },
    DestructivePattern {
        name: "su",
        matcher: Matcher::Regex(lazy_re!(r"^su(?:[ \t]|$)|(?:\|\||&&|\||;)[ \t]*su[ \t]")),
        reason: "switching user with su is privilege escalation and is not allowed",
    },
    DestructivePattern {
        name: "rm-root",
        matcher: Matcher::Regex(lazy_re!(
            r"\brm\s+(?:-(?:rf|fr)\s+(?:--no-preserve-root\s+)?|--no-preserve-root\s+-(?:rf|fr)\s+)(?:/\*|/(?:$|[\s;&|]))"
        )),
        reason: "recursively deleting the root filesystem would destroy the host",
    },
    DestructivePattern {
        name: "dd-block-device",
        matcher: Matcher::Predicate(dd_writes_device),
        reason: "writing raw data to a block device destroys its partition table and filesystems",
    },
    DestructivePattern {
        name: "disk-format",
        matcher: Matcher::Predicate(invokes_disk_utility),
        reason: "disk formatting and partitioning tools destroy all data on the target disk",
    },
    DestructivePattern {
        name: "fork-bomb",
        matcher: Matcher::Predicate(is_fork_bomb),
        reason: "fork bombs exhaust the process table and hang the host",
    },
    DestructivePattern {
        name: "device-write",
        matcher: Matcher::Predicate(redirects_into_device),
        reason: "redirecting output into a device file can corrupt disks or hardware state",
    },
];

/// Device files that are harmless to redirect into.
const SAFE_SINKS: &[&str] = &["null", "stdout", "stderr"];

static DD_TARGET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"of= ?/dev/").expect("dd regex must compile"));

static DEVICE_REDIRECT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r">\s?/dev/([^\s;|&)<>]+)").expect("redirect regex must compile"));

fn dd_writes_device(_raw: &str, lower: &str) -> bool {
    lower.contains("dd ") && DD_TARGET.is_match(lower)
}

fn redirects_into_device(_raw: &str, lower: &str) -> bool {
    DEVICE_REDIRECT
        .captures_iter(lower)
        .any(|cap| !SAFE_SINKS.contains(&&cap[1]))
}

fn is_fork_bomb(_raw: &str, lower: &str) -> bool {
    let compact: String = lower.chars().filter(|c| !c.is_whitespace()).collect();
    compact.contains(":(){:|:&};:")
}

/// Formatting and partitioning tools across macOS, Linux and Windows, in
/// lowercase. Matched at the start of any command segment or as a word
/// delimited by whitespace or shell operators. `mkfs.<fs>` matches for any
/// filesystem name.
static DISK_UTILITIES: &[&str] = &[
    "mkfs",
    "mkfs.ext2",
    "mkfs.ext3",
    "mkfs.ext4",
    "mkfs.xfs",
    "mkfs.btrfs",
    "mkfs.vfat",
    "mkfs.fat",
    "mkfs.exfat",
    "mkfs.ntfs",
    "mke2fs",
    "mkswap",
    "fdisk",
    "sfdisk",
    "cfdisk",
    "gdisk",
    "sgdisk",
    "parted",
    "wipefs",
    "diskutil erasedisk",
    "diskutil erasevolume",
    "diskutil partitiondisk",
    "diskutil zerodisk",
    "diskutil randomdisk",
    "diskutil secureerase",
    "diskutil reformat",
    "diskpart",
    "format-volume",
    "clear-disk",
    "initialize-disk",
];

static DISK_UTILITY_MATCHER: LazyLock<AhoCorasick> = LazyLock::new(|| {
    AhoCorasick::new(DISK_UTILITIES).expect("disk utility automaton must build")
});

fn is_word_boundary(b: u8) -> bool {
    b.is_ascii_whitespace() || matches!(b, b';' | b'|' | b'&' | b'(' | b')' | b'`')
}

fn invokes_disk_utility(_raw: &str, lower: &str) -> bool {
    if segments(lower).any(|segment| DISK_UTILITIES.iter().any(|tool| segment.starts_with(tool))) {
        return true;
    }
    let bytes = lower.as_bytes();
    DISK_UTILITY_MATCHER
        .find_overlapping_iter(lower)
        .any(|m| {
            let before = m.start() == 0 || is_word_boundary(bytes[m.start() - 1]);
            let after = match bytes.get(m.end()).copied() {
                None => true,
                Some(b'.') => DISK_UTILITIES[m.pattern().as_usize()] == "mkfs",
                Some(b) => is_word_boundary(b),
            };
            before && after
        })
}

// ---------------------------------------------------------------------------
// Path-targeting commands
// ---------------------------------------------------------------------------

const PATH_TARGETING: &[&str] = &["rm", "chmod", "chown"];

/// `chmod`/`chown` arguments this short with no separator are taken as a
/// mode or owner, not a path.
const MAX_MODE_LEN: usize = 5;

fn segments(command: &str) -> impl Iterator<Item = &str> {
    command
        .split(|c| matches!(c, ';' | '|' | '&' | '\n' | '(' | ')' | '`'))
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// For a redirection token (`>`, `>>`, `<`, `2>`, `>/dev/null`), the target
/// written in the same token, possibly empty.
fn redirection(token: &str) -> Option<&str> {
    let op = token.trim_start_matches(|c: char| c.is_ascii_digit());
    op.strip_prefix(">>")
        .or_else(|| op.strip_prefix('>'))
        .or_else(|| op.strip_prefix('<'))
}

fn strip_quotes(token: &str) -> &str {
    token.trim_matches(|c| c == '"' || c == '\'')
}

fn program_name(token: &str) -> String {
    let token = strip_quotes(token);
    token
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(token)
        .to_lowercase()
}

fn has_glob(token: &str) -> bool {
    token.contains(['*', '?', '['])
}

/// The leading components of `path` that contain no glob characters.
fn glob_free_parent(path: &Path) -> PathBuf {
    path.components()
        .take_while(|c| match c {
            Component::Normal(part) => !has_glob(&part.to_string_lossy()),
            _ => true,
        })
        .collect()
}

// ---------------------------------------------------------------------------
// CommandClassifier
// ---------------------------------------------------------------------------

/// Evaluates shell commands against the destructive catalog.
///
/// Built once and shared; catalog regexes compile on first use and are
/// cached statically.
#[derive(Debug, Clone)]
pub struct CommandClassifier {
    paths: PathClassifier,
}

impl CommandClassifier {
    pub fn new(paths: PathClassifier) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &PathClassifier {
        &self.paths
    }

    /// Classify a command. The first matching stage decides.
    pub fn classify(&self, command: &str) -> CommandVerdict {
        let command = command.trim();
        if command.is_empty() {
            return CommandVerdict::Allow;
        }

        let lower = command.to_lowercase();
        if let Some(pattern) = CATALOG.iter().find(|p| p.matches(command, &lower)) {
            return CommandVerdict::Destructive {
                rule: pattern.name,
                reason: pattern.reason,
            };
        }

        self.protected_target(command)
            .unwrap_or(CommandVerdict::Allow)
    }

    fn protected_target(&self, command: &str) -> Option<CommandVerdict> {
        for segment in segments(command) {
            let mut tokens = segment.split_whitespace();
            let Some(first) = tokens.next() else {
                continue;
            };
            let program = program_name(first);
            if !PATH_TARGETING.contains(&program.as_str()) {
                continue;
            }
            let takes_mode = program != "rm";

            let mut redirect_target = false;
            for token in tokens {
                if std::mem::take(&mut redirect_target) {
                    continue;
                }
                if let Some(attached) = redirection(token) {
                    redirect_target = attached.is_empty();
                    continue;
                }
                if token.starts_with('-') {
                    continue;
                }
                let target = strip_quotes(token);
                if target.is_empty() {
                    continue;
                }
                if takes_mode && !target.contains(['/', '\\']) && target.len() <= MAX_MODE_LEN {
                    continue;
                }
                if let Some(reason) = self.target_reason(target) {
                    return Some(CommandVerdict::ProtectedTarget {
                        program,
                        target: target.to_string(),
                        reason,
                    });
                }
            }
        }
        None
    }

    fn target_reason(&self, target: &str) -> Option<&'static str> {
        let expanded = shellexpand::tilde(target);
        let literal = Path::new(expanded.as_ref());
        let path = std::path::absolute(literal).unwrap_or_else(|_| literal.to_path_buf());

        if let Some(reason) = self.paths.is_protected(&path) {
            return Some(reason);
        }
        if has_glob(&expanded) {
            return self.paths.is_protected(&glob_free_parent(&path));
        }
        None
    }
}

impl Default for CommandClassifier {
    fn default() -> Self {
        Self::new(PathClassifier::new(Default::default()))
    }
}

/// Truncate a string for log/display purposes.
pub(crate) fn truncate(s: &str, max: usize) -> &str {
    if s.len() <= max {
        s
    } else {
        let end = s
            .char_indices()
            .nth(max)
            .map(|(i, _)| i)
            .unwrap_or(s.len());
        &s[..end]
    }
}
