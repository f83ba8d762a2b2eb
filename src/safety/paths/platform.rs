//! Per-OS protected-path tables and path syntax.
//!
//! Each supported OS is a [`RuleSet`]: its fixed system prefixes plus the
//! path grammar needed to compare against them (separator, case folding,
//! what counts as a root). The set is picked once from [`Platform`] when a
//! classifier is built, so no per-call branching on the host OS exists.

use super::ProtectedPathRule;

/// Host operating system family, as far as path protection is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    MacOs,
    Linux,
    Windows,
}

impl Platform {
    /// The platform this process runs on.
    pub fn current() -> Self {
        Self::from_os(std::env::consts::OS)
    }

    /// Map an OS identifier (as in `std::env::consts::OS`) to a platform.
    ///
    /// Anything unrecognized gets the Linux table, which protects the most
    /// POSIX system trees.
    pub fn from_os(os: &str) -> Self {
        match os {
            "macos" => Self::MacOs,
            "windows" => Self::Windows,
            _ => Self::Linux,
        }
    }

    /// The ruleset for this platform.
    pub fn rules(self) -> &'static dyn RuleSet {
        match self {
            Self::MacOs => &MACOS,
            Self::Linux => &LINUX,
            Self::Windows => &WINDOWS,
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MacOs => write!(f, "macos"),
            Self::Linux => write!(f, "linux"),
            Self::Windows => write!(f, "windows"),
        }
    }
}

/// Protected prefixes and path grammar for one OS family.
pub trait RuleSet: std::fmt::Debug + Send + Sync {
    /// Fixed system prefixes, in match order.
    fn system_rules(&self) -> &'static [ProtectedPathRule];

    /// Path component separator.
    fn separator(&self) -> char;

    /// Lexically clean a path: unify separators, drop `.` and empty
    /// components, resolve `..` without escaping the root.
    fn clean(&self, path: &str) -> String;

    /// Fold a cleaned path into the form compared against prefixes.
    fn fold(&self, cleaned: String) -> String {
        cleaned
    }

    /// Whether a cleaned path names a filesystem root.
    fn is_root(&self, cleaned: &str) -> bool;

    /// Clean then fold.
    fn normalize(&self, path: &str) -> String {
        self.fold(self.clean(path))
    }
}

/// macOS and Linux share POSIX path syntax and differ only in their tables.
#[derive(Debug)]
struct PosixRules {
    rules: &'static [ProtectedPathRule],
}

impl RuleSet for PosixRules {
    fn system_rules(&self) -> &'static [ProtectedPathRule] {
        self.rules
    }

    fn separator(&self) -> char {
        '/'
    }

    fn clean(&self, path: &str) -> String {
        let rooted = path.starts_with('/');
        let body = clean_components(path, '/', rooted);
        if rooted {
            format!("/{body}")
        } else if body.is_empty() {
            ".".to_string()
        } else {
            body
        }
    }

    fn is_root(&self, cleaned: &str) -> bool {
        cleaned == "/"
    }
}

#[derive(Debug)]
struct WindowsRules;

impl RuleSet for WindowsRules {
    fn system_rules(&self) -> &'static [ProtectedPathRule] {
        WINDOWS_RULES
    }

    fn separator(&self) -> char {
        '\\'
    }

    fn clean(&self, path: &str) -> String {
        let unified = path.replace('/', "\\");
        let unified = strip_verbatim_prefix(&unified);
        let (volume, rest) = split_volume(&unified);
        let rooted = rest.starts_with('\\');
        let body = clean_components(rest, '\\', rooted || !volume.is_empty());
        match (rooted, body.is_empty()) {
            (true, _) => format!("{volume}\\{body}"),
            (false, true) if volume.is_empty() => ".".to_string(),
            (false, _) => format!("{volume}{body}"),
        }
    }

    /// Windows paths are compared case-insensitively.
    fn fold(&self, cleaned: String) -> String {
        cleaned.to_lowercase()
    }

    fn is_root(&self, cleaned: &str) -> bool {
        if cleaned == "\\" {
            return true;
        }
        let (volume, rest) = split_volume(cleaned);
        is_drive(volume) && (rest.is_empty() || rest == "\\")
    }
}

/// Clean the component list of a path. `anchored` stops `..` from climbing
/// past the start.
fn clean_components(path: &str, sep: char, anchored: bool) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for part in path.split(sep) {
        match part {
            "" | "." => {}
            ".." => match parts.last() {
                Some(&last) if last != ".." => {
                    parts.pop();
                }
                _ if anchored => {}
                _ => parts.push(".."),
            },
            _ => parts.push(part),
        }
    }
    let sep = sep.to_string();
    parts.join(sep.as_str())
}

/// Drop the `\\?\` and `\\?\UNC\` prefixes canonicalization produces on
/// Windows.
fn strip_verbatim_prefix(path: &str) -> String {
    if let Some(rest) = path.strip_prefix(r"\\?\UNC\") {
        format!(r"\\{rest}")
    } else if let Some(rest) = path.strip_prefix(r"\\?\") {
        rest.to_string()
    } else {
        path.to_string()
    }
}

/// Split a Windows path into its volume (`C:` or `\\server\share`) and the
/// remainder.
fn split_volume(path: &str) -> (&str, &str) {
    let bytes = path.as_bytes();
    if bytes.len() >= 2 && bytes[1] == b':' && bytes[0].is_ascii_alphabetic() {
        return path.split_at(2);
    }
    if let Some(unc) = path.strip_prefix(r"\\") {
        let server_end = match unc.find('\\') {
            Some(i) => i,
            None => return (path, ""),
        };
        let share_end = unc[server_end + 1..]
            .find('\\')
            .map(|i| server_end + 1 + i)
            .unwrap_or(unc.len());
        return path.split_at(2 + share_end);
    }
    ("", path)
}

fn is_drive(volume: &str) -> bool {
    volume.len() == 2 && volume.ends_with(':')
}

macro_rules! rule {
    ($prefix:expr, $reason:expr) => {
        ProtectedPathRule {
            prefix: $prefix,
            reason: $reason,
        }
    };
}

const SYSTEM_BINARIES: &str = "system binaries";
const SYSTEM_LIBRARIES: &str = "system libraries";
const SYSTEM_CONFIG: &str = "system configuration";
const DEVICE_FILES: &str = "device files";

static MACOS: PosixRules = PosixRules { rules: MACOS_RULES };
static LINUX: PosixRules = PosixRules { rules: LINUX_RULES };
static WINDOWS: WindowsRules = WindowsRules;

static MACOS_RULES: &[ProtectedPathRule] = &[
    rule!("/System", "macOS system files"),
    rule!("/bin", SYSTEM_BINARIES),
    rule!("/sbin", SYSTEM_BINARIES),
    rule!("/usr/bin", SYSTEM_BINARIES),
    rule!("/usr/sbin", SYSTEM_BINARIES),
    rule!("/usr/lib", SYSTEM_LIBRARIES),
    rule!("/usr/libexec", SYSTEM_BINARIES),
    rule!("/etc", SYSTEM_CONFIG),
    rule!("/private/etc", SYSTEM_CONFIG),
    rule!("/var/db", "system databases"),
    rule!("/private/var/db", "system databases"),
    rule!("/Library", "system-wide libraries and launch daemons"),
    rule!("/dev", DEVICE_FILES),
];

static LINUX_RULES: &[ProtectedPathRule] = &[
    rule!("/bin", SYSTEM_BINARIES),
    rule!("/sbin", SYSTEM_BINARIES),
    rule!("/usr/bin", SYSTEM_BINARIES),
    rule!("/usr/sbin", SYSTEM_BINARIES),
    rule!("/usr/lib", SYSTEM_LIBRARIES),
    rule!("/usr/lib32", SYSTEM_LIBRARIES),
    rule!("/usr/lib64", SYSTEM_LIBRARIES),
    rule!("/usr/libexec", SYSTEM_BINARIES),
    rule!("/lib", SYSTEM_LIBRARIES),
    rule!("/lib32", SYSTEM_LIBRARIES),
    rule!("/lib64", SYSTEM_LIBRARIES),
    rule!("/etc", SYSTEM_CONFIG),
    rule!("/boot", "bootloader and kernel images"),
    rule!("/sys", "kernel interface (sysfs)"),
    rule!("/proc", "kernel process interface (procfs)"),
    rule!("/dev", DEVICE_FILES),
    rule!("/var/lib/dpkg", "package manager database"),
    rule!("/var/lib/rpm", "package manager database"),
];

// Stored lower-cased; Windows comparisons fold case.
static WINDOWS_RULES: &[ProtectedPathRule] = &[
    rule!(r"c:\windows", "Windows system directory"),
    rule!(r"c:\program files", "installed applications"),
    rule!(r"c:\program files (x86)", "installed applications"),
    rule!(r"c:\programdata\microsoft", "Windows platform data"),
    rule!(r"c:\recovery", "system recovery data"),
    rule!(r"c:\system volume information", "restore points and volume shadow copies"),
    rule!(r"c:\bootmgr", "the boot manager"),
];
