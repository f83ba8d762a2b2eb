//! Hard safety guard for privileged tool calls.
//!
//! [`Guard`] routes each call by tool name to the [`FileGuard`] or the
//! [`ShellGuard`]; both consult the [`PathClassifier`], and the shell guard
//! additionally runs the [`CommandClassifier`] catalog. A refusal is a
//! [`Denial`].

pub mod command_guard;
mod denial;
mod dispatcher;
pub mod file_guard;
pub mod paths;
pub mod shell_guard;

pub use command_guard::{CommandClassifier, CommandVerdict};
pub use denial::Denial;
pub use dispatcher::{Guard, GuardKind, GuardTable, check};
pub use file_guard::{FileGuard, FileRequest};
pub use paths::{PathClassifier, Platform};
pub use shell_guard::{ShellGuard, ShellRequest};
