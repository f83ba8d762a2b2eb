//! Hard safety floor for autonomous agent tools.
//!
//! `hardline` sits in front of the two privileged capabilities an agent can
//! be handed, arbitrary file writes and arbitrary shell commands, and refuses
//! the small, enumerable set of operations that would wreck the host: wiping
//! the root filesystem, formatting disks, escalating privilege, overwriting
//! credentials, or destroying the agent's own persisted state.
//!
//! It is not a preference layer. Nothing in [`settings::GuardSettings`] can
//! switch a rule off, and no approval flow sits above it.
//!
//! ```rust,ignore
//! use hardline::safety::Guard;
//!
//! let guard = Guard::new();
//! let denied = guard.check("shell", &serde_json::json!({
//!     "action": "exec",
//!     "command": "sudo rm -rf /var",
//! }));
//! assert!(denied.is_err());
//! ```

pub mod safety;
pub mod settings;
pub mod tools;

pub use safety::{Denial, Guard, check};
pub use settings::GuardSettings;
