//! The tool execution seam the guard is injected into.

mod registry;
mod tool;

pub use registry::ToolRegistry;
pub use tool::{Tool, ToolError, ToolOutput};
