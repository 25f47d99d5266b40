//! Tool layer over the bridge's command dispatcher
//!
//! Exposes exactly two tool-shaped primitives, `browser_evaluate` and
//! `browser_interact`, plus the result envelope the tool protocol
//! expects. Site-specific tools are external callers layered on these.

pub mod result;
pub mod toolset;

pub use result::{ContentBlock, ToolResult};
pub use toolset::{ToolDescriptor, ToolError, ToolSet, TOOL_EVALUATE, TOOL_INTERACT};
