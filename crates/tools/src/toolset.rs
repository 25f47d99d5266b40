//! The two tool-shaped primitives every site-specific tool builds on.
//!
//! Higher-level tools (search, product parse, cart actions) live
//! outside the bridge and call these through `call_tool_raw`; LLM
//! clients reach them through the tool-protocol adapter in the server
//! binary.

use std::sync::Arc;

use bridge::{Backend, BridgeError, InteractionAction};
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;

use crate::result::ToolResult;

pub const TOOL_EVALUATE: &str = "browser_evaluate";
pub const TOOL_INTERACT: &str = "browser_interact";

#[derive(Error, Debug)]
pub enum ToolError {
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    #[error("invalid arguments: {0}")]
    InvalidArgs(#[from] serde_json::Error),

    #[error(transparent)]
    Bridge(#[from] BridgeError),
}

/// Descriptor for one tool: name, prose, JSON schema for its input.
#[derive(Debug, Clone)]
pub struct ToolDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    pub input_schema: Value,
}

#[derive(Debug, Deserialize)]
struct EvaluateArgs {
    script: String,
}

#[derive(Debug, Deserialize)]
struct InteractArgs {
    actions: Vec<InteractionAction>,
}

/// The outward tool surface over the command dispatcher.
pub struct ToolSet {
    backend: Arc<Backend>,
}

impl ToolSet {
    pub fn new(backend: Arc<Backend>) -> Self {
        Self { backend }
    }

    pub fn list_tools(&self) -> Vec<ToolDescriptor> {
        vec![
            ToolDescriptor {
                name: TOOL_EVALUATE,
                description:
                    "Run a JavaScript expression in the connected tab's page context and \
                     return its result",
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "script": {
                            "type": "string",
                            "description": "Script body to evaluate in the page"
                        }
                    },
                    "required": ["script"]
                }),
            },
            ToolDescriptor {
                name: TOOL_INTERACT,
                description:
                    "Perform an ordered sequence of simulated user actions (click, type, \
                     press_key, scroll_by, wait) against the connected tab",
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "actions": {
                            "type": "array",
                            "description": "Actions executed strictly in order",
                            "items": {
                                "type": "object",
                                "properties": {
                                    "type": {
                                        "type": "string",
                                        "enum": ["click", "type", "press_key", "scroll_by", "wait"]
                                    },
                                    "selector": { "type": "string" },
                                    "clickCount": { "type": "integer" },
                                    "text": { "type": "string" },
                                    "key": { "type": "string" },
                                    "x": { "type": "integer" },
                                    "y": { "type": "integer" },
                                    "timeout": {
                                        "type": "integer",
                                        "description": "Local delay in milliseconds (wait only)"
                                    }
                                },
                                "required": ["type"]
                            }
                        }
                    },
                    "required": ["actions"]
                }),
            },
        ]
    }

    /// Tool-protocol entry point: errors become a structured failure
    /// envelope, never a propagated error.
    pub async fn call_tool(&self, name: &str, args: Value) -> ToolResult {
        match self.call_tool_raw(name, args).await {
            Ok(value) => match value {
                Value::String(text) => ToolResult::text(text),
                other => match serde_json::to_string_pretty(&other) {
                    Ok(text) => ToolResult::text(text),
                    Err(e) => ToolResult::error(format!("unserializable result: {e}")),
                },
            },
            Err(e) => ToolResult::error(e.to_string()),
        }
    }

    /// `rawResult` mode: the unwrapped underlying value, for callers that
    /// layer their own parsing on top of the primitives. Presentation
    /// difference only; the dispatch path is identical.
    pub async fn call_tool_raw(&self, name: &str, args: Value) -> Result<Value, ToolError> {
        match name {
            TOOL_EVALUATE => {
                let args: EvaluateArgs = serde_json::from_value(args)?;
                Ok(self.backend.evaluate(&args.script).await?)
            }
            TOOL_INTERACT => {
                let args: InteractArgs = serde_json::from_value(args)?;
                let count = args.actions.len();
                self.backend.interact(&args.actions).await?;
                Ok(json!({ "status": "ok", "actions": count }))
            }
            other => Err(ToolError::UnknownTool(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge::ExtensionRegistry;

    async fn toolset_without_extension() -> ToolSet {
        let registry = Arc::new(
            ExtensionRegistry::start("127.0.0.1", 0)
                .await
                .expect("bind ephemeral port"),
        );
        ToolSet::new(Arc::new(Backend::new(registry, false)))
    }

    #[tokio::test]
    async fn descriptors_cover_both_primitives() {
        let tools = toolset_without_extension().await;
        let descriptors = tools.list_tools();
        let names: Vec<_> = descriptors.iter().map(|d| d.name).collect();
        assert_eq!(names, vec![TOOL_EVALUATE, TOOL_INTERACT]);
        for descriptor in &descriptors {
            assert!(descriptor.input_schema.is_object());
            assert_eq!(descriptor.input_schema["type"], "object");
        }
    }

    #[tokio::test]
    async fn unknown_tool_becomes_a_structured_failure() {
        let tools = toolset_without_extension().await;
        let result = tools.call_tool("browser_teleport", json!({})).await;
        assert!(result.is_error);
    }

    #[tokio::test]
    async fn invalid_arguments_become_a_structured_failure() {
        let tools = toolset_without_extension().await;
        let result = tools.call_tool(TOOL_EVALUATE, json!({"scrpt": "1"})).await;
        assert!(result.is_error);
    }

    #[tokio::test]
    async fn no_connection_surfaces_in_the_envelope() {
        let tools = toolset_without_extension().await;
        let result = tools.call_tool(TOOL_EVALUATE, json!({"script": "1"})).await;
        assert!(result.is_error);
        let crate::result::ContentBlock::Text { text } = &result.content[0];
        assert!(text.contains("no extension connection"), "{text}");
    }

    #[tokio::test]
    async fn raw_mode_propagates_typed_errors() {
        let tools = toolset_without_extension().await;
        let err = tools
            .call_tool_raw(TOOL_INTERACT, json!({"actions": [{"type": "wait", "timeout": 1}]}))
            .await
            .err();
        // A wait-only sequence issues no RPC and succeeds even unbound.
        assert!(err.is_none());

        let err = tools
            .call_tool_raw(TOOL_EVALUATE, json!({"script": "1"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::Bridge(BridgeError::NoConnection)));
    }
}
