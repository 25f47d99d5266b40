//! Tool-protocol adapter
//!
//! Maps the protocol-agnostic `ToolSet` onto the MCP server traits.
//! All protocol framing and transport is rmcp's job; failures from the
//! bridge arrive here already shaped as result envelopes.

use std::sync::Arc;

use rmcp::model::{
    CallToolRequestParam, CallToolResult, Content, Implementation, ListToolsResult,
    PaginatedRequestParam, ProtocolVersion, ServerCapabilities, ServerInfo, Tool,
};
use rmcp::service::{RequestContext, RoleServer};
use rmcp::{ErrorData as McpError, ServerHandler};
use serde_json::Value;
use tools::{ContentBlock, ToolSet};

#[derive(Clone)]
pub struct BridgeService {
    tools: Arc<ToolSet>,
}

impl BridgeService {
    pub fn new(tools: ToolSet) -> Self {
        Self {
            tools: Arc::new(tools),
        }
    }
}

impl ServerHandler for BridgeService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(
                "Drives a live browser tab through a connected extension. \
                 browser_evaluate runs a script in the page; browser_interact \
                 performs an ordered sequence of simulated user actions."
                    .to_string(),
            ),
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        let tools = self
            .tools
            .list_tools()
            .into_iter()
            .map(|descriptor| {
                let schema = match descriptor.input_schema {
                    Value::Object(map) => map,
                    _ => serde_json::Map::new(),
                };
                Tool::new(descriptor.name, descriptor.description, Arc::new(schema))
            })
            .collect();
        Ok(ListToolsResult {
            tools,
            next_cursor: None,
        })
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        let args = request
            .arguments
            .map(Value::Object)
            .unwrap_or_else(|| Value::Object(serde_json::Map::new()));
        tracing::debug!(tool = %request.name, "tool call");

        let result = self.tools.call_tool(&request.name, args).await;
        let content: Vec<Content> = result
            .content
            .into_iter()
            .map(|block| match block {
                ContentBlock::Text { text } => Content::text(text),
            })
            .collect();

        if result.is_error {
            Ok(CallToolResult::error(content))
        } else {
            Ok(CallToolResult::success(content))
        }
    }
}
