//! MCP server implementation for findata.

use std::sync::Arc;

use rmcp::model::{
    CallToolRequestParam, CallToolResult, Content, Implementation, JsonObject, ListToolsResult,
    PaginatedRequestParam, ProtocolVersion, ServerCapabilities, ServerInfo, Tool,
};
use rmcp::service::RequestContext;
use rmcp::{ErrorData as McpError, RoleServer, ServerHandler};
use serde_json::Value;

use findata_core::tools::catalog;

use crate::dispatch::ToolDispatcher;
use crate::{SERVER_NAME, SERVER_VERSION};

/// findata MCP server.
///
/// Tool calls are routed through a shared [`ToolDispatcher`], so every
/// session sees the same rate-limit windows and connection pool.
#[derive(Clone)]
pub struct FindataMcpServer {
    dispatcher: Arc<ToolDispatcher>,
    name: String,
    version: String,
}

impl FindataMcpServer {
    /// Create a server over `dispatcher`.
    pub fn new(dispatcher: Arc<ToolDispatcher>) -> Self {
        Self {
            dispatcher,
            name: SERVER_NAME.to_string(),
            version: SERVER_VERSION.to_string(),
        }
    }

    /// Override the advertised name and version.
    #[must_use]
    pub fn with_identity(mut self, name: impl Into<String>, version: impl Into<String>) -> Self {
        self.name = name.into();
        self.version = version.into();
        self
    }

    pub fn dispatcher(&self) -> &Arc<ToolDispatcher> {
        &self.dispatcher
    }

    /// Catalog entries as MCP tool descriptors.
    pub fn tools() -> Vec<Tool> {
        catalog()
            .into_iter()
            .map(|def| {
                let schema = match def.input_schema {
                    Value::Object(map) => map,
                    _ => JsonObject::new(),
                };
                Tool::new(def.name, def.description, Arc::new(schema))
            })
            .collect()
    }

    /// Run one tool and wrap the envelope as a single text content item.
    pub async fn call(
        &self,
        name: &str,
        arguments: Option<JsonObject>,
    ) -> Result<CallToolResult, McpError> {
        let response = self
            .dispatcher
            .dispatch(name, arguments)
            .await
            .map_err(|e| McpError::internal_error(e.to_string(), None))?;
        let text = response
            .to_json()
            .map_err(|e| McpError::internal_error(e.to_string(), None))?;
        let content = vec![Content::text(text)];
        if response.ok {
            Ok(CallToolResult::success(content))
        } else {
            Ok(CallToolResult::error(content))
        }
    }
}

impl ServerHandler for FindataMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: self.name.clone(),
                version: self.version.clone(),
                title: Some("Financial Data MCP Server".to_string()),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Financial data queries over companies, fundamentals, stock prices and analyst \
                 ratings. Every tool returns a JSON envelope with ok, data, error and meta. \
                 Paginated tools return next_cursor; pass it back unchanged to continue."
                    .to_string(),
            ),
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        Ok(ListToolsResult::with_all_items(Self::tools()))
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        self.call(&request.name, request.arguments).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use findata_core::config::RateLimitConfig;
    use findata_core::envelope::{ErrorCode, ToolResponse};
    use findata_core::rate_limit::RateLimiter;
    use findata_store::{Database, UserContext};
    use serde_json::json;

    fn server() -> FindataMcpServer {
        let dispatcher = ToolDispatcher::with_limiter(
            Database::sample().unwrap(),
            Arc::new(RateLimiter::default()),
            RateLimitConfig::default(),
            UserContext::admin(),
        );
        FindataMcpServer::new(Arc::new(dispatcher))
    }

    fn envelope(result: &CallToolResult) -> ToolResponse {
        let text = &result.content[0].as_text().unwrap().text;
        serde_json::from_str(text).unwrap()
    }

    #[test]
    fn test_server_info() {
        let info = server().get_info();
        assert_eq!(info.server_info.name, SERVER_NAME);
        assert_eq!(info.server_info.version, SERVER_VERSION);
        assert!(info.capabilities.tools.is_some());
    }

    #[test]
    fn test_tools_match_catalog() {
        let tools = FindataMcpServer::tools();
        assert_eq!(tools.len(), 8);
        let search = tools.iter().find(|t| t.name == "search_companies").unwrap();
        assert_eq!(search.input_schema["type"], "object");
        assert!(search.input_schema["required"]
            .as_array()
            .unwrap()
            .contains(&json!("query")));
    }

    #[tokio::test]
    async fn test_call_success() {
        let args = json!({"ticker": "gama"}).as_object().cloned();
        let result = server().call("get_company_profile", args).await.unwrap();
        assert_ne!(result.is_error, Some(true));
        let env = envelope(&result);
        assert!(env.ok);
        assert_eq!(env.data.unwrap()["ticker"], "GAMA");
    }

    #[tokio::test]
    async fn test_call_failure_sets_is_error() {
        let result = server().call("nope", None).await.unwrap();
        assert_eq!(result.is_error, Some(true));
        let env = envelope(&result);
        assert_eq!(env.tool, "nope");
        assert_eq!(env.error_code(), Some(ErrorCode::UnknownTool));
    }
}
