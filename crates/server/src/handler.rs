//! Tool surface over one [`OfflineWorker`].
use std::sync::Arc;

use crate::tools::{ControlParams, InterceptParams, SyncParams, control_impl, intercept_impl, stores_impl, sync_impl};

use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};
use stowaway_client::OfflineWorker;

/// MCP handler exposing the worker to the host application.
#[derive(Clone)]
pub struct StowawayServer {
    worker: Arc<OfflineWorker>,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl StowawayServer {
    pub fn new(worker: Arc<OfflineWorker>) -> Self {
        Self { worker, tool_router: Self::tool_router() }
    }

    #[tool(
        description = "Route a request through the offline cache layer. Returns status, headers, body and where the response came from (network, cache, stale_cache, offline_fallback, root_fallback, bypass)."
    )]
    async fn intercept(&self, params: Parameters<InterceptParams>) -> Result<CallToolResult, McpError> {
        intercept_impl(&self.worker, params.0).await
    }

    #[tool(description = "Send a control message: {\"type\": \"SKIP_WAITING\"} or {\"type\": \"CLEAR_CACHE\"}.")]
    async fn control(&self, params: Parameters<ControlParams>) -> Result<CallToolResult, McpError> {
        control_impl(&self.worker, params.0).await
    }

    #[tool(description = "Fire the deferred-sync tag, as when connectivity is restored.")]
    async fn sync(&self, params: Parameters<SyncParams>) -> Result<CallToolResult, McpError> {
        sync_impl(&self.worker, params.0).await
    }

    #[tool(description = "List cache stores with entry counts and sizes, plus the lifecycle state.")]
    async fn cache_stores(&self) -> Result<CallToolResult, McpError> {
        stores_impl(&self.worker).await
    }
}

impl ServerHandler for StowawayServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "stowaway".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}
