//! db-csv MCP server implementation

use rmcp::{
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{CallToolResult, Content, ServerCapabilities, ServerInfo},
    tool, tool_handler, tool_router,
    ErrorData as McpError,
};

use crate::config::DbConfig;
use crate::handlers::{self, query_error_to_mcp};
use crate::params::{ExecuteQueryParams, ExecuteQueryWithConnectionParams};

/// Read-only SQL to CSV MCP server
#[derive(Clone)]
pub struct DbCsvMcpServer {
    config: DbConfig,
    tool_router: ToolRouter<Self>,
}

impl DbCsvMcpServer {
    /// Create a new server, loading config from standard locations
    pub fn new() -> Self {
        let config = DbConfig::load().unwrap_or_else(|e| {
            tracing::warn!("Failed to load config: {}. Using default.", e);
            DbConfig::default()
        });
        Self::with_config(config)
    }

    /// Create a new server with explicit config
    pub fn with_config(config: DbConfig) -> Self {
        Self {
            config,
            tool_router: Self::tool_router(),
        }
    }
}

impl Default for DbCsvMcpServer {
    fn default() -> Self {
        Self::new()
    }
}

#[tool_router]
impl DbCsvMcpServer {
    /// Run a read-only query against the configured default database
    #[tool(description = "Execute a read-only SQL query against the configured default database and return the result set as CSV text. Only a single SELECT (or WITH ... SELECT) statement is allowed; INSERT/UPDATE/DELETE and DDL are rejected before any connection is opened. quote_mode controls CSV quoting: none, headers_only, strings_only, or all.")]
    async fn execute_query(
        &self,
        Parameters(params): Parameters<ExecuteQueryParams>,
    ) -> Result<CallToolResult, McpError> {
        let csv = handlers::execute_query(&self.config, params)
            .await
            .map_err(query_error_to_mcp)?;
        Ok(CallToolResult::success(vec![Content::text(csv)]))
    }

    /// Run a read-only query against an explicit database URL
    #[tool(description = "Execute a read-only SQL query against an explicitly supplied database and return the result set as CSV text. url is a sqlite: or postgres:// connection URL; driver may name the driver explicitly (sqlite or postgres). The same read-only rules apply as for execute_query.")]
    async fn execute_query_with_connection(
        &self,
        Parameters(params): Parameters<ExecuteQueryWithConnectionParams>,
    ) -> Result<CallToolResult, McpError> {
        let csv = handlers::execute_query_with_connection(params)
            .await
            .map_err(query_error_to_mcp)?;
        Ok(CallToolResult::success(vec![Content::text(csv)]))
    }
}

#[tool_handler]
impl rmcp::ServerHandler for DbCsvMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Read-only SQL query server. Use execute_query to run a SELECT against \
                 the configured default database, or execute_query_with_connection to \
                 target an explicit database URL. Results come back as CSV text with a \
                 header row; mutating statements are always rejected."
                    .to_string(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}
