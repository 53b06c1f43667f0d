//! Query tool handlers
//!
//! Each handler runs the full pipeline: guard the SQL, resolve connection
//! parameters, execute read-only, encode the rows as CSV. Errors propagate
//! to the caller of the tool; nothing is retried or swallowed.

use rmcp::ErrorData as McpError;

use crate::config::ConnectionDefaults;
use crate::encoder;
use crate::executor::{self, ConnectionSpec};
use crate::guard;
use crate::params::{ExecuteQueryParams, ExecuteQueryWithConnectionParams};
use crate::types::{QueryError, QuoteMode};

/// Run a query against the process-wide configured database.
pub async fn execute_query(
    defaults: &dyn ConnectionDefaults,
    params: ExecuteQueryParams,
) -> Result<String, QueryError> {
    guard::validate_read_only(&params.sql)?;
    let spec = executor::resolve_configured(
        defaults,
        &params.username,
        params.password.as_deref(),
    )?;
    run_and_encode(&spec, &params.sql, params.quote_mode).await
}

/// Run a query against a caller-supplied database URL.
pub async fn execute_query_with_connection(
    params: ExecuteQueryWithConnectionParams,
) -> Result<String, QueryError> {
    guard::validate_read_only(&params.sql)?;
    let spec = executor::resolve_external(
        &params.url,
        params.driver.as_deref(),
        &params.username,
        params.password.as_deref(),
    )?;
    run_and_encode(&spec, &params.sql, params.quote_mode).await
}

async fn run_and_encode(
    spec: &ConnectionSpec,
    sql: &str,
    quote_mode: QuoteMode,
) -> Result<String, QueryError> {
    let result = executor::run_read_only(spec, sql).await?;
    tracing::debug!(
        rows = result.rows.len(),
        columns = result.columns.len(),
        "query returned a result set"
    );
    encoder::to_csv(&result, quote_mode)
}

/// Map pipeline errors onto the MCP error surface.
pub fn query_error_to_mcp(err: QueryError) -> McpError {
    match &err {
        QueryError::Validation(_) => McpError::invalid_params(err.to_string(), None),
        QueryError::Configuration(_) | QueryError::Execution(_) | QueryError::Encoding(_) => {
            McpError::internal_error(err.to_string(), None)
        }
    }
}
