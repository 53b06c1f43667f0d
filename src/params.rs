//! Tool parameter types

use schemars::JsonSchema;
use serde::Deserialize;

use crate::types::QuoteMode;

/// Parameters for the execute_query tool
#[derive(Debug, Deserialize, JsonSchema)]
pub struct ExecuteQueryParams {
    /// Read-only SQL statement: a single SELECT (or WITH ... SELECT) query
    pub sql: String,

    /// Database username used to open the connection
    pub username: String,

    /// Database password; omit for passwordless accounts
    #[serde(default)]
    pub password: Option<String>,

    /// CSV quoting policy: none, headers_only, strings_only, or all
    #[serde(default)]
    pub quote_mode: QuoteMode,
}

/// Parameters for the execute_query_with_connection tool
// driver and quote_mode are optional in the schema; everything else is
// mandatory and enforced again at resolution time
#[derive(Debug, Deserialize, JsonSchema)]
pub struct ExecuteQueryWithConnectionParams {
    /// Database URL, e.g. `postgres://db.internal:5432/analytics` or
    /// `sqlite:///var/data/app.db`
    pub url: String,

    /// Driver name (`sqlite` or `postgres`); derived from the URL scheme
    /// when omitted
    #[serde(default)]
    pub driver: Option<String>,

    /// Read-only SQL statement: a single SELECT (or WITH ... SELECT) query
    pub sql: String,

    /// Database username used to open the connection
    pub username: String,

    /// Database password; omit for passwordless accounts
    #[serde(default)]
    pub password: Option<String>,

    /// CSV quoting policy: none, headers_only, strings_only, or all
    #[serde(default)]
    pub quote_mode: QuoteMode,
}
