//! db-csv MCP Library
//!
//! Runs read-only SQL queries against a relational database and returns the
//! result set as CSV text. Built to be called by an LLM tool orchestrator
//! that must never be allowed to mutate the target database, no matter how
//! the SQL is phrased: statements are lexically validated before any
//! connection is opened, the connection is forced read-only where the driver
//! supports it, and statements that turn out not to be queries are rejected
//! after the fact.
//!
//! # Usage as Library
//!
//! ```rust,ignore
//! use db_csv_mcp::DbCsvMcpServer;
//!
//! let server = DbCsvMcpServer::new();
//! // Serve via stdio, or call the handlers directly
//! ```

pub mod config;
pub mod encoder;
pub mod executor;
pub mod guard;
pub mod handlers;
pub mod params;
pub mod server;
pub mod types;

// Re-export main server type
pub use server::DbCsvMcpServer;

// Re-export the pieces needed for direct API usage
pub use config::DbConfig;
pub use types::{QueryError, QuoteMode};
