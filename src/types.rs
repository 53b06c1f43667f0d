//! Type definitions for the db-csv MCP server

use bigdecimal::BigDecimal;
use chrono::NaiveDateTime;
use schemars::JsonSchema;
use serde::Deserialize;
use thiserror::Error;

/// Rejection message shared by the guard and the executor's second-line check.
pub(crate) const SELECT_ONLY_MESSAGE: &str = "Only SELECT queries are allowed.";

// ============================================================================
// Errors
// ============================================================================

/// Errors surfaced by the query pipeline
#[derive(Debug, Error)]
pub enum QueryError {
    /// The SQL text or request parameters were rejected before execution.
    #[error("{0}")]
    Validation(String),

    /// No default database URL is configured for the configured-connection tool.
    #[error("{0}")]
    Configuration(String),

    /// The database rejected or failed the validated query.
    #[error("Database rejected the read-only query: {0}")]
    Execution(String),

    /// CSV formatting failed.
    #[error("Failed to encode CSV output: {0}")]
    Encoding(String),
}

impl QueryError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

// ============================================================================
// CSV quoting policy
// ============================================================================

/// CSV quoting policy for the encoded result set
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum QuoteMode {
    /// Quote only fields that contain a delimiter, quote, or line break.
    #[default]
    None,
    /// Force-quote the header row; data fields quoted only when required.
    HeadersOnly,
    /// Quote textual fields; numeric and boolean fields stay bare.
    StringsOnly,
    /// Force-quote every non-null field, headers included.
    All,
}

// ============================================================================
// Result set
// ============================================================================

/// One cell of a result row.
///
/// A closed set of scalar shapes rather than a dynamic value: the encoder
/// needs to distinguish textual from numeric fields, and nothing else.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Decimal(BigDecimal),
    Text(String),
    Timestamp(NaiveDateTime),
}

impl Value {
    /// Render the cell the way it appears in a CSV field.
    pub fn render(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Bool(v) => v.to_string(),
            Value::Int(v) => v.to_string(),
            Value::Float(v) => v.to_string(),
            Value::Decimal(v) => v.to_string(),
            Value::Text(v) => v.clone(),
            Value::Timestamp(v) => v.to_string(),
        }
    }

    /// Textual cells are the ones `strings_only` quoting applies to.
    pub fn is_textual(&self) -> bool {
        matches!(self, Value::Text(_) | Value::Timestamp(_))
    }
}

/// A query result: column names in driver order, then rows of cells.
///
/// Column order and count are fixed by the statement metadata; every row
/// carries exactly one cell per column.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_scalars() {
        assert_eq!(Value::Null.render(), "");
        assert_eq!(Value::Bool(true).render(), "true");
        assert_eq!(Value::Int(-7).render(), "-7");
        assert_eq!(Value::Float(100.0).render(), "100");
        assert_eq!(Value::Float(1.5).render(), "1.5");
        assert_eq!(Value::Text("apple".into()).render(), "apple");
    }

    #[test]
    fn test_textual_classification() {
        assert!(Value::Text("x".into()).is_textual());
        assert!(!Value::Int(1).is_textual());
        assert!(!Value::Float(1.0).is_textual());
        assert!(!Value::Bool(false).is_textual());
        assert!(!Value::Null.is_textual());
    }
}
