//! Integration tests for the db-csv MCP server
//!
//! The SQLite tests run fully self-contained against a seeded temporary
//! database file. The PostgreSQL tests require a reachable server and are
//! ignored by default:
//!
//! ```bash
//! # Run the self-contained tests
//! cargo test --test integration
//!
//! # Run the PostgreSQL tests against your own server
//! DBCSV_TEST_POSTGRES_URL=postgres://localhost:5432/postgres \
//! DBCSV_TEST_POSTGRES_USER=postgres \
//! cargo test --test integration -- --ignored
//! ```

use tempfile::TempDir;

use db_csv_mcp::config::DbConfig;
use db_csv_mcp::executor;
use db_csv_mcp::handlers;
use db_csv_mcp::params::{ExecuteQueryParams, ExecuteQueryWithConnectionParams};
use db_csv_mcp::types::{QueryError, QuoteMode};

/// Create a database file with the demo tables and return its URL.
fn seeded_database(dir: &TempDir) -> String {
    let path = dir.path().join("demo.db");
    let conn = rusqlite::Connection::open(&path).unwrap();
    conn.execute_batch(
        r#"
        CREATE TABLE items (id INTEGER PRIMARY KEY, name TEXT NOT NULL, price INTEGER NOT NULL);
        INSERT INTO items VALUES (1, 'apple', 100), (2, 'banana', 80);
        CREATE TABLE orders (id INTEGER PRIMARY KEY, status TEXT NOT NULL);
        INSERT INTO orders VALUES (1, 'PAID'), (2, 'SHIPPED');
        CREATE TABLE customers (id INTEGER PRIMARY KEY, name TEXT NOT NULL, note TEXT);
        INSERT INTO customers VALUES (1, 'Alice Kim', NULL), (2, 'Bob "Builder"', 'a,b');
        "#,
    )
    .unwrap();
    format!("sqlite://{}", path.display())
}

fn configured_params(sql: &str) -> ExecuteQueryParams {
    ExecuteQueryParams {
        sql: sql.to_string(),
        username: "sa".to_string(),
        password: Some(String::new()),
        quote_mode: QuoteMode::None,
    }
}

fn external_params(url: &str, sql: &str) -> ExecuteQueryWithConnectionParams {
    ExecuteQueryWithConnectionParams {
        url: url.to_string(),
        driver: None,
        sql: sql.to_string(),
        username: "sa".to_string(),
        password: Some(String::new()),
        quote_mode: QuoteMode::None,
    }
}

// ============================================================================
// Configured-connection tool
// ============================================================================

#[tokio::test]
async fn execute_query_allows_with_clause_select() {
    let dir = TempDir::new().unwrap();
    let config = DbConfig::with_url(seeded_database(&dir));

    let csv = handlers::execute_query(
        &config,
        configured_params(
            "WITH price_list AS (SELECT id, name FROM items) \
             SELECT name FROM price_list WHERE id = 1",
        ),
    )
    .await
    .unwrap();

    assert!(csv.contains("name"));
    assert!(csv.contains("apple"));
}

#[tokio::test]
async fn execute_query_allows_keyword_inside_literal() {
    let dir = TempDir::new().unwrap();
    let config = DbConfig::with_url(seeded_database(&dir));

    let csv = handlers::execute_query(
        &config,
        configured_params("SELECT 'drop table orders' AS text"),
    )
    .await
    .unwrap();

    assert!(csv.contains("text"));
    assert!(csv.contains("drop table orders"));
}

#[tokio::test]
async fn execute_query_returns_empty_csv_when_filter_removes_rows() {
    let dir = TempDir::new().unwrap();
    let config = DbConfig::with_url(seeded_database(&dir));

    let csv = handlers::execute_query(
        &config,
        configured_params("SELECT status FROM orders WHERE status = 'UPDATE'"),
    )
    .await
    .unwrap();

    assert_eq!(csv, "");
}

#[tokio::test]
async fn execute_query_rejects_mutating_statements() {
    let dir = TempDir::new().unwrap();
    let config = DbConfig::with_url(seeded_database(&dir));

    let err = handlers::execute_query(
        &config,
        configured_params("UPDATE orders SET status = 'PAID'"),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, QueryError::Validation(_)));
    assert!(err.to_string().contains("Only SELECT queries are allowed."));
}

#[tokio::test]
async fn execute_query_rejects_multiple_statements() {
    let dir = TempDir::new().unwrap();
    let config = DbConfig::with_url(seeded_database(&dir));

    let err = handlers::execute_query(
        &config,
        configured_params("SELECT 1; SELECT name FROM items"),
    )
    .await
    .unwrap_err();

    assert!(err
        .to_string()
        .contains("Multiple SQL statements are not allowed."));
}

#[tokio::test]
async fn execute_query_requires_username() {
    let dir = TempDir::new().unwrap();
    let config = DbConfig::with_url(seeded_database(&dir));

    let mut params = configured_params("SELECT 1");
    params.username = String::new();
    let err = handlers::execute_query(&config, params).await.unwrap_err();

    assert!(err.to_string().contains("Database username is required."));
}

#[tokio::test]
async fn execute_query_fails_without_configured_url() {
    let err = handlers::execute_query(&DbConfig::default(), configured_params("SELECT 1"))
        .await
        .unwrap_err();

    assert!(matches!(err, QueryError::Configuration(_)));
    assert!(err.to_string().contains("Database URL is not configured."));
}

#[tokio::test]
async fn execute_query_provides_meaningful_message_on_database_error() {
    let dir = TempDir::new().unwrap();
    let config = DbConfig::with_url(seeded_database(&dir));

    let err = handlers::execute_query(&config, configured_params("SELECT * FROM missing_table"))
        .await
        .unwrap_err();

    assert!(matches!(err, QueryError::Execution(_)));
    let message = err.to_string();
    assert!(message.contains("Database rejected the read-only query"));
    assert!(message.contains("missing_table"));
}

// ============================================================================
// Quote modes
// ============================================================================

#[tokio::test]
async fn execute_query_applies_strings_only_quote_mode() {
    let dir = TempDir::new().unwrap();
    let config = DbConfig::with_url(seeded_database(&dir));

    let mut params = configured_params("SELECT name, price FROM items WHERE id = 1");
    params.quote_mode = QuoteMode::StringsOnly;
    let csv = handlers::execute_query(&config, params).await.unwrap();

    assert!(csv.contains("\"apple\",100"));
}

#[tokio::test]
async fn execute_query_applies_all_value_quote_mode() {
    let dir = TempDir::new().unwrap();
    let config = DbConfig::with_url(seeded_database(&dir));

    let mut params = configured_params("SELECT name, price FROM items WHERE id = 1");
    params.quote_mode = QuoteMode::All;
    let csv = handlers::execute_query(&config, params).await.unwrap();

    assert!(csv.contains("\"apple\",\"100\""));
}

#[tokio::test]
async fn execute_query_applies_headers_only_quote_mode() {
    let dir = TempDir::new().unwrap();
    let config = DbConfig::with_url(seeded_database(&dir));

    let mut params = configured_params("SELECT name, price FROM items ORDER BY id");
    params.quote_mode = QuoteMode::HeadersOnly;
    let csv = handlers::execute_query(&config, params).await.unwrap();

    assert!(csv.starts_with("\"name\",\"price\"\n"));
    assert!(csv.contains("apple,100"));
}

#[tokio::test]
async fn csv_output_parses_back_with_a_csv_reader() {
    let dir = TempDir::new().unwrap();
    let config = DbConfig::with_url(seeded_database(&dir));

    let csv_text = handlers::execute_query(
        &config,
        configured_params("SELECT name, note FROM customers ORDER BY id"),
    )
    .await
    .unwrap();

    let mut reader = csv::ReaderBuilder::new().from_reader(csv_text.as_bytes());
    let headers = reader.headers().unwrap().clone();
    assert_eq!(headers, csv::StringRecord::from(vec!["name", "note"]));

    let records: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
    assert_eq!(records.len(), 2);
    assert_eq!(&records[0], &csv::StringRecord::from(vec!["Alice Kim", ""]));
    // embedded quote and comma survive the round trip
    assert_eq!(
        &records[1],
        &csv::StringRecord::from(vec!["Bob \"Builder\"", "a,b"])
    );
}

// ============================================================================
// External-connection tool
// ============================================================================

#[tokio::test]
async fn execute_query_with_connection_uses_provided_target() {
    let dir = TempDir::new().unwrap();
    let url = seeded_database(&dir);

    let csv = handlers::execute_query_with_connection(external_params(
        &url,
        "SELECT name FROM customers ORDER BY id",
    ))
    .await
    .unwrap();

    assert!(csv.contains("name"));
    assert!(csv.contains("Alice Kim"));
}

#[tokio::test]
async fn execute_query_with_connection_accepts_driver_hint() {
    let dir = TempDir::new().unwrap();
    let url = seeded_database(&dir);

    let mut params = external_params(&url, "SELECT COUNT(*) AS n FROM items");
    params.driver = Some("sqlite3".to_string());
    let csv = handlers::execute_query_with_connection(params).await.unwrap();

    assert_eq!(csv, "n\n2\n");
}

#[tokio::test]
async fn execute_query_with_connection_validates_required_url() {
    let err = handlers::execute_query_with_connection(external_params(" ", "SELECT 1"))
        .await
        .unwrap_err();

    assert!(err.to_string().contains("Database URL is required."));
}

#[tokio::test]
async fn execute_query_with_connection_rejects_unknown_scheme() {
    let err = handlers::execute_query_with_connection(external_params(
        "jdbc:h2:mem:demo",
        "SELECT 1",
    ))
    .await
    .unwrap_err();

    assert!(matches!(err, QueryError::Validation(_)));
    assert!(err.to_string().contains("Unsupported database URL"));
}

// ============================================================================
// Second line of defense (below the guard)
// ============================================================================

#[tokio::test]
async fn statement_without_result_set_is_rejected_and_not_executed() {
    let dir = TempDir::new().unwrap();
    let url = seeded_database(&dir);

    let spec = executor::resolve_external(&url, None, "sa", None).unwrap();
    let err = executor::run_read_only(&spec, "CREATE TABLE sneaky (id INTEGER)")
        .await
        .unwrap_err();
    assert!(matches!(err, QueryError::Validation(_)));
    assert!(err.to_string().contains("Only SELECT queries are allowed."));

    // the table must not have been created
    let err = executor::run_read_only(&spec, "SELECT COUNT(*) AS n FROM sneaky")
        .await
        .unwrap_err();
    assert!(matches!(err, QueryError::Execution(_)));
}

// ============================================================================
// PostgreSQL (requires a reachable server)
// ============================================================================

fn postgres_params(sql: &str) -> Option<ExecuteQueryWithConnectionParams> {
    let url = std::env::var("DBCSV_TEST_POSTGRES_URL").ok()?;
    let username =
        std::env::var("DBCSV_TEST_POSTGRES_USER").unwrap_or_else(|_| "postgres".to_string());
    let password = std::env::var("DBCSV_TEST_POSTGRES_PASSWORD").ok();
    Some(ExecuteQueryWithConnectionParams {
        url,
        driver: None,
        sql: sql.to_string(),
        username,
        password,
        quote_mode: QuoteMode::None,
    })
}

#[tokio::test]
#[ignore = "integration test - requires a PostgreSQL server (set DBCSV_TEST_POSTGRES_URL)"]
async fn postgres_select_round_trip() {
    let Some(params) = postgres_params(
        "SELECT 1::int8 AS n, 'x'::text AS t, 1.5::float8 AS f, 2.50::numeric AS d, true AS b",
    ) else {
        eprintln!("Skipping: DBCSV_TEST_POSTGRES_URL not set");
        return;
    };

    let csv = handlers::execute_query_with_connection(params).await.unwrap();
    assert!(csv.starts_with("n,t,f,d,b\n"));
    assert!(csv.contains("1,x,1.5,2.50,true"));
}

#[tokio::test]
#[ignore = "integration test - requires a PostgreSQL server (set DBCSV_TEST_POSTGRES_URL)"]
async fn postgres_rejects_mutating_statement_before_connecting() {
    let Some(params) = postgres_params("DELETE FROM anything") else {
        eprintln!("Skipping: DBCSV_TEST_POSTGRES_URL not set");
        return;
    };

    let err = handlers::execute_query_with_connection(params).await.unwrap_err();
    assert!(matches!(err, QueryError::Validation(_)));
}
