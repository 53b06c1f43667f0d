//! Read-only query executor
//!
//! Resolves connection parameters, opens one connection per call, forces it
//! read-only where the driver supports it, runs the validated statement, and
//! restores the prior read-only state before the connection is released --
//! on every exit path. The guard is the primary defense; the connection flag
//! and the no-result-set check are the second line.

pub(crate) mod postgres;
pub(crate) mod sqlite;

use async_trait::async_trait;
use url::Url;

use crate::config::ConnectionDefaults;
use crate::types::{QueryError, ResultSet, SELECT_ONLY_MESSAGE};

// ============================================================================
// Connection resolution
// ============================================================================

/// Supported database drivers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverKind {
    Sqlite,
    Postgres,
}

impl DriverKind {
    /// Resolve an explicit driver name.
    pub fn from_hint(hint: &str) -> Result<Self, QueryError> {
        match hint.trim().to_lowercase().as_str() {
            "sqlite" | "sqlite3" => Ok(DriverKind::Sqlite),
            "postgres" | "postgresql" => Ok(DriverKind::Postgres),
            other => Err(QueryError::validation(format!(
                "Unsupported database driver: {other}"
            ))),
        }
    }

    /// Derive the driver from the URL scheme. Unknown schemes are rejected
    /// rather than handed to a driver whose quoting rules the guard does not
    /// cover.
    pub fn from_url(url: &str) -> Result<Self, QueryError> {
        let url = url.trim();
        if url.starts_with("sqlite:") {
            Ok(DriverKind::Sqlite)
        } else if url.starts_with("postgres://") || url.starts_with("postgresql://") {
            Ok(DriverKind::Postgres)
        } else {
            Err(QueryError::validation(format!(
                "Unsupported database URL: {url}"
            )))
        }
    }
}

/// Everything needed to open one connection
#[derive(Debug, Clone)]
pub struct ConnectionSpec {
    pub url: String,
    pub driver: DriverKind,
    pub username: String,
    pub password: Option<String>,
}

/// Resolve the configured-connection form from process-wide defaults.
pub fn resolve_configured(
    defaults: &dyn ConnectionDefaults,
    username: &str,
    password: Option<&str>,
) -> Result<ConnectionSpec, QueryError> {
    if username.trim().is_empty() {
        return Err(QueryError::validation("Database username is required."));
    }
    let url = defaults.default_url().ok_or_else(|| {
        QueryError::Configuration("Database URL is not configured.".to_string())
    })?;
    let driver = match defaults.default_driver() {
        Some(hint) => DriverKind::from_hint(&hint)?,
        None => DriverKind::from_url(&url)?,
    };
    build_spec(url, driver, username, password)
}

/// Resolve the external-connection form from caller-supplied parameters.
pub fn resolve_external(
    url: &str,
    driver_hint: Option<&str>,
    username: &str,
    password: Option<&str>,
) -> Result<ConnectionSpec, QueryError> {
    if url.trim().is_empty() {
        return Err(QueryError::validation("Database URL is required."));
    }
    if username.trim().is_empty() {
        return Err(QueryError::validation("Database username is required."));
    }
    let driver = match driver_hint {
        Some(hint) if !hint.trim().is_empty() => DriverKind::from_hint(hint)?,
        _ => DriverKind::from_url(url)?,
    };
    build_spec(url.to_string(), driver, username, password)
}

fn build_spec(
    url: String,
    driver: DriverKind,
    username: &str,
    password: Option<&str>,
) -> Result<ConnectionSpec, QueryError> {
    if driver == DriverKind::Postgres {
        validate_postgres_url(&url)?;
    }
    Ok(ConnectionSpec {
        url,
        driver,
        username: username.to_string(),
        password: password.map(|p| p.to_string()),
    })
}

fn validate_postgres_url(url: &str) -> Result<(), QueryError> {
    let parsed = Url::parse(url)
        .map_err(|e| QueryError::validation(format!("Invalid database URL: {e}")))?;
    if parsed.host_str().is_none() {
        return Err(QueryError::validation("Database URL must include a host."));
    }
    Ok(())
}

// ============================================================================
// Driver seam
// ============================================================================

/// One open database connection.
///
/// The contract mirrors what the executor needs and nothing more: query and
/// set the read-only flag (drivers may support neither), run one statement,
/// close. Implementations must not pool or cache.
#[async_trait]
pub(crate) trait DbConnection: Send {
    /// Current read-only flag; `None` when the driver cannot report it.
    async fn read_only(&mut self) -> anyhow::Result<Option<bool>>;

    /// Set the read-only flag. Returns `false` when the driver does not
    /// support the flag at all.
    async fn set_read_only(&mut self, read_only: bool) -> anyhow::Result<bool>;

    /// Run the statement. `None` means it produced no result set.
    async fn run(&mut self, sql: &str) -> anyhow::Result<Option<ResultSet>>;

    async fn close(self: Box<Self>) -> anyhow::Result<()>;
}

async fn connect(spec: &ConnectionSpec) -> anyhow::Result<Box<dyn DbConnection>> {
    match spec.driver {
        DriverKind::Sqlite => Ok(Box::new(sqlite::SqliteConnection::open(spec)?)),
        DriverKind::Postgres => Ok(Box::new(postgres::PostgresConnection::open(spec).await?)),
    }
}

// ============================================================================
// Read-only execution
// ============================================================================

/// What restoring the connection's read-only flag means after this call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReadOnlyRestore {
    /// The driver rejected the flag entirely; nothing to undo.
    NotApplied,
    /// Prior state known; put it back.
    Previous(bool),
    /// Flag applied but prior state unknown; fall back to read-write.
    Default,
}

/// Run one validated statement over a fresh connection.
///
/// The connection is always closed before returning, and the read-only flag
/// is restored whether or not execution succeeded.
pub async fn run_read_only(spec: &ConnectionSpec, sql: &str) -> Result<ResultSet, QueryError> {
    let mut conn = connect(spec).await.map_err(translate_db_error)?;

    let outcome = execute_guarded(conn.as_mut(), sql).await;

    if let Err(e) = conn.close().await {
        tracing::debug!("error closing connection: {e:#}");
    }

    match outcome {
        Ok(Some(result)) => Ok(result),
        Ok(None) => Err(QueryError::validation(SELECT_ONLY_MESSAGE)),
        Err(e) => Err(translate_db_error(e)),
    }
}

async fn execute_guarded(
    conn: &mut dyn DbConnection,
    sql: &str,
) -> anyhow::Result<Option<ResultSet>> {
    let restore = enable_read_only(conn).await?;
    let result = conn.run(sql).await;
    restore_read_only(conn, restore).await;
    result
}

async fn enable_read_only(conn: &mut dyn DbConnection) -> anyhow::Result<ReadOnlyRestore> {
    let prior = conn.read_only().await?;
    if !conn.set_read_only(true).await? {
        return Ok(ReadOnlyRestore::NotApplied);
    }
    Ok(match prior {
        Some(previous) => ReadOnlyRestore::Previous(previous),
        None => ReadOnlyRestore::Default,
    })
}

/// Restoration failures are logged and never replace the primary outcome; a
/// fresh connection re-establishes the correct state on its next use.
async fn restore_read_only(conn: &mut dyn DbConnection, restore: ReadOnlyRestore) {
    let target = match restore {
        ReadOnlyRestore::NotApplied => return,
        ReadOnlyRestore::Previous(previous) => previous,
        ReadOnlyRestore::Default => false,
    };
    if let Err(e) = conn.set_read_only(target).await {
        tracing::warn!("failed to restore connection read-only state: {e:#}");
    }
}

fn translate_db_error(e: anyhow::Error) -> QueryError {
    QueryError::Execution(e.root_cause().to_string())
}
