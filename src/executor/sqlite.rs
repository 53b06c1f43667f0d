//! SQLite backend
//!
//! The connection-level read-only guard is `PRAGMA query_only`, which is
//! both readable and writable, so prior state is always restorable. SQLite
//! has no credentials; the supplied username/password are accepted and
//! ignored, as its drivers conventionally do.

use async_trait::async_trait;
use rusqlite::types::ValueRef;
use rusqlite::Connection;

use super::{ConnectionSpec, DbConnection};
use crate::types::{ResultSet, Value};

pub(crate) struct SqliteConnection {
    conn: Connection,
}

impl SqliteConnection {
    pub(crate) fn open(spec: &ConnectionSpec) -> anyhow::Result<Self> {
        let conn = Connection::open(database_path(&spec.url))?;
        Ok(Self { conn })
    }
}

/// `sqlite:///var/data/app.db`, `sqlite:app.db`, and `sqlite::memory:` all
/// name the file the way the sqlite3 library expects it.
fn database_path(url: &str) -> &str {
    let url = url.trim();
    url.strip_prefix("sqlite://")
        .or_else(|| url.strip_prefix("sqlite:"))
        .unwrap_or(url)
}

#[async_trait]
impl DbConnection for SqliteConnection {
    async fn read_only(&mut self) -> anyhow::Result<Option<bool>> {
        let query_only: bool = self
            .conn
            .pragma_query_value(None, "query_only", |row| row.get(0))?;
        Ok(Some(query_only))
    }

    async fn set_read_only(&mut self, read_only: bool) -> anyhow::Result<bool> {
        self.conn.pragma_update(None, "query_only", read_only)?;
        Ok(true)
    }

    async fn run(&mut self, sql: &str) -> anyhow::Result<Option<ResultSet>> {
        let mut stmt = self.conn.prepare(sql)?;
        if stmt.column_count() == 0 {
            // update count instead of a result set
            return Ok(None);
        }
        let columns: Vec<String> = stmt.column_names().iter().map(|s| s.to_string()).collect();

        let mut rows = stmt.query([])?;
        let mut collected = Vec::new();
        while let Some(row) = rows.next()? {
            let mut cells = Vec::with_capacity(columns.len());
            for i in 0..columns.len() {
                cells.push(decode_cell(row.get_ref(i)?));
            }
            collected.push(cells);
        }

        Ok(Some(ResultSet {
            columns,
            rows: collected,
        }))
    }

    async fn close(self: Box<Self>) -> anyhow::Result<()> {
        self.conn.close().map_err(|(_, e)| anyhow::Error::new(e))
    }
}

fn decode_cell(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(v) => Value::Int(v),
        ValueRef::Real(v) => Value::Float(v),
        ValueRef::Text(t) => Value::Text(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => Value::Text(format!("<blob {} bytes>", b.len())),
    }
}
