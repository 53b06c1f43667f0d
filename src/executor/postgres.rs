//! PostgreSQL backend
//!
//! One plain `PgConnection` per call, no pool. The connection-level
//! read-only guard is the `default_transaction_read_only` session GUC,
//! readable via SHOW and writable via SET, so prior state is always
//! restorable. Cells are decoded by type-name dispatch; types outside the
//! known set fall back to a string decode and degrade to NULL with a
//! warning.

use std::str::FromStr;

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use sqlx::postgres::{PgConnectOptions, PgConnection, PgRow};
use sqlx::{Column, ConnectOptions, Connection, Executor, Row, Statement, TypeInfo};
use uuid::Uuid;

use super::{ConnectionSpec, DbConnection};
use crate::types::{ResultSet, Value};

pub(crate) struct PostgresConnection {
    conn: PgConnection,
}

impl PostgresConnection {
    pub(crate) async fn open(spec: &ConnectionSpec) -> anyhow::Result<Self> {
        let mut options = PgConnectOptions::from_str(&spec.url)?;
        options = options.username(&spec.username);
        if let Some(password) = &spec.password {
            options = options.password(password);
        }
        let conn = options.connect().await?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl DbConnection for PostgresConnection {
    async fn read_only(&mut self) -> anyhow::Result<Option<bool>> {
        let setting: String = sqlx::query_scalar("SHOW default_transaction_read_only")
            .fetch_one(&mut self.conn)
            .await?;
        Ok(Some(setting == "on"))
    }

    async fn set_read_only(&mut self, read_only: bool) -> anyhow::Result<bool> {
        let statement = if read_only {
            "SET default_transaction_read_only = on"
        } else {
            "SET default_transaction_read_only = off"
        };
        sqlx::query(statement).execute(&mut self.conn).await?;
        Ok(true)
    }

    async fn run(&mut self, sql: &str) -> anyhow::Result<Option<ResultSet>> {
        let stmt = self.conn.prepare(sql).await?;
        if stmt.columns().is_empty() {
            // command tag instead of a result set
            return Ok(None);
        }
        let columns: Vec<String> = stmt.columns().iter().map(|c| c.name().to_string()).collect();
        let type_names: Vec<String> = stmt
            .columns()
            .iter()
            .map(|c| c.type_info().name().to_string())
            .collect();

        let rows: Vec<PgRow> = stmt.query().fetch_all(&mut self.conn).await?;
        let mut collected = Vec::with_capacity(rows.len());
        for row in &rows {
            let mut cells = Vec::with_capacity(columns.len());
            for (i, type_name) in type_names.iter().enumerate() {
                cells.push(decode_cell(row, i, type_name));
            }
            collected.push(cells);
        }

        Ok(Some(ResultSet {
            columns,
            rows: collected,
        }))
    }

    async fn close(self: Box<Self>) -> anyhow::Result<()> {
        self.conn.close().await?;
        Ok(())
    }
}

fn decode_cell(row: &PgRow, index: usize, type_name: &str) -> Value {
    match type_name {
        "BOOL" => row
            .try_get::<Option<bool>, _>(index)
            .ok()
            .flatten()
            .map(Value::Bool)
            .unwrap_or(Value::Null),
        "INT2" | "SMALLINT" => row
            .try_get::<Option<i16>, _>(index)
            .ok()
            .flatten()
            .map(|v| Value::Int(v.into()))
            .unwrap_or(Value::Null),
        "INT4" | "INT" | "INTEGER" => row
            .try_get::<Option<i32>, _>(index)
            .ok()
            .flatten()
            .map(|v| Value::Int(v.into()))
            .unwrap_or(Value::Null),
        "INT8" | "BIGINT" => row
            .try_get::<Option<i64>, _>(index)
            .ok()
            .flatten()
            .map(Value::Int)
            .unwrap_or(Value::Null),
        "FLOAT4" | "REAL" => row
            .try_get::<Option<f32>, _>(index)
            .ok()
            .flatten()
            .map(|v| Value::Float(v.into()))
            .unwrap_or(Value::Null),
        "FLOAT8" | "DOUBLE PRECISION" => row
            .try_get::<Option<f64>, _>(index)
            .ok()
            .flatten()
            .map(Value::Float)
            .unwrap_or(Value::Null),
        "NUMERIC" => row
            .try_get::<Option<BigDecimal>, _>(index)
            .ok()
            .flatten()
            .map(Value::Decimal)
            .unwrap_or(Value::Null),
        "TEXT" | "VARCHAR" | "CHAR" | "BPCHAR" | "NAME" => row
            .try_get::<Option<String>, _>(index)
            .ok()
            .flatten()
            .map(Value::Text)
            .unwrap_or(Value::Null),
        "TIMESTAMP" => row
            .try_get::<Option<NaiveDateTime>, _>(index)
            .ok()
            .flatten()
            .map(Value::Timestamp)
            .unwrap_or(Value::Null),
        "TIMESTAMPTZ" => row
            .try_get::<Option<DateTime<Utc>>, _>(index)
            .ok()
            .flatten()
            .map(|v| Value::Timestamp(v.naive_utc()))
            .unwrap_or(Value::Null),
        "DATE" => row
            .try_get::<Option<NaiveDate>, _>(index)
            .ok()
            .flatten()
            .map(|v| Value::Text(v.to_string()))
            .unwrap_or(Value::Null),
        "TIME" => row
            .try_get::<Option<NaiveTime>, _>(index)
            .ok()
            .flatten()
            .map(|v| Value::Text(v.to_string()))
            .unwrap_or(Value::Null),
        "UUID" => row
            .try_get::<Option<Uuid>, _>(index)
            .ok()
            .flatten()
            .map(|v| Value::Text(v.to_string()))
            .unwrap_or(Value::Null),
        "JSON" | "JSONB" => row
            .try_get::<Option<serde_json::Value>, _>(index)
            .ok()
            .flatten()
            .map(|v| Value::Text(v.to_string()))
            .unwrap_or(Value::Null),
        other => match row.try_get::<Option<String>, _>(index) {
            Ok(v) => v.map(Value::Text).unwrap_or(Value::Null),
            Err(e) => {
                tracing::warn!("cannot decode column type {other}: {e}");
                Value::Null
            }
        },
    }
}
