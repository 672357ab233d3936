//! QueryExecutor implementation for PostgreSQL
//!
//! Columns are decoded by their declared type name. Types without a scalar
//! mapping (arrays, NUMERIC, geometric types, ...) are rejected with the
//! column name so the caller can cast in the registered view instead.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::query::Query;
use sqlx::{Column, Postgres, Row, TypeInfo, ValueRef};

use super::PostgresService;
use crate::data::error::DataError;
use crate::data::sql::{Backend, SqlDialect};
use crate::data::traits::QueryExecutor;
use crate::data::types::{Record, Value};

type PgQuery<'q> = Query<'q, Postgres, PgArguments>;

fn bind_args<'q>(mut query: PgQuery<'q>, args: &'q [Value]) -> PgQuery<'q> {
    for arg in args {
        query = match arg {
            Value::Null => query.bind(None::<String>),
            Value::Bool(b) => query.bind(*b),
            Value::Int(i) => query.bind(*i),
            Value::Float(f) => query.bind(*f),
            Value::Text(s) => query.bind(s.as_str()),
            Value::Timestamp(t) => query.bind(*t),
        };
    }
    query
}

fn decode_value(row: &PgRow, idx: usize, type_name: &str) -> Result<Value, DataError> {
    let raw = row.try_get_raw(idx).map_err(DataError::from_postgres)?;
    if raw.is_null() {
        return Ok(Value::Null);
    }

    let pg = DataError::from_postgres;
    let value = match type_name {
        "BOOL" => Value::Bool(row.try_get(idx).map_err(pg)?),
        "INT2" => Value::Int(row.try_get::<i16, _>(idx).map_err(pg)?.into()),
        "INT4" => Value::Int(row.try_get::<i32, _>(idx).map_err(pg)?.into()),
        "INT8" => Value::Int(row.try_get(idx).map_err(pg)?),
        "FLOAT4" => Value::Float(row.try_get::<f32, _>(idx).map_err(pg)?.into()),
        "FLOAT8" => Value::Float(row.try_get(idx).map_err(pg)?),
        "TEXT" | "VARCHAR" | "CHAR" | "BPCHAR" | "NAME" | "CITEXT" => {
            Value::Text(row.try_get(idx).map_err(pg)?)
        }
        "TIMESTAMPTZ" => Value::Timestamp(row.try_get::<DateTime<Utc>, _>(idx).map_err(pg)?),
        "TIMESTAMP" => Value::Timestamp(row.try_get::<NaiveDateTime, _>(idx).map_err(pg)?.and_utc()),
        "DATE" => {
            let date: NaiveDate = row.try_get(idx).map_err(pg)?;
            date.and_hms_opt(0, 0, 0)
                .map(|dt| Value::Timestamp(dt.and_utc()))
                .unwrap_or(Value::Null)
        }
        "UUID" => Value::Text(row.try_get::<uuid::Uuid, _>(idx).map_err(pg)?.to_string()),
        "JSON" | "JSONB" => {
            Value::Text(row.try_get::<serde_json::Value, _>(idx).map_err(pg)?.to_string())
        }
        "BYTEA" => Value::Text(hex::encode(row.try_get::<Vec<u8>, _>(idx).map_err(pg)?)),
        other => {
            return Err(DataError::UnsupportedColumn {
                column: row.columns()[idx].name().to_string(),
                type_name: other.to_string(),
            });
        }
    };
    Ok(value)
}

fn decode_row(row: &PgRow) -> Result<Record, DataError> {
    let mut record = Record::new();
    for column in row.columns() {
        let value = decode_value(row, column.ordinal(), column.type_info().name())?;
        record.push(column.name(), value);
    }
    Ok(record)
}

#[async_trait]
impl QueryExecutor for PostgresService {
    fn dialect(&self) -> &'static dyn SqlDialect {
        Backend::Postgres.dialect()
    }

    async fn fetch_all(&self, query: &str, args: &[Value]) -> Result<Vec<Record>, DataError> {
        tracing::trace!(query, args = args.len(), "postgres fetch_all");
        let rows = bind_args(sqlx::query(query), args)
            .fetch_all(self.pool())
            .await
            .map_err(DataError::from_postgres)?;
        rows.iter().map(decode_row).collect()
    }

    async fn fetch_count(&self, query: &str, args: &[Value]) -> Result<i64, DataError> {
        tracing::trace!(query, args = args.len(), "postgres fetch_count");
        let row = bind_args(sqlx::query(query), args)
            .fetch_one(self.pool())
            .await
            .map_err(DataError::from_postgres)?;
        row.try_get::<i64, _>(0).map_err(DataError::from_postgres)
    }

    async fn execute(&self, query: &str, args: &[Value]) -> Result<u64, DataError> {
        tracing::trace!(query, args = args.len(), "postgres execute");
        let result = bind_args(sqlx::query(query), args)
            .execute(self.pool())
            .await
            .map_err(DataError::from_postgres)?;
        Ok(result.rows_affected())
    }
}
