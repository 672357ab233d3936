//! QueryExecutor implementation for SQLite
//!
//! SQLite is dynamically typed, so decoding looks at the storage class of
//! each value. The declared column type is only consulted to recover booleans
//! (stored as integers) and timestamps (stored as text).

use async_trait::async_trait;
use sqlx::query::Query;
use sqlx::sqlite::{SqliteArguments, SqliteRow};
use sqlx::{Column, Row, Sqlite, TypeInfo, ValueRef};

use super::SqliteService;
use crate::data::error::DataError;
use crate::data::sql::{Backend, SqlDialect};
use crate::data::traits::QueryExecutor;
use crate::data::types::{Record, Value};

type SqliteQuery<'q> = Query<'q, Sqlite, SqliteArguments<'q>>;

fn bind_args<'q>(mut query: SqliteQuery<'q>, args: &'q [Value]) -> SqliteQuery<'q> {
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

fn decode_value(row: &SqliteRow, idx: usize, declared: &str) -> Result<Value, DataError> {
    let raw = row.try_get_raw(idx).map_err(DataError::from_sqlite)?;
    if raw.is_null() {
        return Ok(Value::Null);
    }
    let storage = raw.type_info().name().to_string();

    let value = match (declared, storage.as_str()) {
        ("BOOLEAN", "INTEGER") => {
            let v: i64 = row.try_get_unchecked(idx).map_err(DataError::from_sqlite)?;
            Value::Bool(v != 0)
        }
        ("DATETIME" | "DATE", "TEXT") => {
            let text: String = row.try_get_unchecked(idx).map_err(DataError::from_sqlite)?;
            let value = Value::Text(text);
            match value.as_timestamp() {
                Some(ts) => Value::Timestamp(ts),
                None => value,
            }
        }
        (_, "INTEGER") => Value::Int(row.try_get_unchecked(idx).map_err(DataError::from_sqlite)?),
        (_, "REAL" | "NUMERIC") => {
            Value::Float(row.try_get_unchecked(idx).map_err(DataError::from_sqlite)?)
        }
        (_, "TEXT") => Value::Text(row.try_get_unchecked(idx).map_err(DataError::from_sqlite)?),
        (_, "BLOB") => {
            let bytes: Vec<u8> = row.try_get_unchecked(idx).map_err(DataError::from_sqlite)?;
            Value::Text(hex::encode(bytes))
        }
        (_, other) => {
            return Err(DataError::UnsupportedColumn {
                column: row.columns()[idx].name().to_string(),
                type_name: other.to_string(),
            });
        }
    };
    Ok(value)
}

fn decode_row(row: &SqliteRow) -> Result<Record, DataError> {
    let mut record = Record::new();
    for column in row.columns() {
        let declared = column.type_info().name().to_ascii_uppercase();
        let value = decode_value(row, column.ordinal(), &declared)?;
        record.push(column.name(), value);
    }
    Ok(record)
}

#[async_trait]
impl QueryExecutor for SqliteService {
    fn dialect(&self) -> &'static dyn SqlDialect {
        Backend::Sqlite.dialect()
    }

    async fn fetch_all(&self, query: &str, args: &[Value]) -> Result<Vec<Record>, DataError> {
        tracing::trace!(query, args = args.len(), "sqlite fetch_all");
        let rows = bind_args(sqlx::query(query), args)
            .fetch_all(self.pool())
            .await
            .map_err(DataError::from_sqlite)?;
        rows.iter().map(decode_row).collect()
    }

    async fn fetch_count(&self, query: &str, args: &[Value]) -> Result<i64, DataError> {
        tracing::trace!(query, args = args.len(), "sqlite fetch_count");
        let row = bind_args(sqlx::query(query), args)
            .fetch_one(self.pool())
            .await
            .map_err(DataError::from_sqlite)?;
        row.try_get::<i64, _>(0).map_err(DataError::from_sqlite)
    }

    async fn execute(&self, query: &str, args: &[Value]) -> Result<u64, DataError> {
        tracing::trace!(query, args = args.len(), "sqlite execute");
        let result = bind_args(sqlx::query(query), args)
            .execute(self.pool())
            .await
            .map_err(DataError::from_sqlite)?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::filters::{DateRangeMatcher, Filter, Matcher, compile_filter};
    use chrono::{TimeZone, Utc};
    use sqlx::sqlite::SqlitePoolOptions;

    async fn setup_service() -> SqliteService {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        sqlx::query(
            "CREATE TABLE items (
                id INTEGER PRIMARY KEY,
                name TEXT,
                price REAL,
                active BOOLEAN,
                created DATETIME,
                payload BLOB
            )",
        )
        .execute(&pool)
        .await
        .unwrap();
        SqliteService::from_pool(pool)
    }

    #[tokio::test]
    async fn test_roundtrip_all_scalar_kinds() {
        let service = setup_service().await;
        let created = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();

        let affected = service
            .execute(
                "INSERT INTO items (id, name, price, active, created, payload) \
                 VALUES (?, ?, ?, ?, ?, X'CAFE')",
                &[
                    Value::Int(1),
                    Value::from("widget"),
                    Value::Float(9.5),
                    Value::Bool(true),
                    Value::Timestamp(created),
                ],
            )
            .await
            .unwrap();
        assert_eq!(affected, 1);

        let rows = service
            .fetch_all("SELECT * FROM items WHERE id = ?", &[Value::Int(1)])
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.get("id"), Some(&Value::Int(1)));
        assert_eq!(row.get("name"), Some(&Value::from("widget")));
        assert_eq!(row.get("price"), Some(&Value::Float(9.5)));
        assert_eq!(row.get("active"), Some(&Value::Bool(true)));
        assert_eq!(row.get("created"), Some(&Value::Timestamp(created)));
        assert_eq!(row.get("payload"), Some(&Value::from("cafe")));
    }

    #[tokio::test]
    async fn test_nulls_decode_as_null() {
        let service = setup_service().await;
        service
            .execute(
                "INSERT INTO items (id, name) VALUES (?, ?)",
                &[Value::Int(2), Value::Null],
            )
            .await
            .unwrap();
        let rows = service
            .fetch_all("SELECT name, price FROM items", &[])
            .await
            .unwrap();
        assert_eq!(rows[0].values(), &[Value::Null, Value::Null]);
    }

    #[tokio::test]
    async fn test_fetch_count() {
        let service = setup_service().await;
        for id in 1..=3 {
            service
                .execute("INSERT INTO items (id) VALUES (?)", &[Value::Int(id)])
                .await
                .unwrap();
        }
        let count = service
            .fetch_count("SELECT COUNT(*) FROM items WHERE id > ?", &[Value::Int(1)])
            .await
            .unwrap();
        assert_eq!(count, 2);
    }

    #[tokio::test]
    async fn test_sql_error_maps_to_sqlite_backend() {
        let service = setup_service().await;
        let err = service
            .fetch_all("SELECT * FROM missing_table", &[])
            .await
            .unwrap_err();
        assert_eq!(err.backend(), "sqlite");
        assert_eq!(err.code(), "DATABASE_ERROR");
    }

    async fn count_matching(service: &SqliteService, filter: &Filter) -> i64 {
        let selector = compile_filter(service.dialect(), Some(filter)).unwrap();
        let sql = selector.statement("SELECT COUNT(*) FROM items");
        service.fetch_count(&sql, &selector.args).await.unwrap()
    }

    fn january(invert: bool) -> Filter {
        Filter::new().with_date(
            "created",
            DateRangeMatcher::try_new(
                Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(2024, 1, 31, 0, 0, 0).unwrap(),
                invert,
            )
            .unwrap(),
        )
    }

    #[tokio::test]
    async fn test_date_range_over_sqlite_native_text() {
        let service = setup_service().await;
        sqlx::query(
            "INSERT INTO items (id, created) VALUES
                (1, '2024-01-01 12:00:00'),
                (2, '2024-01-15 00:00:00'),
                (3, '2024-02-01 00:00:00'),
                (4, datetime('now'))",
        )
        .execute(service.pool())
        .await
        .unwrap();

        assert_eq!(count_matching(&service, &january(false)).await, 2);
        assert_eq!(count_matching(&service, &january(true)).await, 2);
    }

    #[tokio::test]
    async fn test_date_range_over_mixed_text_layouts() {
        let service = setup_service().await;
        sqlx::query("INSERT INTO items (id, created) VALUES (1, '2024-01-01 00:00:00')")
            .execute(service.pool())
            .await
            .unwrap();
        service
            .execute(
                "INSERT INTO items (id, created) VALUES (?, ?)",
                &[
                    Value::Int(2),
                    Value::Timestamp(Utc.with_ymd_and_hms(2024, 1, 31, 0, 0, 0).unwrap()),
                ],
            )
            .await
            .unwrap();
        sqlx::query("INSERT INTO items (id, created) VALUES (3, '2024-01-31T00:00:01Z')")
            .execute(service.pool())
            .await
            .unwrap();

        // Both bounds are inclusive regardless of layout
        assert_eq!(count_matching(&service, &january(false)).await, 2);
    }

    #[tokio::test]
    async fn test_inverted_list_excludes_values() {
        let service = setup_service().await;
        for (id, name) in [(1, "alpha"), (2, "beta"), (3, "gamma")] {
            service
                .execute(
                    "INSERT INTO items (id, name) VALUES (?, ?)",
                    &[Value::Int(id), Value::from(name)],
                )
                .await
                .unwrap();
        }
        let filter = Filter::new().with_list("name", Matcher::none_of(["alpha", "gamma"]));
        assert_eq!(count_matching(&service, &filter).await, 1);

        let filter = Filter::new().with_list("name", Matcher::any_of(["alpha", "gamma"]));
        assert_eq!(count_matching(&service, &filter).await, 2);
    }

    #[tokio::test]
    async fn test_dialect() {
        let service = setup_service().await;
        assert_eq!(service.dialect().placeholder(3), "?");
        assert_eq!(service.dialect().pattern_match_op(), "LIKE");
    }
}
