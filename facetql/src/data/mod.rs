//! Data layer
//!
//! - `filters` - Filter model, selector compiler, type registry and parsing
//! - `facets` - Distinct values and extremes for filter UIs
//! - `generic` - Count/get/delete access layer on top of the compiler
//! - `sqlite` / `postgres` - Backend services implementing `QueryExecutor`
//! - `sql` - Dialect layer (placeholders, pattern operators)
//! - `types` - Scalar values and decoded records
//! - `error` - Unified error type for all backends

pub mod error;
pub mod facets;
pub mod filters;
pub mod generic;
pub mod postgres;
pub mod sql;
pub mod sqlite;
pub mod traits;
pub mod types;

pub use error::{DataError, ErrorKind};
pub use generic::GenericStore;
pub use postgres::PostgresService;
pub use sqlite::SqliteService;
pub use traits::QueryExecutor;
pub use types::{Record, Value};

use std::sync::Arc;

use crate::core::config::DatabaseConfig;
use sql::Backend;

/// Database service enum
///
/// Wraps the configured backend. Services are stored as Arc so executors can
/// be handed out to stores without tying them to this value.
pub enum DataService {
    /// SQLite backend (default, embedded)
    Sqlite(Arc<SqliteService>),
    /// PostgreSQL backend
    Postgres(Arc<PostgresService>),
}

impl DataService {
    /// Initialize the configured backend
    pub async fn init(config: &DatabaseConfig) -> Result<Self, DataError> {
        match config.backend {
            Backend::Sqlite => {
                let service = SqliteService::init(&config.sqlite).await?;
                Ok(Self::Sqlite(Arc::new(service)))
            }
            Backend::Postgres => {
                let pg = config.postgres.as_ref().ok_or_else(|| {
                    DataError::Config("PostgreSQL configuration required".to_string())
                })?;
                let service = PostgresService::init(pg).await?;
                Ok(Self::Postgres(Arc::new(service)))
            }
        }
    }

    pub fn backend(&self) -> Backend {
        match self {
            Self::Sqlite(_) => Backend::Sqlite,
            Self::Postgres(_) => Backend::Postgres,
        }
    }

    /// Executor handle for the access layer and facet resolver
    pub fn executor(&self) -> Arc<dyn QueryExecutor> {
        match self {
            Self::Sqlite(s) => s.clone(),
            Self::Postgres(p) => p.clone(),
        }
    }

    /// Close the database connection gracefully
    pub async fn close(&self) {
        match self {
            Self::Sqlite(s) => s.close().await,
            Self::Postgres(p) => p.close().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::SqliteConfig;

    #[tokio::test]
    async fn test_init_sqlite_in_memory() {
        let config = DatabaseConfig {
            backend: Backend::Sqlite,
            sqlite: SqliteConfig::in_memory(),
            postgres: None,
            query_timeout_secs: 0,
        };
        let service = DataService::init(&config).await.unwrap();
        assert_eq!(service.backend(), Backend::Sqlite);

        let executor = service.executor();
        assert_eq!(executor.dialect().name(), "sqlite");
        let count = executor.fetch_count("SELECT 41 + 1", &[]).await.unwrap();
        assert_eq!(count, 42);
        service.close().await;
    }

    #[tokio::test]
    async fn test_init_postgres_requires_config() {
        let config = DatabaseConfig {
            backend: Backend::Postgres,
            sqlite: SqliteConfig::in_memory(),
            postgres: None,
            query_timeout_secs: 0,
        };
        let err = DataService::init(&config).await.err().unwrap();
        assert_eq!(err.code(), "CONFIG_ERROR");
    }
}
