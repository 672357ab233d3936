//! SQLite database service
//!
//! Embedded backend for local use and tests. A configured path gives a
//! file-backed WAL database; `:memory:` gives a single-connection in-memory
//! database that lives as long as the pool.

pub mod error;
mod executor;

pub use error::SqliteError;
pub use sqlx::SqlitePool;

use std::str::FromStr;
use std::time::Duration;

use sqlx::ConnectOptions;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use tracing::log::LevelFilter;

use crate::core::config::SqliteConfig;
use crate::core::constants::SQLITE_BUSY_TIMEOUT_SECS;
use crate::utils::file::{ensure_parent_dir, expand_path};

/// SQLite database service
///
/// Should be created once at startup and shared behind an `Arc`.
pub struct SqliteService {
    pool: SqlitePool,
}

impl SqliteService {
    /// Initialize the database service
    ///
    /// File-backed databases are created if missing (including the parent
    /// directory).
    pub async fn init(config: &SqliteConfig) -> Result<Self, SqliteError> {
        if config.is_in_memory() {
            let options = SqliteConnectOptions::from_str("sqlite::memory:")?
                .log_statements(LevelFilter::Trace);

            // One connection that never recycles, otherwise the data disappears
            let pool = SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options)
                .await?;

            tracing::debug!("SqliteService initialized (in-memory)");
            return Ok(Self { pool });
        }

        let db_path = expand_path(&config.path);
        ensure_parent_dir(&db_path)?;

        let options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(SQLITE_BUSY_TIMEOUT_SECS))
            .log_statements(LevelFilter::Trace);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await?;

        tracing::debug!(
            path = %db_path.display(),
            max_connections = config.max_connections,
            "SqliteService initialized"
        );
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Create a SqliteService from an existing pool
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Close the connection pool gracefully
    pub async fn close(&self) {
        self.pool.close().await;
        tracing::debug!("SQLite pool closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_init_in_memory_keeps_data() {
        let service = SqliteService::init(&SqliteConfig::in_memory()).await.unwrap();
        sqlx::query("CREATE TABLE t (id INTEGER)")
            .execute(service.pool())
            .await
            .unwrap();
        sqlx::query("INSERT INTO t VALUES (1)")
            .execute(service.pool())
            .await
            .unwrap();
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM t")
            .fetch_one(service.pool())
            .await
            .unwrap();
        assert_eq!(count, 1);
        service.close().await;
    }

    #[tokio::test]
    async fn test_init_file_creates_parent_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/facetql.db");
        let config = SqliteConfig {
            path: path.to_string_lossy().to_string(),
            max_connections: 2,
        };
        let service = SqliteService::init(&config).await.unwrap();
        assert!(path.exists());
        service.close().await;
    }
}
