//! Execution interface for database backends
//!
//! The access layer and facet resolver only see this trait. Each backend
//! (SQLite, PostgreSQL) binds scalar arguments positionally and decodes rows
//! into [`Record`]s with its own logic.

use async_trait::async_trait;

use crate::data::error::DataError;
use crate::data::sql::SqlDialect;
use crate::data::types::{Record, Value};

#[async_trait]
pub trait QueryExecutor: Send + Sync {
    /// Dialect used to render placeholders for this backend
    fn dialect(&self) -> &'static dyn SqlDialect;

    /// Run a query and decode every row
    async fn fetch_all(&self, query: &str, args: &[Value]) -> Result<Vec<Record>, DataError>;

    /// Run a query returning a single integer (e.g. `COUNT(*)`)
    async fn fetch_count(&self, query: &str, args: &[Value]) -> Result<i64, DataError>;

    /// Run a statement and return the number of affected rows
    async fn execute(&self, query: &str, args: &[Value]) -> Result<u64, DataError>;
}
