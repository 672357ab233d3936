//! Generic access layer
//!
//! Count / list / lookup / delete / facet operations for any registered data
//! type. Every identifier is validated against the [`TypeRegistry`] before a
//! statement is built, and every value travels as a bound argument.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;

use crate::data::error::DataError;
use crate::data::facets;
use crate::data::filters::{
    CommonParams, DataTypeSpec, Filter, FilterError, FilterValues, TypeRegistry, compile_filter,
    compile_params,
};
use crate::data::sql::SqlDialect;
use crate::data::traits::QueryExecutor;
use crate::data::types::{Record, Value};

/// Access layer over one executor and one registry
#[derive(Clone)]
pub struct GenericStore {
    executor: Arc<dyn QueryExecutor>,
    registry: Arc<TypeRegistry>,
    timeout: Option<Duration>,
    cancel: CancellationToken,
}

impl GenericStore {
    pub fn new(executor: Arc<dyn QueryExecutor>, registry: Arc<TypeRegistry>) -> Self {
        Self {
            executor,
            registry,
            timeout: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Abort queries that run longer than `timeout` (zero disables)
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = (!timeout.is_zero()).then_some(timeout);
        self
    }

    /// Abort in-flight and future queries once `token` is cancelled
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    pub fn dialect(&self) -> &'static dyn SqlDialect {
        self.executor.dialect()
    }

    /// Number of rows matching `filter`
    pub async fn count(&self, data_type: &str, filter: Option<&Filter>) -> Result<i64, DataError> {
        let op = "count";
        let spec = self.validated(op, data_type, |r| match filter {
            Some(filter) => r.validate_filter(data_type, filter),
            None => r.get(data_type),
        })?;
        let selector = compile_filter(self.dialect(), filter)
            .map_err(|e| DataError::query(op, data_type, e.into()))?;
        let sql = selector.statement(&format!("SELECT COUNT(*) FROM {}", spec.table));

        tracing::debug!(data_type, table = %spec.table, args = selector.args.len(), "count");
        self.guard(op, data_type, self.executor.fetch_count(&sql, &selector.args))
            .await
    }

    /// Rows matching the filter, sorted and paged
    pub async fn get(&self, data_type: &str, params: &CommonParams) -> Result<Vec<Record>, DataError> {
        let op = "get";
        let spec = self.validated(op, data_type, |r| r.validate_params(data_type, params))?;
        let selector = compile_params(self.dialect(), params)
            .map_err(|e| DataError::query(op, data_type, e.into()))?;
        let sql = selector.statement(&format!("SELECT * FROM {}", spec.table));

        tracing::debug!(
            data_type,
            table = %spec.table,
            page = params.page,
            page_size = params.page_size,
            "get"
        );
        self.guard(op, data_type, self.executor.fetch_all(&sql, &selector.args))
            .await
    }

    /// [`get`](Self::get) deserialized into `T`
    pub async fn get_as<T: DeserializeOwned>(
        &self,
        data_type: &str,
        params: &CommonParams,
    ) -> Result<Vec<T>, DataError> {
        self.get(data_type, params)
            .await?
            .iter()
            .map(Record::deserialize)
            .collect::<Result<Vec<T>, _>>()
            .map_err(|e| DataError::query("get", data_type, e))
    }

    /// Row whose `key_field` equals `key`, bypassing the filter compiler
    pub async fn get_one(
        &self,
        data_type: &str,
        key_field: &str,
        key: impl Into<Value>,
    ) -> Result<Option<Record>, DataError> {
        let op = "get_one";
        let spec = self.validated(op, data_type, |r| r.validate_key(data_type, key_field))?;
        let sql = format!(
            "SELECT * FROM {} WHERE {} = {} LIMIT 1",
            spec.table,
            key_field,
            self.dialect().placeholder(1)
        );

        tracing::debug!(data_type, table = %spec.table, key_field, "get_one");
        let rows = self
            .guard(op, data_type, self.executor.fetch_all(&sql, &[key.into()]))
            .await?;
        Ok(rows.into_iter().next())
    }

    /// [`get_one`](Self::get_one) deserialized into `T`
    pub async fn get_one_as<T: DeserializeOwned>(
        &self,
        data_type: &str,
        key_field: &str,
        key: impl Into<Value>,
    ) -> Result<Option<T>, DataError> {
        self.get_one(data_type, key_field, key)
            .await?
            .map(|record| record.deserialize())
            .transpose()
            .map_err(|e| DataError::query("get_one", data_type, e))
    }

    /// Delete rows whose `key_field` is one of `keys`; empty `keys` is a no-op
    pub async fn delete(
        &self,
        data_type: &str,
        key_field: &str,
        keys: &[Value],
    ) -> Result<u64, DataError> {
        let op = "delete";
        let spec = self.validated(op, data_type, |r| r.validate_key(data_type, key_field))?;
        if keys.is_empty() {
            return Ok(0);
        }

        let dialect = self.dialect();
        let placeholders = (1..=keys.len())
            .map(|i| dialect.placeholder(i))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "DELETE FROM {} WHERE {} IN ({})",
            spec.table, key_field, placeholders
        );

        tracing::debug!(data_type, table = %spec.table, keys = keys.len(), "delete");
        self.guard(op, data_type, self.executor.execute(&sql, keys))
            .await
    }

    /// Whether a row with `key_field = id` exists
    pub async fn exists(
        &self,
        data_type: &str,
        key_field: &str,
        id: impl Into<Value>,
    ) -> Result<bool, DataError> {
        let op = "exists";
        let spec = self.validated(op, data_type, |r| r.validate_key(data_type, key_field))?;
        let sql = format!(
            "SELECT COUNT(*) FROM (SELECT 1 FROM {} WHERE {} = {} LIMIT 1) AS found",
            spec.table,
            key_field,
            self.dialect().placeholder(1)
        );

        tracing::debug!(data_type, table = %spec.table, key_field, "exists");
        let count = self
            .guard(op, data_type, self.executor.fetch_count(&sql, &[id.into()]))
            .await?;
        Ok(count > 0)
    }

    /// Facet values for the type's registered filter specs
    pub async fn filter_values(
        &self,
        data_type: &str,
        filter: Option<&Filter>,
    ) -> Result<FilterValues, DataError> {
        let op = "filter_values";
        let spec = self.validated(op, data_type, |r| match filter {
            Some(filter) => r.validate_filter(data_type, filter),
            None => r.get(data_type),
        })?;

        self.guard(
            op,
            data_type,
            facets::filter_values(self.executor.as_ref(), &spec.table, &spec.filters, filter),
        )
        .await
    }

    fn validated<'r>(
        &'r self,
        op: &'static str,
        data_type: &str,
        check: impl FnOnce(&'r TypeRegistry) -> Result<&'r DataTypeSpec, FilterError>,
    ) -> Result<&'r DataTypeSpec, DataError> {
        check(self.registry.as_ref()).map_err(|e| {
            tracing::debug!(data_type, op, error = %e, "Rejected request");
            DataError::query(op, data_type, e.into())
        })
    }

    /// Run a query future under the store's timeout and cancellation token
    async fn guard<T>(
        &self,
        op: &'static str,
        data_type: &str,
        query: impl Future<Output = Result<T, DataError>>,
    ) -> Result<T, DataError> {
        let backend = self.dialect().name();
        let timed = async {
            match self.timeout {
                Some(limit) => tokio::time::timeout(limit, query)
                    .await
                    .map_err(|_| DataError::timeout(backend, limit))?,
                None => query.await,
            }
        };

        let result = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(DataError::Cancelled { backend }),
            result = timed => result,
        };

        result.map_err(|e| {
            tracing::warn!(data_type, op, backend, error = %e, "Query failed");
            DataError::query(op, data_type, e)
        })
    }
}
