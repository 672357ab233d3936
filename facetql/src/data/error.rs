//! Unified error type for data layer
//!
//! Wraps backend errors and filter validation errors while keeping enough
//! context (operation, data type, field) to diagnose a failed query without
//! leaking SQL text to end users.

use std::time::Duration;

use thiserror::Error;

use super::filters::FilterError;

/// Coarse classification used by outer layers (e.g. HTTP status mapping)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Caller supplied an invalid filter, type, field or pagination
    BadRequest,
    /// Query exceeded its deadline or was cancelled
    Timeout,
    /// Database or decoding failure
    Internal,
}

/// Unified error type for data layer operations
#[derive(Error, Debug)]
pub enum DataError {
    /// Filter failed validation before compilation
    #[error(transparent)]
    Filter(#[from] FilterError),

    /// SQLite database error
    #[error("SQLite error: {0}")]
    Sqlite(sqlx::Error),

    /// PostgreSQL database error
    #[error("PostgreSQL error: {0}")]
    Postgres(sqlx::Error),

    /// Query failed for an access layer operation
    #[error("{op} failed for data type '{data_type}': {source}")]
    Query {
        op: &'static str,
        data_type: String,
        #[source]
        source: Box<DataError>,
    },

    /// Facet query failed for a field
    #[error("failed to resolve facet for '{field}' in '{data_type}': {source}")]
    Facet {
        field: String,
        data_type: String,
        #[source]
        source: Box<DataError>,
    },

    /// Column type has no scalar mapping
    #[error("Unsupported type '{type_name}' for column '{column}'")]
    UnsupportedColumn { column: String, type_name: String },

    /// Row could not be converted to the requested shape
    #[error("Decode error: {0}")]
    Decode(String),

    /// Query timeout
    #[error("Query timeout after {timeout:?} on {backend}")]
    Timeout {
        backend: &'static str,
        timeout: Duration,
    },

    /// Query cancelled by the caller
    #[error("Query cancelled on {backend}")]
    Cancelled { backend: &'static str },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DataError {
    /// Create a SQLite error with preserved context
    pub fn from_sqlite(e: sqlx::Error) -> Self {
        Self::Sqlite(e)
    }

    /// Create a PostgreSQL error with preserved context
    pub fn from_postgres(e: sqlx::Error) -> Self {
        Self::Postgres(e)
    }

    /// Wrap an error with the access layer operation and data type
    pub fn query(op: &'static str, data_type: &str, source: DataError) -> Self {
        Self::Query {
            op,
            data_type: data_type.to_string(),
            source: Box::new(source),
        }
    }

    /// Wrap an error with the facet field and data type
    pub fn facet(field: &str, data_type: &str, source: DataError) -> Self {
        Self::Facet {
            field: field.to_string(),
            data_type: data_type.to_string(),
            source: Box::new(source),
        }
    }

    /// Create a timeout error
    pub fn timeout(backend: &'static str, timeout: Duration) -> Self {
        Self::Timeout { backend, timeout }
    }

    /// Innermost error, skipping operation/facet context wrappers
    pub fn root(&self) -> &DataError {
        match self {
            Self::Query { source, .. } | Self::Facet { source, .. } => source.root(),
            other => other,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self.root() {
            Self::Filter(_) => ErrorKind::BadRequest,
            Self::Timeout { .. } | Self::Cancelled { .. } => ErrorKind::Timeout,
            _ => ErrorKind::Internal,
        }
    }

    /// Stable classification code, safe to show to clients
    pub fn code(&self) -> &'static str {
        match self.root() {
            Self::Filter(e) => e.code(),
            Self::Timeout { .. } => "QUERY_TIMEOUT",
            Self::Cancelled { .. } => "QUERY_CANCELLED",
            Self::Sqlite(_) | Self::Postgres(_) => "DATABASE_ERROR",
            Self::UnsupportedColumn { .. } | Self::Decode(_) => "DECODE_ERROR",
            Self::Config(_) => "CONFIG_ERROR",
            Self::Io(_) => "IO_ERROR",
            Self::Query { .. } | Self::Facet { .. } => "DATABASE_ERROR",
        }
    }

    /// Message for clients: validation errors are explained, everything else
    /// is generic so SQL text and driver detail stay server-side.
    pub fn public_message(&self) -> String {
        match self.root() {
            Self::Filter(e) => e.to_string(),
            Self::Timeout { .. } => "Query timed out".to_string(),
            Self::Cancelled { .. } => "Query cancelled".to_string(),
            _ => "Database operation failed".to_string(),
        }
    }

    /// Check if this is a connection-related error that might be transient
    pub fn is_transient(&self) -> bool {
        match self.root() {
            Self::Timeout { .. } => true,
            Self::Sqlite(e) | Self::Postgres(e) => {
                matches!(
                    e,
                    sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_)
                )
            }
            _ => false,
        }
    }

    /// Get the backend name that generated this error
    pub fn backend(&self) -> &'static str {
        match self.root() {
            Self::Sqlite(_) => "sqlite",
            Self::Postgres(_) => "postgres",
            Self::Timeout { backend, .. } | Self::Cancelled { backend } => *backend,
            _ => "unknown",
        }
    }
}

/// Convert from the SqliteError type
impl From<crate::data::sqlite::SqliteError> for DataError {
    fn from(e: crate::data::sqlite::SqliteError) -> Self {
        match e {
            crate::data::sqlite::SqliteError::Database(e) => Self::Sqlite(e),
            crate::data::sqlite::SqliteError::Io(e) => Self::Io(e),
        }
    }
}

/// Convert from the PostgresError type
impl From<crate::data::postgres::PostgresError> for DataError {
    fn from(e: crate::data::postgres::PostgresError) -> Self {
        match e {
            crate::data::postgres::PostgresError::Database(e) => Self::Postgres(e),
            crate::data::postgres::PostgresError::Config(msg) => Self::Config(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_error_display() {
        let err = DataError::timeout("postgres", Duration::from_secs(30));
        assert_eq!(err.to_string(), "Query timeout after 30s on postgres");
        assert_eq!(err.kind(), ErrorKind::Timeout);

        let err = DataError::timeout("sqlite", Duration::from_millis(250));
        assert_eq!(err.to_string(), "Query timeout after 250ms on sqlite");
    }

    #[test]
    fn test_facet_error_names_field_and_type() {
        let err = DataError::facet(
            "status",
            "users",
            DataError::from_sqlite(sqlx::Error::RowNotFound),
        );
        let msg = err.to_string();
        assert!(msg.contains("'status'"));
        assert!(msg.contains("'users'"));
        assert_eq!(err.backend(), "sqlite");
        assert_eq!(err.kind(), ErrorKind::Internal);
    }

    #[test]
    fn test_filter_error_is_bad_request() {
        let err = DataError::query(
            "count",
            "users",
            FilterError::UnknownField {
                data_type: "users".to_string(),
                field: "nope".to_string(),
            }
            .into(),
        );
        assert_eq!(err.kind(), ErrorKind::BadRequest);
        assert_eq!(err.code(), "UNKNOWN_FIELD");
        assert!(err.public_message().contains("nope"));
    }

    #[test]
    fn test_public_message_hides_driver_detail() {
        let err = DataError::query(
            "get",
            "users",
            DataError::from_postgres(sqlx::Error::Protocol(
                "syntax error at or near SELECT".to_string(),
            )),
        );
        assert_eq!(err.code(), "DATABASE_ERROR");
        assert_eq!(err.public_message(), "Database operation failed");
        assert!(!err.public_message().contains("SELECT"));
    }

    #[test]
    fn test_is_transient() {
        assert!(DataError::timeout("sqlite", Duration::from_secs(5)).is_transient());
        assert!(DataError::from_postgres(sqlx::Error::PoolTimedOut).is_transient());
        assert!(!DataError::Config("bad config".into()).is_transient());
        assert!(!DataError::Cancelled { backend: "sqlite" }.is_transient());
    }
}
