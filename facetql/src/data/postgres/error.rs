//! PostgreSQL error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PostgresError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::error::DataError;

    #[test]
    fn test_config_error_display() {
        let err = PostgresError::Config("missing URL".to_string());
        assert_eq!(err.to_string(), "Configuration error: missing URL");
    }

    #[test]
    fn test_into_data_error() {
        let err: DataError = PostgresError::Config("bad".to_string()).into();
        assert_eq!(err.code(), "CONFIG_ERROR");

        let err: DataError = PostgresError::Database(sqlx::Error::RowNotFound).into();
        assert_eq!(err.backend(), "postgres");
    }
}
