//! PostgreSQL database service
//!
//! Pooled backend for shared deployments with:
//! - Connection pooling with min/max bounds
//! - Idle connection cleanup and lifetime cycling
//! - Server-side statement timeout
//! - Fixed session time zone so timestamp facets are stable

pub mod error;
mod executor;

pub use error::PostgresError;
pub use sqlx::PgPool;

use std::time::Duration;

use sqlx::ConnectOptions;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use tracing::log::LevelFilter;

use crate::core::config::PostgresConfig;

/// PostgreSQL database service
///
/// Should be created once at startup and shared behind an `Arc`.
pub struct PostgresService {
    pool: PgPool,
}

/// Build connect options from a URL or from individual connection parts
pub(crate) fn connect_options(config: &PostgresConfig) -> Result<PgConnectOptions, PostgresError> {
    let mut options = match (&config.url, &config.host) {
        (Some(url), _) => url
            .parse::<PgConnectOptions>()
            .map_err(|e| PostgresError::Config(format!("Invalid PostgreSQL URL: {}", e)))?,
        (None, Some(host)) => {
            let mut options = PgConnectOptions::new().host(host).port(config.port);
            if let Some(user) = &config.user {
                options = options.username(user);
            }
            if let Some(password) = &config.password {
                options = options.password(password);
            }
            if let Some(database) = &config.database {
                options = options.database(database);
            }
            options
        }
        (None, None) => {
            return Err(PostgresError::Config(
                "PostgreSQL URL or host is required".into(),
            ));
        }
    };

    options = options.log_statements(LevelFilter::Trace);

    if !config.timezone.is_empty() {
        options = options.options([("TimeZone", config.timezone.as_str())]);
    }
    if config.statement_timeout_secs > 0 {
        options = options.options([(
            "statement_timeout",
            format!("{}s", config.statement_timeout_secs),
        )]);
    }
    Ok(options)
}

impl PostgresService {
    /// Initialize the database service from configuration
    pub async fn init(config: &PostgresConfig) -> Result<Self, PostgresError> {
        let options = connect_options(config)?;

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
            .max_lifetime(Duration::from_secs(config.max_lifetime_secs))
            .connect_with(options)
            .await?;

        tracing::debug!(
            max_connections = config.max_connections,
            min_connections = config.min_connections,
            acquire_timeout_secs = config.acquire_timeout_secs,
            idle_timeout_secs = config.idle_timeout_secs,
            statement_timeout_secs = config.statement_timeout_secs,
            timezone = %config.timezone,
            "PostgresService initialized"
        );
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create a PostgresService from an existing pool
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Close the connection pool gracefully
    pub async fn close(&self) {
        self.pool.close().await;
        tracing::debug!("PostgreSQL pool closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parts_config() -> PostgresConfig {
        PostgresConfig {
            url: None,
            host: Some("db.internal".to_string()),
            user: Some("app".to_string()),
            database: Some("inventory".to_string()),
            ..PostgresConfig::from_url("")
        }
    }

    #[test]
    fn test_connect_options_from_url() {
        let options =
            connect_options(&PostgresConfig::from_url("postgres://u:p@localhost:6543/app")).unwrap();
        assert_eq!(options.get_host(), "localhost");
        assert_eq!(options.get_port(), 6543);
        assert_eq!(options.get_database(), Some("app"));
    }

    #[test]
    fn test_connect_options_from_parts() {
        let options = connect_options(&parts_config()).unwrap();
        assert_eq!(options.get_host(), "db.internal");
        assert_eq!(options.get_port(), 5432);
        assert_eq!(options.get_username(), "app");
        assert_eq!(options.get_database(), Some("inventory"));
        let extra = options.get_options().unwrap_or_default();
        assert!(extra.contains("TimeZone=UTC"));
        assert!(extra.contains("statement_timeout=60s"));
    }

    #[test]
    fn test_connect_options_invalid_url() {
        let err = connect_options(&PostgresConfig::from_url("not a url")).unwrap_err();
        assert!(matches!(err, PostgresError::Config(_)));
    }

    #[test]
    fn test_connect_options_requires_target() {
        let config = PostgresConfig {
            url: None,
            host: None,
            ..PostgresConfig::from_url("")
        };
        assert!(connect_options(&config).is_err());
    }
}
