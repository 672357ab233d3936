use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::data::filters::{DataTypeSpec, TypeRegistry};
use crate::data::sql::Backend;
use crate::utils::file::expand_path;

use super::cli::CliConfig;
use super::constants::{
    APP_DOT_FOLDER, CONFIG_FILE_NAME, DEFAULT_QUERY_TIMEOUT_SECS,
    POSTGRES_DEFAULT_ACQUIRE_TIMEOUT_SECS, POSTGRES_DEFAULT_IDLE_TIMEOUT_SECS,
    POSTGRES_DEFAULT_MAX_CONNECTIONS, POSTGRES_DEFAULT_MAX_LIFETIME_SECS,
    POSTGRES_DEFAULT_MIN_CONNECTIONS, POSTGRES_DEFAULT_PORT,
    POSTGRES_DEFAULT_STATEMENT_TIMEOUT_SECS, POSTGRES_DEFAULT_TIMEZONE, SQLITE_MAX_CONNECTIONS,
    SQLITE_MEMORY_PATH,
};

// =============================================================================
// File Config (JSON)
// =============================================================================

/// SQLite configuration section (from JSON config file)
#[derive(Debug, Default, Clone, Deserialize)]
pub struct SqliteFileConfig {
    /// Database file path, or ":memory:" (default)
    pub path: Option<String>,
    /// Maximum number of pooled connections (default: 5)
    pub max_connections: Option<u32>,
}

/// PostgreSQL configuration section (from JSON config file)
///
/// Either `url`, or `host` plus the other connection parts.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct PostgresFileConfig {
    /// PostgreSQL connection URL (or use FACETQL_POSTGRES_URL env var)
    pub url: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub database: Option<String>,
    /// Session time zone (default: UTC)
    pub timezone: Option<String>,
    /// Maximum number of connections in the pool (default: 20)
    pub max_connections: Option<u32>,
    /// Minimum number of connections to keep warm (default: 2)
    pub min_connections: Option<u32>,
    /// Connection acquire timeout in seconds (default: 30)
    pub acquire_timeout_secs: Option<u64>,
    /// Idle connection timeout in seconds (default: 600)
    pub idle_timeout_secs: Option<u64>,
    /// Max connection lifetime in seconds (default: 1800)
    pub max_lifetime_secs: Option<u64>,
    /// Statement timeout in seconds, 0 to disable (default: 60)
    pub statement_timeout_secs: Option<u64>,
}

/// Database configuration section (from JSON config file)
#[derive(Debug, Default, Clone, Deserialize)]
pub struct DatabaseFileConfig {
    /// Backend: sqlite (default) or postgres
    pub backend: Option<Backend>,
    pub sqlite: Option<SqliteFileConfig>,
    pub postgres: Option<PostgresFileConfig>,
    /// Client-side per-query timeout in seconds, 0 to disable (default: 0)
    pub query_timeout_secs: Option<u64>,
}

/// File-based configuration (JSON)
#[derive(Debug, Default, Deserialize)]
pub struct FileConfig {
    pub database: Option<DatabaseFileConfig>,
    /// Registered data types by name
    pub types: Option<BTreeMap<String, DataTypeSpec>>,
    #[serde(flatten)]
    pub extra: serde_json::Value,
}

macro_rules! merge_opt {
    ($current:expr, $other:expr, $($field:ident),+ $(,)?) => {
        $(
            if $other.$field.is_some() {
                $current.$field = $other.$field;
            }
        )+
    };
}

impl FileConfig {
    /// Load configuration from a JSON file
    fn load_from_file(path: &Path) -> Result<Self> {
        tracing::debug!(path = %path.display(), "Loading config file");
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        tracing::trace!(config = ?config, "Parsed config file");
        Ok(config)
    }

    /// Warn about unknown fields in the config
    fn warn_unknown_fields(&self) {
        if let serde_json::Value::Object(map) = &self.extra
            && !map.is_empty()
        {
            let keys_str: String = map
                .keys()
                .map(|k| k.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            tracing::warn!(
                fields = %keys_str,
                "Unknown fields in config file (possible typos)"
            );
        }
    }

    /// Merge another FileConfig into this one (other takes precedence)
    fn merge(&mut self, other: FileConfig) {
        if let Some(database) = other.database {
            let current = self
                .database
                .get_or_insert_with(DatabaseFileConfig::default);
            merge_opt!(current, database, backend, query_timeout_secs);

            if let Some(sqlite) = database.sqlite {
                let current_sqlite = current.sqlite.get_or_insert_with(SqliteFileConfig::default);
                merge_opt!(current_sqlite, sqlite, path, max_connections);
            }

            if let Some(postgres) = database.postgres {
                let current_pg = current
                    .postgres
                    .get_or_insert_with(PostgresFileConfig::default);
                merge_opt!(
                    current_pg,
                    postgres,
                    url,
                    host,
                    port,
                    user,
                    password,
                    database,
                    timezone,
                    max_connections,
                    min_connections,
                    acquire_timeout_secs,
                    idle_timeout_secs,
                    max_lifetime_secs,
                    statement_timeout_secs,
                );
            }
        }

        // Types are merged per name; a later file replaces a whole registration
        if let Some(types) = other.types {
            let current = self.types.get_or_insert_with(BTreeMap::new);
            for (name, spec) in types {
                tracing::trace!(data_type = %name, "Merging type registration");
                current.insert(name, spec);
            }
        }
    }
}

// =============================================================================
// Runtime Config
// =============================================================================

/// SQLite configuration (final/runtime)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqliteConfig {
    /// Database file path or ":memory:"
    pub path: String,
    pub max_connections: u32,
}

impl SqliteConfig {
    pub fn in_memory() -> Self {
        Self {
            path: SQLITE_MEMORY_PATH.to_string(),
            max_connections: 1,
        }
    }

    pub fn is_in_memory(&self) -> bool {
        self.path.is_empty() || self.path == SQLITE_MEMORY_PATH
    }
}

/// PostgreSQL configuration (final/runtime)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostgresConfig {
    /// Connection URL; takes precedence over the individual parts
    pub url: Option<String>,
    pub host: Option<String>,
    pub port: u16,
    pub user: Option<String>,
    pub password: Option<String>,
    pub database: Option<String>,
    /// Session time zone
    pub timezone: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_secs: u64,
    pub idle_timeout_secs: u64,
    pub max_lifetime_secs: u64,
    /// Statement timeout in seconds (0 = disabled)
    pub statement_timeout_secs: u64,
}

impl PostgresConfig {
    /// Config for a connection URL with default pool settings
    pub fn from_url(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Self::from_file(PostgresFileConfig::default())
        }
    }

    fn from_file(file: PostgresFileConfig) -> Self {
        Self {
            url: file.url.filter(|u| !u.is_empty()),
            host: file.host.filter(|h| !h.is_empty()),
            port: file.port.unwrap_or(POSTGRES_DEFAULT_PORT),
            user: file.user,
            password: file.password,
            database: file.database,
            timezone: file
                .timezone
                .unwrap_or_else(|| POSTGRES_DEFAULT_TIMEZONE.to_string()),
            max_connections: file
                .max_connections
                .unwrap_or(POSTGRES_DEFAULT_MAX_CONNECTIONS),
            min_connections: file
                .min_connections
                .unwrap_or(POSTGRES_DEFAULT_MIN_CONNECTIONS),
            acquire_timeout_secs: file
                .acquire_timeout_secs
                .unwrap_or(POSTGRES_DEFAULT_ACQUIRE_TIMEOUT_SECS),
            idle_timeout_secs: file
                .idle_timeout_secs
                .unwrap_or(POSTGRES_DEFAULT_IDLE_TIMEOUT_SECS),
            max_lifetime_secs: file
                .max_lifetime_secs
                .unwrap_or(POSTGRES_DEFAULT_MAX_LIFETIME_SECS),
            statement_timeout_secs: file
                .statement_timeout_secs
                .unwrap_or(POSTGRES_DEFAULT_STATEMENT_TIMEOUT_SECS),
        }
    }
}

/// Database configuration (final/runtime)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub backend: Backend,
    pub sqlite: SqliteConfig,
    /// Only present when backend = postgres
    pub postgres: Option<PostgresConfig>,
    /// Client-side per-query timeout in seconds (0 = disabled)
    pub query_timeout_secs: u64,
}

/// Final merged application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub registry: TypeRegistry,
}

impl AppConfig {
    /// Load configuration from all sources
    ///
    /// Priority (lowest to highest):
    /// 1. Defaults
    /// 2. Profile directory config (~/.facetql/facetql.json)
    /// 3. Local directory config OR CLI-specified config path
    /// 4. CLI arguments (which include env var fallbacks via clap)
    pub fn load(cli: &CliConfig) -> Result<Self> {
        tracing::debug!("Loading application configuration");
        tracing::trace!(cli = ?cli, "CLI config");

        let mut file_config = FileConfig::default();
        let mut found_configs: Vec<String> = Vec::new();

        // 1. Load from profile dir (~/.facetql/facetql.json) - skip if not exists
        if let Some(profile_path) = get_profile_config_path()
            && profile_path.exists()
        {
            let profile_config = FileConfig::load_from_file(&profile_path)?;
            profile_config.warn_unknown_fields();
            file_config.merge(profile_config);
            found_configs.push(profile_path.display().to_string());
        }

        // 2. Load from CLI-specified path OR local directory
        let overlay_path = if let Some(ref path) = cli.config {
            let expanded = expand_path(&path.to_string_lossy());
            if !expanded.exists() {
                anyhow::bail!("Config file not found: {}", expanded.display());
            }
            Some(expanded)
        } else {
            let local = PathBuf::from(CONFIG_FILE_NAME);
            if local.exists() { Some(local) } else { None }
        };

        if let Some(path) = overlay_path {
            let overlay_config = FileConfig::load_from_file(&path)?;
            overlay_config.warn_unknown_fields();
            file_config.merge(overlay_config);
            found_configs.push(path.display().to_string());
        }

        tracing::debug!(configs = ?found_configs, "Config files loaded");

        Self::from_sources(file_config, cli)
    }

    /// Layer defaults, merged file config and CLI/env overrides
    fn from_sources(file_config: FileConfig, cli: &CliConfig) -> Result<Self> {
        let file_database = file_config.database.unwrap_or_default();
        let file_sqlite = file_database.sqlite.unwrap_or_default();

        let backend = cli.backend.or(file_database.backend).unwrap_or_default();

        let sqlite_path = cli
            .sqlite_path
            .clone()
            .or(file_sqlite.path)
            .unwrap_or_else(|| SQLITE_MEMORY_PATH.to_string());
        let sqlite = if sqlite_path.is_empty() || sqlite_path == SQLITE_MEMORY_PATH {
            SqliteConfig::in_memory()
        } else {
            SqliteConfig {
                path: sqlite_path,
                max_connections: file_sqlite
                    .max_connections
                    .unwrap_or(SQLITE_MAX_CONNECTIONS),
            }
        };

        let postgres = match backend {
            Backend::Postgres => {
                let mut pg = PostgresConfig::from_file(file_database.postgres.unwrap_or_default());
                if let Some(url) = cli.postgres_url.clone().filter(|u| !u.is_empty()) {
                    pg.url = Some(url);
                }
                Some(pg)
            }
            Backend::Sqlite => None,
        };

        let query_timeout_secs = cli
            .query_timeout
            .or(file_database.query_timeout_secs)
            .unwrap_or(DEFAULT_QUERY_TIMEOUT_SECS);

        let registry = TypeRegistry::from_specs(file_config.types.unwrap_or_default())
            .map_err(|e| anyhow::anyhow!("Invalid type registration in config: {}", e))?;

        let config = Self {
            database: DatabaseConfig {
                backend,
                sqlite,
                postgres,
                query_timeout_secs,
            },
            registry,
        };
        config.validate()?;

        tracing::debug!(
            backend = %config.database.backend,
            types = config.registry.len(),
            query_timeout_secs,
            "Configuration loaded"
        );
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if let Some(pg) = &self.database.postgres {
            if pg.url.is_none() && pg.host.is_none() {
                anyhow::bail!(
                    "PostgreSQL backend requires database.postgres.url, database.postgres.host \
                     or --postgres-url"
                );
            }
            if pg.min_connections > pg.max_connections {
                anyhow::bail!(
                    "database.postgres.min_connections ({}) exceeds max_connections ({})",
                    pg.min_connections,
                    pg.max_connections
                );
            }
        }
        if self.database.sqlite.max_connections == 0 {
            anyhow::bail!("database.sqlite.max_connections must be at least 1");
        }
        Ok(())
    }
}

fn get_profile_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(APP_DOT_FOLDER).join(CONFIG_FILE_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::filters::FilterType;
    use std::io::Write;

    fn parse(json: &str) -> FileConfig {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_file_config_parse_full() {
        let config = parse(
            r#"{
                "database": {
                    "backend": "postgres",
                    "postgres": {"url": "postgres://localhost/app", "timezone": "Europe/Berlin"},
                    "query_timeout_secs": 10
                },
                "types": {
                    "users": {
                        "table": "users",
                        "key": "id",
                        "filters": [{"field": "age", "name": "Age", "type": "NumRange"}]
                    }
                }
            }"#,
        );
        let database = config.database.unwrap();
        assert_eq!(database.backend, Some(Backend::Postgres));
        assert_eq!(database.query_timeout_secs, Some(10));
        let pg = database.postgres.unwrap();
        assert_eq!(pg.url.as_deref(), Some("postgres://localhost/app"));
        assert_eq!(pg.timezone.as_deref(), Some("Europe/Berlin"));

        let types = config.types.unwrap();
        assert_eq!(types["users"].filters[0].filter_type, FilterType::NumRange);
    }

    #[test]
    fn test_file_config_parse_empty() {
        let config = parse("{}");
        assert!(config.database.is_none());
        assert!(config.types.is_none());
    }

    #[test]
    fn test_file_config_parse_extra_fields() {
        let config = parse(r#"{"databse": {}}"#);
        let serde_json::Value::Object(map) = &config.extra else {
            panic!("extra should be an object");
        };
        assert!(map.contains_key("databse"));
    }

    #[test]
    fn test_merge_overrides_fields_and_types() {
        let mut base = parse(
            r#"{
                "database": {"backend": "postgres", "postgres": {"host": "db", "port": 6543}},
                "types": {
                    "users": {"table": "users", "key": "id"},
                    "orders": {"table": "orders", "key": "id"}
                }
            }"#,
        );
        let overlay = parse(
            r#"{
                "database": {"postgres": {"port": 5433, "user": "app"}},
                "types": {"users": {"table": "app_users", "key": "uid"}}
            }"#,
        );
        base.merge(overlay);

        let database = base.database.unwrap();
        assert_eq!(database.backend, Some(Backend::Postgres));
        let pg = database.postgres.unwrap();
        assert_eq!(pg.host.as_deref(), Some("db"));
        assert_eq!(pg.port, Some(5433));
        assert_eq!(pg.user.as_deref(), Some("app"));

        let types = base.types.unwrap();
        assert_eq!(types["users"].table, "app_users");
        assert_eq!(types["orders"].table, "orders");
    }

    #[test]
    fn test_defaults_to_in_memory_sqlite() {
        let config = AppConfig::from_sources(FileConfig::default(), &CliConfig::default()).unwrap();
        assert_eq!(config.database.backend, Backend::Sqlite);
        assert!(config.database.sqlite.is_in_memory());
        assert_eq!(config.database.sqlite.max_connections, 1);
        assert!(config.database.postgres.is_none());
        assert_eq!(config.database.query_timeout_secs, DEFAULT_QUERY_TIMEOUT_SECS);
        assert!(config.registry.is_empty());
    }

    #[test]
    fn test_cli_overrides_file() {
        let file = parse(
            r#"{"database": {"backend": "sqlite", "sqlite": {"path": "file.db"}, "query_timeout_secs": 3}}"#,
        );
        let cli = CliConfig {
            backend: Some(Backend::Postgres),
            postgres_url: Some("postgres://cli/db".to_string()),
            query_timeout: Some(9),
            ..CliConfig::default()
        };
        let config = AppConfig::from_sources(file, &cli).unwrap();
        assert_eq!(config.database.backend, Backend::Postgres);
        assert_eq!(config.database.sqlite.path, "file.db");
        assert_eq!(config.database.query_timeout_secs, 9);

        let pg = config.database.postgres.unwrap();
        assert_eq!(pg.url.as_deref(), Some("postgres://cli/db"));
        assert_eq!(pg.max_connections, POSTGRES_DEFAULT_MAX_CONNECTIONS);
        assert_eq!(pg.timezone, POSTGRES_DEFAULT_TIMEZONE);
    }

    #[test]
    fn test_postgres_requires_connection_info() {
        let cli = CliConfig {
            backend: Some(Backend::Postgres),
            ..CliConfig::default()
        };
        let err = AppConfig::from_sources(FileConfig::default(), &cli).unwrap_err();
        assert!(err.to_string().contains("PostgreSQL backend requires"));
    }

    #[test]
    fn test_invalid_type_registration_fails() {
        let file = parse(r#"{"types": {"users": {"table": "users; --", "key": "id"}}}"#);
        assert!(AppConfig::from_sources(file, &CliConfig::default()).is_err());
    }

    #[test]
    fn test_load_from_cli_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "database": {{"sqlite": {{"path": ":memory:"}}}},
                "types": {{"users": {{"table": "users", "key": "id", "sortable": ["name"]}}}}
            }}"#
        )
        .unwrap();

        let cli = CliConfig {
            config: Some(file.path().to_path_buf()),
            backend: Some(Backend::Sqlite),
            ..CliConfig::default()
        };
        let config = AppConfig::load(&cli).unwrap();
        assert!(config.registry.get("users").unwrap().is_sortable("name"));
    }

    #[test]
    fn test_load_missing_cli_path_fails() {
        let cli = CliConfig {
            config: Some(PathBuf::from("/nonexistent/facetql.json")),
            ..CliConfig::default()
        };
        let err = AppConfig::load(&cli).unwrap_err();
        assert!(err.to_string().contains("Config file not found"));
    }
}
