// =============================================================================
// Application Identity
// =============================================================================

/// Application name in lowercase (for paths and identifiers)
pub const APP_NAME_LOWER: &str = "facetql";

/// Unix-style dotfile folder name
pub const APP_DOT_FOLDER: &str = ".facetql";

// =============================================================================
// Configuration Files
// =============================================================================

/// Config file name
pub const CONFIG_FILE_NAME: &str = "facetql.json";

/// Environment variable for config file path
pub const ENV_CONFIG: &str = "FACETQL_CONFIG";

// =============================================================================
// Environment Variables - Logging
// =============================================================================

/// Environment variable for log level/filter
pub const ENV_LOG: &str = "FACETQL_LOG";

// =============================================================================
// Environment Variables - Database
// =============================================================================

/// Environment variable for database backend (sqlite or postgres)
pub const ENV_BACKEND: &str = "FACETQL_BACKEND";

/// Environment variable for PostgreSQL connection URL
pub const ENV_POSTGRES_URL: &str = "FACETQL_POSTGRES_URL";

/// Environment variable for SQLite database path
pub const ENV_SQLITE_PATH: &str = "FACETQL_SQLITE_PATH";

// =============================================================================
// SQLite
// =============================================================================

/// Path value selecting an in-memory database
pub const SQLITE_MEMORY_PATH: &str = ":memory:";

/// Maximum pooled connections for file-backed databases
pub const SQLITE_MAX_CONNECTIONS: u32 = 5;

/// Busy timeout in seconds
pub const SQLITE_BUSY_TIMEOUT_SECS: u64 = 30;

// =============================================================================
// PostgreSQL
// =============================================================================

pub const POSTGRES_DEFAULT_PORT: u16 = 5432;

pub const POSTGRES_DEFAULT_TIMEZONE: &str = "UTC";

pub const POSTGRES_DEFAULT_MAX_CONNECTIONS: u32 = 20;

pub const POSTGRES_DEFAULT_MIN_CONNECTIONS: u32 = 2;

pub const POSTGRES_DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 30;

pub const POSTGRES_DEFAULT_IDLE_TIMEOUT_SECS: u64 = 600;

pub const POSTGRES_DEFAULT_MAX_LIFETIME_SECS: u64 = 1800;

/// Server-side statement timeout (0 = disabled)
pub const POSTGRES_DEFAULT_STATEMENT_TIMEOUT_SECS: u64 = 60;

// =============================================================================
// Queries
// =============================================================================

/// Client-side per-query timeout applied by the access layer (0 = disabled)
pub const DEFAULT_QUERY_TIMEOUT_SECS: u64 = 0;
