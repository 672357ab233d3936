use clap::{Parser, Subcommand};

use std::path::PathBuf;

use super::constants::{ENV_BACKEND, ENV_CONFIG, ENV_POSTGRES_URL, ENV_SQLITE_PATH};
use crate::data::sql::Backend;

#[derive(Parser)]
#[command(name = "facetql")]
#[command(version, about = "Compile structured filters into SQL and query facets", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to config file
    #[arg(long, short = 'c', global = true, env = ENV_CONFIG)]
    pub config: Option<PathBuf>,

    /// Database backend (sqlite or postgres)
    #[arg(long, global = true, env = ENV_BACKEND, value_parser = parse_backend)]
    pub backend: Option<Backend>,

    /// PostgreSQL connection URL (when using postgres backend)
    #[arg(long, global = true, env = ENV_POSTGRES_URL)]
    pub postgres_url: Option<String>,

    /// SQLite database path, or :memory: (when using sqlite backend)
    #[arg(long, global = true, env = ENV_SQLITE_PATH)]
    pub sqlite_path: Option<String>,

    /// Per-query timeout in seconds (0 = disabled)
    #[arg(long, global = true)]
    pub query_timeout: Option<u64>,
}

/// Parse database backend from CLI/env string
pub(crate) fn parse_backend(s: &str) -> Result<Backend, String> {
    match s.to_lowercase().as_str() {
        "sqlite" => Ok(Backend::Sqlite),
        "postgres" | "postgresql" => Ok(Backend::Postgres),
        _ => Err(format!(
            "Invalid backend '{}'. Valid options: sqlite, postgres",
            s
        )),
    }
}

#[derive(Subcommand, Clone, Debug)]
pub enum Commands {
    /// Compile list parameters to SQL without connecting (prints JSON)
    Compile {
        /// Registered data type
        #[arg(long = "type", short = 't')]
        data_type: String,
        /// CommonParams JSON (filter, page, pageSize, sort, sortDesc)
        #[arg(long)]
        params: Option<String>,
        /// Placeholder dialect (defaults to the configured backend)
        #[arg(long, value_parser = parse_backend)]
        dialect: Option<Backend>,
    },
    /// Count rows matching a filter
    Count {
        #[arg(long = "type", short = 't')]
        data_type: String,
        /// Filter JSON
        #[arg(long)]
        filter: Option<String>,
    },
    /// List rows matching list parameters
    Get {
        #[arg(long = "type", short = 't')]
        data_type: String,
        /// CommonParams JSON
        #[arg(long)]
        params: Option<String>,
    },
    /// Fetch a single row by key
    GetOne {
        #[arg(long = "type", short = 't')]
        data_type: String,
        /// Key column (defaults to the registered key)
        #[arg(long)]
        key_field: Option<String>,
        #[arg(long)]
        key: String,
    },
    /// Check whether a row with the given key exists
    Exists {
        #[arg(long = "type", short = 't')]
        data_type: String,
        #[arg(long)]
        key_field: Option<String>,
        #[arg(long)]
        key: String,
    },
    /// Delete rows by key
    Delete {
        #[arg(long = "type", short = 't')]
        data_type: String,
        #[arg(long)]
        key_field: Option<String>,
        #[arg(required = true)]
        keys: Vec<String>,
    },
    /// Compute distinct values and ranges for the registered filters
    Facets {
        #[arg(long = "type", short = 't')]
        data_type: String,
        #[arg(long)]
        filter: Option<String>,
    },
    /// List registered data types
    Types,
}

/// Configuration derived from CLI arguments
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub config: Option<PathBuf>,
    pub backend: Option<Backend>,
    pub postgres_url: Option<String>,
    pub sqlite_path: Option<String>,
    pub query_timeout: Option<u64>,
}

/// Parse CLI arguments and return config with command
pub fn parse() -> (CliConfig, Commands) {
    let cli = Cli::parse();
    let config = CliConfig {
        config: cli.config,
        backend: cli.backend,
        postgres_url: cli.postgres_url,
        sqlite_path: cli.sqlite_path,
        query_timeout: cli.query_timeout,
    };
    (config, cli.command)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_backend() {
        assert_eq!(parse_backend("sqlite"), Ok(Backend::Sqlite));
        assert_eq!(parse_backend("PostgreSQL"), Ok(Backend::Postgres));
        assert!(parse_backend("duckdb").is_err());
    }

    #[test]
    fn test_parse_delete_command() {
        let cli = Cli::try_parse_from([
            "facetql",
            "--backend",
            "sqlite",
            "delete",
            "--type",
            "users",
            "1",
            "2",
        ])
        .unwrap();
        assert_eq!(cli.backend, Some(Backend::Sqlite));
        match cli.command {
            Commands::Delete {
                data_type, keys, ..
            } => {
                assert_eq!(data_type, "users");
                assert_eq!(keys, vec!["1", "2"]);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_global_flag_after_command() {
        let cli = Cli::try_parse_from([
            "facetql",
            "compile",
            "-t",
            "users",
            "--dialect",
            "postgres",
            "--query-timeout",
            "5",
        ])
        .unwrap();
        assert_eq!(cli.query_timeout, Some(5));
        assert!(matches!(
            cli.command,
            Commands::Compile {
                dialect: Some(Backend::Postgres),
                ..
            }
        ));
    }

    #[test]
    fn test_delete_requires_keys() {
        assert!(Cli::try_parse_from(["facetql", "delete", "--type", "users"]).is_err());
    }
}
