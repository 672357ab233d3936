//! Core application

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use serde::Serialize;
use serde_json::json;
use tokio_util::sync::CancellationToken;

use crate::core::cli::{self, Commands};
use crate::core::config::AppConfig;
use crate::core::constants::{APP_NAME_LOWER, ENV_LOG};
use crate::data::filters::{CommonParams, Filter, compile_params, parse_filter, parse_params};
use crate::data::sql::Backend;
use crate::data::{DataService, GenericStore, Record, Value};

pub struct CoreApp {
    pub config: AppConfig,
    pub database: DataService,
    pub store: GenericStore,
    pub shutdown: CancellationToken,
}

impl CoreApp {
    /// Run the application with CLI argument parsing
    pub async fn run() -> Result<()> {
        dotenvy::dotenv().ok();
        Self::init_logging();

        tracing::debug!("Application starting");

        let (cli_config, command) = cli::parse();
        tracing::trace!(command = ?command, "Parsed command");

        let config = AppConfig::load(&cli_config)?;

        match command {
            Commands::Compile {
                data_type,
                params,
                dialect,
            } => {
                let output = compile_statement(&config, &data_type, params.as_deref(), dialect)?;
                print_json(&output)
            }
            Commands::Types => print_json(&config.registry),
            command => {
                let app = Self::init(config).await?;
                let result = app.execute(command).await;
                app.database.close().await;
                result
            }
        }
    }

    async fn init(config: AppConfig) -> Result<Self> {
        let database = DataService::init(&config.database)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to initialize database: {}", e))?;
        tracing::debug!(backend = %database.backend(), "Database initialized");

        let shutdown = CancellationToken::new();
        Self::install_signal_handler(shutdown.clone());

        let store = GenericStore::new(database.executor(), Arc::new(config.registry.clone()))
            .with_timeout(Duration::from_secs(config.database.query_timeout_secs))
            .with_cancellation(shutdown.clone());

        Ok(Self {
            config,
            database,
            store,
            shutdown,
        })
    }

    fn init_logging() {
        let default_filter = format!("warn,{}=info", APP_NAME_LOWER);

        let filter = std::env::var(ENV_LOG)
            .or_else(|_| std::env::var("RUST_LOG"))
            .unwrap_or(default_filter);

        // stdout carries command output
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_thread_ids(false)
            .with_level(true)
            .with_ansi(true)
            .compact()
            .with_env_filter(filter)
            .init();
    }

    fn install_signal_handler(token: CancellationToken) {
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupt received, cancelling in-flight query");
                token.cancel();
            }
        });
    }

    async fn execute(&self, command: Commands) -> Result<()> {
        match command {
            Commands::Count { data_type, filter } => {
                let filter = parse_filter_arg(filter.as_deref())?;
                let count = self.store.count(&data_type, filter.as_ref()).await?;
                print_json(&json!({ "count": count }))
            }
            Commands::Get { data_type, params } => {
                let params = parse_params_arg(params.as_deref())?;
                let rows = self.store.get(&data_type, &params).await?;
                print_json(&rows.iter().map(Record::to_json).collect::<Vec<_>>())
            }
            Commands::GetOne {
                data_type,
                key_field,
                key,
            } => {
                let key_field = self.key_field(&data_type, key_field)?;
                let row = self
                    .store
                    .get_one(&data_type, &key_field, parse_key(&key))
                    .await?;
                print_json(&row.map(|r| r.to_json()))
            }
            Commands::Exists {
                data_type,
                key_field,
                key,
            } => {
                let key_field = self.key_field(&data_type, key_field)?;
                let exists = self
                    .store
                    .exists(&data_type, &key_field, parse_key(&key))
                    .await?;
                print_json(&json!({ "exists": exists }))
            }
            Commands::Delete {
                data_type,
                key_field,
                keys,
            } => {
                let key_field = self.key_field(&data_type, key_field)?;
                let keys: Vec<Value> = keys.iter().map(|k| parse_key(k)).collect();
                let deleted = self.store.delete(&data_type, &key_field, &keys).await?;
                tracing::info!(data_type = %data_type, deleted, "Rows deleted");
                print_json(&json!({ "deleted": deleted }))
            }
            Commands::Facets { data_type, filter } => {
                let filter = parse_filter_arg(filter.as_deref())?;
                let values = self.store.filter_values(&data_type, filter.as_ref()).await?;
                print_json(&values)
            }
            other => anyhow::bail!("{:?} does not run against the database", other),
        }
    }

    /// Explicit `--key-field`, or the registered key of the data type
    fn key_field(&self, data_type: &str, key_field: Option<String>) -> Result<String> {
        match key_field {
            Some(field) => Ok(field),
            None => Ok(self.config.registry.get(data_type)?.key.clone()),
        }
    }
}

/// SQL and bound arguments for `SELECT * FROM <table>` under `params`
pub fn compile_statement(
    config: &AppConfig,
    data_type: &str,
    params: Option<&str>,
    dialect: Option<Backend>,
) -> Result<serde_json::Value> {
    let params = parse_params_arg(params)?;
    let spec = config.registry.validate_params(data_type, &params)?;
    let backend = dialect.unwrap_or(config.database.backend);
    let selector = compile_params(backend.dialect(), &params)?;
    let sql = selector.statement(&format!("SELECT * FROM {}", spec.table));

    tracing::debug!(data_type, dialect = %backend, args = selector.args.len(), "Compiled statement");
    Ok(json!({ "sql": sql, "args": selector.args }))
}

/// Numeric keys bind as integers, anything else as text
fn parse_key(raw: &str) -> Value {
    raw.parse::<i64>()
        .map(Value::Int)
        .unwrap_or_else(|_| Value::Text(raw.to_string()))
}

fn parse_filter_arg(raw: Option<&str>) -> Result<Option<Filter>> {
    Ok(raw.map(parse_filter).transpose()?)
}

fn parse_params_arg(raw: Option<&str>) -> Result<CommonParams> {
    match raw {
        Some(raw) => Ok(parse_params(raw)?),
        None => Ok(CommonParams::default()),
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
