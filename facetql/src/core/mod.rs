//! Core application infrastructure

pub mod cli;
pub mod config;
pub mod constants;

pub use crate::app::CoreApp;
pub use cli::{CliConfig, Commands};
pub use config::AppConfig;

// Re-export the service enum for embedders that manage their own lifecycle
pub use crate::data::DataService;
