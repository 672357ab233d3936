//! Structured filters compiled into parameterized SQL, with facet resolution
//! and a generic access layer over SQLite and PostgreSQL.

pub mod app;
pub mod core;
pub mod data;
pub mod utils;
