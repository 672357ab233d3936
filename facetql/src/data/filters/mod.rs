//! Query filter system
//!
//! Structured filters (equality sets, boolean flags, date and numeric ranges,
//! pattern searches) compiled into parameterized SQL for any registered table.
//!
//! ## Usage
//!
//! ```no_run
//! use facetql::data::filters::{compile_params, parse_params};
//! use facetql::data::sql::PostgresDialect;
//!
//! let json = r#"{"filter": {"props": {"status": {"fields": ["active"]}}}, "pageSize": 20}"#;
//! let params = parse_params(json).unwrap();
//! let selector = compile_params(&PostgresDialect, &params).unwrap();
//! let sql = selector.statement("SELECT * FROM users");
//! ```

mod clause;
mod error;
mod parser;
mod registry;
mod selector;
mod types;

pub use clause::Clause;
pub use error::FilterError;
pub use parser::{MAX_FILTER_JSON_SIZE, parse_filter, parse_params};
pub use registry::{DataTypeSpec, TypeRegistry, is_identifier, is_qualified_identifier};
pub use selector::{Selector, SelectorGenerator, compile_filter, compile_params};
pub use types::{
    CommonParams, DateRange, DateRangeMatcher, Filter, FilterSpec, FilterType, FilterValues,
    Mapping, Matcher, NumberRange, RangeMatcher,
};
