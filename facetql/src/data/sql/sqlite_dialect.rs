//! SQLite SQL dialect implementation

use super::SqlDialect;

/// SQLite SQL dialect
pub struct SqliteDialect;

impl SqlDialect for SqliteDialect {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn placeholder(&self, _index: usize) -> String {
        "?".to_string()
    }

    fn pattern_match_op(&self) -> &'static str {
        "LIKE"
    }

    fn timestamp_expr(&self, expr: &str) -> String {
        format!("julianday({})", expr)
    }
}
