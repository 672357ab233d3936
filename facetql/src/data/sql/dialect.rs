//! SQL dialect trait for multi-database support

/// SQL dialect trait for generating database-specific SQL
///
/// Different databases have different syntax for:
/// - Parameter placeholders (? vs $1)
/// - Pattern matching (SIMILAR TO vs LIKE)
/// - Timestamp comparison (native vs text-stored)
pub trait SqlDialect: Send + Sync {
    /// Get the dialect name
    fn name(&self) -> &'static str;

    /// Generate a parameter placeholder for the given index (1-based)
    ///
    /// - SQLite: Always returns "?"
    /// - PostgreSQL: Returns "$1", "$2", etc.
    fn placeholder(&self, index: usize) -> String;

    /// Operator used by search clauses, without negation
    ///
    /// - PostgreSQL: `SIMILAR TO`
    /// - SQLite: `LIKE` (no SIMILAR TO support; same `%`/`_` wildcards)
    fn pattern_match_op(&self) -> &'static str;

    /// Wrap a column or placeholder so timestamps compare chronologically
    ///
    /// SQLite stores timestamps as text in more than one layout
    /// (`2024-01-01 12:00:00`, `2024-01-01T12:00:00+00:00`), so both sides go
    /// through `julianday()`. PostgreSQL compares native timestamps as-is.
    fn timestamp_expr(&self, expr: &str) -> String {
        expr.to_string()
    }
}
