//! PostgreSQL SQL dialect implementation

use super::SqlDialect;

/// PostgreSQL SQL dialect
pub struct PostgresDialect;

impl SqlDialect for PostgresDialect {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn placeholder(&self, index: usize) -> String {
        format!("${}", index)
    }

    fn pattern_match_op(&self) -> &'static str {
        "SIMILAR TO"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder() {
        let dialect = PostgresDialect;
        assert_eq!(dialect.placeholder(1), "$1");
        assert_eq!(dialect.placeholder(5), "$5");
    }

    #[test]
    fn test_pattern_match_op() {
        assert_eq!(PostgresDialect.pattern_match_op(), "SIMILAR TO");
    }

    #[test]
    fn test_timestamp_expr_is_identity() {
        assert_eq!(PostgresDialect.timestamp_expr("created"), "created");
    }
}
