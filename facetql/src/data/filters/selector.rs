//! Selector compiler
//!
//! Turns a [`Filter`] or [`CommonParams`] into a parameterized predicate and a
//! positional argument list. Values are only ever bound, never interpolated.
//! Field names and the sort column are embedded as-is, so callers validate
//! them against the type registry first.

use super::clause::Clause;
use super::error::FilterError;
use super::types::{CommonParams, Filter, Matcher};
use crate::data::sql::SqlDialect;
use crate::data::types::Value;

/// Compiled predicate plus trailing ORDER BY / LIMIT fragment
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selector {
    /// Conditions joined with `AND`, without the `WHERE` keyword
    pub predicate: String,
    /// ` ORDER BY ...` and ` LIMIT p OFFSET p`, each with a leading space
    pub suffix: String,
    pub args: Vec<Value>,
}

impl Selector {
    pub fn is_empty(&self) -> bool {
        self.predicate.is_empty() && self.suffix.is_empty()
    }

    /// ` WHERE <predicate>` or an empty string
    pub fn where_clause(&self) -> String {
        if self.predicate.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.predicate)
        }
    }

    /// Predicate followed by the suffix
    pub fn query_fragment(&self) -> String {
        if self.predicate.is_empty() {
            self.suffix.trim_start().to_string()
        } else {
            format!("{}{}", self.predicate, self.suffix)
        }
    }

    /// Full statement for `head`, e.g. `SELECT * FROM users`
    pub fn statement(&self, head: &str) -> String {
        format!("{}{}{}", head, self.where_clause(), self.suffix)
    }
}

/// Single-use generator holding the placeholder counter and argument list
pub struct SelectorGenerator<'d> {
    dialect: &'d dyn SqlDialect,
    placeholders: usize,
    args: Vec<Value>,
}

impl<'d> SelectorGenerator<'d> {
    pub fn new(dialect: &'d dyn SqlDialect) -> Self {
        Self {
            dialect,
            placeholders: 0,
            args: Vec::new(),
        }
    }

    /// Compile a filter without pagination or sorting
    pub fn compile(mut self, filter: Option<&Filter>) -> Selector {
        let predicate = self.predicate(filter);
        self.finish(predicate, String::new())
    }

    /// Compile a filter followed by ORDER BY and LIMIT/OFFSET
    pub fn compile_paged(mut self, params: &CommonParams) -> Selector {
        let predicate = self.predicate(params.filter.as_ref());

        let mut suffix = String::new();
        if !params.sort.is_empty() {
            let direction = if params.sort_desc { "DESC" } else { "ASC" };
            suffix.push_str(&format!(" ORDER BY {} {}", params.sort, direction));
        }
        if params.limit() != 0 {
            let limit = self.bind(Value::Int(params.limit()));
            let offset = self.bind(Value::Int(params.offset()));
            suffix.push_str(&format!(" LIMIT {} OFFSET {}", limit, offset));
        }

        self.finish(predicate, suffix)
    }

    fn predicate(&mut self, filter: Option<&Filter>) -> String {
        let Some(filter) = filter else {
            return String::new();
        };
        filter
            .clauses()
            .iter()
            .map(|clause| self.clause(clause))
            .collect::<Vec<_>>()
            .join(" AND ")
    }

    fn clause(&mut self, clause: &Clause<'_>) -> String {
        match *clause {
            Clause::Equality { field, matcher } => {
                let not = if matcher.invert { "NOT " } else { "" };
                let list = self.bind_all(matcher).join(", ");
                format!("{} {}IN ({})", field, not, list)
            }
            Clause::Boolean { field, value } => {
                let p = self.bind(Value::Bool(value));
                format!("{} = {}", field, p)
            }
            Clause::DateRange { field, matcher } => {
                let dialect = self.dialect;
                let not = if matcher.invert { "NOT " } else { "" };
                let from = self.bind(Value::Timestamp(matcher.range.from));
                let to = self.bind(Value::Timestamp(matcher.range.to));
                format!(
                    "({} {}BETWEEN {} AND {})",
                    dialect.timestamp_expr(field),
                    not,
                    dialect.timestamp_expr(&from),
                    dialect.timestamp_expr(&to)
                )
            }
            Clause::NumRange { field, matcher } => {
                let not = if matcher.invert { "NOT " } else { "" };
                let from = self.bind(Value::Float(matcher.range.from));
                let to = self.bind(Value::Float(matcher.range.to));
                format!("({} {}BETWEEN {} AND {})", field, not, from, to)
            }
            Clause::Search { field, matcher } => {
                let op = self.dialect.pattern_match_op();
                let not = if matcher.invert { "NOT " } else { "" };
                let alternatives = self
                    .bind_all(matcher)
                    .into_iter()
                    .map(|p| format!("{} {}{} {}", field, not, op, p))
                    .collect::<Vec<_>>();
                format!("({})", alternatives.join(" OR "))
            }
        }
    }

    fn bind_all(&mut self, matcher: &Matcher) -> Vec<String> {
        matcher
            .fields
            .iter()
            .map(|value| self.bind(value.clone()))
            .collect()
    }

    fn bind(&mut self, value: Value) -> String {
        self.placeholders += 1;
        self.args.push(value);
        self.dialect.placeholder(self.placeholders)
    }

    fn finish(self, predicate: String, suffix: String) -> Selector {
        assert_eq!(
            self.placeholders,
            self.args.len(),
            "placeholder count does not match bound arguments"
        );
        Selector {
            predicate,
            suffix,
            args: self.args,
        }
    }
}

/// Validate and compile a filter. `None` yields an empty selector.
pub fn compile_filter(
    dialect: &dyn SqlDialect,
    filter: Option<&Filter>,
) -> Result<Selector, FilterError> {
    if let Some(filter) = filter {
        filter.validate()?;
    }
    Ok(SelectorGenerator::new(dialect).compile(filter))
}

/// Validate and compile list parameters
pub fn compile_params(
    dialect: &dyn SqlDialect,
    params: &CommonParams,
) -> Result<Selector, FilterError> {
    params.validate()?;
    Ok(SelectorGenerator::new(dialect).compile_paged(params))
}
