//! Typed match clauses
//!
//! A [`Filter`] flattened into one ordered list. Stage order is fixed
//! (equality, boolean, date range, numeric range, search) and fields are
//! lexicographic inside each stage. Entries that constrain nothing are dropped
//! here so the compiler never sees them.

use super::types::{DateRangeMatcher, Filter, Matcher, RangeMatcher};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Clause<'a> {
    /// `field [NOT] IN (...)`, from `props` and `lists`
    Equality { field: &'a str, matcher: &'a Matcher },
    /// `field = value`
    Boolean { field: &'a str, value: bool },
    /// `(field [NOT] BETWEEN from AND to)` over timestamps
    DateRange {
        field: &'a str,
        matcher: &'a DateRangeMatcher,
    },
    /// `(field [NOT] BETWEEN from AND to)` over numbers
    NumRange {
        field: &'a str,
        matcher: &'a RangeMatcher,
    },
    /// `(field [NOT] <pattern op> p OR ...)`
    Search { field: &'a str, matcher: &'a Matcher },
}

impl<'a> Clause<'a> {
    pub fn field(&self) -> &'a str {
        match self {
            Clause::Equality { field, .. }
            | Clause::Boolean { field, .. }
            | Clause::DateRange { field, .. }
            | Clause::NumRange { field, .. }
            | Clause::Search { field, .. } => field,
        }
    }

    /// Number of placeholders this clause binds
    pub fn arg_count(&self) -> usize {
        match self {
            Clause::Equality { matcher, .. } | Clause::Search { matcher, .. } => {
                matcher.fields.len()
            }
            Clause::Boolean { .. } => 1,
            Clause::DateRange { .. } | Clause::NumRange { .. } => 2,
        }
    }
}

impl Filter {
    /// The filter as an ordered clause list
    pub fn clauses(&self) -> Vec<Clause<'_>> {
        let equality = self
            .props
            .iter()
            .chain(self.lists.iter())
            .filter(|(_, m)| !m.is_empty())
            .map(|(field, matcher)| Clause::Equality { field, matcher });

        let bools = self.bools.iter().filter_map(|(field, value)| {
            value.map(|value| Clause::Boolean { field, value })
        });

        let dates = self
            .dates
            .iter()
            .map(|(field, matcher)| Clause::DateRange { field, matcher });

        let ranges = self
            .ranges
            .iter()
            .map(|(field, matcher)| Clause::NumRange { field, matcher });

        let searches = self
            .searches
            .iter()
            .filter(|(_, m)| !m.is_empty())
            .map(|(field, matcher)| Clause::Search { field, matcher });

        equality
            .chain(bools)
            .chain(dates)
            .chain(ranges)
            .chain(searches)
            .collect()
    }
}
