//! Filter facet resolution
//!
//! Computes what a filter UI can offer for each declared field: distinct
//! values for `Prop`/`Array` fields and observed extremes for range fields,
//! optionally scoped by a filter that is already applied.

use crate::data::error::DataError;
use crate::data::filters::{
    DateRange, Filter, FilterSpec, FilterType, FilterValues, NumberRange, Selector,
    compile_filter,
};
use crate::data::traits::QueryExecutor;
use crate::data::types::{Record, Value};

/// Resolve facet values for `specs` against `table`
///
/// `Boolean`, `Search` and `Constant` specs are skipped. NULLs never appear in
/// distinct values, and a field whose extremes are NULL (no rows in scope)
/// gets no range entry. The first failing query aborts the whole resolution.
pub async fn filter_values(
    executor: &dyn QueryExecutor,
    table: &str,
    specs: &[FilterSpec],
    filter: Option<&Filter>,
) -> Result<FilterValues, DataError> {
    let scope = match filter {
        Some(filter) if filter.is_valid() => compile_filter(executor.dialect(), Some(filter))?,
        _ => Selector::default(),
    };

    tracing::debug!(
        table,
        specs = specs.len(),
        scoped = !scope.predicate.is_empty(),
        "Resolving filter values"
    );

    let mut values = FilterValues::new();
    for spec in specs {
        let field = spec.field.as_str();
        let on_error = |e| DataError::facet(field, table, e);

        match spec.filter_type {
            FilterType::Prop | FilterType::Array => {
                let sql = format!(
                    "SELECT DISTINCT {field} FROM {table}{} ORDER BY {field}",
                    scope.where_clause()
                );
                let rows = executor
                    .fetch_all(&sql, &scope.args)
                    .await
                    .map_err(on_error)?;
                let distinct = rows
                    .into_iter()
                    .filter_map(|row| row.into_values().into_iter().next())
                    .filter(|v| !v.is_null())
                    .collect();
                values.values.insert(spec.field.clone(), distinct);
            }
            FilterType::DateRange => {
                let Some((from, to)) = extremes(executor, table, field, &scope)
                    .await
                    .map_err(on_error)?
                else {
                    continue;
                };
                let (Some(from), Some(to)) = (from.as_timestamp(), to.as_timestamp()) else {
                    return Err(on_error(DataError::Decode(format!(
                        "extremes of '{}' are not timestamps: {} / {}",
                        field, from, to
                    ))));
                };
                values
                    .dates
                    .insert(spec.field.clone(), DateRange { from, to });
            }
            FilterType::NumRange => {
                let Some((from, to)) = extremes(executor, table, field, &scope)
                    .await
                    .map_err(on_error)?
                else {
                    continue;
                };
                let (Some(from), Some(to)) = (from.as_f64(), to.as_f64()) else {
                    return Err(on_error(DataError::Decode(format!(
                        "extremes of '{}' are not numeric: {} / {}",
                        field, from, to
                    ))));
                };
                values
                    .ranges
                    .insert(spec.field.clone(), NumberRange { from, to });
            }
            FilterType::Boolean | FilterType::Search | FilterType::Constant => {}
        }
    }

    Ok(values)
}

/// `MIN`/`MAX` of a field, or `None` when nothing is in scope
async fn extremes(
    executor: &dyn QueryExecutor,
    table: &str,
    field: &str,
    scope: &Selector,
) -> Result<Option<(Value, Value)>, DataError> {
    let sql = format!(
        "SELECT MIN({field}) AS _from, MAX({field}) AS _to FROM {table}{}",
        scope.where_clause()
    );
    let rows = executor.fetch_all(&sql, &scope.args).await?;
    let Some(row) = rows.into_iter().next() else {
        return Ok(None);
    };
    Ok(bounds(row))
}

fn bounds(row: Record) -> Option<(Value, Value)> {
    let mut values = row.into_values().into_iter();
    match (values.next(), values.next()) {
        (Some(from), Some(to)) if !from.is_null() && !to.is_null() => Some((from, to)),
        _ => None,
    }
}
