//! Data type registry
//!
//! Per data type: table, key field, filterable fields with their kinds and
//! sortable fields. Every identifier that the compiler embeds into SQL text
//! passes through here first.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::error::FilterError;
use super::types::{CommonParams, Filter, FilterSpec};

/// Registration of one data type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataTypeSpec {
    pub table: String,
    pub key: String,
    #[serde(default)]
    pub filters: Vec<FilterSpec>,
    #[serde(default)]
    pub sortable: Vec<String>,
}

impl DataTypeSpec {
    pub fn new(table: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            key: key.into(),
            filters: Vec::new(),
            sortable: Vec::new(),
        }
    }

    pub fn with_filter(mut self, spec: FilterSpec) -> Self {
        self.filters.push(spec);
        self
    }

    pub fn with_sortable(mut self, field: impl Into<String>) -> Self {
        self.sortable.push(field.into());
        self
    }

    pub fn filter_spec(&self, field: &str) -> Option<&FilterSpec> {
        self.filters.iter().find(|s| s.field == field)
    }

    pub fn is_sortable(&self, field: &str) -> bool {
        self.sortable.iter().any(|s| s == field)
    }

    fn knows_field(&self, field: &str) -> bool {
        self.key == field || self.filter_spec(field).is_some() || self.is_sortable(field)
    }
}

/// `[A-Za-z_][A-Za-z0-9_]*`
pub fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Identifier optionally qualified by one schema, e.g. `public.users`
pub fn is_qualified_identifier(s: &str) -> bool {
    match s.split_once('.') {
        Some((schema, name)) => is_identifier(schema) && is_identifier(name),
        None => is_identifier(s),
    }
}

fn check_identifier(s: &str) -> Result<(), FilterError> {
    if is_identifier(s) {
        Ok(())
    } else {
        Err(FilterError::InvalidIdentifier(s.to_string()))
    }
}

/// Registered data types by name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct TypeRegistry {
    types: BTreeMap<String, DataTypeSpec>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from a name → spec map, validating every entry
    pub fn from_specs(specs: BTreeMap<String, DataTypeSpec>) -> Result<Self, FilterError> {
        let mut registry = Self::new();
        for (name, spec) in specs {
            registry.register(name, spec)?;
        }
        Ok(registry)
    }

    /// Register (or replace) a data type
    pub fn register(
        &mut self,
        name: impl Into<String>,
        spec: DataTypeSpec,
    ) -> Result<(), FilterError> {
        let name = name.into();
        check_identifier(&name)?;
        if !is_qualified_identifier(&spec.table) {
            return Err(FilterError::InvalidIdentifier(spec.table.clone()));
        }
        check_identifier(&spec.key)?;
        for filter in &spec.filters {
            check_identifier(&filter.field)?;
        }
        for field in &spec.sortable {
            check_identifier(field)?;
        }

        tracing::debug!(
            data_type = %name,
            table = %spec.table,
            filters = spec.filters.len(),
            "Registered data type"
        );
        self.types.insert(name, spec);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<&DataTypeSpec, FilterError> {
        self.types
            .get(name)
            .ok_or_else(|| FilterError::UnknownDataType(name.to_string()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Check every field of `filter` is declared with a kind its mapping accepts
    pub fn validate_filter(&self, name: &str, filter: &Filter) -> Result<&DataTypeSpec, FilterError> {
        let spec = self.get(name)?;
        for (mapping, field) in filter.fields() {
            let Some(declared) = spec.filter_spec(field) else {
                return Err(FilterError::UnknownField {
                    data_type: name.to_string(),
                    field: field.to_string(),
                });
            };
            if !mapping.accepts(declared.filter_type) {
                return Err(FilterError::KindMismatch {
                    data_type: name.to_string(),
                    field: field.to_string(),
                    mapping: mapping.name(),
                    declared: declared.filter_type,
                });
            }
        }
        filter.validate()?;
        Ok(spec)
    }

    /// Validate the filter, the sort column and pagination
    pub fn validate_params(
        &self,
        name: &str,
        params: &CommonParams,
    ) -> Result<&DataTypeSpec, FilterError> {
        let spec = match &params.filter {
            Some(filter) => self.validate_filter(name, filter)?,
            None => self.get(name)?,
        };
        if !params.sort.is_empty() && !spec.is_sortable(&params.sort) {
            return Err(FilterError::UnsortableField {
                data_type: name.to_string(),
                field: params.sort.clone(),
            });
        }
        params.validate()?;
        Ok(spec)
    }

    /// Check `field` is known for the data type (key, filterable or sortable)
    pub fn validate_key(&self, name: &str, field: &str) -> Result<&DataTypeSpec, FilterError> {
        let spec = self.get(name)?;
        if !spec.knows_field(field) {
            return Err(FilterError::UnknownField {
                data_type: name.to_string(),
                field: field.to_string(),
            });
        }
        Ok(spec)
    }
}
