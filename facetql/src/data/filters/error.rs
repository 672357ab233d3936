//! Filter validation errors
//!
//! Every variant is a caller mistake and maps to a bad-request response.

use chrono::{DateTime, Utc};
use thiserror::Error;

use super::types::FilterType;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FilterError {
    #[error("range end {to} is before start {from}")]
    InvalidRange { from: f64, to: f64 },

    #[error("date range end {to} is before start {from}")]
    InvalidDateRange {
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    },

    #[error("range bounds must be finite numbers")]
    NonFiniteBound,

    #[error("null cannot be matched by value")]
    NullValue,

    #[error("invalid filter on '{field}': {source}")]
    Field {
        field: String,
        #[source]
        source: Box<FilterError>,
    },

    #[error("invalid pagination: {0}")]
    InvalidPagination(String),

    #[error("unknown data type '{0}'")]
    UnknownDataType(String),

    #[error("field '{field}' is not filterable for '{data_type}'")]
    UnknownField { data_type: String, field: String },

    #[error("field '{field}' of '{data_type}' is declared as {declared} and cannot be used in '{mapping}'")]
    KindMismatch {
        data_type: String,
        field: String,
        mapping: &'static str,
        declared: FilterType,
    },

    #[error("cannot sort '{data_type}' by '{field}'")]
    UnsortableField { data_type: String, field: String },

    #[error("'{0}' is not a valid SQL identifier")]
    InvalidIdentifier(String),

    #[error("filter JSON exceeds maximum size of {max_bytes} bytes")]
    TooLarge { max_bytes: usize },

    #[error("invalid filter JSON: {0}")]
    InvalidJson(String),
}

impl FilterError {
    /// Attach the offending field name
    pub fn for_field(self, field: &str) -> Self {
        Self::Field {
            field: field.to_string(),
            source: Box::new(self),
        }
    }

    /// Stable error code for clients
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidRange { .. } => "INVALID_RANGE",
            Self::InvalidDateRange { .. } => "INVALID_DATE_RANGE",
            Self::NonFiniteBound => "NON_FINITE_BOUND",
            Self::NullValue => "NULL_MATCHER_VALUE",
            Self::Field { source, .. } => source.code(),
            Self::InvalidPagination(_) => "INVALID_PAGINATION",
            Self::UnknownDataType(_) => "UNKNOWN_DATA_TYPE",
            Self::UnknownField { .. } => "UNKNOWN_FIELD",
            Self::KindMismatch { .. } => "FIELD_KIND_MISMATCH",
            Self::UnsortableField { .. } => "UNSORTABLE_FIELD",
            Self::InvalidIdentifier(_) => "INVALID_IDENTIFIER",
            Self::TooLarge { .. } => "FILTER_JSON_TOO_LARGE",
            Self::InvalidJson(_) => "INVALID_FILTER_JSON",
        }
    }
}
