//! Filter parsing
//!
//! Parses JSON filter and list parameter definitions with validation.

use serde::de::DeserializeOwned;

use super::error::FilterError;
use super::types::{CommonParams, Filter};

/// Maximum size of filter JSON in bytes (64KB)
pub const MAX_FILTER_JSON_SIZE: usize = 64 * 1024;

fn decode<T: DeserializeOwned>(json_str: &str) -> Result<T, FilterError> {
    if json_str.len() > MAX_FILTER_JSON_SIZE {
        return Err(FilterError::TooLarge {
            max_bytes: MAX_FILTER_JSON_SIZE,
        });
    }
    serde_json::from_str(json_str).map_err(|e| FilterError::InvalidJson(e.to_string()))
}

/// Parse a filter from JSON (query param or body)
///
/// Validates JSON size, decodes, and rejects malformed ranges.
pub fn parse_filter(json_str: &str) -> Result<Filter, FilterError> {
    let filter: Filter = decode(json_str)?;
    filter.validate()?;
    Ok(filter)
}

/// Parse list parameters (filter, page, pageSize, sort, sortDesc) from JSON
pub fn parse_params(json_str: &str) -> Result<CommonParams, FilterError> {
    let params: CommonParams = decode(json_str)?;
    params.validate()?;
    Ok(params)
}
