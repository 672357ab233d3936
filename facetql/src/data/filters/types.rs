//! Filter type definitions
//!
//! The JSON-facing filter model. Every mapping is an ordered map keyed by
//! field name so that compiled SQL is reproducible.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::error::FilterError;
use crate::data::types::Value;

/// Kind of a filterable field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilterType {
    Prop,
    Array,
    DateRange,
    NumRange,
    Boolean,
    Search,
    Constant,
}

impl fmt::Display for FilterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FilterType::Prop => "Prop",
            FilterType::Array => "Array",
            FilterType::DateRange => "DateRange",
            FilterType::NumRange => "NumRange",
            FilterType::Boolean => "Boolean",
            FilterType::Search => "Search",
            FilterType::Constant => "Constant",
        };
        write!(f, "{}", name)
    }
}

/// Declares a filterable field of a data type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSpec {
    pub field: String,
    pub name: String,
    #[serde(rename = "type")]
    pub filter_type: FilterType,
}

impl FilterSpec {
    pub fn new(field: impl Into<String>, name: impl Into<String>, filter_type: FilterType) -> Self {
        Self {
            field: field.into(),
            name: name.into(),
            filter_type,
        }
    }
}

/// Equality-set matcher
///
/// Not inverted: the field must equal one of `fields`. Inverted: none of them.
/// An empty `fields` list contributes no predicate at all.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Matcher {
    pub invert: bool,
    pub fields: Vec<Value>,
}

impl Matcher {
    pub fn any_of<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self {
            invert: false,
            fields: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn none_of<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self {
            invert: true,
            ..Self::any_of(values)
        }
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Null values are rejected; matchers compare by value only
    pub fn validate(&self) -> Result<(), FilterError> {
        if self.fields.iter().any(Value::is_null) {
            return Err(FilterError::NullValue);
        }
        Ok(())
    }
}

/// Closed interval of timestamps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl DateRange {
    pub fn try_new(from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Self, FilterError> {
        let range = Self { from, to };
        range.validate()?;
        Ok(range)
    }

    pub fn validate(&self) -> Result<(), FilterError> {
        if self.to < self.from {
            return Err(FilterError::InvalidDateRange {
                from: self.from,
                to: self.to,
            });
        }
        Ok(())
    }

    pub fn difference(&self) -> Duration {
        self.to - self.from
    }
}

/// Closed interval of real numbers
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NumberRange {
    pub from: f64,
    pub to: f64,
}

impl NumberRange {
    pub fn try_new(from: f64, to: f64) -> Result<Self, FilterError> {
        let range = Self { from, to };
        range.validate()?;
        Ok(range)
    }

    pub fn validate(&self) -> Result<(), FilterError> {
        if !self.from.is_finite() || !self.to.is_finite() {
            return Err(FilterError::NonFiniteBound);
        }
        if self.to < self.from {
            return Err(FilterError::InvalidRange {
                from: self.from,
                to: self.to,
            });
        }
        Ok(())
    }
}

/// Date range matcher: inside `[from, to]`, or outside it when inverted
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DateRangeMatcher {
    #[serde(flatten)]
    pub range: DateRange,
    #[serde(default)]
    pub invert: bool,
}

impl DateRangeMatcher {
    pub fn try_new(
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        invert: bool,
    ) -> Result<Self, FilterError> {
        Ok(Self {
            range: DateRange::try_new(from, to)?,
            invert,
        })
    }
}

/// Numeric range matcher: inside `[from, to]`, or outside it when inverted
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RangeMatcher {
    #[serde(flatten)]
    pub range: NumberRange,
    #[serde(default)]
    pub invert: bool,
}

impl RangeMatcher {
    pub fn try_new(from: f64, to: f64, invert: bool) -> Result<Self, FilterError> {
        Ok(Self {
            range: NumberRange::try_new(from, to)?,
            invert,
        })
    }
}

/// Which mapping of a [`Filter`] a field was found in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mapping {
    Props,
    Lists,
    Bools,
    Searches,
    Constants,
    Dates,
    Ranges,
}

impl Mapping {
    pub fn name(&self) -> &'static str {
        match self {
            Mapping::Props => "props",
            Mapping::Lists => "lists",
            Mapping::Bools => "bools",
            Mapping::Searches => "searches",
            Mapping::Constants => "constants",
            Mapping::Dates => "dates",
            Mapping::Ranges => "ranges",
        }
    }

    /// Whether a field declared with `filter_type` may appear in this mapping
    pub fn accepts(&self, filter_type: FilterType) -> bool {
        match self {
            Mapping::Props | Mapping::Lists => {
                matches!(filter_type, FilterType::Prop | FilterType::Array)
            }
            Mapping::Bools => filter_type == FilterType::Boolean,
            Mapping::Searches => filter_type == FilterType::Search,
            Mapping::Constants => filter_type == FilterType::Constant,
            Mapping::Dates => filter_type == FilterType::DateRange,
            Mapping::Ranges => filter_type == FilterType::NumRange,
        }
    }
}

/// Generic filter usable against any registered table
///
/// `bools` values are tri-state: `null` means "don't care" and is skipped.
/// `constants` are reserved and never compiled.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Filter {
    pub bools: BTreeMap<String, Option<bool>>,
    pub props: BTreeMap<String, Matcher>,
    pub lists: BTreeMap<String, Matcher>,
    pub searches: BTreeMap<String, Matcher>,
    pub constants: BTreeMap<String, Matcher>,
    pub dates: BTreeMap<String, DateRangeMatcher>,
    #[serde(alias = "range")]
    pub ranges: BTreeMap<String, RangeMatcher>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_prop(mut self, field: impl Into<String>, matcher: Matcher) -> Self {
        self.props.insert(field.into(), matcher);
        self
    }

    pub fn with_list(mut self, field: impl Into<String>, matcher: Matcher) -> Self {
        self.lists.insert(field.into(), matcher);
        self
    }

    pub fn with_bool(mut self, field: impl Into<String>, value: Option<bool>) -> Self {
        self.bools.insert(field.into(), value);
        self
    }

    pub fn with_search(mut self, field: impl Into<String>, matcher: Matcher) -> Self {
        self.searches.insert(field.into(), matcher);
        self
    }

    pub fn with_constant(mut self, field: impl Into<String>, matcher: Matcher) -> Self {
        self.constants.insert(field.into(), matcher);
        self
    }

    pub fn with_date(mut self, field: impl Into<String>, matcher: DateRangeMatcher) -> Self {
        self.dates.insert(field.into(), matcher);
        self
    }

    pub fn with_range(mut self, field: impl Into<String>, matcher: RangeMatcher) -> Self {
        self.ranges.insert(field.into(), matcher);
        self
    }

    /// True if the filter carries at least one real constraint
    pub fn is_valid(&self) -> bool {
        self.props.values().any(|m| !m.is_empty())
            || self.lists.values().any(|m| !m.is_empty())
            || self.searches.values().any(|m| !m.is_empty())
            || self.bools.values().any(Option::is_some)
            || !self.dates.is_empty()
            || !self.ranges.is_empty()
    }

    /// Reject malformed ranges and null matcher values before compilation
    pub fn validate(&self) -> Result<(), FilterError> {
        for (field, matcher) in self.props.iter().chain(&self.lists).chain(&self.searches) {
            matcher.validate().map_err(|e| e.for_field(field))?;
        }
        for (field, matcher) in &self.dates {
            matcher
                .range
                .validate()
                .map_err(|e| e.for_field(field))?;
        }
        for (field, matcher) in &self.ranges {
            matcher
                .range
                .validate()
                .map_err(|e| e.for_field(field))?;
        }
        Ok(())
    }

    /// Every field referenced by the filter, with the mapping it appears in
    pub fn fields(&self) -> Vec<(Mapping, &str)> {
        let mut fields = Vec::new();
        fields.extend(self.props.keys().map(|k| (Mapping::Props, k.as_str())));
        fields.extend(self.lists.keys().map(|k| (Mapping::Lists, k.as_str())));
        fields.extend(self.bools.keys().map(|k| (Mapping::Bools, k.as_str())));
        fields.extend(self.searches.keys().map(|k| (Mapping::Searches, k.as_str())));
        fields.extend(self.constants.keys().map(|k| (Mapping::Constants, k.as_str())));
        fields.extend(self.dates.keys().map(|k| (Mapping::Dates, k.as_str())));
        fields.extend(self.ranges.keys().map(|k| (Mapping::Ranges, k.as_str())));
        fields
    }
}

/// Filter plus pagination and sorting for list queries
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CommonParams {
    pub filter: Option<Filter>,
    pub page: i64,
    pub page_size: i64,
    pub sort: String,
    pub sort_desc: bool,
}

impl CommonParams {
    pub fn new(filter: Filter) -> Self {
        Self {
            filter: Some(filter),
            ..Self::default()
        }
    }

    pub fn paged(mut self, page: i64, page_size: i64) -> Self {
        self.page = page;
        self.page_size = page_size;
        self
    }

    pub fn sorted(mut self, sort: impl Into<String>, descending: bool) -> Self {
        self.sort = sort.into();
        self.sort_desc = descending;
        self
    }

    pub fn offset(&self) -> i64 {
        self.page.saturating_mul(self.page_size)
    }

    pub fn limit(&self) -> i64 {
        self.page_size
    }

    pub fn validate(&self) -> Result<(), FilterError> {
        if self.page < 0 {
            return Err(FilterError::InvalidPagination(format!(
                "page must be >= 0, got {}",
                self.page
            )));
        }
        if self.page_size < 0 {
            return Err(FilterError::InvalidPagination(format!(
                "pageSize must be >= 0, got {}",
                self.page_size
            )));
        }
        if self.page.checked_mul(self.page_size).is_none() {
            return Err(FilterError::InvalidPagination(
                "offset overflows".to_string(),
            ));
        }
        if let Some(filter) = &self.filter {
            filter.validate()?;
        }
        Ok(())
    }
}

/// Facet values computed for a data type
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterValues {
    pub values: BTreeMap<String, Vec<Value>>,
    pub dates: BTreeMap<String, DateRange>,
    pub ranges: BTreeMap<String, NumberRange>,
}

impl FilterValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty() && self.dates.is_empty() && self.ranges.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap()
    }

    #[test]
    fn empty_filter_is_not_valid() {
        assert!(!Filter::new().is_valid());
        assert!(
            !Filter::new()
                .with_prop("status", Matcher::default())
                .with_bool("active", None)
                .is_valid()
        );
    }

    #[test]
    fn any_constraint_makes_filter_valid() {
        assert!(
            Filter::new()
                .with_prop("status", Matcher::any_of(["a"]))
                .is_valid()
        );
        assert!(Filter::new().with_bool("active", Some(false)).is_valid());
        assert!(
            Filter::new()
                .with_range("age", RangeMatcher::try_new(1.0, 2.0, false).unwrap())
                .is_valid()
        );
    }

    #[test]
    fn constants_alone_do_not_constrain() {
        let filter = Filter::new().with_constant("tenant", Matcher::any_of(["acme"]));
        assert!(!filter.is_valid());
    }

    #[test]
    fn number_range_rejects_reversed_bounds() {
        assert_eq!(
            RangeMatcher::try_new(100.0, 1.0, false),
            Err(FilterError::InvalidRange {
                from: 100.0,
                to: 1.0
            })
        );
        assert!(RangeMatcher::try_new(5.0, 5.0, true).is_ok());
        assert_eq!(
            NumberRange::try_new(f64::NAN, 1.0),
            Err(FilterError::NonFiniteBound)
        );
    }

    #[test]
    fn date_range_rejects_reversed_bounds() {
        assert!(DateRangeMatcher::try_new(ts(5), ts(1), false).is_err());
        let range = DateRange::try_new(ts(1), ts(3)).unwrap();
        assert_eq!(range.difference(), Duration::days(2));
    }

    #[test]
    fn filter_validate_names_field() {
        let mut filter = Filter::new();
        filter.ranges.insert(
            "age".to_string(),
            RangeMatcher {
                range: NumberRange {
                    from: 100.0,
                    to: 1.0,
                },
                invert: false,
            },
        );
        let err = filter.validate().unwrap_err();
        assert!(matches!(err, FilterError::Field { ref field, .. } if field == "age"));
    }

    #[test]
    fn filter_validate_rejects_null_values() {
        let filter =
            Filter::new().with_list("tags", Matcher::any_of([Value::from("a"), Value::Null]));
        let err = filter.validate().unwrap_err();
        assert_eq!(err.code(), "NULL_MATCHER_VALUE");
        assert!(matches!(err, FilterError::Field { ref field, .. } if field == "tags"));

        let filter = Filter::new().with_search("name", Matcher::any_of([Value::Null]));
        assert!(filter.validate().is_err());

        // Constants are never compiled
        let filter = Filter::new().with_constant("kind", Matcher::any_of([Value::Null]));
        assert!(filter.validate().is_ok());
    }

    #[test]
    fn filter_json_shape() {
        let json = r#"{
            "props": {"status": {"invert": false, "fields": ["active", "pending"]}},
            "bools": {"verified": true, "deleted": null},
            "dates": {"created": {"from": "2024-01-01T00:00:00Z", "to": "2024-01-03T00:00:00Z", "invert": true}},
            "range": {"age": {"from": 18, "to": 65}}
        }"#;
        let filter: Filter = serde_json::from_str(json).unwrap();

        assert_eq!(
            filter.props["status"].fields,
            vec![Value::from("active"), Value::from("pending")]
        );
        assert_eq!(filter.bools["verified"], Some(true));
        assert_eq!(filter.bools["deleted"], None);
        assert_eq!(filter.dates["created"].range.from, ts(1));
        assert!(filter.dates["created"].invert);
        assert_eq!(filter.ranges["age"].range, NumberRange { from: 18.0, to: 65.0 });
        assert!(!filter.ranges["age"].invert);
        assert!(filter.lists.is_empty());
    }

    #[test]
    fn filter_fields_lists_every_mapping() {
        let filter = Filter::new()
            .with_prop("status", Matcher::any_of(["a"]))
            .with_list("tags", Matcher::none_of(["x"]))
            .with_bool("active", None)
            .with_search("name", Matcher::default())
            .with_constant("kind", Matcher::default())
            .with_range("age", RangeMatcher::try_new(1.0, 2.0, false).unwrap());
        let fields = filter.fields();
        assert_eq!(
            fields,
            vec![
                (Mapping::Props, "status"),
                (Mapping::Lists, "tags"),
                (Mapping::Bools, "active"),
                (Mapping::Searches, "name"),
                (Mapping::Constants, "kind"),
                (Mapping::Ranges, "age"),
            ]
        );
    }

    #[test]
    fn mapping_accepts() {
        assert!(Mapping::Props.accepts(FilterType::Array));
        assert!(Mapping::Lists.accepts(FilterType::Prop));
        assert!(!Mapping::Props.accepts(FilterType::NumRange));
        assert!(Mapping::Ranges.accepts(FilterType::NumRange));
        assert!(!Mapping::Dates.accepts(FilterType::NumRange));
    }

    #[test]
    fn common_params_offset_and_validation() {
        let params = CommonParams::default().paged(3, 20);
        assert_eq!(params.offset(), 60);
        assert_eq!(params.limit(), 20);
        assert!(params.validate().is_ok());

        assert!(CommonParams::default().paged(-1, 20).validate().is_err());
        assert!(CommonParams::default().paged(0, -5).validate().is_err());
        assert!(
            CommonParams::default()
                .paged(i64::MAX, 2)
                .validate()
                .is_err()
        );
    }

    #[test]
    fn common_params_json_camel_case() {
        let params: CommonParams =
            serde_json::from_str(r#"{"page": 2, "pageSize": 10, "sort": "name", "sortDesc": true}"#)
                .unwrap();
        assert_eq!(params.page, 2);
        assert_eq!(params.page_size, 10);
        assert_eq!(params.sort, "name");
        assert!(params.sort_desc);
        assert!(params.filter.is_none());
    }

    #[test]
    fn filter_spec_json() {
        let spec: FilterSpec =
            serde_json::from_str(r#"{"field": "age", "name": "Age", "type": "NumRange"}"#).unwrap();
        assert_eq!(spec, FilterSpec::new("age", "Age", FilterType::NumRange));
    }
}
