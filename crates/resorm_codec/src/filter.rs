//! Query filter serialization.
//!
//! Predicates, sort order and pagination are sent to the remote API as
//! plain query parameters:
//!
//! | State | Parameter |
//! |---|---|
//! | `name = v` | `name=v` |
//! | `age > v` | `age-GT=v` |
//! | `id IN (1, 2)` | `id-IN=1,2` |
//! | offset 20, count 10 | `limit=20,10` |
//! | count 10 | `limit=10` |
//! | sort | `sort-by=name,ASC;age,DESC` |
//!
//! Everything here is pure and deterministic: the same state always
//! produces the same parameters in the same order.

use crate::value::{Payload, Value};
use indexmap::IndexMap;
use std::fmt;

/// Query parameter carrying pagination.
pub const LIMIT_PARAM: &str = "limit";

/// Query parameter carrying the sort specification.
pub const SORT_PARAM: &str = "sort-by";

/// Value sent with the null/not-null operators.
pub const NULL_SENTINEL: &str = "null";

/// Page size used when none is given.
pub const DEFAULT_PER_PAGE: u64 = 15;

/// Comparison operators understood by the remote API.
///
/// Equality has no operator token: an equality filter is keyed by the bare
/// field name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterOperator {
    /// `field != value`
    NotEquals,
    /// `field > value`
    GreaterThan,
    /// `field >= value`
    GreaterThanOrEquals,
    /// `field < value`
    LessThan,
    /// `field <= value`
    LessThanOrEquals,
    /// `field IS NULL`
    IsNull,
    /// `field IS NOT NULL`
    IsNotNull,
    /// `field BETWEEN a AND b`
    Between,
    /// `field NOT BETWEEN a AND b`
    NotBetween,
    /// `field IN (..)`
    In,
    /// `field NOT IN (..)`
    NotIn,
    /// Prefix match.
    StartsWith,
    /// Suffix match.
    EndsWith,
    /// Substring match.
    Contains,
}

impl FilterOperator {
    /// All operators, in declaration order.
    pub const ALL: [FilterOperator; 14] = [
        FilterOperator::NotEquals,
        FilterOperator::GreaterThan,
        FilterOperator::GreaterThanOrEquals,
        FilterOperator::LessThan,
        FilterOperator::LessThanOrEquals,
        FilterOperator::IsNull,
        FilterOperator::IsNotNull,
        FilterOperator::Between,
        FilterOperator::NotBetween,
        FilterOperator::In,
        FilterOperator::NotIn,
        FilterOperator::StartsWith,
        FilterOperator::EndsWith,
        FilterOperator::Contains,
    ];

    /// The wire token appended to the field name.
    pub fn token(self) -> &'static str {
        match self {
            FilterOperator::NotEquals => "NOTEQ",
            FilterOperator::GreaterThan => "GT",
            FilterOperator::GreaterThanOrEquals => "GTE",
            FilterOperator::LessThan => "LT",
            FilterOperator::LessThanOrEquals => "LTE",
            FilterOperator::IsNull => "NULL",
            FilterOperator::IsNotNull => "NOTNULL",
            FilterOperator::Between => "BETWEEN",
            FilterOperator::NotBetween => "NOTBETWEEN",
            FilterOperator::In => "IN",
            FilterOperator::NotIn => "NOTIN",
            FilterOperator::StartsWith => "STARTSWITH",
            FilterOperator::EndsWith => "ENDSWITH",
            FilterOperator::Contains => "CONTAINS",
        }
    }

    /// Parses a wire token (case-insensitive).
    pub fn from_token(token: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|op| op.token().eq_ignore_ascii_case(token))
    }
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Builds the parameter key for a filter: `field` or `field-TOKEN`.
pub fn filter_key(field: &str, operator: Option<FilterOperator>) -> String {
    match operator {
        Some(op) => format!("{field}-{}", op.token()),
        None => field.to_string(),
    }
}

/// Joins the values of a multi-value operator with commas.
pub fn join_values<I, V>(values: I) -> Value
where
    I: IntoIterator<Item = V>,
    V: Into<Value>,
{
    Value::Text(
        values
            .into_iter()
            .map(|v| v.into().to_param_string())
            .collect::<Vec<_>>()
            .join(","),
    )
}

/// An ordered set of filters keyed by `field` or `field-TOKEN`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterSet {
    entries: IndexMap<String, Value>,
}

impl FilterSet {
    /// Creates an empty filter set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a filter. Empty-string values are ignored.
    pub fn insert(
        &mut self,
        field: &str,
        operator: Option<FilterOperator>,
        value: impl Into<Value>,
    ) -> &mut Self {
        let value = value.into();
        if matches!(&value, Value::Text(s) if s.is_empty()) {
            return self;
        }
        self.entries.insert(filter_key(field, operator), value);
        self
    }

    /// `field = value`
    pub fn equals(&mut self, field: &str, value: impl Into<Value>) -> &mut Self {
        self.insert(field, None, value)
    }

    /// `field != value`
    pub fn not_equals(&mut self, field: &str, value: impl Into<Value>) -> &mut Self {
        self.insert(field, Some(FilterOperator::NotEquals), value)
    }

    /// `field > value`
    pub fn greater_than(&mut self, field: &str, value: impl Into<Value>) -> &mut Self {
        self.insert(field, Some(FilterOperator::GreaterThan), value)
    }

    /// `field >= value`
    pub fn greater_than_or_equals(&mut self, field: &str, value: impl Into<Value>) -> &mut Self {
        self.insert(field, Some(FilterOperator::GreaterThanOrEquals), value)
    }

    /// `field < value`
    pub fn less_than(&mut self, field: &str, value: impl Into<Value>) -> &mut Self {
        self.insert(field, Some(FilterOperator::LessThan), value)
    }

    /// `field <= value`
    pub fn less_than_or_equals(&mut self, field: &str, value: impl Into<Value>) -> &mut Self {
        self.insert(field, Some(FilterOperator::LessThanOrEquals), value)
    }

    /// `field IS NULL`
    pub fn is_null(&mut self, field: &str) -> &mut Self {
        self.insert(field, Some(FilterOperator::IsNull), NULL_SENTINEL)
    }

    /// `field IS NOT NULL`
    pub fn is_not_null(&mut self, field: &str) -> &mut Self {
        self.insert(field, Some(FilterOperator::IsNotNull), NULL_SENTINEL)
    }

    /// `low <= field <= high`
    pub fn between(
        &mut self,
        field: &str,
        low: impl Into<Value>,
        high: impl Into<Value>,
    ) -> &mut Self {
        let joined = join_values([low.into(), high.into()]);
        self.insert(field, Some(FilterOperator::Between), joined)
    }

    /// `field < low || field > high`
    pub fn not_between(
        &mut self,
        field: &str,
        low: impl Into<Value>,
        high: impl Into<Value>,
    ) -> &mut Self {
        let joined = join_values([low.into(), high.into()]);
        self.insert(field, Some(FilterOperator::NotBetween), joined)
    }

    /// `field IN (values)`
    pub fn is_in<I, V>(&mut self, field: &str, values: I) -> &mut Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let joined = join_values(values);
        self.insert(field, Some(FilterOperator::In), joined)
    }

    /// `field NOT IN (values)`
    pub fn not_in<I, V>(&mut self, field: &str, values: I) -> &mut Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let joined = join_values(values);
        self.insert(field, Some(FilterOperator::NotIn), joined)
    }

    /// Prefix match.
    pub fn starts_with(&mut self, field: &str, value: &str) -> &mut Self {
        self.insert(field, Some(FilterOperator::StartsWith), value)
    }

    /// Suffix match.
    pub fn ends_with(&mut self, field: &str, value: &str) -> &mut Self {
        self.insert(field, Some(FilterOperator::EndsWith), value)
    }

    /// Substring match.
    pub fn contains(&mut self, field: &str, value: &str) -> &mut Self {
        self.insert(field, Some(FilterOperator::Contains), value)
    }

    /// Returns the value stored under a parameter key.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Removes every filter.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of filters.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if there are no filters.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over `(key, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.entries.iter()
    }
}

/// Ordered mapping of column name to a descending flag.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SortSpec {
    columns: IndexMap<String, bool>,
}

impl SortSpec {
    /// Creates an empty sort specification.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the direction of a column. A column that is already present
    /// keeps its position.
    pub fn sort_by(&mut self, column: &str, desc: bool) -> &mut Self {
        self.columns.insert(column.to_string(), desc);
        self
    }

    /// Removes every column.
    pub fn clear(&mut self) {
        self.columns.clear();
    }

    /// Returns true if no column is set.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// `col,ASC;col,DESC`, or `None` when no column is set.
    pub fn param(&self) -> Option<String> {
        if self.columns.is_empty() {
            return None;
        }
        Some(
            self.columns
                .iter()
                .map(|(column, desc)| format!("{column},{}", if *desc { "DESC" } else { "ASC" }))
                .collect::<Vec<_>>()
                .join(";"),
        )
    }
}

/// Offset/count pagination state. Zero means "not set" for both.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Pagination {
    /// Number of records to skip.
    pub offset: u64,
    /// Number of records to return.
    pub count: u64,
}

impl Pagination {
    /// Sets the offset for a 1-based page.
    pub fn for_page(page: u64, per_page: u64) -> Self {
        Self {
            offset: page.saturating_sub(1).saturating_mul(per_page),
            count: per_page,
        }
    }

    /// `offset,count` when both are set, `count` when only the count is
    /// set, `None` otherwise.
    pub fn limit_param(&self) -> Option<String> {
        match (self.offset, self.count) {
            (_, 0) => None,
            (0, count) => Some(count.to_string()),
            (offset, count) => Some(format!("{offset},{count}")),
        }
    }
}

/// Merges filter state into query parameters.
///
/// Persistent filters go first; transient filters override them on key
/// collision. `limit` and `sort-by` are appended when set.
pub fn build_query(
    persistent: &FilterSet,
    transient: &FilterSet,
    pagination: &Pagination,
    sort: &SortSpec,
) -> Payload {
    let mut params = Payload::new();
    for (key, value) in persistent.iter().chain(transient.iter()) {
        params.insert(key.clone(), value.clone());
    }
    if let Some(limit) = pagination.limit_param() {
        params.insert(LIMIT_PARAM.to_string(), Value::Text(limit));
    }
    if let Some(sort) = sort.param() {
        params.insert(SORT_PARAM.to_string(), Value::Text(sort));
    }
    params
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn operator_tokens() {
        assert_eq!(filter_key("age", Some(FilterOperator::GreaterThan)), "age-GT");
        assert_eq!(filter_key("name", None), "name");
        assert_eq!(FilterOperator::from_token("notin"), Some(FilterOperator::NotIn));
        assert_eq!(FilterOperator::from_token("LIKE"), None);
    }

    #[test]
    fn named_variants_write_expected_keys() {
        let mut filters = FilterSet::new();
        filters
            .equals("name", "bob")
            .not_equals("role", "admin")
            .greater_than_or_equals("age", 18)
            .is_null("deleted_at")
            .between("score", 1, 10)
            .is_in("id", [1, 2, 3])
            .contains("bio", "rust");

        assert_eq!(filters.get("name"), Some(&Value::from("bob")));
        assert_eq!(filters.get("role-NOTEQ"), Some(&Value::from("admin")));
        assert_eq!(filters.get("age-GTE"), Some(&Value::Integer(18)));
        assert_eq!(filters.get("deleted_at-NULL"), Some(&Value::from("null")));
        assert_eq!(filters.get("score-BETWEEN"), Some(&Value::from("1,10")));
        assert_eq!(filters.get("id-IN"), Some(&Value::from("1,2,3")));
        assert_eq!(filters.get("bio-CONTAINS"), Some(&Value::from("rust")));
    }

    #[test]
    fn empty_string_values_are_ignored() {
        let mut filters = FilterSet::new();
        filters.equals("name", "").starts_with("email", "");
        assert!(filters.is_empty());

        filters.equals("count", 0);
        assert_eq!(filters.len(), 1);
    }

    #[test]
    fn limit_formatting() {
        let mut p = Pagination::default();
        assert_eq!(p.limit_param(), None);

        p.count = 10;
        assert_eq!(p.limit_param().as_deref(), Some("10"));

        p.offset = 20;
        assert_eq!(p.limit_param().as_deref(), Some("20,10"));

        p.count = 0;
        assert_eq!(p.limit_param(), None);
    }

    #[test]
    fn pages_are_one_based() {
        let p = Pagination::for_page(3, 15);
        assert_eq!(p.offset, 30);
        assert_eq!(p.count, 15);
        assert_eq!(Pagination::for_page(1, 15).offset, 0);
        assert_eq!(Pagination::for_page(0, 15).offset, 0);
    }

    #[test]
    fn sort_param_keeps_order() {
        let mut sort = SortSpec::new();
        assert_eq!(sort.param(), None);
        sort.sort_by("name", false).sort_by("age", true);
        assert_eq!(sort.param().as_deref(), Some("name,ASC;age,DESC"));

        sort.sort_by("name", true);
        assert_eq!(sort.param().as_deref(), Some("name,DESC;age,DESC"));
    }

    #[test]
    fn transient_filters_win_on_collision() {
        let mut persistent = FilterSet::new();
        persistent.equals("user_id", 1).equals("type", "post");
        let mut transient = FilterSet::new();
        transient.equals("user_id", 2);

        let mut sort = SortSpec::new();
        sort.sort_by("id", true);
        let pagination = Pagination { offset: 0, count: 5 };

        let params = build_query(&persistent, &transient, &pagination, &sort);
        assert_eq!(params.get("user_id"), Some(&Value::Integer(2)));
        assert_eq!(params.get("type"), Some(&Value::from("post")));
        assert_eq!(params.get(LIMIT_PARAM), Some(&Value::from("5")));
        assert_eq!(params.get(SORT_PARAM), Some(&Value::from("id,DESC")));
    }

    proptest! {
        #[test]
        fn limit_param_matches_state(offset in 0u64..10_000, count in 0u64..10_000) {
            let p = Pagination { offset, count };
            let expected = match (offset, count) {
                (_, 0) => None,
                (0, c) => Some(c.to_string()),
                (o, c) => Some(format!("{o},{c}")),
            };
            prop_assert_eq!(p.limit_param(), expected);
        }

        #[test]
        fn in_filter_roundtrips_through_split(values in proptest::collection::vec(0i64..1000, 1..8)) {
            let mut filters = FilterSet::new();
            filters.is_in("id", values.clone());
            let joined = filters.get("id-IN").and_then(Value::as_str).unwrap().to_string();
            let parsed: Vec<i64> = joined.split(',').map(|s| s.parse().unwrap()).collect();
            prop_assert_eq!(parsed, values);
        }
    }
}
