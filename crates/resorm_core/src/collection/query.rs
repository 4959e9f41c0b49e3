//! Query builder state: filters, sort and pagination.

use super::Collection;
use resorm_codec::{build_query, FilterOperator, FilterSet, Pagination, Payload, Value, DEFAULT_PER_PAGE};

/// Which filter set a predicate is written to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FilterScope {
    /// Cleared after every fetch.
    #[default]
    Transient,
    /// Survives across fetches. Relations scope their children with these.
    Persistent,
}

macro_rules! transient_where {
    ($($(#[$doc:meta])* $name:ident => $op:ident;)*) => {
        $(
            $(#[$doc])*
            pub fn $name(&mut self, field: &str, value: impl Into<Value>) -> &mut Self {
                self.where_clause(field, Some(FilterOperator::$op), value, FilterScope::Transient)
            }
        )*
    };
}

impl Collection {
    /// Adds a predicate to the chosen filter set. Empty-string values are
    /// ignored.
    ///
    /// The `where_*` shorthands below write transient filters. Every named
    /// predicate is also available on [`FilterSet`], so the persistent form
    /// of any of them goes through [`filters_mut`](Self::filters_mut):
    ///
    /// ```ignore
    /// users
    ///     .filters_mut(FilterScope::Persistent)
    ///     .is_not_null("verified_at")
    ///     .between("age", 18, 65);
    /// ```
    pub fn where_clause(
        &mut self,
        field: &str,
        operator: Option<FilterOperator>,
        value: impl Into<Value>,
        scope: FilterScope,
    ) -> &mut Self {
        self.filters_mut(scope).insert(field, operator, value);
        self
    }

    /// `field = value`
    pub fn where_equals(&mut self, field: &str, value: impl Into<Value>) -> &mut Self {
        self.where_clause(field, None, value, FilterScope::Transient)
    }

    transient_where! {
        /// `field != value`
        where_not_equals => NotEquals;
        /// `field > value`
        where_greater_than => GreaterThan;
        /// `field >= value`
        where_greater_than_or_equals => GreaterThanOrEquals;
        /// `field < value`
        where_less_than => LessThan;
        /// `field <= value`
        where_less_than_or_equals => LessThanOrEquals;
    }

    /// `field IS NULL`
    pub fn where_is_null(&mut self, field: &str) -> &mut Self {
        self.transient_filters.is_null(field);
        self
    }

    /// `field IS NOT NULL`
    pub fn where_is_not_null(&mut self, field: &str) -> &mut Self {
        self.transient_filters.is_not_null(field);
        self
    }

    /// `low <= field <= high`
    pub fn where_between(
        &mut self,
        field: &str,
        low: impl Into<Value>,
        high: impl Into<Value>,
    ) -> &mut Self {
        self.transient_filters.between(field, low, high);
        self
    }

    /// `field < low || field > high`
    pub fn where_not_between(
        &mut self,
        field: &str,
        low: impl Into<Value>,
        high: impl Into<Value>,
    ) -> &mut Self {
        self.transient_filters.not_between(field, low, high);
        self
    }

    /// `field IN (values)`
    pub fn where_in<I, V>(&mut self, field: &str, values: I) -> &mut Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.transient_filters.is_in(field, values);
        self
    }

    /// `field NOT IN (values)`
    pub fn where_not_in<I, V>(&mut self, field: &str, values: I) -> &mut Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.transient_filters.not_in(field, values);
        self
    }

    /// Prefix match.
    pub fn where_starts_with(&mut self, field: &str, value: &str) -> &mut Self {
        self.transient_filters.starts_with(field, value);
        self
    }

    /// Suffix match.
    pub fn where_ends_with(&mut self, field: &str, value: &str) -> &mut Self {
        self.transient_filters.ends_with(field, value);
        self
    }

    /// Substring match.
    pub fn where_contains(&mut self, field: &str, value: &str) -> &mut Self {
        self.transient_filters.contains(field, value);
        self
    }

    /// The filters of one scope.
    pub fn filters(&self, scope: FilterScope) -> &FilterSet {
        match scope {
            FilterScope::Transient => &self.transient_filters,
            FilterScope::Persistent => &self.persistent_filters,
        }
    }

    /// The filters of one scope, mutably. Named predicates written here
    /// keep the scope's lifetime: persistent ones survive every fetch.
    pub fn filters_mut(&mut self, scope: FilterScope) -> &mut FilterSet {
        match scope {
            FilterScope::Transient => &mut self.transient_filters,
            FilterScope::Persistent => &mut self.persistent_filters,
        }
    }

    /// Clears the transient filters.
    pub fn reset_filters(&mut self) -> &mut Self {
        self.transient_filters.clear();
        self
    }

    /// Sorts by `column`. Calling again for the same column changes its
    /// direction in place.
    pub fn sort_by(&mut self, column: &str, desc: bool) -> &mut Self {
        self.sort.sort_by(column, desc);
        self
    }

    /// Clears the sort columns.
    pub fn reset_sort(&mut self) -> &mut Self {
        self.sort.clear();
        self
    }

    /// Skips the first `offset` rows.
    pub fn skip(&mut self, offset: u64) -> &mut Self {
        self.pagination.offset = offset;
        self
    }

    /// Returns at most `count` rows.
    pub fn take(&mut self, count: u64) -> &mut Self {
        self.pagination.count = count;
        self
    }

    /// Alias of [`take`](Self::take).
    pub fn limit(&mut self, count: u64) -> &mut Self {
        self.take(count)
    }

    /// Selects a 1-based page.
    pub fn for_page(&mut self, page: u64, per_page: u64) -> &mut Self {
        self.pagination = Pagination::for_page(page, per_page);
        self
    }

    /// Selects a 1-based page of the default size.
    pub fn for_page_default(&mut self, page: u64) -> &mut Self {
        self.for_page(page, DEFAULT_PER_PAGE)
    }

    /// Current pagination.
    pub fn pagination(&self) -> Pagination {
        self.pagination
    }

    /// Query parameters of the next fetch.
    pub fn query_params(&self) -> Payload {
        build_query(
            &self.persistent_filters,
            &self.transient_filters,
            &self.pagination,
            &self.sort,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_records::{transport, user};
    use resorm_codec::{LIMIT_PARAM, SORT_PARAM};

    fn users() -> Collection {
        let (_, transport) = transport();
        user().collection(&transport)
    }

    #[test]
    fn limit_parameter() {
        let mut c = users();
        assert!(!c.query_params().contains_key(LIMIT_PARAM));

        c.skip(20).take(10);
        assert_eq!(c.query_params()[LIMIT_PARAM], Value::from("20,10"));

        c.skip(0);
        assert_eq!(c.query_params()[LIMIT_PARAM], Value::from("10"));

        c.skip(5).take(0);
        assert!(!c.query_params().contains_key(LIMIT_PARAM));
    }

    #[test]
    fn pages() {
        let mut c = users();
        c.for_page(3, 15);
        assert_eq!(c.pagination(), Pagination { offset: 30, count: 15 });
        assert_eq!(c.query_params()[LIMIT_PARAM], Value::from("30,15"));

        c.for_page_default(1);
        assert_eq!(c.query_params()[LIMIT_PARAM], Value::from("15"));
    }

    #[test]
    fn sort_parameter_keeps_insertion_order() {
        let mut c = users();
        c.sort_by("name", false).sort_by("age", true);
        assert_eq!(c.query_params()[SORT_PARAM], Value::from("name,ASC;age,DESC"));

        c.sort_by("name", true);
        assert_eq!(c.query_params()[SORT_PARAM], Value::from("name,DESC;age,DESC"));

        c.reset_sort();
        assert!(!c.query_params().contains_key(SORT_PARAM));
    }

    #[test]
    fn named_predicates() {
        let mut c = users();
        c.where_equals("name", "bob")
            .where_greater_than("age", 18)
            .where_less_than_or_equals("age", 65)
            .where_is_null("deleted_at")
            .where_not_between("score", 1, 3)
            .where_not_in("role", ["root", "guest"])
            .where_starts_with("email", "b");

        let params = c.query_params();
        assert_eq!(params["name"], Value::from("bob"));
        assert_eq!(params["age-GT"], Value::Integer(18));
        assert_eq!(params["age-LTE"], Value::Integer(65));
        assert_eq!(params["deleted_at-NULL"], Value::from("null"));
        assert_eq!(params["score-NOTBETWEEN"], Value::from("1,3"));
        assert_eq!(params["role-NOTIN"], Value::from("root,guest"));
        assert_eq!(params["email-STARTSWITH"], Value::from("b"));
    }

    #[test]
    fn persistent_named_predicates() {
        let mut c = users();
        c.filters_mut(FilterScope::Persistent)
            .is_not_null("verified_at")
            .between("age", 18, 65)
            .is_in("role", ["admin", "editor"])
            .ends_with("email", ".org");
        c.where_greater_than("age", 30);

        let persistent = c.filters(FilterScope::Persistent);
        assert_eq!(persistent.len(), 4);
        assert_eq!(persistent.get("age-BETWEEN"), Some(&Value::from("18,65")));
        assert!(c.filters(FilterScope::Transient).get("age-BETWEEN").is_none());

        c.reset_filters();
        let params = c.query_params();
        assert_eq!(params["verified_at-NOTNULL"], Value::from("null"));
        assert_eq!(params["age-BETWEEN"], Value::from("18,65"));
        assert_eq!(params["role-IN"], Value::from("admin,editor"));
        assert_eq!(params["email-ENDSWITH"], Value::from(".org"));
        assert!(!params.contains_key("age-GT"));
    }

    #[test]
    fn empty_strings_are_ignored() {
        let mut c = users();
        c.where_equals("name", "").where_contains("bio", "");
        assert!(c.filters(FilterScope::Transient).is_empty());
    }

    #[test]
    fn transient_filters_override_persistent_ones() {
        let mut c = users();
        c.where_clause("status", None, "archived", FilterScope::Persistent)
            .where_clause("org", None, 1, FilterScope::Persistent)
            .where_equals("status", "active");

        let params = c.query_params();
        assert_eq!(params["status"], Value::from("active"));
        assert_eq!(params["org"], Value::Integer(1));
        let keys: Vec<_> = params.keys().map(String::as_str).collect();
        assert_eq!(keys, ["status", "org"]);

        c.reset_filters();
        assert_eq!(c.query_params()["status"], Value::from("archived"));
    }
}
