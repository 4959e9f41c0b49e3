//! Property-based test generators using proptest.

use proptest::prelude::*;
use resorm_codec::{FilterOperator, Value};

/// Strategy for scalar values that survive a JSON round trip.
pub fn scalar_value_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::Integer),
        "[a-zA-Z0-9 ]{0,16}".prop_map(Value::Text),
    ]
}

/// Strategy for snake_case field names.
pub fn field_name_strategy() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9]{0,6}(_[a-z0-9]{1,6}){0,2}"
}

/// Strategy for filter operators, `None` meaning equality.
pub fn operator_strategy() -> impl Strategy<Value = Option<FilterOperator>> {
    prop_oneof![
        Just(None),
        proptest::sample::select(FilterOperator::ALL.to_vec()).prop_map(Some),
    ]
}

/// Strategy for post rows as `(title, views)` pairs.
pub fn post_rows_strategy(max: usize) -> impl Strategy<Value = Vec<(String, i64)>> {
    prop::collection::vec(("[a-z]{1,8}", 0i64..1000), 0..max)
}

/// Strategy for `(page, per_page)` pairs with 1-based pages.
pub fn page_strategy() -> impl Strategy<Value = (u64, u64)> {
    (1u64..6, 1u64..12)
}
