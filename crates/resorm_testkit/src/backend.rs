//! An in-memory REST backend.
//!
//! [`InMemoryBackend`] implements [`Transport`] by serving requests from
//! in-memory tables, following the same URL and envelope conventions as
//! the real API:
//!
//! | Request | Meaning |
//! |---|---|
//! | `GET .../{table}` | list, with filters, `limit`, `sort-by` and `count` |
//! | `GET .../{parent}/{id}/{table}` | list scoped to `{parent}_id = id` |
//! | `PATCH .../{table}` | bulk patch, body keyed by primary key |
//! | `POST .../{name}` | create |
//! | `GET .../{name}/{id}` | show |
//! | `PATCH .../{name}/{id}` | update |
//! | `DELETE .../{name}/{id}` | delete |
//!
//! Leading namespace segments are ignored.

use async_trait::async_trait;
use indexmap::IndexMap;
use parking_lot::Mutex;
use resorm_codec::{FilterOperator, Payload, Value, LIMIT_PARAM, SORT_PARAM};
use resorm_transport::{ApiResponse, Method, Request, Transport};
use std::cmp::Ordering;
use std::collections::VecDeque;
use tracing::debug;

/// Error code of a failed required-field check.
pub const VALIDATION_FAILED: &str = "E-VALIDATION";

/// Error code of an unknown route or row.
pub const NOT_FOUND: &str = "E-NOT-FOUND";

const PRIMARY_KEY: &str = "id";

#[derive(Debug)]
struct Resource {
    name: String,
    table: String,
    required: Vec<String>,
}

#[derive(Debug, Default)]
struct Table {
    rows: IndexMap<i64, Payload>,
    next_id: i64,
}

impl Table {
    fn insert(&mut self, mut row: Payload) -> i64 {
        let id = match row.get(PRIMARY_KEY).and_then(Value::as_i64) {
            Some(id) => id,
            None => {
                self.next_id += 1;
                self.next_id
            }
        };
        self.next_id = self.next_id.max(id);
        row.insert(PRIMARY_KEY.to_string(), Value::Integer(id));
        self.rows.insert(id, row);
        id
    }
}

#[derive(Debug)]
enum Route<'a> {
    List {
        resource: &'a Resource,
        scope: Option<(String, Value)>,
    },
    Create {
        resource: &'a Resource,
    },
    Item {
        resource: &'a Resource,
        id: Option<i64>,
    },
}

/// An in-memory implementation of the REST API.
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    resources: Vec<Resource>,
    tables: Mutex<IndexMap<String, Table>>,
    scripted: Mutex<VecDeque<ApiResponse>>,
    requests: Mutex<Vec<Request>>,
}

impl InMemoryBackend {
    /// Creates a backend serving no resource.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a resource by singular name and table, with the fields a
    /// create or update must leave non-blank.
    pub fn with_resource(mut self, name: &str, table: &str, required: &[&str]) -> Self {
        self.resources.push(Resource {
            name: name.to_string(),
            table: table.to_string(),
            required: required.iter().map(|f| f.to_string()).collect(),
        });
        self.tables.lock().entry(table.to_string()).or_default();
        self
    }

    /// Inserts a row and returns its primary key. A row without an integer
    /// `id` gets the next free one.
    pub fn insert(&self, table: &str, row: Payload) -> i64 {
        self.tables
            .lock()
            .entry(table.to_string())
            .or_default()
            .insert(row)
    }

    /// A row by primary key.
    pub fn row(&self, table: &str, id: i64) -> Option<Payload> {
        self.tables.lock().get(table)?.rows.get(&id).cloned()
    }

    /// Every row of a table, in insertion order.
    pub fn rows(&self, table: &str) -> Vec<Payload> {
        self.tables
            .lock()
            .get(table)
            .map(|t| t.rows.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Answers the next request with `response` instead of serving it.
    pub fn fail_next(&self, response: ApiResponse) {
        self.scripted.lock().push_back(response);
    }

    /// Every request received so far.
    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().clone()
    }

    /// The most recent request.
    pub fn last_request(&self) -> Option<Request> {
        self.requests.lock().last().cloned()
    }

    /// Number of requests received so far.
    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    fn resource_by_table(&self, table: &str) -> Option<&Resource> {
        self.resources.iter().find(|r| r.table == table)
    }

    fn resource_by_name(&self, name: &str) -> Option<&Resource> {
        self.resources.iter().find(|r| r.name == name)
    }

    fn route(&self, endpoint: &str) -> Option<Route<'_>> {
        let segments: Vec<&str> = endpoint.split('/').filter(|s| !s.is_empty()).collect();
        let (last, rest) = segments.split_last()?;

        if let Some(resource) = self.resource_by_table(last) {
            let scope = match rest {
                [.., parent, id] => self
                    .resource_by_name(parent)
                    .map(|p| (format!("{}_id", p.name), Value::from(*id))),
                _ => None,
            };
            return Some(Route::List { resource, scope });
        }
        if let Some(resource) = self.resource_by_name(last) {
            return Some(Route::Create { resource });
        }
        let resource = self.resource_by_name(rest.last()?)?;
        Some(Route::Item {
            resource,
            id: last.parse().ok(),
        })
    }

    fn serve(&self, request: &Request) -> ApiResponse {
        let Some(route) = self.route(&request.endpoint) else {
            return not_found(&request.endpoint);
        };
        match (request.method, route) {
            (Method::Get, Route::List { resource, scope }) => self.list(resource, scope, &request.data),
            (Method::Patch, Route::List { resource, .. }) => self.bulk_patch(resource, &request.data),
            (Method::Post, Route::Create { resource }) => self.create(resource, &request.data),
            (method, Route::Item { resource, id: Some(id) }) => match method {
                Method::Get => self.show(resource, id),
                Method::Patch => self.patch(resource, id, &request.data),
                Method::Delete => self.delete(resource, id),
                Method::Post => not_found(&request.endpoint),
            },
            _ => not_found(&request.endpoint),
        }
    }

    fn list(&self, resource: &Resource, scope: Option<(String, Value)>, params: &Payload) -> ApiResponse {
        let tables = self.tables.lock();
        let mut rows: Vec<&Payload> = tables
            .get(&resource.table)
            .map(|t| t.rows.values().collect())
            .unwrap_or_default();

        if let Some((field, value)) = &scope {
            rows.retain(|row| field_value(row, field).loose_eq(value));
        }
        for (key, expected) in params {
            if key == LIMIT_PARAM || key == SORT_PARAM {
                continue;
            }
            rows.retain(|row| matches_filter(row, key, expected));
        }
        if let Some(sort) = params.get(SORT_PARAM) {
            sort_rows(&mut rows, &sort.to_param_string());
        }

        let count = rows.len();
        let (offset, limit) = params
            .get(LIMIT_PARAM)
            .map(|limit| parse_limit(&limit.to_param_string()))
            .unwrap_or((0, None));
        let page: Vec<Value> = rows
            .into_iter()
            .skip(offset)
            .take(limit.unwrap_or(usize::MAX))
            .map(|row| Value::Map(row.clone()))
            .collect();

        ApiResponse::success()
            .with_data(resource.table.clone(), Value::Array(page))
            .with_data("count", count)
    }

    fn show(&self, resource: &Resource, id: i64) -> ApiResponse {
        match self.row(&resource.table, id) {
            Some(row) => ApiResponse::success().with_data(resource.name.clone(), Value::Map(row)),
            None => not_found(&format!("{}/{id}", resource.name)),
        }
    }

    fn create(&self, resource: &Resource, data: &Payload) -> ApiResponse {
        if let Some(failure) = validate(resource, data) {
            return failure;
        }
        let mut row = data.clone();
        row.shift_remove(PRIMARY_KEY);
        let id = self.insert(&resource.table, row);
        self.show(resource, id)
    }

    fn patch(&self, resource: &Resource, id: i64, data: &Payload) -> ApiResponse {
        let Some(mut row) = self.row(&resource.table, id) else {
            return not_found(&format!("{}/{id}", resource.name));
        };
        merge(&mut row, data);
        if let Some(failure) = validate(resource, &row) {
            return failure;
        }
        self.insert(&resource.table, row);
        self.show(resource, id)
    }

    fn bulk_patch(&self, resource: &Resource, data: &Payload) -> ApiResponse {
        let mut tables = self.tables.lock();
        let table = tables.entry(resource.table.clone()).or_default();

        let mut updated = Vec::new();
        for (key, diff) in data {
            let (Ok(id), Some(diff)) = (key.parse::<i64>(), diff.as_map()) else {
                continue;
            };
            if let Some(row) = table.rows.get_mut(&id) {
                merge(row, diff);
                updated.push(Value::Map(row.clone()));
            }
        }
        ApiResponse::success().with_data(resource.table.clone(), Value::Array(updated))
    }

    fn delete(&self, resource: &Resource, id: i64) -> ApiResponse {
        let removed = self
            .tables
            .lock()
            .get_mut(&resource.table)
            .and_then(|t| t.rows.shift_remove(&id));
        match removed {
            Some(_) => ApiResponse::success(),
            None => not_found(&format!("{}/{id}", resource.name)),
        }
    }
}

#[async_trait]
impl Transport for InMemoryBackend {
    async fn send(&self, request: Request) -> ApiResponse {
        debug!(method = %request.method, endpoint = %request.endpoint, "in-memory request");
        let scripted = self.scripted.lock().pop_front();
        let response = scripted.unwrap_or_else(|| self.serve(&request));
        self.requests.lock().push(request);
        response
    }
}

fn not_found(what: &str) -> ApiResponse {
    ApiResponse::failure(NOT_FOUND, format!("{what} not found")).with_status(404)
}

fn field_value<'a>(row: &'a Payload, field: &str) -> &'a Value {
    row.get(field).unwrap_or(&Value::Null)
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Text(s) => s.trim().is_empty(),
        _ => false,
    }
}

fn validate(resource: &Resource, row: &Payload) -> Option<ApiResponse> {
    let missing: Vec<&String> = resource
        .required
        .iter()
        .filter(|field| is_blank(field_value(row, field)))
        .collect();
    if missing.is_empty() {
        return None;
    }
    let response = missing.into_iter().fold(
        ApiResponse::failure(VALIDATION_FAILED, "Invalid data").with_status(422),
        |response, field| response.with_validation_error(field.clone(), "is required"),
    );
    Some(response)
}

fn merge(row: &mut Payload, diff: &Payload) {
    for (key, value) in diff {
        if key != PRIMARY_KEY {
            row.insert(key.clone(), value.clone());
        }
    }
}

fn number(value: &Value) -> Option<f64> {
    value
        .as_f64()
        .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
}

fn compare(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Less,
        (_, Value::Null) => Ordering::Greater,
        _ => match (number(a), number(b)) {
            (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
            _ => a.to_param_string().cmp(&b.to_param_string()),
        },
    }
}

fn list_values(value: &Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items.clone(),
        other => other
            .to_param_string()
            .split(',')
            .map(|part| Value::from(part.trim()))
            .collect(),
    }
}

fn matches_filter(row: &Payload, key: &str, expected: &Value) -> bool {
    let (field, operator) = match key.rsplit_once('-') {
        Some((field, token)) => match FilterOperator::from_token(token) {
            Some(op) => (field, Some(op)),
            None => (key, None),
        },
        None => (key, None),
    };
    let actual = field_value(row, field);
    let text = || (actual.to_param_string(), expected.to_param_string());

    match operator {
        None => actual.loose_eq(expected),
        Some(FilterOperator::NotEquals) => !actual.loose_eq(expected),
        Some(FilterOperator::GreaterThan) => !actual.is_null() && compare(actual, expected).is_gt(),
        Some(FilterOperator::GreaterThanOrEquals) => {
            !actual.is_null() && compare(actual, expected).is_ge()
        }
        Some(FilterOperator::LessThan) => !actual.is_null() && compare(actual, expected).is_lt(),
        Some(FilterOperator::LessThanOrEquals) => {
            !actual.is_null() && compare(actual, expected).is_le()
        }
        Some(FilterOperator::IsNull) => actual.is_null(),
        Some(FilterOperator::IsNotNull) => !actual.is_null(),
        Some(op @ (FilterOperator::Between | FilterOperator::NotBetween)) => {
            let bounds = list_values(expected);
            let inside = match bounds.as_slice() {
                [low, high] => {
                    !actual.is_null() && compare(actual, low).is_ge() && compare(actual, high).is_le()
                }
                _ => false,
            };
            inside == (op == FilterOperator::Between)
        }
        Some(op @ (FilterOperator::In | FilterOperator::NotIn)) => {
            let found = list_values(expected).iter().any(|v| actual.loose_eq(v));
            found == (op == FilterOperator::In)
        }
        Some(FilterOperator::StartsWith) => {
            let (a, e) = text();
            a.starts_with(&e)
        }
        Some(FilterOperator::EndsWith) => {
            let (a, e) = text();
            a.ends_with(&e)
        }
        Some(FilterOperator::Contains) => {
            let (a, e) = text();
            a.contains(&e)
        }
    }
}

fn sort_rows(rows: &mut [&Payload], spec: &str) {
    let columns: Vec<(&str, bool)> = spec
        .split(';')
        .filter_map(|pair| {
            let (column, direction) = pair.split_once(',')?;
            Some((column, direction.eq_ignore_ascii_case("DESC")))
        })
        .collect();

    rows.sort_by(|a, b| {
        columns
            .iter()
            .map(|(column, desc)| {
                let ordering = compare(field_value(a, column), field_value(b, column));
                if *desc {
                    ordering.reverse()
                } else {
                    ordering
                }
            })
            .find(|o| o.is_ne())
            .unwrap_or(Ordering::Equal)
    });
}

fn parse_limit(limit: &str) -> (usize, Option<usize>) {
    match limit.split_once(',') {
        Some((offset, count)) => (offset.trim().parse().unwrap_or(0), count.trim().parse().ok()),
        None => (0, limit.trim().parse().ok()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{fixture_backend, payload};

    fn seeded() -> InMemoryBackend {
        let backend = fixture_backend();
        for (title, views, user) in [("alpha", 5, 1), ("beta", 12, 1), ("gamma", 7, 2), ("delta", 30, 2)] {
            backend.insert(
                "posts",
                payload([
                    ("title", Value::from(title)),
                    ("views", Value::from(views)),
                    ("user_id", Value::from(user)),
                ]),
            );
        }
        backend
    }

    fn titles(response: &ApiResponse) -> Vec<String> {
        response
            .data("posts")
            .and_then(Value::as_array)
            .unwrap()
            .iter()
            .map(|row| row.get("title").unwrap().to_string())
            .collect()
    }

    #[test]
    fn routes() {
        let backend = fixture_backend();
        assert!(matches!(backend.route("api/users"), Some(Route::List { scope: None, .. })));
        assert!(matches!(
            backend.route("user/3/posts"),
            Some(Route::List { scope: Some((ref f, _)), .. }) if f == "user_id"
        ));
        assert!(matches!(backend.route("api/user"), Some(Route::Create { .. })));
        assert!(matches!(backend.route("api/user/3"), Some(Route::Item { id: Some(3), .. })));
        assert!(backend.route("api/unknown").is_none());
    }

    #[tokio::test]
    async fn list_filters_sorts_and_pages() {
        let backend = seeded();
        let params = payload([
            ("views-GTE", Value::from(6)),
            ("sort-by", Value::from("views,DESC")),
            ("limit", Value::from("1,2")),
        ]);
        let response = backend.get("posts", params).await;

        assert!(response.is_successful());
        assert_eq!(titles(&response), ["beta", "gamma"]);
        assert_eq!(response.data("count"), Some(&Value::Integer(3)));
    }

    #[tokio::test]
    async fn list_operators() {
        let backend = seeded();
        let cases = [
            ("title-STARTSWITH", Value::from("g"), vec!["gamma"]),
            ("title-IN", Value::from("alpha,delta"), vec!["alpha", "delta"]),
            ("views-BETWEEN", Value::from("6,15"), vec!["beta", "gamma"]),
            ("views-NOTBETWEEN", Value::from("6,15"), vec!["alpha", "delta"]),
            ("user_id-NOTEQ", Value::from(1), vec!["gamma", "delta"]),
            ("body-NULL", Value::from("null"), vec!["alpha", "beta", "gamma", "delta"]),
        ];
        for (key, value, expected) in cases {
            let response = backend.get("posts", payload([(key, value)])).await;
            assert_eq!(titles(&response), expected, "{key}");
        }
    }

    #[tokio::test]
    async fn nested_list_is_scoped_to_the_parent() {
        let backend = seeded();
        let response = backend.get("user/2/posts", Payload::new()).await;
        assert_eq!(titles(&response), ["gamma", "delta"]);
    }

    #[tokio::test]
    async fn create_validates_required_fields() {
        let backend = fixture_backend();
        let response = backend.post("api/user", payload([("name", "ann")])).await;
        assert!(!response.is_successful());
        assert_eq!(response.error_code(), VALIDATION_FAILED);
        assert_eq!(response.validation_errors()["email"], "is required");

        let response = backend
            .post("api/user", payload([("name", "ann"), ("email", "ann@x.io")]))
            .await;
        assert!(response.is_successful());
        assert_eq!(response.data("user").unwrap().get("id"), Some(&Value::Integer(1)));
    }

    #[tokio::test]
    async fn item_lifecycle() {
        let backend = seeded();
        let response = Transport::patch(&backend, "post/2", payload([("views", 13)])).await;
        assert_eq!(response.data("post").unwrap().get("views"), Some(&Value::Integer(13)));

        assert!(Transport::delete(&backend, "post/2", Payload::new()).await.is_successful());
        let response = backend.get("post/2", Payload::new()).await;
        assert_eq!(response.error_code(), NOT_FOUND);
        assert_eq!(response.status(), Some(404));
    }

    #[tokio::test]
    async fn bulk_patch_returns_updated_rows() {
        let backend = seeded();
        let body = payload([
            ("1", Value::map([("title", "ALPHA")])),
            ("99", Value::map([("title", "ghost")])),
        ]);
        let response = Transport::patch(&backend, "posts", body).await;
        assert_eq!(titles(&response), ["ALPHA"]);
        assert_eq!(backend.row("posts", 1).unwrap()["title"], Value::from("ALPHA"));
    }

    #[tokio::test]
    async fn scripted_failures_take_precedence() {
        let backend = seeded();
        backend.fail_next(ApiResponse::transport_failure("down"));
        assert!(!backend.get("posts", Payload::new()).await.is_successful());
        assert!(backend.get("posts", Payload::new()).await.is_successful());
        assert_eq!(backend.request_count(), 2);
    }
}
