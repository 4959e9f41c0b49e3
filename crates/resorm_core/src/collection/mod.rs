//! Collections.
//!
//! A [`Collection`] is an ordered, queryable and paginated set of entities
//! backed by a list endpoint (`{namespace}/{table}`). It owns the query
//! builder state, replaces its items wholesale on every fetch, and can
//! reconcile the changes of all its items in one bulk PATCH.

mod persist;
mod query;

pub use query::FilterScope;

use crate::entity::Entity;
use crate::error::{ModelError, ModelResult};
use crate::record::RecordInfo;
use resorm_codec::{join_path, FilterSet, Pagination, Payload, SortSpec, Value};
use resorm_transport::Transport;
use std::fmt;
use std::sync::Arc;

/// An ordered set of entities of one record type.
#[derive(Clone)]
pub struct Collection {
    record: Arc<RecordInfo>,
    transport: Arc<dyn Transport>,
    items: Vec<Entity>,
    total_count: u64,
    transient_filters: FilterSet,
    persistent_filters: FilterSet,
    sort: SortSpec,
    pagination: Pagination,
    persistent_attributes: Payload,
    scope: Option<String>,
    is_loading: bool,
}

impl Collection {
    /// Creates an empty collection.
    pub fn new(record: Arc<RecordInfo>, transport: Arc<dyn Transport>) -> Self {
        Self {
            record,
            transport,
            items: Vec::new(),
            total_count: 0,
            transient_filters: FilterSet::new(),
            persistent_filters: FilterSet::new(),
            sort: SortSpec::new(),
            pagination: Pagination::default(),
            persistent_attributes: Payload::new(),
            scope: None,
            is_loading: false,
        }
    }

    /// Record metadata of the items.
    pub fn record(&self) -> &Arc<RecordInfo> {
        &self.record
    }

    /// Table name.
    pub fn table(&self) -> &str {
        self.record.table()
    }

    /// Transport used by remote operations.
    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// Items, in server order.
    pub fn items(&self) -> &[Entity] {
        &self.items
    }

    /// Items, mutably.
    pub fn items_mut(&mut self) -> &mut [Entity] {
        &mut self.items
    }

    /// Iterates over the items.
    pub fn iter(&self) -> std::slice::Iter<'_, Entity> {
        self.items.iter()
    }

    /// Number of items held locally.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if no item is held locally.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Total reported by the last fetch, independent of [`len`](Self::len).
    pub fn total_count(&self) -> u64 {
        self.total_count
    }

    /// True while a remote operation on this collection is in flight.
    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    // =========================================================================
    // Items
    // =========================================================================

    /// Attributes stamped onto every item added to the collection, keyed by
    /// wire name.
    pub fn persistent_attributes(&self) -> &Payload {
        &self.persistent_attributes
    }

    /// Adds an attribute stamped onto every item added from now on.
    pub fn add_persistent_attribute(&mut self, key: &str, value: impl Into<Value>) -> &mut Self {
        self.persistent_attributes.insert(key.to_string(), value.into());
        self
    }

    pub(crate) fn stamp(&self, item: &mut Entity) -> ModelResult<()> {
        for (key, value) in &self.persistent_attributes {
            item.set_attribute(key, value.clone())?;
        }
        Ok(())
    }

    /// Stamps the persistent attributes onto `item` and appends it.
    pub fn add_item(&mut self, mut item: Entity) -> ModelResult<&mut Self> {
        self.stamp(&mut item)?;
        self.items.push(item);
        Ok(self)
    }

    /// Builds an item from remote data and appends it.
    pub fn add_item_from_data(&mut self, data: &Value) -> ModelResult<&mut Self> {
        let item = self.record.make_from(&self.transport, data)?;
        self.add_item(item)
    }

    /// Replaces the items with entities built from `rows`, in order.
    /// Null clears the collection.
    pub fn load(&mut self, rows: &Value) -> ModelResult<()> {
        let rows = match rows {
            Value::Null => &[][..],
            Value::Array(rows) => rows.as_slice(),
            other => {
                return Err(ModelError::invalid_payload(
                    self.record.table(),
                    format!("expected a list of rows, got {}", other.kind()),
                ))
            }
        };

        let mut items = Vec::with_capacity(rows.len());
        for row in rows {
            let mut item = self.record.make_from(&self.transport, row)?;
            self.stamp(&mut item)?;
            items.push(item);
        }
        self.items = items;
        Ok(())
    }

    /// Serialized state of every item.
    pub fn to_json(&self) -> ModelResult<Value> {
        self.items
            .iter()
            .map(|item| item.to_json().map(Value::Map))
            .collect::<ModelResult<Vec<_>>>()
            .map(Value::Array)
    }

    // =========================================================================
    // Lookup
    // =========================================================================

    /// First item whose attribute loosely equals `value`.
    pub fn find_by(&self, key: &str, value: impl Into<Value>) -> Option<&Entity> {
        let index = self.find_index_by(key, value)?;
        self.items.get(index)
    }

    /// First item whose attribute loosely equals `value`, mutably.
    pub fn find_by_mut(&mut self, key: &str, value: impl Into<Value>) -> Option<&mut Entity> {
        let index = self.find_index_by(key, value)?;
        self.items.get_mut(index)
    }

    /// Position of the first item whose attribute loosely equals `value`.
    pub fn find_index_by(&self, key: &str, value: impl Into<Value>) -> Option<usize> {
        let value = value.into();
        self.items.iter().position(|item| {
            item.get_attribute(key)
                .is_ok_and(|current| current.loose_eq(&value))
        })
    }

    /// Removes and returns the first matching item.
    pub fn remove_by(&mut self, key: &str, value: impl Into<Value>) -> Option<Entity> {
        let index = self.find_index_by(key, value)?;
        Some(self.items.remove(index))
    }

    // =========================================================================
    // URL
    // =========================================================================

    /// Parent scope replacing `{namespace}/{table}`, set by nested relations.
    pub fn scope(&self) -> Option<&str> {
        self.scope.as_deref()
    }

    /// Sets or clears the parent scope.
    pub fn set_scope(&mut self, scope: Option<String>) -> &mut Self {
        self.scope = scope;
        self
    }

    /// List endpoint, optionally with a trailing segment.
    pub fn url(&self, append: Option<&str>) -> String {
        let append = append.unwrap_or_default();
        match &self.scope {
            Some(scope) => join_path([scope.as_str(), append]),
            None => join_path([self.record.namespace(), self.record.table(), append]),
        }
    }
}

impl fmt::Debug for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collection")
            .field("table", &self.record.table())
            .field("items", &self.items)
            .field("total_count", &self.total_count)
            .field("scope", &self.scope)
            .finish_non_exhaustive()
    }
}

impl<'a> IntoIterator for &'a Collection {
    type Item = &'a Entity;
    type IntoIter = std::slice::Iter<'a, Entity>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_records::{post, transport, user};

    fn rows() -> Value {
        Value::Array(vec![
            Value::map([("id", Value::from(1)), ("title", Value::from("first"))]),
            Value::map([("id", Value::from(2)), ("title", Value::from("second"))]),
            Value::map([("id", Value::from(3)), ("title", Value::from("third"))]),
        ])
    }

    #[test]
    fn load_replaces_items_in_order() {
        let (_, transport) = transport();
        let mut posts = post().collection(&transport);
        posts.add_item(post().make(&transport)).unwrap();
        posts.load(&rows()).unwrap();

        assert_eq!(posts.len(), 3);
        let titles: Vec<_> = posts
            .iter()
            .map(|p| p.get_attribute("title").unwrap().to_string())
            .collect();
        assert_eq!(titles, ["first", "second", "third"]);
        assert!(posts.iter().all(|p| !p.is_new()));

        posts.load(&Value::Null).unwrap();
        assert!(posts.is_empty());
    }

    #[test]
    fn load_rejects_non_lists() {
        let (_, transport) = transport();
        let mut posts = post().collection(&transport);
        assert!(matches!(
            posts.load(&Value::map([("id", 1)])),
            Err(ModelError::InvalidPayload { .. })
        ));
    }

    #[test]
    fn persistent_attributes_are_stamped_on_every_item() {
        let (_, transport) = transport();
        let mut posts = post().collection(&transport);
        posts.add_persistent_attribute("user_id", 5);

        posts.load(&rows()).unwrap();
        posts
            .add_item_from_data(&Value::map([("id", 4)]))
            .unwrap()
            .add_item(post().make(&transport))
            .unwrap();

        assert_eq!(posts.len(), 5);
        assert!(posts
            .iter()
            .all(|p| p.get_attribute("UserId").unwrap() == &Value::Integer(5)));
    }

    #[test]
    fn lookup_uses_loose_equality() {
        let (_, transport) = transport();
        let mut posts = post().collection(&transport);
        posts.load(&rows()).unwrap();

        assert_eq!(posts.find_index_by("id", "2"), Some(1));
        assert_eq!(
            posts.find_by("title", "third").map(|p| p.primary_key_value().unwrap().clone()),
            Some(Value::Integer(3))
        );
        assert!(posts.find_by("missing", 1).is_none());

        posts
            .find_by_mut("id", 1)
            .unwrap()
            .set_attribute("title", "edited")
            .unwrap();
        assert!(posts.items()[0].has_changed());

        let removed = posts.remove_by("id", 2.0).unwrap();
        assert_eq!(removed.primary_key_value().unwrap(), &Value::Integer(2));
        assert_eq!(posts.len(), 2);
        assert!(posts.remove_by("id", 99).is_none());
    }

    #[test]
    fn urls() {
        let (_, transport) = transport();
        let mut users = user().collection(&transport);
        assert_eq!(users.url(None), "admin/users");
        assert_eq!(users.url(Some("active")), "admin/users/active");

        users.set_scope(Some("company/3/users".into()));
        assert_eq!(users.url(None), "company/3/users");
        assert_eq!(users.scope(), Some("company/3/users"));
    }

    #[test]
    fn to_json_serializes_items() {
        let (_, transport) = transport();
        let mut posts = post().collection(&transport);
        posts.load(&rows()).unwrap();
        let json = posts.to_json().unwrap();
        let rows = json.as_array().unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].get("title"), Some(&Value::from("first")));
    }
}
