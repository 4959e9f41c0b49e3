//! Record metadata.
//!
//! A [`RecordInfo`] describes one entity type: its singular name, table,
//! namespace, primary key, declared fields and declared relations. It is
//! built once with a [`RecordBuilder`] and shared through an `Arc` by every
//! entity and collection of that type.

use crate::collection::Collection;
use crate::entity::Entity;
use crate::error::ModelResult;
use crate::relation::{RelationDescriptor, Related};
use indexmap::IndexMap;
use resorm_codec::{NamingConvention, SnakeCaseWire, Value};
use resorm_transport::Transport;
use std::fmt;
use std::sync::Arc;

/// Default primary key wire name.
pub const DEFAULT_PRIMARY_KEY: &str = "id";

/// Declared kind of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FieldKind {
    /// Accepts any value.
    #[default]
    Any,
    /// Boolean.
    Bool,
    /// Integer.
    Integer,
    /// Float. Integers are accepted too.
    Float,
    /// Text.
    Text,
    /// Array.
    Array,
    /// Map.
    Map,
    /// Nested entity or collection; accepts maps as raw values.
    Nested,
}

impl FieldKind {
    /// Returns true if `value` may be assigned to a field of this kind.
    /// Null is always accepted.
    pub fn accepts(self, value: &Value) -> bool {
        match (self, value) {
            (_, Value::Null) | (FieldKind::Any, _) => true,
            (FieldKind::Bool, Value::Bool(_))
            | (FieldKind::Integer, Value::Integer(_))
            | (FieldKind::Float, Value::Float(_) | Value::Integer(_))
            | (FieldKind::Text, Value::Text(_))
            | (FieldKind::Array, Value::Array(_))
            | (FieldKind::Map | FieldKind::Nested, Value::Map(_)) => true,
            _ => false,
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldKind::Any => "any",
            FieldKind::Bool => "bool",
            FieldKind::Integer => "integer",
            FieldKind::Float => "float",
            FieldKind::Text => "text",
            FieldKind::Array => "array",
            FieldKind::Map => "map",
            FieldKind::Nested => "nested",
        };
        f.write_str(name)
    }
}

/// A declared field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDef {
    /// Name on the wire.
    pub wire_name: String,
    /// Name in memory.
    pub memory_name: String,
    /// Declared kind.
    pub kind: FieldKind,
    /// Value a fresh entity starts with.
    pub default: Value,
}

/// Metadata for one entity type.
pub struct RecordInfo {
    name: String,
    table: String,
    namespace: String,
    primary_key: String,
    primary_key_memory: String,
    fields: IndexMap<String, FieldDef>,
    relations: IndexMap<String, RelationDescriptor>,
    naming: Arc<dyn NamingConvention>,
    strict: bool,
}

impl RecordInfo {
    /// Starts declaring a record with a singular name.
    pub fn builder(name: impl Into<String>) -> RecordBuilder {
        RecordBuilder::new(name)
    }

    /// Singular name (e.g. `user`).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Plural name used by list endpoints and list payloads (e.g. `users`).
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Path prefix, possibly empty.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Primary key wire name.
    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }

    /// Primary key memory name.
    pub fn primary_key_memory(&self) -> &str {
        &self.primary_key_memory
    }

    /// False for dynamic records that accept any attribute.
    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// Naming convention for keys outside the field table.
    pub fn naming(&self) -> &dyn NamingConvention {
        self.naming.as_ref()
    }

    /// Declared fields, in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = &FieldDef> {
        self.fields.values()
    }

    /// Looks up a field by wire or memory name.
    pub fn field(&self, key: &str) -> Option<&FieldDef> {
        self.fields
            .get(key)
            .or_else(|| self.fields.values().find(|f| f.memory_name == key))
    }

    /// Translates a key in either convention to its memory name.
    pub fn memory_name(&self, key: &str) -> String {
        match self.field(key) {
            Some(field) => field.memory_name.clone(),
            None => self.naming.to_memory(key),
        }
    }

    /// Translates a memory name to its wire name.
    pub fn wire_name(&self, memory: &str) -> String {
        match self.fields.values().find(|f| f.memory_name == memory) {
            Some(field) => field.wire_name.clone(),
            None => self.naming.to_wire(memory),
        }
    }

    /// Returns true if `memory` names the primary key.
    pub fn is_primary_key(&self, memory: &str) -> bool {
        memory == self.primary_key_memory
    }

    /// Declared relations keyed by memory name, in declaration order.
    pub fn relations(&self) -> impl Iterator<Item = (&str, &RelationDescriptor)> {
        self.relations.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Looks up a relation by wire or memory name, returning its memory
    /// name and descriptor.
    pub fn relation(&self, name: &str) -> Option<(&str, &RelationDescriptor)> {
        if let Some((key, descriptor)) = self.relations.get_key_value(name) {
            return Some((key.as_str(), descriptor));
        }
        let memory = self.naming.to_memory(name);
        self.relations
            .get_key_value(&memory)
            .map(|(key, descriptor)| (key.as_str(), descriptor))
    }

    /// Creates a fresh entity of this type.
    pub fn make(self: &Arc<Self>, transport: &Arc<dyn Transport>) -> Entity {
        Entity::new(Arc::clone(self), Arc::clone(transport))
    }

    /// Creates an entity and loads `data` into it.
    pub fn make_from(self: &Arc<Self>, transport: &Arc<dyn Transport>, data: &Value) -> ModelResult<Entity> {
        let mut entity = self.make(transport);
        entity.load(data)?;
        Ok(entity)
    }

    /// Creates an empty collection of this type.
    pub fn collection(self: &Arc<Self>, transport: &Arc<dyn Transport>) -> Collection {
        Collection::new(Arc::clone(self), Arc::clone(transport))
    }
}

impl fmt::Debug for RecordInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordInfo")
            .field("name", &self.name)
            .field("table", &self.table)
            .field("namespace", &self.namespace)
            .field("primary_key", &self.primary_key)
            .field("fields", &self.fields.keys().collect::<Vec<_>>())
            .field("relations", &self.relations.keys().collect::<Vec<_>>())
            .field("strict", &self.strict)
            .finish()
    }
}

/// Builder for [`RecordInfo`].
///
/// ```
/// use resorm_core::{FieldKind, RecordInfo};
///
/// let user = RecordInfo::builder("user")
///     .namespace("admin")
///     .field("user_name", FieldKind::Text)
///     .field_with_default("active", FieldKind::Bool, true)
///     .build();
///
/// assert_eq!(user.table(), "users");
/// assert_eq!(user.memory_name("user_name"), "UserName");
/// assert_eq!(user.primary_key_memory(), "Id");
/// ```
pub struct RecordBuilder {
    name: String,
    table: Option<String>,
    namespace: String,
    primary_key: String,
    fields: Vec<(String, Option<String>, FieldKind, Value)>,
    relations: Vec<(String, RelationDescriptor)>,
    naming: Arc<dyn NamingConvention>,
    strict: bool,
}

impl RecordBuilder {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table: None,
            namespace: String::new(),
            primary_key: DEFAULT_PRIMARY_KEY.to_string(),
            fields: Vec::new(),
            relations: Vec::new(),
            naming: Arc::new(SnakeCaseWire),
            strict: true,
        }
    }

    /// Sets the table name. Defaults to the name with an `s` appended.
    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    /// Sets the namespace.
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Sets the primary key wire name.
    pub fn primary_key(mut self, primary_key: impl Into<String>) -> Self {
        self.primary_key = primary_key.into();
        self
    }

    /// Declares a field defaulting to null.
    pub fn field(self, wire_name: impl Into<String>, kind: FieldKind) -> Self {
        self.field_with_default(wire_name, kind, Value::Null)
    }

    /// Declares a field with a default value.
    pub fn field_with_default(
        mut self,
        wire_name: impl Into<String>,
        kind: FieldKind,
        default: impl Into<Value>,
    ) -> Self {
        self.fields.push((wire_name.into(), None, kind, default.into()));
        self
    }

    /// Declares a field whose memory name is not derived by the naming
    /// convention.
    pub fn field_as(
        mut self,
        wire_name: impl Into<String>,
        memory_name: impl Into<String>,
        kind: FieldKind,
    ) -> Self {
        self.fields
            .push((wire_name.into(), Some(memory_name.into()), kind, Value::Null));
        self
    }

    /// Declares a relation.
    pub fn relation(mut self, name: impl Into<String>, descriptor: RelationDescriptor) -> Self {
        self.relations.push((name.into(), descriptor));
        self
    }

    /// Declares a has-one relation with default keys.
    pub fn has_one<F>(self, name: impl Into<String>, producer: F) -> Self
    where
        F: Fn(&Arc<dyn Transport>) -> Related + Send + Sync + 'static,
    {
        self.relation(name, RelationDescriptor::has_one(producer))
    }

    /// Declares a belongs-to relation with default keys.
    pub fn belongs_to<F>(self, name: impl Into<String>, producer: F) -> Self
    where
        F: Fn(&Arc<dyn Transport>) -> Related + Send + Sync + 'static,
    {
        self.relation(name, RelationDescriptor::belongs_to(producer))
    }

    /// Declares a has-many relation with default keys.
    pub fn has_many<F>(self, name: impl Into<String>, producer: F) -> Self
    where
        F: Fn(&Arc<dyn Transport>) -> Related + Send + Sync + 'static,
    {
        self.relation(name, RelationDescriptor::has_many(producer))
    }

    /// Declares a has-many-through relation with default keys.
    pub fn has_many_through<F>(
        self,
        name: impl Into<String>,
        discriminator: impl Into<String>,
        producer: F,
    ) -> Self
    where
        F: Fn(&Arc<dyn Transport>) -> Related + Send + Sync + 'static,
    {
        self.relation(name, RelationDescriptor::has_many_through(discriminator, producer))
    }

    /// Sets the naming convention.
    pub fn naming(mut self, naming: impl NamingConvention + 'static) -> Self {
        self.naming = Arc::new(naming);
        self
    }

    /// Accepts undeclared attributes instead of rejecting them.
    pub fn dynamic(mut self) -> Self {
        self.strict = false;
        self
    }

    /// Finishes the declaration. The primary key is declared implicitly
    /// when no field names it.
    pub fn build(self) -> Arc<RecordInfo> {
        let naming = self.naming;
        let mut fields = IndexMap::new();

        if !self.fields.iter().any(|(wire, ..)| *wire == self.primary_key) {
            fields.insert(
                self.primary_key.clone(),
                FieldDef {
                    wire_name: self.primary_key.clone(),
                    memory_name: naming.to_memory(&self.primary_key),
                    kind: FieldKind::Any,
                    default: Value::Null,
                },
            );
        }
        for (wire_name, memory_name, kind, default) in self.fields {
            let memory_name = memory_name.unwrap_or_else(|| naming.to_memory(&wire_name));
            fields.insert(
                wire_name.clone(),
                FieldDef {
                    wire_name,
                    memory_name,
                    kind,
                    default,
                },
            );
        }

        let relations = self
            .relations
            .into_iter()
            .map(|(name, descriptor)| (naming.to_memory(&name), descriptor))
            .collect();

        let primary_key_memory = fields
            .get(&self.primary_key)
            .map(|f: &FieldDef| f.memory_name.clone())
            .unwrap_or_else(|| naming.to_memory(&self.primary_key));

        Arc::new(RecordInfo {
            table: self.table.unwrap_or_else(|| format!("{}s", self.name)),
            name: self.name,
            namespace: self.namespace,
            primary_key: self.primary_key,
            primary_key_memory,
            fields,
            relations,
            naming,
            strict: self.strict,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use resorm_codec::Verbatim;

    #[test]
    fn field_kinds_accept_matching_values() {
        assert!(FieldKind::Integer.accepts(&Value::Integer(1)));
        assert!(FieldKind::Integer.accepts(&Value::Null));
        assert!(!FieldKind::Integer.accepts(&Value::from("1")));
        assert!(FieldKind::Float.accepts(&Value::Integer(1)));
        assert!(FieldKind::Nested.accepts(&Value::map([("id", 1)])));
        assert!(FieldKind::Any.accepts(&Value::Array(vec![])));
    }

    #[test]
    fn primary_key_is_declared_implicitly() {
        let record = RecordInfo::builder("user").build();
        let pk = record.field("id").unwrap();
        assert_eq!(pk.memory_name, "Id");
        assert_eq!(pk.kind, FieldKind::Any);
        assert!(record.is_primary_key("Id"));
    }

    #[test]
    fn custom_primary_key_keeps_declared_kind() {
        let record = RecordInfo::builder("country")
            .table("countries")
            .primary_key("iso_code")
            .field("iso_code", FieldKind::Text)
            .build();
        assert_eq!(record.table(), "countries");
        assert_eq!(record.primary_key_memory(), "IsoCode");
        assert_eq!(record.field("IsoCode").unwrap().kind, FieldKind::Text);
        assert_eq!(record.fields().count(), 1);
    }

    #[test]
    fn key_translation_uses_field_table_first() {
        let record = RecordInfo::builder("user")
            .field_as("e_mail", "Email", FieldKind::Text)
            .build();
        assert_eq!(record.memory_name("e_mail"), "Email");
        assert_eq!(record.memory_name("Email"), "Email");
        assert_eq!(record.wire_name("Email"), "e_mail");
        assert_eq!(record.memory_name("last_login"), "LastLogin");
        assert_eq!(record.wire_name("LastLogin"), "last_login");
    }

    #[test]
    fn relations_resolve_in_either_convention() {
        let record = RecordInfo::builder("user")
            .has_many("blog_posts", |t| {
                Related::Collection(RecordInfo::builder("post").build().collection(t))
            })
            .build();
        assert_eq!(record.relation("blog_posts").map(|(k, _)| k), Some("BlogPosts"));
        assert_eq!(record.relation("BlogPosts").map(|(k, _)| k), Some("BlogPosts"));
        assert!(record.relation("comments").is_none());
    }

    #[test]
    fn verbatim_naming_keeps_keys() {
        let record = RecordInfo::builder("row").naming(Verbatim).dynamic().build();
        assert!(!record.is_strict());
        assert_eq!(record.memory_name("user_name"), "user_name");
        assert_eq!(record.primary_key_memory(), "id");
    }
}
