//! Entities.
//!
//! An [`Entity`] is the in-memory projection of one remote record. It holds
//! its attributes in [`Slot`]s keyed by memory name, tracks a snapshot of
//! the last synced scalar values, and saves only what changed.
//!
//! ## Key Invariants
//!
//! - An attribute is changed iff its value is not loosely equal to its
//!   snapshot value; attributes absent from the snapshot are never changed
//! - `load` and every successful save re-baseline the snapshot
//! - Keys are accepted in wire (`user_name`) or memory (`UserName`) naming

mod persist;
mod slot;

pub use slot::Slot;

use crate::error::{ModelError, ModelResult};
use crate::record::RecordInfo;
use crate::relation::Related;
use indexmap::IndexMap;
use resorm_codec::{join_path, render_template, Payload, Value};
use resorm_transport::Transport;
use std::fmt;
use std::sync::Arc;
use tracing::warn;

/// A remote-backed record with local dirty tracking.
#[derive(Clone)]
pub struct Entity {
    record: Arc<RecordInfo>,
    transport: Arc<dyn Transport>,
    attributes: IndexMap<String, Slot>,
    snapshot: IndexMap<String, Value>,
    // wire keys of undeclared attributes, as first received
    wire_names: IndexMap<String, String>,
    pub(crate) relations: IndexMap<String, Related>,
    validation_errors: IndexMap<String, String>,
    is_new: bool,
    is_loading: bool,
    create_url_format: String,
    patch_url_format: String,
}

impl Entity {
    /// Creates a fresh entity with every declared field at its default.
    pub fn new(record: Arc<RecordInfo>, transport: Arc<dyn Transport>) -> Self {
        let attributes = record
            .fields()
            .map(|field| (field.memory_name.clone(), Slot::Scalar(field.default.clone())))
            .collect();
        let primary_key = format!("{{{}}}", record.primary_key_memory());
        let create_url_format = join_path([record.namespace(), record.name()]);
        let patch_url_format = join_path([record.namespace(), record.name(), primary_key.as_str()]);

        let mut entity = Self {
            record,
            transport,
            attributes,
            snapshot: IndexMap::new(),
            wire_names: IndexMap::new(),
            relations: IndexMap::new(),
            validation_errors: IndexMap::new(),
            is_new: true,
            is_loading: false,
            create_url_format,
            patch_url_format,
        };
        entity.reset_snapshot();
        entity
    }

    /// Record metadata.
    pub fn record(&self) -> &Arc<RecordInfo> {
        &self.record
    }

    /// Singular record name.
    pub fn name(&self) -> &str {
        self.record.name()
    }

    /// Transport used by remote operations.
    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// True until the primary key is assigned or a create succeeds.
    pub fn is_new(&self) -> bool {
        self.is_new
    }

    /// True while a remote operation on this entity is in flight.
    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    // =========================================================================
    // Attributes
    // =========================================================================

    /// Returns true if the attribute exists.
    pub fn has_attribute(&self, key: &str) -> bool {
        self.attributes.contains_key(&self.record.memory_name(key))
    }

    /// Returns the current value of a scalar attribute.
    pub fn get_attribute(&self, key: &str) -> ModelResult<&Value> {
        match self.slot(key)? {
            Slot::Scalar(value) => Ok(value),
            slot => Err(ModelError::NotScalar {
                record: self.name().to_string(),
                key: self.record.memory_name(key),
                holds: slot.holds(),
            }),
        }
    }

    /// Returns the slot of an attribute.
    pub fn slot(&self, key: &str) -> ModelResult<&Slot> {
        let memory = self.record.memory_name(key);
        self.attributes
            .get(&memory)
            .ok_or_else(|| ModelError::attribute_not_found(self.name(), memory))
    }

    /// Returns the slot of an attribute, mutably.
    pub fn slot_mut(&mut self, key: &str) -> ModelResult<&mut Slot> {
        let memory = self.record.memory_name(key);
        match self.attributes.get_mut(&memory) {
            Some(slot) => Ok(slot),
            None => Err(ModelError::attribute_not_found(self.record.name(), memory)),
        }
    }

    /// Iterates over `(memory name, slot)` pairs.
    pub fn attributes(&self) -> impl Iterator<Item = (&str, &Slot)> {
        self.attributes.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Value of the primary key.
    pub fn primary_key_value(&self) -> ModelResult<&Value> {
        self.get_attribute(self.record.primary_key_memory())
    }

    /// Sets a scalar attribute.
    ///
    /// Assigning the primary key marks the entity as not new.
    pub fn set_attribute(&mut self, key: &str, value: impl Into<Value>) -> ModelResult<&mut Self> {
        let value = value.into();
        let memory = self.record.memory_name(key);
        self.check_writable(&memory, &value)?;
        if self.record.is_primary_key(&memory) {
            self.is_new = false;
        }
        self.remember_wire_name(key, &memory);
        self.attributes.insert(memory, Slot::Scalar(value));
        Ok(self)
    }

    /// Places a nested entity or collection in an attribute slot.
    pub fn set_nested(&mut self, key: &str, slot: impl Into<Slot>) -> ModelResult<&mut Self> {
        match slot.into() {
            Slot::Scalar(value) => self.set_attribute(key, value),
            nested => {
                let memory = self.record.memory_name(key);
                if self.record.is_strict() && self.record.field(&memory).is_none() {
                    return Err(ModelError::unknown_attribute(self.name(), memory));
                }
                self.remember_wire_name(key, &memory);
                self.attributes.insert(memory, nested);
                Ok(self)
            }
        }
    }

    /// Keeps `key` as the wire name of an undeclared attribute when it was
    /// given in wire form. Case conversion is lossy (`address_line_1` and
    /// `address_line1` share a memory name), so export must not re-derive it.
    fn remember_wire_name(&mut self, key: &str, memory: &str) {
        if key != memory && self.record.field(memory).is_none() {
            self.wire_names
                .entry(memory.to_string())
                .or_insert_with(|| key.to_string());
        }
    }

    fn wire_name(&self, memory: &str) -> String {
        match self.wire_names.get(memory) {
            Some(wire) => wire.clone(),
            None => self.record.wire_name(memory),
        }
    }

    fn check_writable(&self, memory: &str, value: &Value) -> ModelResult<()> {
        match self.record.field(memory) {
            Some(field) if !field.kind.accepts(value) => Err(ModelError::TypeMismatch {
                record: self.name().to_string(),
                key: memory.to_string(),
                expected: field.kind.to_string(),
                actual: value.kind(),
            }),
            Some(_) => Ok(()),
            None if self.record.is_strict() => Err(ModelError::unknown_attribute(self.name(), memory)),
            None => Ok(()),
        }
    }

    // =========================================================================
    // Snapshot
    // =========================================================================

    /// Value of an attribute as of the last sync.
    pub fn original_attribute(&self, key: &str) -> Option<&Value> {
        self.snapshot.get(&self.record.memory_name(key))
    }

    /// Returns true if the attribute differs from its snapshot value.
    pub fn has_attribute_changed(&self, key: &str) -> bool {
        self.is_changed(&self.record.memory_name(key))
    }

    fn is_changed(&self, memory: &str) -> bool {
        match (self.attributes.get(memory), self.snapshot.get(memory)) {
            (Some(Slot::Scalar(current)), Some(original)) => !current.loose_eq(original),
            _ => false,
        }
    }

    /// Returns true if any tracked attribute changed. Relations are not
    /// considered.
    pub fn has_changed(&self) -> bool {
        self.snapshot.keys().any(|memory| self.is_changed(memory))
    }

    /// Changed scalar attributes in wire naming, plus the primary keys of
    /// every materialized, non-empty has-many child collection keyed by the
    /// relation's wire name.
    pub fn changed_attributes(&self) -> ModelResult<Payload> {
        let mut changed = Payload::new();
        for (memory, slot) in &self.attributes {
            if let Slot::Scalar(value) = slot {
                if self.is_changed(memory) {
                    changed.insert(self.wire_name(memory), value.clone());
                }
            }
        }

        for (name, descriptor) in self.record.relations() {
            if !descriptor.kind().is_plural() {
                continue;
            }
            let Some(Related::Collection(children)) = self.relations.get(name) else {
                continue;
            };
            if children.is_empty() {
                continue;
            }
            let keys = children
                .iter()
                .map(|child| child.primary_key_value().cloned())
                .collect::<ModelResult<Vec<_>>>()?;
            changed.insert(self.record.naming().to_wire(name), Value::Array(keys));
        }
        Ok(changed)
    }

    /// Full serialized state: every attribute in wire naming, nested values
    /// serialized recursively, plus materialized has-many children.
    pub fn to_json(&self) -> ModelResult<Payload> {
        let mut json = Payload::new();
        for (memory, slot) in &self.attributes {
            let value = match slot {
                Slot::Scalar(value) => value.clone(),
                Slot::Entity(entity) => Value::Map(entity.to_json()?),
                Slot::Collection(collection) => collection.to_json()?,
            };
            json.insert(self.wire_name(memory), value);
        }

        for (name, descriptor) in self.record.relations() {
            if !descriptor.kind().is_plural() {
                continue;
            }
            if let Some(Related::Collection(children)) = self.relations.get(name) {
                if !children.is_empty() {
                    json.insert(self.record.naming().to_wire(name), children.to_json()?);
                }
            }
        }
        Ok(json)
    }

    /// Takes the current scalar values as the new baseline.
    pub fn reset_snapshot(&mut self) {
        self.snapshot = self
            .attributes
            .iter()
            .filter_map(|(memory, slot)| slot.as_value().map(|v| (memory.clone(), v.clone())))
            .collect();
    }

    /// Rolls every tracked attribute back to its snapshot value.
    pub fn restore_snapshot(&mut self) {
        for (memory, value) in &self.snapshot {
            self.attributes
                .insert(memory.clone(), Slot::Scalar(value.clone()));
        }
    }

    // =========================================================================
    // Load
    // =========================================================================

    /// Loads remote data.
    ///
    /// A scalar is taken as the primary key (reference hydration). A map is
    /// applied entry by entry: nested slots and declared relations receive
    /// their entry recursively, declared fields are assigned, undeclared
    /// keys of strict records are skipped. The snapshot is re-baselined
    /// afterwards. Null is ignored.
    pub fn load(&mut self, data: &Value) -> ModelResult<()> {
        match data {
            Value::Null => Ok(()),
            Value::Map(map) => self.load_map(map),
            Value::Array(_) => Err(ModelError::invalid_payload(
                self.name(),
                "expected a map or a primary key, got an array",
            )),
            key => {
                self.attributes.insert(
                    self.record.primary_key_memory().to_string(),
                    Slot::Scalar(key.clone()),
                );
                self.is_new = false;
                self.reset_snapshot();
                Ok(())
            }
        }
    }

    fn load_map(&mut self, map: &Payload) -> ModelResult<()> {
        let mut deferred = Vec::new();

        for (key, value) in map {
            let memory = self.record.memory_name(key);
            match self.attributes.get_mut(&memory) {
                Some(Slot::Entity(entity)) => {
                    entity.load(value)?;
                    continue;
                }
                Some(Slot::Collection(collection)) => {
                    collection.load(value)?;
                    continue;
                }
                _ => {}
            }

            if self.record.relation(&memory).is_some() {
                deferred.push((memory, value));
                continue;
            }
            if self.record.is_strict() && self.record.field(&memory).is_none() {
                warn!(record = %self.record.name(), key = %key, "skipping undeclared attribute");
                continue;
            }
            if self.record.is_primary_key(&memory) && !value.is_null() {
                self.is_new = false;
            }
            self.remember_wire_name(key, &memory);
            self.attributes.insert(memory, Slot::Scalar(value.clone()));
        }

        // Relations load after the scalars so that key propagation sees
        // the incoming local keys.
        for (name, value) in deferred {
            match self.relation(&name)? {
                Related::Entity(entity) => entity.load(value)?,
                Related::Collection(collection) => collection.load(value)?,
            }
        }

        self.reset_snapshot();
        Ok(())
    }

    // =========================================================================
    // Validation errors
    // =========================================================================

    /// Field validation errors keyed by memory name.
    pub fn validation_errors(&self) -> &IndexMap<String, String> {
        &self.validation_errors
    }

    /// Validation error of one field.
    pub fn validation_error(&self, key: &str) -> Option<&str> {
        self.validation_errors
            .get(&self.record.memory_name(key))
            .map(String::as_str)
    }

    /// Returns true if any validation error is recorded.
    pub fn has_validation_errors(&self) -> bool {
        !self.validation_errors.is_empty()
    }

    /// Records a validation error.
    pub fn add_validation_error(&mut self, key: &str, message: impl Into<String>) -> &mut Self {
        self.validation_errors
            .insert(self.record.memory_name(key), message.into());
        self
    }

    /// Removes the validation error of one field.
    pub fn remove_validation_error(&mut self, key: &str) -> &mut Self {
        self.validation_errors
            .shift_remove(&self.record.memory_name(key));
        self
    }

    /// Removes every validation error.
    pub fn reset_validation_errors(&mut self) {
        self.validation_errors.clear();
    }

    fn load_validation_errors(&mut self, errors: &IndexMap<String, String>) {
        self.validation_errors = errors
            .iter()
            .map(|(field, message)| (self.record.memory_name(field), message.clone()))
            .collect();
    }

    // =========================================================================
    // URLs
    // =========================================================================

    /// Template of the create endpoint.
    pub fn create_url_format(&self) -> &str {
        &self.create_url_format
    }

    /// Template of the update/fetch/delete endpoint.
    pub fn patch_url_format(&self) -> &str {
        &self.patch_url_format
    }

    /// Overrides the create endpoint template.
    pub fn set_create_url_format(&mut self, format: impl Into<String>) -> &mut Self {
        self.create_url_format = format.into();
        self
    }

    /// Overrides the update/fetch/delete endpoint template.
    pub fn set_patch_url_format(&mut self, format: impl Into<String>) -> &mut Self {
        self.patch_url_format = format.into();
        self
    }

    /// Create endpoint rendered against the current state.
    pub fn create_url(&self) -> ModelResult<String> {
        Ok(render_template(&self.create_url_format, &self.to_json()?)?)
    }

    /// Update endpoint rendered against the current state.
    pub fn patch_url(&self) -> ModelResult<String> {
        Ok(render_template(&self.patch_url_format, &self.to_json()?)?)
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entity")
            .field("record", &self.record.name())
            .field("attributes", &self.attributes)
            .field("relations", &self.relations.keys().collect::<Vec<_>>())
            .field("is_new", &self.is_new)
            .finish_non_exhaustive()
    }
}
