//! Lazy relation resolution and foreign-key propagation.

use super::{RelationDescriptor, RelationKind, Related, DISCRIMINATOR_FIELD};
use crate::collection::{Collection, FilterScope};
use crate::entity::Entity;
use crate::error::{ModelError, ModelResult};
use crate::record::RecordInfo;
use resorm_codec::{join_path, Value};
use std::sync::Arc;
use tracing::debug;

impl Entity {
    /// Resolves a declared relation.
    ///
    /// The first access runs the relation's producer and caches the result;
    /// later accesses reuse the cached value. Every access re-applies the
    /// foreign-key wiring, so a changed local key is reflected without a
    /// network call.
    pub fn relation(&mut self, name: &str) -> ModelResult<&mut Related> {
        let record = Arc::clone(self.record());
        let (key, descriptor) = record
            .relation(name)
            .ok_or_else(|| ModelError::unknown_relation(record.name(), name))?;

        if !self.relations.contains_key(key) {
            let related = descriptor.produce(self.transport());
            let expected = descriptor.kind().capability();
            if related.capability() != expected {
                return Err(ModelError::RelationContractViolation {
                    record: record.name().to_string(),
                    relation: key.to_string(),
                    expected,
                    actual: related.capability(),
                });
            }
            debug!(record = %record.name(), relation = %key, kind = %descriptor.kind(), "relation resolved");
            self.relations.insert(key.to_string(), related);
        }

        self.propagate_keys(&record, key, descriptor)?;
        self.relations
            .get_mut(key)
            .ok_or_else(|| ModelError::unknown_relation(record.name(), name))
    }

    /// Resolves a singular relation.
    pub fn related_entity(&mut self, name: &str) -> ModelResult<&mut Entity> {
        let record = self.record().name().to_string();
        match self.relation(name)? {
            Related::Entity(entity) => Ok(entity),
            Related::Collection(_) => Err(ModelError::RelationContractViolation {
                record,
                relation: name.to_string(),
                expected: "entity",
                actual: "collection",
            }),
        }
    }

    /// Resolves a plural relation.
    pub fn related_collection(&mut self, name: &str) -> ModelResult<&mut Collection> {
        let record = self.record().name().to_string();
        match self.relation(name)? {
            Related::Collection(collection) => Ok(collection),
            Related::Entity(_) => Err(ModelError::RelationContractViolation {
                record,
                relation: name.to_string(),
                expected: "collection",
                actual: "entity",
            }),
        }
    }

    /// The cached value of a relation, without resolving it.
    pub fn relation_value(&self, name: &str) -> Option<&Related> {
        let (key, _) = self.record().relation(name)?;
        self.relations.get(key)
    }

    fn propagate_keys(
        &mut self,
        record: &RecordInfo,
        key: &str,
        descriptor: &RelationDescriptor,
    ) -> ModelResult<()> {
        let Some(child_record) = self.relations.get(key).map(|r| Arc::clone(r.record())) else {
            return Ok(());
        };
        let options = descriptor.options();
        let (local_key, foreign_key) = match descriptor.kind() {
            RelationKind::BelongsTo => (
                options
                    .local_key
                    .clone()
                    .unwrap_or_else(|| format!("{}_id", child_record.name())),
                options
                    .foreign_key
                    .clone()
                    .unwrap_or_else(|| child_record.primary_key().to_string()),
            ),
            _ => (
                options
                    .local_key
                    .clone()
                    .unwrap_or_else(|| record.primary_key().to_string()),
                options
                    .foreign_key
                    .clone()
                    .unwrap_or_else(|| format!("{}_id", record.name())),
            ),
        };
        let local_value = self.get_attribute(&local_key)?.clone();

        let Some(related) = self.relations.get_mut(key) else {
            return Ok(());
        };
        match related {
            Related::Entity(child) => {
                child.set_attribute(&foreign_key, local_value.clone())?;
                if descriptor.kind() == RelationKind::HasOne && options.nested_url {
                    let url = join_path([
                        Value::from(record.namespace()),
                        Value::from(record.name()),
                        local_value,
                        Value::from(child_record.name()),
                    ]);
                    child.set_create_url_format(url);
                }
            }
            Related::Collection(children) => {
                children
                    .filters_mut(FilterScope::Persistent)
                    .equals(&foreign_key, local_value.clone());
                children.add_persistent_attribute(&foreign_key, local_value.clone());
                if let Some(discriminator) = descriptor.discriminator() {
                    children
                        .filters_mut(FilterScope::Persistent)
                        .equals(DISCRIMINATOR_FIELD, discriminator);
                    children.add_persistent_attribute(DISCRIMINATOR_FIELD, discriminator);
                }
                if options.nested_url {
                    let scope = join_path([
                        Value::from(child_record.namespace()),
                        Value::from(record.name()),
                        local_value,
                        Value::from(child_record.table()),
                    ]);
                    children.set_scope(Some(scope));
                }
            }
        }
        Ok(())
    }
}
