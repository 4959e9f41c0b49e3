//! Relation declarations.
//!
//! A relation is declared once per record type with a
//! [`RelationDescriptor`]: its kind, optional key overrides and a producer
//! that builds the related entity or collection. A generic resolver
//! materializes it lazily per parent entity and wires foreign keys on every
//! access.
//!
//! | Kind | Local key (parent) | Foreign key (child) |
//! |---|---|---|
//! | has-one | parent primary key | `{parent}_id` |
//! | belongs-to | `{child}_id` | child primary key |
//! | has-many | parent primary key | `{parent}_id` |
//! | has-many-through | parent primary key | `{parent}_id` |

mod resolver;

use crate::collection::Collection;
use crate::entity::Entity;
use crate::record::RecordInfo;
use resorm_transport::Transport;
use std::fmt;
use std::sync::Arc;

/// Field holding the has-many-through discriminator.
pub const DISCRIMINATOR_FIELD: &str = "type";

/// Builds the related value for a parent's transport.
pub type RelationProducer = Arc<dyn Fn(&Arc<dyn Transport>) -> Related + Send + Sync>;

/// Kind of a relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationKind {
    /// Parent owns exactly one child holding the foreign key.
    HasOne,
    /// Parent holds the foreign key of one child.
    BelongsTo,
    /// Parent owns many children holding the foreign key.
    HasMany,
    /// As [`RelationKind::HasMany`], scoped by a `type` discriminator.
    HasManyThrough,
}

impl RelationKind {
    /// True for kinds that resolve to a collection.
    pub fn is_plural(self) -> bool {
        matches!(self, RelationKind::HasMany | RelationKind::HasManyThrough)
    }

    /// Capability the producer must yield.
    pub fn capability(self) -> &'static str {
        if self.is_plural() {
            "collection"
        } else {
            "entity"
        }
    }
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RelationKind::HasOne => "has-one",
            RelationKind::BelongsTo => "belongs-to",
            RelationKind::HasMany => "has-many",
            RelationKind::HasManyThrough => "has-many-through",
        })
    }
}

/// Key overrides and URL nesting.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelationOptions {
    /// Key read on the parent.
    pub local_key: Option<String>,
    /// Key written on the child.
    pub foreign_key: Option<String>,
    /// Nest the child's URL under the parent's.
    pub nested_url: bool,
}

/// A declared relation.
#[derive(Clone)]
pub struct RelationDescriptor {
    kind: RelationKind,
    options: RelationOptions,
    discriminator: Option<String>,
    producer: RelationProducer,
}

impl RelationDescriptor {
    /// Creates a descriptor of any kind.
    pub fn new<F>(kind: RelationKind, producer: F) -> Self
    where
        F: Fn(&Arc<dyn Transport>) -> Related + Send + Sync + 'static,
    {
        Self {
            kind,
            options: RelationOptions::default(),
            discriminator: None,
            producer: Arc::new(producer),
        }
    }

    /// has-one
    pub fn has_one<F>(producer: F) -> Self
    where
        F: Fn(&Arc<dyn Transport>) -> Related + Send + Sync + 'static,
    {
        Self::new(RelationKind::HasOne, producer)
    }

    /// belongs-to
    pub fn belongs_to<F>(producer: F) -> Self
    where
        F: Fn(&Arc<dyn Transport>) -> Related + Send + Sync + 'static,
    {
        Self::new(RelationKind::BelongsTo, producer)
    }

    /// has-many
    pub fn has_many<F>(producer: F) -> Self
    where
        F: Fn(&Arc<dyn Transport>) -> Related + Send + Sync + 'static,
    {
        Self::new(RelationKind::HasMany, producer)
    }

    /// has-many-through, scoped by `type = discriminator`.
    pub fn has_many_through<F>(discriminator: impl Into<String>, producer: F) -> Self
    where
        F: Fn(&Arc<dyn Transport>) -> Related + Send + Sync + 'static,
    {
        let mut descriptor = Self::new(RelationKind::HasManyThrough, producer);
        descriptor.discriminator = Some(discriminator.into());
        descriptor
    }

    /// Overrides the local key.
    pub fn local_key(mut self, key: impl Into<String>) -> Self {
        self.options.local_key = Some(key.into());
        self
    }

    /// Overrides the foreign key.
    pub fn foreign_key(mut self, key: impl Into<String>) -> Self {
        self.options.foreign_key = Some(key.into());
        self
    }

    /// Nests the child's URL under the parent's.
    pub fn nested_url(mut self) -> Self {
        self.options.nested_url = true;
        self
    }

    /// Relation kind.
    pub fn kind(&self) -> RelationKind {
        self.kind
    }

    /// Key overrides.
    pub fn options(&self) -> &RelationOptions {
        &self.options
    }

    /// has-many-through discriminator.
    pub fn discriminator(&self) -> Option<&str> {
        self.discriminator.as_deref()
    }

    /// Runs the producer.
    pub fn produce(&self, transport: &Arc<dyn Transport>) -> Related {
        (self.producer)(transport)
    }
}

impl fmt::Debug for RelationDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelationDescriptor")
            .field("kind", &self.kind)
            .field("options", &self.options)
            .field("discriminator", &self.discriminator)
            .finish_non_exhaustive()
    }
}

/// A materialized relation value.
#[derive(Debug, Clone)]
pub enum Related {
    /// Singular relation.
    Entity(Entity),
    /// Plural relation.
    Collection(Collection),
}

impl Related {
    /// `"entity"` or `"collection"`.
    pub fn capability(&self) -> &'static str {
        match self {
            Related::Entity(_) => "entity",
            Related::Collection(_) => "collection",
        }
    }

    /// Record of the related entity or collection items.
    pub fn record(&self) -> &Arc<RecordInfo> {
        match self {
            Related::Entity(entity) => entity.record(),
            Related::Collection(collection) => collection.record(),
        }
    }

    /// The entity, for singular relations.
    pub fn as_entity(&self) -> Option<&Entity> {
        match self {
            Related::Entity(entity) => Some(entity),
            Related::Collection(_) => None,
        }
    }

    /// The entity, mutably.
    pub fn as_entity_mut(&mut self) -> Option<&mut Entity> {
        match self {
            Related::Entity(entity) => Some(entity),
            Related::Collection(_) => None,
        }
    }

    /// The collection, for plural relations.
    pub fn as_collection(&self) -> Option<&Collection> {
        match self {
            Related::Collection(collection) => Some(collection),
            Related::Entity(_) => None,
        }
    }

    /// The collection, mutably.
    pub fn as_collection_mut(&mut self) -> Option<&mut Collection> {
        match self {
            Related::Collection(collection) => Some(collection),
            Related::Entity(_) => None,
        }
    }
}

impl From<Entity> for Related {
    fn from(entity: Entity) -> Self {
        Related::Entity(entity)
    }
}

impl From<Collection> for Related {
    fn from(collection: Collection) -> Self {
        Related::Collection(collection)
    }
}
