//! Attribute slots.

use super::Entity;
use crate::collection::Collection;
use resorm_codec::Value;

/// What an attribute holds.
#[derive(Debug, Clone)]
pub enum Slot {
    /// A plain value, tracked by the snapshot.
    Scalar(Value),
    /// A nested entity. `load` recurses into it instead of overwriting.
    Entity(Box<Entity>),
    /// A nested collection. `load` recurses into it instead of overwriting.
    Collection(Box<Collection>),
}

impl Slot {
    /// The value, when this is a scalar slot.
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Slot::Scalar(value) => Some(value),
            _ => None,
        }
    }

    /// True for nested entity and collection slots.
    pub fn is_nested(&self) -> bool {
        !matches!(self, Slot::Scalar(_))
    }

    pub(crate) fn holds(&self) -> &'static str {
        match self {
            Slot::Scalar(_) => "scalar",
            Slot::Entity(_) => "entity",
            Slot::Collection(_) => "collection",
        }
    }
}

impl From<Value> for Slot {
    fn from(value: Value) -> Self {
        Slot::Scalar(value)
    }
}

impl From<Entity> for Slot {
    fn from(entity: Entity) -> Self {
        Slot::Entity(Box::new(entity))
    }
}

impl From<Collection> for Slot {
    fn from(collection: Collection) -> Self {
        Slot::Collection(Box::new(collection))
    }
}
