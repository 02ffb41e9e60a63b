use log::debug;

use crate::{
    component::{ComponentId, MAX_COMPONENT_TYPES},
    error::{EcsError, Result},
};

pub type Entity = u32;

/// A bitset over component ids, where bit `k` is set when the entity has a component of type `k`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ComponentMask(u64);

impl ComponentMask {
    pub const EMPTY: Self = Self(0);

    pub fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    pub fn from_ids(ids: impl IntoIterator<Item = ComponentId>) -> Self {
        ids.into_iter().fold(Self::EMPTY, |mask, id| mask.with(id))
    }

    pub fn bits(self) -> u64 {
        self.0
    }

    /// Ids at or above [MAX_COMPONENT_TYPES] have no bit and leave the mask unchanged
    pub fn with(self, id: ComponentId) -> Self {
        if id >= MAX_COMPONENT_TYPES {
            return self;
        }
        Self(self.0 | (1u64 << id))
    }

    pub fn without(self, id: ComponentId) -> Self {
        if id >= MAX_COMPONENT_TYPES {
            return self;
        }
        Self(self.0 & !(1u64 << id))
    }

    pub fn contains(self, id: ComponentId) -> bool {
        id < MAX_COMPONENT_TYPES && self.0 & (1u64 << id) != 0
    }

    /// True if every bit of `other` is also set in `self`
    pub fn contains_all(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Set component ids, lowest first
    pub fn iter(self) -> impl Iterator<Item = ComponentId> {
        let mut bits = self.0;
        core::iter::from_fn(move || {
            if bits == 0 {
                return None;
            }
            let id = bits.trailing_zeros() as ComponentId;
            bits &= bits - 1;
            Some(id)
        })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct EntityRecord {
    pub entity: Entity,
    pub mask: ComponentMask,
}

/// Allocates entity ids and tracks which component types each live entity has.
///
/// # Implementation
/// Ids come from a monotonic counter and are never handed out twice, so pushing a new record
/// keeps the record vec sorted by id. Lookups are a binary search, and iteration in vec order is
/// ascending id order, which keeps query results deterministic between runs.
pub struct EntityRegistry {
    records: Vec<EntityRecord>,
    next_id: Entity,
    max_entities: usize,
}

impl EntityRegistry {
    pub fn new(max_entities: usize) -> Self {
        Self {
            records: Vec::with_capacity(max_entities.min(1024)),
            next_id: 0,
            max_entities,
        }
    }

    pub fn max_entities(&self) -> usize {
        self.max_entities
    }

    /// Number of live entities
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn create_entity(&mut self) -> Result<Entity> {
        if self.records.len() >= self.max_entities {
            return Err(EcsError::EntityLimitExceeded {
                limit: self.max_entities,
            });
        }

        let entity = self.next_id;
        self.next_id = entity.checked_add(1).ok_or(EcsError::EntityIdsExhausted)?;
        self.records.push(EntityRecord {
            entity,
            mask: ComponentMask::EMPTY,
        });

        debug!("created entity {entity}");
        Ok(entity)
    }

    /// Releases the id. Detaching components is left to the caller, see
    /// [crate::World::destroy_entity].
    pub fn destroy_entity(&mut self, entity: Entity) -> Result<()> {
        let index = self.index_of(entity)?;
        self.records.remove(index);
        debug!("destroyed entity {entity}");
        Ok(())
    }

    pub fn is_alive(&self, entity: Entity) -> bool {
        self.index_of(entity).is_ok()
    }

    pub fn mask(&self, entity: Entity) -> Result<ComponentMask> {
        let index = self.index_of(entity)?;
        Ok(self.records[index].mask)
    }

    pub fn has_component(&self, entity: Entity, component: ComponentId) -> Result<bool> {
        Ok(self.mask(entity)?.contains(component))
    }

    pub fn attach_component(&mut self, entity: Entity, component: ComponentId) -> Result<()> {
        if component >= MAX_COMPONENT_TYPES {
            return Err(EcsError::InvalidComponentType(component));
        }
        let record = self.record_mut(entity)?;
        if record.mask.contains(component) {
            return Err(EcsError::ComponentAlreadyAttached { entity, component });
        }
        record.mask = record.mask.with(component);
        Ok(())
    }

    pub fn detach_component(&mut self, entity: Entity, component: ComponentId) -> Result<()> {
        let record = self.record_mut(entity)?;
        if !record.mask.contains(component) {
            return Err(EcsError::ComponentNotAttached { entity, component });
        }
        record.mask = record.mask.without(component);
        Ok(())
    }

    /// Lazily yields, in ascending order, every live entity whose mask is a superset of `mask`.
    /// The iterator is `Clone`, so a copy taken before iterating can restart the sequence.
    pub fn find_entities_with_mask(
        &self,
        mask: ComponentMask,
    ) -> impl Iterator<Item = Entity> + Clone + '_ {
        self.records
            .iter()
            .filter(move |record| record.mask.contains_all(mask))
            .map(|record| record.entity)
    }

    pub fn iter(&self) -> impl Iterator<Item = &EntityRecord> {
        self.records.iter()
    }

    fn index_of(&self, entity: Entity) -> Result<usize> {
        self.records
            .binary_search_by_key(&entity, |record| record.entity)
            .map_err(|_| EcsError::EntityNotFound(entity))
    }

    fn record_mut(&mut self, entity: Entity) -> Result<&mut EntityRecord> {
        let index = self.index_of(entity)?;
        Ok(&mut self.records[index])
    }
}
