use std::collections::HashMap;

use nohash_hasher::BuildNoHashHasher;

use super::schema::State;
use crate::entity::Entity;

struct ComponentInstance {
    entity: Entity,
    state: State,
}

/// Stores every instance of a single component type
///
/// # Implementation
/// This is a sparse set. Instances live contiguously in `dense`, and `sparse` maps an entity to
/// the index of its instance. Removal swaps the last instance into the hole, so the index of the
/// moved instance has to be patched in `sparse`. Most entities lack most component types, so a
/// hashmap is used for the sparse side rather than a vec indexed by entity.
pub struct ComponentStorage {
    dense: Vec<ComponentInstance>,
    sparse: HashMap<Entity, usize, BuildNoHashHasher<Entity>>,
}

impl ComponentStorage {
    pub fn new() -> Self {
        Self {
            dense: Vec::with_capacity(8),
            sparse: HashMap::with_capacity_and_hasher(8, BuildNoHashHasher::default()),
        }
    }

    pub fn len(&self) -> usize {
        self.dense.len()
    }

    pub fn contains(&self, entity: Entity) -> bool {
        self.sparse.contains_key(&entity)
    }

    /// Returns false, leaving the storage untouched, if the entity already has an instance
    pub fn insert(&mut self, entity: Entity, state: State) -> bool {
        if self.contains(entity) {
            return false;
        }

        self.sparse.insert(entity, self.dense.len());
        self.dense.push(ComponentInstance { entity, state });
        true
    }

    pub fn get(&self, entity: Entity) -> Option<&State> {
        let &index = self.sparse.get(&entity)?;
        Some(&self.dense[index].state)
    }

    pub fn get_mut(&mut self, entity: Entity) -> Option<&mut State> {
        let &index = self.sparse.get(&entity)?;
        Some(&mut self.dense[index].state)
    }

    pub fn remove(&mut self, entity: Entity) -> Option<State> {
        let index = self.sparse.remove(&entity)?;
        let removed = self.dense.swap_remove(index);

        if let Some(moved) = self.dense.get(index) {
            self.sparse.insert(moved.entity, index);
        }

        Some(removed.state)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Entity, &State)> {
        self.dense.iter().map(|instance| (instance.entity, &instance.state))
    }
}

impl Default for ComponentStorage {
    fn default() -> Self {
        Self::new()
    }
}
