pub mod schema;
pub mod storage;

use log::debug;

use crate::{
    entity::Entity,
    error::{EcsError, Result},
};

use self::{
    schema::{Schema, State},
    storage::ComponentStorage,
};

/// Index of a component type, doubling as its bit position in a [crate::ComponentMask]
pub type ComponentId = usize;

pub const MAX_COMPONENT_TYPES: usize = 64;

struct ComponentType {
    schema: Schema,
    storage: ComponentStorage,
}

/// Stores all component data, organised by component type into component storages, and
/// validates every write against the schema registered for that type.
///
/// State handed out by [ComponentStore::find_component] is a copy; the only way to change stored
/// state is [ComponentStore::update_component].
pub struct ComponentStore {
    /// Indexed by component id
    types: Vec<Option<ComponentType>>,
}

impl ComponentStore {
    pub fn new() -> Self {
        Self {
            types: Vec::with_capacity(8),
        }
    }

    pub fn register_type(&mut self, id: ComponentId, schema: Schema) -> Result<()> {
        if id >= MAX_COMPONENT_TYPES {
            return Err(EcsError::InvalidComponentType(id));
        }
        if self.is_registered(id) {
            return Err(EcsError::TypeAlreadyRegistered(id));
        }

        if self.types.len() <= id {
            self.types.resize_with(id + 1, || None);
        }

        debug!("registered component type {id} ({})", schema.name);
        self.types[id] = Some(ComponentType {
            schema,
            storage: ComponentStorage::new(),
        });
        Ok(())
    }

    pub fn is_registered(&self, id: ComponentId) -> bool {
        matches!(self.types.get(id), Some(Some(_)))
    }

    pub fn schema(&self, id: ComponentId) -> Result<&Schema> {
        Ok(&self.get_type(id)?.schema)
    }

    /// Display name from the schema, for log messages
    pub fn component_name(&self, id: ComponentId) -> &str {
        self.get_type(id)
            .map(|ty| ty.schema.name.as_str())
            .unwrap_or("<unregistered>")
    }

    /// Registered ids in ascending order
    pub fn registered_ids(&self) -> impl Iterator<Item = ComponentId> + '_ {
        self.types
            .iter()
            .enumerate()
            .filter_map(|(id, ty)| ty.as_ref().map(|_| id))
    }

    pub fn contains(&self, entity: Entity, id: ComponentId) -> bool {
        self.get_type(id)
            .map(|ty| ty.storage.contains(entity))
            .unwrap_or(false)
    }

    pub fn create_component(
        &mut self,
        entity: Entity,
        id: ComponentId,
        state: State,
    ) -> Result<()> {
        let ty = self.get_type_mut(id)?;
        if ty.storage.contains(entity) {
            return Err(EcsError::ComponentAlreadyExists {
                entity,
                component: id,
            });
        }

        ty.schema
            .validate_full(&state)
            .map_err(|reason| EcsError::InvalidComponentState {
                component: id,
                reason,
            })?;

        ty.storage.insert(entity, state);
        Ok(())
    }

    /// Returns a copy of the stored state
    pub fn find_component(&self, entity: Entity, id: ComponentId) -> Result<State> {
        self.get_state(entity, id).cloned()
    }

    /// Borrowing variant of [ComponentStore::find_component], for read paths inside the crate
    pub(crate) fn get_state(&self, entity: Entity, id: ComponentId) -> Result<&State> {
        self.get_type(id)?
            .storage
            .get(entity)
            .ok_or(EcsError::ComponentNotFound {
                entity,
                component: id,
            })
    }

    /// Shallow-merges `partial` into the stored state. Properties not named in `partial` keep
    /// their current value.
    pub fn update_component(
        &mut self,
        entity: Entity,
        id: ComponentId,
        partial: State,
    ) -> Result<()> {
        let ty = self.get_type_mut(id)?;
        let Some(state) = ty.storage.get_mut(entity) else {
            return Err(EcsError::ComponentNotFound {
                entity,
                component: id,
            });
        };

        ty.schema
            .validate_partial(&partial)
            .map_err(|reason| EcsError::InvalidComponentState {
                component: id,
                reason,
            })?;

        state.extend(partial);
        Ok(())
    }

    pub fn destroy_component(&mut self, entity: Entity, id: ComponentId) -> Result<()> {
        self.get_type_mut(id)?
            .storage
            .remove(entity)
            .map(|_| ())
            .ok_or(EcsError::ComponentNotFound {
                entity,
                component: id,
            })
    }

    /// Every live instance of a component type, in storage order
    pub fn find_components_of_type(
        &self,
        id: ComponentId,
    ) -> Result<impl Iterator<Item = (Entity, &State)>> {
        Ok(self.get_type(id)?.storage.iter())
    }

    pub fn count(&self, id: ComponentId) -> Result<usize> {
        Ok(self.get_type(id)?.storage.len())
    }

    fn get_type(&self, id: ComponentId) -> Result<&ComponentType> {
        match self.types.get(id) {
            Some(Some(ty)) => Ok(ty),
            _ => Err(EcsError::InvalidComponentType(id)),
        }
    }

    fn get_type_mut(&mut self, id: ComponentId) -> Result<&mut ComponentType> {
        match self.types.get_mut(id) {
            Some(Some(ty)) => Ok(ty),
            _ => Err(EcsError::InvalidComponentType(id)),
        }
    }
}

impl Default for ComponentStore {
    fn default() -> Self {
        Self::new()
    }
}
