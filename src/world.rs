use log::debug;

use crate::{
    assemblage::{Assemblage, AssemblageRegistry},
    component::{
        schema::{Schema, State},
        ComponentId, ComponentStore,
    },
    config::KernelConfig,
    entity::{ComponentMask, Entity, EntityRegistry},
    error::{EcsError, Result},
    query::{self, Query, SystemData},
    resource::ResourceRegistry,
};

/// Owns every registry of the kernel. Hosts build entities through it between ticks, and the
/// [crate::Scheduler] applies system commands to it during a tick.
pub struct World {
    pub(crate) entity_registry: EntityRegistry,
    pub(crate) component_store: ComponentStore,
    pub(crate) resource_registry: ResourceRegistry,
    pub(crate) assemblage_registry: AssemblageRegistry,
}

impl World {
    pub fn new(config: &KernelConfig) -> Self {
        Self {
            entity_registry: EntityRegistry::new(config.max_entities),
            component_store: ComponentStore::new(),
            resource_registry: ResourceRegistry::new(),
            assemblage_registry: AssemblageRegistry::new(),
        }
    }

    /// Creates a world and registers the component types and seed resources the config declares
    pub fn from_config(config: &KernelConfig) -> Result<Self> {
        config.validate()?;

        let mut world = Self::new(config);
        for def in &config.components {
            world.register_type(def.id, def.schema())?;
        }
        for (key, value) in &config.resources {
            world.register_resource(key.clone(), value.clone());
        }
        Ok(world)
    }

    pub fn entities(&self) -> &EntityRegistry {
        &self.entity_registry
    }

    pub fn components(&self) -> &ComponentStore {
        &self.component_store
    }

    pub fn resources(&self) -> &ResourceRegistry {
        &self.resource_registry
    }

    pub fn register_type(&mut self, id: ComponentId, schema: Schema) -> Result<()> {
        self.component_store.register_type(id, schema)
    }

    pub fn register_resource(
        &mut self,
        key: impl Into<String>,
        value: serde_json::Value,
    ) -> Option<serde_json::Value> {
        self.resource_registry.register_resource(key, value)
    }

    pub fn find_resource(&self, key: &str) -> Result<&serde_json::Value> {
        self.resource_registry.find_resource(key)
    }

    pub fn register_assemblage(&mut self, assemblage: Assemblage) -> Result<()> {
        self.assemblage_registry
            .register(assemblage, &self.component_store)
    }

    #[inline]
    pub fn create_entity(&mut self) -> Result<Entity> {
        self.entity_registry.create_entity()
    }

    #[inline]
    pub fn is_alive(&self, entity: Entity) -> bool {
        self.entity_registry.is_alive(entity)
    }

    pub fn entity_count(&self) -> usize {
        self.entity_registry.len()
    }

    /// Fails with [EcsError::EntityNotFound] if the entity is not alive
    pub fn has_component(&self, entity: Entity, id: ComponentId) -> Result<bool> {
        self.entity_registry.has_component(entity, id)
    }

    pub fn create_component(
        &mut self,
        entity: Entity,
        id: ComponentId,
        state: State,
    ) -> Result<()> {
        if !self.entity_registry.is_alive(entity) {
            return Err(EcsError::EntityNotFound(entity));
        }

        self.component_store.create_component(entity, id, state)?;
        self.entity_registry.attach_component(entity, id)?;
        debug!(
            "attached {} ({id}) to entity {entity}",
            self.component_store.component_name(id)
        );
        Ok(())
    }

    pub fn find_component(&self, entity: Entity, id: ComponentId) -> Result<State> {
        if !self.entity_registry.is_alive(entity) {
            return Err(EcsError::EntityNotFound(entity));
        }
        self.component_store.find_component(entity, id)
    }

    pub fn update_component(
        &mut self,
        entity: Entity,
        id: ComponentId,
        partial: State,
    ) -> Result<()> {
        if !self.entity_registry.is_alive(entity) {
            return Err(EcsError::EntityNotFound(entity));
        }
        self.component_store.update_component(entity, id, partial)
    }

    pub fn find_components_of_type(
        &self,
        id: ComponentId,
    ) -> Result<impl Iterator<Item = (Entity, &State)>> {
        self.component_store.find_components_of_type(id)
    }

    /// Creates an entity and then each listed component in order.
    ///
    /// This is not atomic. If a component fails to create, the error is returned and the entity
    /// stays alive with the components created before the failure.
    pub fn build_entity(&mut self, components: Vec<(ComponentId, State)>) -> Result<Entity> {
        let entity = self.create_entity()?;
        for (id, state) in components {
            self.create_component(entity, id, state)?;
        }
        Ok(entity)
    }

    /// Builds an entity from a registered [Assemblage], with the same partial-failure behaviour as
    /// [World::build_entity]
    pub fn build_from_assemblage(&mut self, name: &str) -> Result<Entity> {
        let components = self.assemblage_registry.get(name)?.components.clone();
        self.build_entity(components)
    }

    /// For each listed component, merges the state into the existing component or, if the entity
    /// does not have one yet, creates it from the state. Stops at the first failure.
    pub fn update_entity(
        &mut self,
        entity: Entity,
        components: Vec<(ComponentId, State)>,
    ) -> Result<()> {
        for (id, state) in components {
            if self.entity_registry.has_component(entity, id)? {
                self.component_store.update_component(entity, id, state)?;
            } else {
                self.create_component(entity, id, state)?;
            }
        }
        Ok(())
    }

    pub fn destroy_component(&mut self, entity: Entity, id: ComponentId) -> Result<()> {
        if !self.entity_registry.is_alive(entity) {
            return Err(EcsError::EntityNotFound(entity));
        }

        self.component_store.destroy_component(entity, id)?;
        self.entity_registry.detach_component(entity, id)?;
        debug!(
            "detached {} ({id}) from entity {entity}",
            self.component_store.component_name(id)
        );
        Ok(())
    }

    /// Destroys every component whose bit is set on the entity, lowest id first, then releases the
    /// entity id. The id is never issued again.
    pub fn destroy_entity(&mut self, entity: Entity) -> Result<()> {
        let mask: ComponentMask = self.entity_registry.mask(entity)?;
        for id in mask.iter() {
            self.destroy_component(entity, id)?;
        }
        self.entity_registry.destroy_entity(entity)
    }

    pub fn get_system_data(&self, query: &Query) -> Result<SystemData> {
        query::resolve(self, query)
    }
}
