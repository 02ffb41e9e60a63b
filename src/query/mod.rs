use std::collections::BTreeMap;

use ahash::AHashMap;

use crate::{
    component::{
        schema::{State, Value},
        ComponentId, MAX_COMPONENT_TYPES,
    },
    entity::{ComponentMask, Entity},
    error::{EcsError, Result},
    World,
};

/// The data a system declares it needs: a set of component types that matching entities must
/// all have, plus any resources by key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    pub resources: Vec<String>,
    pub components: Vec<ComponentId>,
}

impl Query {
    pub fn builder() -> QueryBuilder {
        QueryBuilder::new()
    }

    /// Bitwise OR of the requested component bits. Fails with [EcsError::InvalidComponentType]
    /// if an id is not below [crate::MAX_COMPONENT_TYPES].
    pub fn mask(&self) -> Result<ComponentMask> {
        if let Some(&id) = self.components.iter().find(|&&id| id >= MAX_COMPONENT_TYPES) {
            return Err(EcsError::InvalidComponentType(id));
        }
        Ok(ComponentMask::from_ids(self.components.iter().copied()))
    }
}

pub struct QueryBuilder {
    query: Query,
}

impl QueryBuilder {
    pub fn new() -> Self {
        Self {
            query: Query::default(),
        }
    }

    pub fn component(mut self, id: ComponentId) -> Self {
        if !self.query.components.contains(&id) {
            self.query.components.push(id);
        }
        self
    }

    pub fn resource(mut self, key: impl Into<String>) -> Self {
        let key = key.into();
        if !self.query.resources.contains(&key) {
            self.query.resources.push(key);
        }
        self
    }

    pub fn build(self) -> Query {
        self.query
    }
}

impl Default for QueryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// One matching entity with a copy of each requested component's state
#[derive(Debug, Clone, PartialEq)]
pub struct EntityData {
    pub entity: Entity,
    pub components: BTreeMap<ComponentId, State>,
}

impl EntityData {
    pub fn get(&self, id: ComponentId) -> Option<&State> {
        self.components.get(&id)
    }

    pub fn value(&self, id: ComponentId, property: &str) -> Option<&Value> {
        self.components.get(&id)?.get(property)
    }

    pub fn number(&self, id: ComponentId, property: &str) -> Option<f64> {
        self.value(id, property)?.as_number()
    }
}

/// A snapshot of everything a [Query] asked for, taken in one call with no mutation in between.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SystemData {
    pub resources: AHashMap<String, serde_json::Value>,
    pub entities: Vec<EntityData>,
}

impl SystemData {
    pub fn resource(&self, key: &str) -> Option<&serde_json::Value> {
        self.resources.get(key)
    }

    pub fn entity(&self, entity: Entity) -> Option<&EntityData> {
        self.entities.iter().find(|data| data.entity == entity)
    }
}

/// Resolves a query against the world. Entities come back in ascending id order.
pub fn resolve(world: &World, query: &Query) -> Result<SystemData> {
    for &id in &query.components {
        if !world.component_store.is_registered(id) {
            return Err(EcsError::InvalidComponentType(id));
        }
    }

    let mask = query.mask()?;
    let entities = world
        .entity_registry
        .find_entities_with_mask(mask)
        .map(|entity| -> Result<EntityData> {
            let components = query
                .components
                .iter()
                .map(|&id| -> Result<(ComponentId, State)> {
                    let state = world.component_store.get_state(entity, id)?;
                    Ok((id, state.clone()))
                })
                .collect::<Result<BTreeMap<_, _>>>()?;
            Ok(EntityData { entity, components })
        })
        .collect::<Result<Vec<_>>>()?;

    let resources = query
        .resources
        .iter()
        .map(|key| -> Result<(String, serde_json::Value)> {
            let value = world.resource_registry.find_resource(key)?;
            Ok((key.clone(), value.clone()))
        })
        .collect::<Result<AHashMap<_, _>>>()?;

    Ok(SystemData {
        resources,
        entities,
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{
        component::schema::{Kind, Schema},
        config::KernelConfig,
        state,
    };

    const POSITION: ComponentId = 0;
    const VELOCITY: ComponentId = 1;
    const TAG: ComponentId = 2;

    fn world() -> World {
        let mut world = World::new(&KernelConfig::default());
        world
            .register_type(
                POSITION,
                Schema::new("position")
                    .field("x", Kind::Number)
                    .field("y", Kind::Number),
            )
            .unwrap();
        world
            .register_type(VELOCITY, Schema::new("velocity").field("dx", Kind::Number))
            .unwrap();
        world
            .register_type(TAG, Schema::new("tag").field("label", Kind::String))
            .unwrap();
        world
    }

    #[test]
    fn builder_dedups() {
        let query = Query::builder()
            .component(POSITION)
            .component(VELOCITY)
            .component(POSITION)
            .resource("bounds")
            .resource("bounds")
            .build();

        assert_eq!(query.components, vec![POSITION, VELOCITY]);
        assert_eq!(query.resources, vec!["bounds".to_string()]);
        assert_eq!(query.mask(), Ok(ComponentMask::from_bits(0b11)));
    }

    #[test]
    fn mask_rejects_ids_past_the_mask_width() {
        let query = Query::builder().component(POSITION).component(70).build();
        assert_eq!(query.mask(), Err(EcsError::InvalidComponentType(70)));
    }

    #[test]
    fn resolves_matching_entities_and_resources() {
        let mut world = world();
        world.register_resource("bounds", json!({ "width": 10 }));

        let moving = world
            .build_entity(vec![
                (POSITION, state! { "x" => 1, "y" => 2 }),
                (VELOCITY, state! { "dx" => 3 }),
            ])
            .unwrap();
        world
            .build_entity(vec![(POSITION, state! { "x" => 0, "y" => 0 })])
            .unwrap();
        world
            .build_entity(vec![(TAG, state! { "label" => "rock" })])
            .unwrap();

        let query = Query::builder()
            .component(POSITION)
            .component(VELOCITY)
            .resource("bounds")
            .build();
        let data = resolve(&world, &query).unwrap();

        assert_eq!(data.entities.len(), 1);
        let entity = &data.entities[0];
        assert_eq!(entity.entity, moving);
        assert_eq!(entity.number(POSITION, "y"), Some(2.0));
        assert_eq!(entity.get(VELOCITY), Some(&state! { "dx" => 3 }));
        assert_eq!(entity.get(TAG), None);
        assert_eq!(data.resource("bounds"), Some(&json!({ "width": 10 })));
    }

    #[test]
    fn results_are_in_ascending_order() {
        let mut world = world();
        let ids: Vec<Entity> = (0..5)
            .map(|i| {
                world
                    .build_entity(vec![(POSITION, state! { "x" => i, "y" => 0 })])
                    .unwrap()
            })
            .collect();
        world.destroy_entity(ids[2]).unwrap();

        let data = resolve(&world, &Query::builder().component(POSITION).build()).unwrap();
        let found: Vec<Entity> = data.entities.iter().map(|e| e.entity).collect();
        assert_eq!(found, vec![ids[0], ids[1], ids[3], ids[4]]);
    }

    #[test]
    fn missing_pieces_fail() {
        let world = world();
        assert_eq!(
            resolve(&world, &Query::builder().resource("bounds").build()),
            Err(EcsError::ResourceNotFound("bounds".into()))
        );
        assert_eq!(
            resolve(&world, &Query::builder().component(9).build()),
            Err(EcsError::InvalidComponentType(9))
        );
        // Ids past the mask width are rejected before the mask is built
        assert_eq!(
            resolve(&world, &Query::builder().component(70).build()),
            Err(EcsError::InvalidComponentType(70))
        );
    }
}
