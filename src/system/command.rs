use crate::{
    component::{schema::State, ComponentId},
    entity::Entity,
    error::Result,
    World,
};

/// A mutation intent produced by a system
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Merge `state` into the component, attaching it if the entity does not have it yet
    Update {
        entity: Entity,
        component: ComponentId,
        state: State,
    },
    /// Remove the component and clear its bit on the entity
    Delete {
        entity: Entity,
        component: ComponentId,
    },
    Spawn {
        components: Vec<(ComponentId, State)>,
    },
    Despawn {
        entity: Entity,
    },
}

impl Command {
    pub fn apply(self, world: &mut World) -> Result<()> {
        match self {
            Command::Update {
                entity,
                component,
                state,
            } => world.update_entity(entity, vec![(component, state)]),
            Command::Delete { entity, component } => world.destroy_component(entity, component),
            Command::Spawn { components } => world.build_entity(components).map(|_| ()),
            Command::Despawn { entity } => world.destroy_entity(entity),
        }
    }
}

/// Stores the commands a system issues during its run, to be applied to the world once the system
/// returns and before the next system resolves its query.
pub struct CommandQueue {
    commands: Vec<Command>,
}

impl CommandQueue {
    pub fn new() -> Self {
        Self {
            commands: Vec::new(),
        }
    }

    pub fn update(&mut self, entity: Entity, component: ComponentId, state: State) {
        self.push(Command::Update {
            entity,
            component,
            state,
        });
    }

    pub fn delete(&mut self, entity: Entity, component: ComponentId) {
        self.push(Command::Delete { entity, component });
    }

    pub fn spawn(&mut self, components: Vec<(ComponentId, State)>) {
        self.push(Command::Spawn { components });
    }

    pub fn despawn(&mut self, entity: Entity) {
        self.push(Command::Despawn { entity });
    }

    pub fn push(&mut self, command: Command) {
        self.commands.push(command);
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Command> {
        self.commands.iter()
    }

    pub fn clear(&mut self) {
        self.commands.clear();
    }

    /// Applies commands in the order they were issued. Stops at the first failure; commands
    /// applied before it stay applied and the rest are discarded. The queue is empty afterwards
    /// either way.
    pub fn apply(&mut self, world: &mut World) -> Result<()> {
        let mut result = Ok(());
        for command in self.commands.drain(..) {
            if let Err(e) = command.apply(world) {
                result = Err(e);
                break;
            }
        }
        result
    }
}

impl Default for CommandQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl Extend<Command> for CommandQueue {
    fn extend<T: IntoIterator<Item = Command>>(&mut self, iter: T) {
        self.commands.extend(iter);
    }
}
