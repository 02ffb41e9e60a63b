use crate::{
    error::Result,
    query::{Query, SystemData},
};

use super::command::CommandQueue;

/// A unit of per-frame logic. It declares the data it needs with [AnySystem::query], reads the
/// resolved [SystemData] and pushes its mutations to the [CommandQueue].
///
/// Returning an error aborts this system's contribution for the current pass: commands pushed
/// during the failing run are discarded.
pub trait AnySystem {
    fn name(&self) -> &str;
    fn query(&self) -> &Query;
    fn run(&mut self, data: &SystemData, commands: &mut CommandQueue) -> Result<()>;
}

pub type SystemFn = Box<dyn FnMut(&SystemData, &mut CommandQueue) -> Result<()>>;

/// A system made from a closure, which is how most systems are written.
pub struct System {
    name: String,
    query: Query,
    func: SystemFn,
}

impl System {
    pub fn new<F>(name: impl Into<String>, query: Query, func: F) -> Self
    where
        F: FnMut(&SystemData, &mut CommandQueue) -> Result<()> + 'static,
    {
        Self {
            name: name.into(),
            query,
            func: Box::new(func),
        }
    }
}

impl AnySystem for System {
    fn name(&self) -> &str {
        &self.name
    }

    fn query(&self) -> &Query {
        &self.query
    }

    fn run(&mut self, data: &SystemData, commands: &mut CommandQueue) -> Result<()> {
        (self.func)(data, commands)
    }
}

impl std::fmt::Debug for System {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("System")
            .field("name", &self.name)
            .field("query", &self.query)
            .finish()
    }
}
