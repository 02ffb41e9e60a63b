mod assemblage;
mod component;
mod config;
mod entity;
mod error;
mod query;
mod resource;
mod system;
mod time;
mod world;

pub use assemblage::{Assemblage, AssemblageRegistry};
pub use component::schema::{Kind, Schema, State, Value};
pub use component::{ComponentId, ComponentStore, MAX_COMPONENT_TYPES};
pub use config::{ComponentDef, KernelConfig};
pub use entity::{ComponentMask, Entity, EntityRecord, EntityRegistry};
pub use error::{EcsError, InvalidStateReason, Result};
pub use query::{EntityData, Query, QueryBuilder, SystemData};
pub use resource::ResourceRegistry;
pub use system::command::{Command, CommandQueue};
pub use system::schedule::{PassReport, Scheduler, SchedulerState, SystemFailure, TickReport};
pub use system::{AnySystem, System, SystemFn};
pub use time::FixedTimestep;
pub use world::*;
