use std::{collections::BTreeMap, time::Duration};

use serde::Deserialize;

use crate::{
    component::{
        schema::{Kind, Schema},
        ComponentId, MAX_COMPONENT_TYPES,
    },
    error::{EcsError, Result},
};

pub const DEFAULT_MAX_ENTITIES: usize = 1024;
pub const DEFAULT_TIMESTEP_HZ: u32 = 60;
/// Upper bound on frames simulated in one tick after a stall
pub const DEFAULT_MAX_SKIP_FRAMES: u32 = 5;

/// A component type declared in configuration
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ComponentDef {
    pub id: ComponentId,
    pub name: String,
    #[serde(default)]
    pub fields: BTreeMap<String, Kind>,
}

impl ComponentDef {
    pub fn schema(&self) -> Schema {
        Schema {
            name: self.name.clone(),
            fields: self.fields.clone(),
        }
    }
}

/// Startup configuration for a [crate::World] and its [crate::Scheduler].
///
/// ```toml
/// max_entities = 512
/// timestep_hz = 30
///
/// [[components]]
/// id = 0
/// name = "position"
/// fields = { x = "number", y = "number" }
///
/// [resources]
/// bounds = { width = 640, height = 480 }
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct KernelConfig {
    pub max_entities: usize,
    pub timestep_hz: u32,
    pub max_skip_frames: u32,
    pub components: Vec<ComponentDef>,
    pub resources: BTreeMap<String, serde_json::Value>,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            max_entities: DEFAULT_MAX_ENTITIES,
            timestep_hz: DEFAULT_TIMESTEP_HZ,
            max_skip_frames: DEFAULT_MAX_SKIP_FRAMES,
            components: Vec::new(),
            resources: BTreeMap::new(),
        }
    }
}

impl KernelConfig {
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(|e| EcsError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_entities == 0 {
            return Err(EcsError::Config("max_entities must be positive".into()));
        }
        if self.timestep_hz == 0 {
            return Err(EcsError::Config("timestep_hz must be positive".into()));
        }
        if self.frame_duration().is_zero() {
            return Err(EcsError::Config(format!(
                "timestep_hz {} is too high, frames would last 0ns",
                self.timestep_hz
            )));
        }
        if self.max_skip_frames == 0 {
            return Err(EcsError::Config("max_skip_frames must be positive".into()));
        }
        if let Some(def) = self.components.iter().find(|def| def.id >= MAX_COMPONENT_TYPES) {
            return Err(EcsError::Config(format!(
                "component `{}` has id {}, ids must be below {MAX_COMPONENT_TYPES}",
                def.name, def.id
            )));
        }
        Ok(())
    }

    /// Duration of one fixed simulation frame
    pub fn frame_duration(&self) -> Duration {
        Duration::from_secs(1) / self.timestep_hz.max(1)
    }
}
