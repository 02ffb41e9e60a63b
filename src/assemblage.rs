use ahash::AHashMap;

use crate::{
    component::{schema::State, ComponentId, ComponentStore},
    error::{EcsError, Result},
};

/// A named, ordered list of component types and their initial state, used to build one entity
/// with its full component set in a single call.
#[derive(Debug, Clone, PartialEq)]
pub struct Assemblage {
    pub name: String,
    pub components: Vec<(ComponentId, State)>,
}

impl Assemblage {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            components: Vec::new(),
        }
    }

    pub fn with(mut self, id: ComponentId, state: State) -> Self {
        self.components.push((id, state));
        self
    }
}

pub struct AssemblageRegistry {
    assemblages: AHashMap<String, Assemblage>,
}

impl AssemblageRegistry {
    pub fn new() -> Self {
        Self {
            assemblages: AHashMap::new(),
        }
    }

    /// Every component type the assemblage lists must already be registered in `store`. Payloads
    /// are only validated when the assemblage is built. Registering under an existing name
    /// replaces the previous assemblage.
    pub fn register(&mut self, assemblage: Assemblage, store: &ComponentStore) -> Result<()> {
        if let Some(&(component, _)) = assemblage
            .components
            .iter()
            .find(|(id, _)| !store.is_registered(*id))
        {
            return Err(EcsError::InvalidAssemblageType {
                assemblage: assemblage.name,
                component,
            });
        }

        self.assemblages.insert(assemblage.name.clone(), assemblage);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<&Assemblage> {
        self.assemblages
            .get(name)
            .ok_or_else(|| EcsError::AssemblageNotFound(name.to_owned()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.assemblages.contains_key(name)
    }
}

impl Default for AssemblageRegistry {
    fn default() -> Self {
        Self::new()
    }
}
