use ahash::AHashMap;
use serde::de::DeserializeOwned;

use crate::error::{EcsError, Result};

/// A collection of process-wide singleton values that are not attached to any entity
///
/// # Implementation
/// Resources are keyed by name and held as JSON values, so a system can request any of them by
/// key in its query without the registry knowing their concrete types. Callers that want a typed
/// view decode on read with [ResourceRegistry::find_resource_as].
pub struct ResourceRegistry {
    resources: AHashMap<String, serde_json::Value>,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self {
            resources: AHashMap::with_capacity(8),
        }
    }

    /// Last write wins. Returns the value that was replaced, if any.
    pub fn register_resource(
        &mut self,
        key: impl Into<String>,
        value: serde_json::Value,
    ) -> Option<serde_json::Value> {
        self.resources.insert(key.into(), value)
    }

    pub fn find_resource(&self, key: &str) -> Result<&serde_json::Value> {
        self.resources
            .get(key)
            .ok_or_else(|| EcsError::ResourceNotFound(key.to_owned()))
    }

    pub fn find_resource_as<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        let value = self.find_resource(key)?;
        T::deserialize(value).map_err(|e| EcsError::InvalidResource {
            key: key.to_owned(),
            reason: e.to_string(),
        })
    }

    pub fn contains(&self, key: &str) -> bool {
        self.resources.contains_key(key)
    }

    pub fn remove_resource(&mut self, key: &str) -> Result<serde_json::Value> {
        self.resources
            .remove(key)
            .ok_or_else(|| EcsError::ResourceNotFound(key.to_owned()))
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

impl Default for ResourceRegistry {
    fn default() -> Self {
        Self::new()
    }
}
