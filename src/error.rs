use thiserror::Error;

use crate::{component::ComponentId, entity::Entity};

pub type Result<T> = std::result::Result<T, EcsError>;

/// Why a state payload was rejected by a component schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidStateReason {
    /// The payload carries a property the schema does not declare
    UnknownProperty(String),
    /// A create payload is missing a property the schema declares
    MissingProperty(String),
    KindMismatch {
        property: String,
        expected: &'static str,
        found: &'static str,
    },
}

impl std::fmt::Display for InvalidStateReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownProperty(p) => write!(f, "unknown property `{p}`"),
            Self::MissingProperty(p) => write!(f, "missing property `{p}`"),
            Self::KindMismatch {
                property,
                expected,
                found,
            } => write!(f, "property `{property}` expects {expected}, found {found}"),
        }
    }
}

/// Every failure the kernel reports. All of them are raised synchronously at the point where the
/// precondition is violated, and none are retried.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EcsError {
    #[error("entity limit of {limit} exceeded")]
    EntityLimitExceeded { limit: usize },

    #[error("entity id space exhausted")]
    EntityIdsExhausted,

    #[error("entity {0} not found")]
    EntityNotFound(Entity),

    #[error("component {component} already exists on entity {entity}")]
    ComponentAlreadyExists { entity: Entity, component: ComponentId },

    #[error("component {component} not found on entity {entity}")]
    ComponentNotFound { entity: Entity, component: ComponentId },

    #[error("invalid component type {0}")]
    InvalidComponentType(ComponentId),

    #[error("invalid state for component {component}: {reason}")]
    InvalidComponentState {
        component: ComponentId,
        reason: InvalidStateReason,
    },

    #[error("component type {0} already registered")]
    TypeAlreadyRegistered(ComponentId),

    #[error("component {component} already attached to entity {entity}")]
    ComponentAlreadyAttached { entity: Entity, component: ComponentId },

    #[error("component {component} not attached to entity {entity}")]
    ComponentNotAttached { entity: Entity, component: ComponentId },

    #[error("resource `{0}` not found")]
    ResourceNotFound(String),

    #[error("resource `{key}` has an unexpected shape: {reason}")]
    InvalidResource { key: String, reason: String },

    #[error("assemblage `{0}` not found")]
    AssemblageNotFound(String),

    #[error("assemblage `{assemblage}` references unregistered component type {component}")]
    InvalidAssemblageType {
        assemblage: String,
        component: ComponentId,
    },

    #[error("system `{system}` failed: {message}")]
    System { system: String, message: String },

    #[error("configuration error: {0}")]
    Config(String),
}

impl EcsError {
    /// Failures that break a structural invariant of the kernel. The scheduler stops and hands
    /// these to the host instead of isolating them to a single system.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::EntityLimitExceeded { .. } | Self::EntityIdsExhausted
        )
    }

    pub fn system(system: impl Into<String>, message: impl Into<String>) -> Self {
        Self::System {
            system: system.into(),
            message: message.into(),
        }
    }
}
