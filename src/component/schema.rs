use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::InvalidStateReason;

/// The closed set of primitive kinds a component property can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    Number,
    String,
    Boolean,
}

impl Kind {
    pub fn as_str(self) -> &'static str {
        match self {
            Kind::Number => "number",
            Kind::String => "string",
            Kind::Boolean => "boolean",
        }
    }
}

impl std::fmt::Display for Kind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single property value. Untagged, so JSON and TOML scalars map onto it directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Boolean(bool),
    Number(f64),
    String(String),
}

impl Value {
    pub fn kind(&self) -> Kind {
        match self {
            Value::Number(_) => Kind::Number,
            Value::String(_) => Kind::String,
            Value::Boolean(_) => Kind::Boolean,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Number(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Number(value as f64)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

/// The state of one component instance. Ordered so that iteration and debug output are stable.
pub type State = BTreeMap<String, Value>;

/// Builds a [State] from `key => value` pairs, converting each value with `Value::from`.
#[macro_export]
macro_rules! state {
    () => { $crate::State::new() };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut state = $crate::State::new();
        $( state.insert(::std::string::String::from($key), $crate::Value::from($value)); )+
        state
    }};
}

/// Maps each property of a component type to the kind of value it must hold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    pub name: String,
    pub fields: BTreeMap<String, Kind>,
}

impl Schema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: BTreeMap::new(),
        }
    }

    pub fn field(mut self, property: impl Into<String>, kind: Kind) -> Self {
        self.fields.insert(property.into(), kind);
        self
    }

    pub fn kind_of(&self, property: &str) -> Option<Kind> {
        self.fields.get(property).copied()
    }

    /// Checks a payload used to create a component: every declared property must be present, no
    /// undeclared ones may appear, and each value must be of the declared kind.
    pub fn validate_full(&self, state: &State) -> Result<(), InvalidStateReason> {
        self.validate_partial(state)?;

        match self.fields.keys().find(|key| !state.contains_key(*key)) {
            Some(missing) => Err(InvalidStateReason::MissingProperty(missing.clone())),
            None => Ok(()),
        }
    }

    /// Checks a payload used to update a component, where any subset of the declared properties
    /// may be given.
    pub fn validate_partial(&self, state: &State) -> Result<(), InvalidStateReason> {
        for (property, value) in state {
            let Some(expected) = self.kind_of(property) else {
                return Err(InvalidStateReason::UnknownProperty(property.clone()));
            };

            let found = value.kind();
            if found != expected {
                return Err(InvalidStateReason::KindMismatch {
                    property: property.clone(),
                    expected: expected.as_str(),
                    found: found.as_str(),
                });
            }
        }

        Ok(())
    }
}
