use crate::domain::business_data::{BusinessObjectDao, Entity};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// A value produced by evaluating an expression
///
/// Plain process data travels as JSON; business data keeps its entity
/// shape so callers can tell a single entity from a list of them.
#[derive(Clone, Debug, PartialEq)]
pub enum RuntimeValue {
    /// Scalar, list or structured process data
    Data(serde_json::Value),

    /// A single business data entity
    Entity(Entity),

    /// Several business data entities, in store order
    Entities(Vec<Entity>),

    /// A business object accessor bound to the business data store
    Dao(DaoHandle),

    /// A handle provided by the engine itself
    Handle(EngineHandle),
}

impl RuntimeValue {
    /// The null value
    #[inline]
    pub fn null() -> Self {
        RuntimeValue::Data(serde_json::Value::Null)
    }

    /// Check if the value is null
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, RuntimeValue::Data(serde_json::Value::Null))
    }

    /// Try to read the value as a boolean
    #[inline]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            RuntimeValue::Data(value) => value.as_bool(),
            _ => None,
        }
    }

    /// Try to read the value as an integer
    #[inline]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            RuntimeValue::Data(value) => value.as_i64(),
            _ => None,
        }
    }

    /// Try to read the value as a string
    #[inline]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            RuntimeValue::Data(value) => value.as_str(),
            _ => None,
        }
    }

    /// Get the inner JSON value of plain data
    #[inline]
    pub fn as_data(&self) -> Option<&serde_json::Value> {
        match self {
            RuntimeValue::Data(value) => Some(value),
            _ => None,
        }
    }

    /// Short description of the value's shape, used in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            RuntimeValue::Data(serde_json::Value::Null) => "null",
            RuntimeValue::Data(serde_json::Value::Bool(_)) => "boolean",
            RuntimeValue::Data(serde_json::Value::Number(_)) => "number",
            RuntimeValue::Data(serde_json::Value::String(_)) => "string",
            RuntimeValue::Data(serde_json::Value::Array(_)) => "list",
            RuntimeValue::Data(serde_json::Value::Object(_)) => "object",
            RuntimeValue::Entity(_) => "entity",
            RuntimeValue::Entities(_) => "entity list",
            RuntimeValue::Dao(_) => "business object accessor",
            RuntimeValue::Handle(_) => "engine handle",
        }
    }
}

impl From<serde_json::Value> for RuntimeValue {
    fn from(value: serde_json::Value) -> Self {
        RuntimeValue::Data(value)
    }
}

impl From<bool> for RuntimeValue {
    fn from(value: bool) -> Self {
        RuntimeValue::Data(serde_json::Value::Bool(value))
    }
}

impl From<i64> for RuntimeValue {
    fn from(value: i64) -> Self {
        RuntimeValue::Data(serde_json::Value::from(value))
    }
}

impl From<f64> for RuntimeValue {
    fn from(value: f64) -> Self {
        match serde_json::Number::from_f64(value) {
            Some(num) => RuntimeValue::Data(serde_json::Value::Number(num)),
            None => RuntimeValue::null(),
        }
    }
}

impl From<&str> for RuntimeValue {
    fn from(value: &str) -> Self {
        RuntimeValue::Data(serde_json::Value::String(value.to_string()))
    }
}

impl From<String> for RuntimeValue {
    fn from(value: String) -> Self {
        RuntimeValue::Data(serde_json::Value::String(value))
    }
}

impl From<Entity> for RuntimeValue {
    fn from(entity: Entity) -> Self {
        RuntimeValue::Entity(entity)
    }
}

/// Shared reference to a business object accessor
///
/// Two handles are equal when they point at the same accessor instance.
#[derive(Clone)]
pub struct DaoHandle(pub Arc<dyn BusinessObjectDao>);

impl DaoHandle {
    /// Access the underlying accessor
    pub fn dao(&self) -> &dyn BusinessObjectDao {
        self.0.as_ref()
    }
}

impl fmt::Debug for DaoHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("DaoHandle")
            .field(&self.0.implementation_name())
            .finish()
    }
}

impl PartialEq for DaoHandle {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// Handles the engine hands to expressions
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineHandle {
    /// Accessor to the engine's public API, scoped to the current tenant
    ApiAccessor,

    /// API accessor dedicated to connectors
    ConnectorApiAccessor,

    /// Snapshot of where the evaluation is taking place
    ExecutionContext(EngineExecutionContext),
}

/// Where an evaluation takes place
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineExecutionContext {
    /// Process definition of the evaluation
    pub process_definition_id: Option<i64>,

    /// Process instance, when the container is a process instance
    pub process_instance_id: Option<i64>,

    /// Flow node instance, when the container is a flow node
    pub activity_instance_id: Option<i64>,
}
