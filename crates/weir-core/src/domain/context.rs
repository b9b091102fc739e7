use crate::types::RuntimeValue;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Kind of element a data container is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ContainerType {
    /// A process instance
    #[serde(rename = "PROCESS_INSTANCE")]
    ProcessInstance,

    /// A flow node instance
    #[serde(rename = "FLOW_NODE")]
    FlowNode,
}

impl ContainerType {
    /// Name used in query parameters
    pub fn as_str(&self) -> &'static str {
        match self {
            ContainerType::ProcessInstance => "PROCESS_INSTANCE",
            ContainerType::FlowNode => "FLOW_NODE",
        }
    }
}

impl fmt::Display for ContainerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Value object: a data-scoping boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DataContainer {
    /// Id of the process instance or flow node instance
    pub id: i64,

    /// What the id refers to
    pub container_type: ContainerType,
}

impl DataContainer {
    /// Create a container
    #[inline]
    pub fn new(id: i64, container_type: ContainerType) -> Self {
        Self { id, container_type }
    }

    /// Container of a process instance
    #[inline]
    pub fn process_instance(id: i64) -> Self {
        Self::new(id, ContainerType::ProcessInstance)
    }

    /// Container of a flow node instance
    #[inline]
    pub fn flow_node(id: i64) -> Self {
        Self::new(id, ContainerType::FlowNode)
    }
}

impl fmt::Display for DataContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.container_type, self.id)
    }
}

/// Mutable per-evaluation context
///
/// Holds the values already known for this batch plus the side channels
/// describing where the evaluation happens. A context is created for one
/// batch and is never shared between concurrent evaluations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExpressionContext {
    values: HashMap<String, RuntimeValue>,

    /// Id of the container the evaluation runs in
    pub container_id: Option<i64>,

    /// Type of the container the evaluation runs in
    pub container_type: Option<ContainerType>,

    /// Process definition of the evaluated element
    pub process_definition_id: Option<i64>,

    /// When set, data is read from archived snapshots taken at or before this instant
    pub time: Option<DateTime<Utc>>,
}

impl ExpressionContext {
    /// Create an empty context
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a context bound to a container
    pub fn for_container(container: DataContainer) -> Self {
        Self {
            container_id: Some(container.id),
            container_type: Some(container.container_type),
            ..Self::default()
        }
    }

    /// Set the process definition id
    pub fn with_process_definition(mut self, process_definition_id: i64) -> Self {
        self.process_definition_id = Some(process_definition_id);
        self
    }

    /// Evaluate against archived data as of `time`
    pub fn at_time(mut self, time: DateTime<Utc>) -> Self {
        self.time = Some(time);
        self
    }

    /// Add a value to the context
    pub fn with_value(mut self, name: impl Into<String>, value: impl Into<RuntimeValue>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }

    /// The container the evaluation runs in, when both side channels are set
    pub fn container(&self) -> Option<DataContainer> {
        match (self.container_id, self.container_type) {
            (Some(id), Some(container_type)) => Some(DataContainer::new(id, container_type)),
            _ => None,
        }
    }

    /// Get a value
    #[inline]
    pub fn get(&self, name: &str) -> Option<&RuntimeValue> {
        self.values.get(name)
    }

    /// Check if a value is present
    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Put or replace a value
    #[inline]
    pub fn insert(&mut self, name: impl Into<String>, value: RuntimeValue) {
        self.values.insert(name.into(), value);
    }

    /// All values currently known
    #[inline]
    pub fn values(&self) -> &HashMap<String, RuntimeValue> {
        &self.values
    }
}
