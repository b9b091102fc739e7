use crate::domain::expression::Expression;
use crate::EngineError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Routing semantics of a gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GatewayType {
    /// Fires every outgoing transition
    Parallel,
    /// Fires every matching outgoing transition
    Inclusive,
    /// Fires the first matching outgoing transition
    Exclusive,
}

/// Kind of a flow node definition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FlowNodeType {
    /// Start event
    StartEvent,
    /// Intermediate catch or throw event
    IntermediateEvent,
    /// End event
    EndEvent,
    /// Human, service or script task
    Task,
    /// Activity calling another process
    CallActivity,
    /// Event sub-process activity
    SubProcess,
    /// Routing-only node
    Gateway(GatewayType),
}

impl FlowNodeType {
    /// Gateway semantics of this node, if it is a gateway
    #[inline]
    pub fn gateway_type(&self) -> Option<GatewayType> {
        match self {
            FlowNodeType::Gateway(gateway_type) => Some(*gateway_type),
            _ => None,
        }
    }

    /// Check if this node is a gateway
    #[inline]
    pub fn is_gateway(&self) -> bool {
        self.gateway_type().is_some()
    }
}

/// A directed edge between two flow nodes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionDefinition {
    /// ID of the transition
    pub id: String,

    /// Human-readable name
    pub name: String,

    /// Source flow node ID
    pub source: String,

    /// Target flow node ID
    pub target: String,

    /// Guard expression; a transition without one is unconditional
    pub condition: Option<Expression>,
}

impl TransitionDefinition {
    /// Create an unconditional transition
    pub fn new(
        id: impl Into<String>,
        source: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            source: source.into(),
            target: target.into(),
            condition: None,
        }
    }

    /// Set the guard expression
    pub fn with_condition(mut self, condition: Expression) -> Self {
        self.condition = Some(condition);
        self
    }

    /// Set the name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Check if the transition has no guard
    #[inline]
    pub fn is_unconditional(&self) -> bool {
        self.condition.is_none()
    }
}

/// A node of the process graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowNodeDefinition {
    /// ID of the flow node
    pub id: String,

    /// Human-readable name
    pub name: String,

    /// Kind of node
    pub node_type: FlowNodeType,

    /// Outgoing transition IDs in definition order, default included
    pub outgoing: Vec<String>,

    /// Designated fallback transition
    pub default_transition: Option<String>,
}

impl FlowNodeDefinition {
    /// Create a flow node without outgoing transitions
    pub fn new(id: impl Into<String>, name: impl Into<String>, node_type: FlowNodeType) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            node_type,
            outgoing: Vec::new(),
            default_transition: None,
        }
    }
}

/// Represents a deployed, immutable process definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessDefinition {
    /// ID of the process definition
    pub id: i64,

    /// Name of the process
    pub name: String,

    /// Version of the process
    pub version: String,

    /// Nodes of the graph
    pub flow_nodes: Vec<FlowNodeDefinition>,

    /// Edges of the graph
    pub transitions: Vec<TransitionDefinition>,
}

impl ProcessDefinition {
    /// Create an empty process definition
    pub fn new(id: i64, name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            version: version.into(),
            flow_nodes: Vec::new(),
            transitions: Vec::new(),
        }
    }

    /// Add a flow node
    pub fn add_flow_node(&mut self, node: FlowNodeDefinition) {
        self.flow_nodes.push(node);
    }

    /// Add a transition and register it as outgoing of its source node
    pub fn add_transition(&mut self, transition: TransitionDefinition) {
        if let Some(node) = self.flow_nodes.iter_mut().find(|n| n.id == transition.source) {
            node.outgoing.push(transition.id.clone());
        }
        self.transitions.push(transition);
    }

    /// Add a transition and make it the default one of its source node
    pub fn add_default_transition(&mut self, transition: TransitionDefinition) {
        if let Some(node) = self.flow_nodes.iter_mut().find(|n| n.id == transition.source) {
            node.default_transition = Some(transition.id.clone());
        }
        self.add_transition(transition);
    }

    /// Find a flow node by ID
    pub fn flow_node(&self, id: &str) -> Option<&FlowNodeDefinition> {
        self.flow_nodes.iter().find(|n| n.id == id)
    }

    /// Find a transition by ID
    pub fn transition(&self, id: &str) -> Option<&TransitionDefinition> {
        self.transitions.iter().find(|t| t.id == id)
    }

    /// Validate the process definition
    pub fn validate(&self) -> Result<(), EngineError> {
        let mut node_ids = HashSet::new();
        for node in &self.flow_nodes {
            if !node_ids.insert(node.id.as_str()) {
                return Err(EngineError::execution(format!(
                    "Duplicate flow node ID: {}",
                    node.id
                )));
            }
        }

        let mut transition_ids = HashSet::new();
        for transition in &self.transitions {
            if !transition_ids.insert(transition.id.as_str()) {
                return Err(EngineError::execution(format!(
                    "Duplicate transition ID: {}",
                    transition.id
                )));
            }
            for end in [&transition.source, &transition.target] {
                if !node_ids.contains(end.as_str()) {
                    return Err(EngineError::execution(format!(
                        "Transition {} references non-existent flow node: {}",
                        transition.id, end
                    )));
                }
            }
        }

        for node in &self.flow_nodes {
            for id in &node.outgoing {
                let transition = self.transition(id).ok_or_else(|| {
                    EngineError::execution(format!(
                        "Flow node {} references non-existent transition: {}",
                        node.name, id
                    ))
                })?;
                if transition.source != node.id {
                    return Err(EngineError::execution(format!(
                        "Transition {} listed as outgoing of {} but starts at {}",
                        id, node.name, transition.source
                    )));
                }
                if node.node_type == FlowNodeType::Gateway(GatewayType::Parallel)
                    && !transition.is_unconditional()
                {
                    return Err(EngineError::execution(format!(
                        "Outgoing transition {} of parallel gateway {} cannot have a condition",
                        id, node.name
                    )));
                }
            }
            if let Some(default) = &node.default_transition {
                if !node.outgoing.contains(default) {
                    return Err(EngineError::execution(format!(
                        "Default transition {} is not an outgoing transition of {}",
                        default, node.name
                    )));
                }
            }
        }

        Ok(())
    }
}

/// The outgoing transitions of one flow node, split the way gateways consume them
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlowNodeTransitions {
    /// Every outgoing transition, in definition order
    pub all_outgoing: Vec<TransitionDefinition>,

    /// Outgoing transitions without the default one, in definition order
    pub non_default_outgoing: Vec<TransitionDefinition>,

    /// Designated fallback transition
    pub default_transition: Option<TransitionDefinition>,
}

impl FlowNodeTransitions {
    /// Collect the outgoing transitions of a flow node
    pub fn for_flow_node(
        definition: &ProcessDefinition,
        flow_node_id: &str,
    ) -> Result<Self, EngineError> {
        let node = definition.flow_node(flow_node_id).ok_or_else(|| {
            EngineError::NotFound(format!(
                "Flow node {} in process {} {}",
                flow_node_id, definition.name, definition.version
            ))
        })?;

        let mut transitions = Self::default();
        for id in &node.outgoing {
            let transition = definition.transition(id).ok_or_else(|| {
                EngineError::NotFound(format!("Transition {} of flow node {}", id, node.name))
            })?;
            if node.default_transition.as_deref() == Some(id.as_str()) {
                transitions.default_transition = Some(transition.clone());
            } else {
                transitions.non_default_outgoing.push(transition.clone());
            }
            transitions.all_outgoing.push(transition.clone());
        }
        Ok(transitions)
    }

    /// Check if the node has no outgoing transition at all
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.all_outgoing.is_empty()
    }
}
