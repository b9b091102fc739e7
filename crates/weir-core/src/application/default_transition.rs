use tracing::debug;

use crate::domain::flow_node_instance::FlowNodeInstance;
use crate::domain::process_definition::{FlowNodeTransitions, ProcessDefinition, TransitionDefinition};
use crate::{EngineError, ExecutionError, Result};

/// Falls back to the default transition of a flow node
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultTransitionResolver;

impl DefaultTransitionResolver {
    /// Create a resolver
    pub fn new() -> Self {
        Self
    }

    /// The default transition, or an execution error when none is configured
    pub fn resolve(
        &self,
        transitions: &FlowNodeTransitions,
        definition: &ProcessDefinition,
        flow_node: &FlowNodeInstance,
    ) -> Result<TransitionDefinition> {
        if let Some(default) = &transitions.default_transition {
            debug!(
                "Flow node {} falls back to default transition {}",
                flow_node.name, default.name
            );
            return Ok(default.clone());
        }

        let mut err = ExecutionError::new(
            "There is no default transition on this flow node, no outgoing transition can be taken",
        )
        .with_flow_node(flow_node.name.clone())
        .with_process(definition.name.clone(), definition.version.clone());
        if let Some(process_instance_id) = flow_node.parent_process_instance_id() {
            err = err.with_process_instance(process_instance_id);
        }
        Err(EngineError::Execution(err))
    }
}
