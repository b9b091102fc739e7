use crate::domain::archive::Archived;
use crate::domain::process_definition::FlowNodeType;
use serde::{Deserialize, Serialize};

/// Logical group holding the process definition id
pub const PROCESS_DEFINITION_GROUP: usize = 0;
/// Logical group holding the root process instance id
pub const ROOT_PROCESS_INSTANCE_GROUP: usize = 1;
/// Logical group holding the parent activity instance id
pub const PARENT_ACTIVITY_INSTANCE_GROUP: usize = 2;
/// Logical group holding the parent process instance id
pub const PARENT_PROCESS_INSTANCE_GROUP: usize = 3;

/// Coarse category of a flow element's state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum StateCategory {
    /// Regular execution
    #[default]
    Normal,
    /// The enclosing process is being aborted
    Aborting,
    /// The enclosing process is being cancelled
    Cancelling,
}

/// Runtime record of a flow node instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowNodeInstance {
    /// Unique identifier
    pub id: i64,

    /// Name copied from the definition
    pub name: String,

    /// ID of the flow node definition
    pub flow_node_definition_id: String,

    /// Kind of node
    pub node_type: FlowNodeType,

    /// Current state id
    pub state_id: i32,

    /// Current state name
    pub state_name: String,

    /// Current state category
    pub state_category: StateCategory,

    /// Whether the current state waits for something external
    pub stable: bool,

    /// Whether the current state is final
    pub terminal: bool,

    /// Process definition id, root process instance id, parent activity
    /// instance id, parent process instance id; 0 when absent
    pub logical_group: [i64; 4],
}

impl FlowNodeInstance {
    /// Create an instance in its initial state
    pub fn new(
        id: i64,
        name: impl Into<String>,
        flow_node_definition_id: impl Into<String>,
        node_type: FlowNodeType,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            flow_node_definition_id: flow_node_definition_id.into(),
            node_type,
            state_id: 0,
            state_name: "initializing".to_string(),
            state_category: StateCategory::Normal,
            stable: false,
            terminal: false,
            logical_group: [0; 4],
        }
    }

    /// Set the owning process definition and process instances
    pub fn within(
        mut self,
        process_definition_id: i64,
        root_process_instance_id: i64,
        parent_process_instance_id: i64,
    ) -> Self {
        self.logical_group[PROCESS_DEFINITION_GROUP] = process_definition_id;
        self.logical_group[ROOT_PROCESS_INSTANCE_GROUP] = root_process_instance_id;
        self.logical_group[PARENT_PROCESS_INSTANCE_GROUP] = parent_process_instance_id;
        self
    }

    /// Set the parent activity instance
    pub fn with_parent_activity(mut self, parent_activity_instance_id: i64) -> Self {
        self.logical_group[PARENT_ACTIVITY_INSTANCE_GROUP] = parent_activity_instance_id;
        self
    }

    /// Move to another state
    pub fn with_state(
        mut self,
        state_id: i32,
        state_name: impl Into<String>,
        stable: bool,
        terminal: bool,
    ) -> Self {
        self.state_id = state_id;
        self.state_name = state_name.into();
        self.stable = stable;
        self.terminal = terminal;
        self
    }

    /// Set the state category
    pub fn with_state_category(mut self, state_category: StateCategory) -> Self {
        self.state_category = state_category;
        self
    }

    /// Id of the owning process definition
    #[inline]
    pub fn process_definition_id(&self) -> i64 {
        self.logical_group[PROCESS_DEFINITION_GROUP]
    }

    /// Id of the root process instance
    #[inline]
    pub fn root_process_instance_id(&self) -> i64 {
        self.logical_group[ROOT_PROCESS_INSTANCE_GROUP]
    }

    /// Id of the parent activity instance, if any
    #[inline]
    pub fn parent_activity_instance_id(&self) -> Option<i64> {
        non_zero(self.logical_group[PARENT_ACTIVITY_INSTANCE_GROUP])
    }

    /// Id of the parent process instance, if any
    #[inline]
    pub fn parent_process_instance_id(&self) -> Option<i64> {
        non_zero(self.logical_group[PARENT_PROCESS_INSTANCE_GROUP])
    }

    /// Check if the enclosing process is being aborted
    #[inline]
    pub fn is_aborting(&self) -> bool {
        self.state_category == StateCategory::Aborting
    }

    /// Check if the enclosing process is being cancelled
    #[inline]
    pub fn is_canceling(&self) -> bool {
        self.state_category == StateCategory::Cancelling
    }

    /// Whether the node must run its abort/cancel handling when its process
    /// is aborted or cancelled.
    ///
    /// Gateways always must: a merging gateway may be parked in an unstable
    /// state while it waits for its siblings.
    pub fn must_execute_on_abort_or_cancel_process(&self) -> bool {
        self.node_type.is_gateway() || (self.stable && !self.terminal)
    }
}

/// Archived snapshot of a flow node instance
pub type ArchivedFlowNodeInstance = Archived<FlowNodeInstance>;

/// How a process instance was started by another element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caller {
    /// Flow node instance that started the process
    pub flow_node_instance_id: i64,

    /// Kind of that flow node
    pub node_type: FlowNodeType,
}

/// Runtime record of a process instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessInstance {
    /// Unique identifier
    pub id: i64,

    /// Name copied from the definition
    pub name: String,

    /// Id of the process definition
    pub process_definition_id: i64,

    /// Id of the root process instance, itself for a root
    pub root_process_instance_id: i64,

    /// Element that started this instance, if any
    pub caller: Option<Caller>,
}

impl ProcessInstance {
    /// Create a root process instance
    pub fn new(id: i64, name: impl Into<String>, process_definition_id: i64) -> Self {
        Self {
            id,
            name: name.into(),
            process_definition_id,
            root_process_instance_id: id,
            caller: None,
        }
    }

    /// Mark this instance as started by a flow node of another instance
    pub fn called_by(
        mut self,
        flow_node_instance_id: i64,
        node_type: FlowNodeType,
        root_process_instance_id: i64,
    ) -> Self {
        self.caller = Some(Caller {
            flow_node_instance_id,
            node_type,
        });
        self.root_process_instance_id = root_process_instance_id;
        self
    }

    /// The event sub-process activity whose data this instance can see, if any
    ///
    /// Instances started by a call activity have their own data scope.
    pub fn data_scope_parent(&self) -> Option<i64> {
        match self.caller {
            Some(Caller {
                flow_node_instance_id,
                node_type: FlowNodeType::SubProcess,
            }) => Some(flow_node_instance_id),
            _ => None,
        }
    }
}

/// Archived snapshot of a process instance
pub type ArchivedProcessInstance = Archived<ProcessInstance>;

#[inline]
fn non_zero(id: i64) -> Option<i64> {
    if id > 0 {
        Some(id)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::process_definition::GatewayType;

    fn task() -> FlowNodeInstance {
        FlowNodeInstance::new(10, "Review", "review", FlowNodeType::Task).within(1, 100, 100)
    }

    #[test]
    fn test_logical_groups() {
        let node = task().with_parent_activity(7);

        assert_eq!(node.process_definition_id(), 1);
        assert_eq!(node.root_process_instance_id(), 100);
        assert_eq!(node.parent_process_instance_id(), Some(100));
        assert_eq!(node.parent_activity_instance_id(), Some(7));
        assert_eq!(task().parent_activity_instance_id(), None);
    }

    #[test]
    fn test_state_category() {
        let node = task().with_state_category(StateCategory::Aborting);
        assert!(node.is_aborting());
        assert!(!node.is_canceling());

        let node = task().with_state_category(StateCategory::Cancelling);
        assert!(!node.is_aborting());
        assert!(node.is_canceling());
    }

    #[test]
    fn test_must_execute_on_abort() {
        let ready = task().with_state(4, "ready", true, false);
        assert!(ready.must_execute_on_abort_or_cancel_process());

        let completed = task().with_state(2, "completed", true, true);
        assert!(!completed.must_execute_on_abort_or_cancel_process());

        let executing = task().with_state(1, "executing", false, false);
        assert!(!executing.must_execute_on_abort_or_cancel_process());

        let merging = FlowNodeInstance::new(
            11,
            "Join",
            "join",
            FlowNodeType::Gateway(GatewayType::Parallel),
        )
        .with_state(61, "executing", false, false);
        assert!(merging.must_execute_on_abort_or_cancel_process());
    }

    #[test]
    fn test_data_scope_parent() {
        let root = ProcessInstance::new(1, "Main", 9);
        assert_eq!(root.data_scope_parent(), None);

        let event_sub = ProcessInstance::new(2, "Handler", 9).called_by(5, FlowNodeType::SubProcess, 1);
        assert_eq!(event_sub.data_scope_parent(), Some(5));
        assert_eq!(event_sub.root_process_instance_id, 1);

        let called = ProcessInstance::new(3, "Child", 8).called_by(6, FlowNodeType::CallActivity, 1);
        assert_eq!(called.data_scope_parent(), None);
    }
}
