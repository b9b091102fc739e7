//! Standard ancestor-chain resolution for data containers.
//!
//! A flow node sees the data of its process instance; a process instance
//! started by an event sub-process activity sees the data of that activity
//! and, through it, of the enclosing process instance. Instances started by
//! a call activity have their own scope and stop the chain.

use std::sync::Arc;

use tracing::trace;

use crate::domain::context::{ContainerType, DataContainer};
use crate::domain::flow_node_instance::{FlowNodeInstance, ProcessInstance};
use crate::domain::repository::{
    ParentContainerResolver, QueryParameter, QueryParameters, ReadArchiveService,
    ReadPersistenceService, SelectOneDescriptor,
};
use crate::{EngineError, Result};

/// Latest snapshot of a flow node instance, by `sourceObjectId`
pub const LAST_ARCHIVED_FLOW_NODE_INSTANCE_QUERY: &str = "getLastArchivedFlowNodeInstance";

/// Latest snapshot of a process instance, by `sourceObjectId`
pub const LAST_ARCHIVED_PROCESS_INSTANCE_QUERY: &str = "getLastArchivedProcessInstance";

/// Parameter holding the id of the live record a snapshot was taken from
pub const SOURCE_OBJECT_ID_PARAMETER: &str = "sourceObjectId";

struct ArchivedRecords {
    flow_nodes: Arc<dyn ReadArchiveService<FlowNodeInstance>>,
    process_instances: Arc<dyn ReadArchiveService<ProcessInstance>>,
}

/// Resolves container hierarchies from flow node and process instance records
///
/// The live variant only sees live records. The archived variant falls back
/// to the latest snapshot of containers that have been purged from the live
/// store, so history can still be resolved after completion.
pub struct ParentContainerResolverImpl {
    flow_nodes: Arc<dyn ReadPersistenceService<FlowNodeInstance>>,
    process_instances: Arc<dyn ReadPersistenceService<ProcessInstance>>,
    archive: Option<ArchivedRecords>,
}

impl ParentContainerResolverImpl {
    /// Resolver over live records only
    pub fn live(
        flow_nodes: Arc<dyn ReadPersistenceService<FlowNodeInstance>>,
        process_instances: Arc<dyn ReadPersistenceService<ProcessInstance>>,
    ) -> Self {
        Self {
            flow_nodes,
            process_instances,
            archive: None,
        }
    }

    /// Resolver that also accepts containers only present in the archive
    pub fn archived(
        flow_nodes: Arc<dyn ReadPersistenceService<FlowNodeInstance>>,
        process_instances: Arc<dyn ReadPersistenceService<ProcessInstance>>,
        archived_flow_nodes: Arc<dyn ReadArchiveService<FlowNodeInstance>>,
        archived_process_instances: Arc<dyn ReadArchiveService<ProcessInstance>>,
    ) -> Self {
        Self {
            flow_nodes,
            process_instances,
            archive: Some(ArchivedRecords {
                flow_nodes: archived_flow_nodes,
                process_instances: archived_process_instances,
            }),
        }
    }

    /// Whether purged containers are resolved from the archive
    pub fn allows_archived_containers(&self) -> bool {
        self.archive.is_some()
    }

    fn flow_node(&self, id: i64) -> Result<FlowNodeInstance> {
        if let Some(node) = self.flow_nodes.select_by_id(id)? {
            return Ok(node);
        }
        if let Some(archive) = &self.archive {
            let query = last_snapshot_query(LAST_ARCHIVED_FLOW_NODE_INSTANCE_QUERY, id);
            if let Some(snapshot) = archive.flow_nodes.select_one(&query)? {
                return Ok(snapshot.record);
            }
        }
        Err(EngineError::NotFound(format!("Flow node instance {}", id)))
    }

    fn process_instance(&self, id: i64) -> Result<ProcessInstance> {
        if let Some(instance) = self.process_instances.select_by_id(id)? {
            return Ok(instance);
        }
        if let Some(archive) = &self.archive {
            let query = last_snapshot_query(LAST_ARCHIVED_PROCESS_INSTANCE_QUERY, id);
            if let Some(snapshot) = archive.process_instances.select_one(&query)? {
                return Ok(snapshot.record);
            }
        }
        Err(EngineError::NotFound(format!("Process instance {}", id)))
    }

    fn parent_of(&self, container: DataContainer) -> Result<Option<DataContainer>> {
        let parent = match container.container_type {
            ContainerType::FlowNode => self
                .flow_node(container.id)?
                .parent_process_instance_id()
                .map(DataContainer::process_instance),
            ContainerType::ProcessInstance => self
                .process_instance(container.id)?
                .data_scope_parent()
                .map(DataContainer::flow_node),
        };
        Ok(parent)
    }
}

impl ParentContainerResolver for ParentContainerResolverImpl {
    fn container_hierarchy(&self, container: DataContainer) -> Result<Vec<DataContainer>> {
        let mut hierarchy = vec![container];
        let mut current = container;
        while let Some(parent) = self.parent_of(current)? {
            if hierarchy.contains(&parent) {
                return Err(EngineError::Persistence(format!(
                    "Container hierarchy of {} loops back to {}",
                    container, parent
                )));
            }
            hierarchy.push(parent);
            current = parent;
        }
        trace!("Container hierarchy of {}: {:?}", container, hierarchy);
        Ok(hierarchy)
    }
}

fn last_snapshot_query(query_name: &str, source_object_id: i64) -> SelectOneDescriptor {
    let mut parameters = QueryParameters::new();
    parameters.insert(
        SOURCE_OBJECT_ID_PARAMETER.to_string(),
        QueryParameter::Id(source_object_id),
    );
    SelectOneDescriptor::new(query_name, parameters)
}
