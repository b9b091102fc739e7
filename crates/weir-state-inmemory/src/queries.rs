//! Named queries the engine issues, implemented as row filters

use std::sync::Arc;

use weir_core::application::container_resolver::{
    LAST_ARCHIVED_FLOW_NODE_INSTANCE_QUERY, LAST_ARCHIVED_PROCESS_INSTANCE_QUERY,
    SOURCE_OBJECT_ID_PARAMETER,
};
use weir_core::application::data_instance_service::{
    container_ids_parameter, container_type_parameter, ARCHIVED_DATA_INSTANCES_QUERY,
    ARCHIVED_DATA_INSTANCES_WITH_NAMES_QUERY, CONTAINER_ID_PARAMETER, CONTAINER_TYPE_PARAMETER,
    DATA_INSTANCES_QUERY, DATA_INSTANCES_WITH_NAMES_QUERY, DATA_NAMES_PARAMETER,
    LOCAL_DATA_INSTANCES_QUERY, TIME_PARAMETER,
};
use weir_core::domain::archive::Archived;
use weir_core::domain::data_instance::DataInstance;
use weir_core::domain::flow_node_instance::{FlowNodeInstance, ProcessInstance};
use weir_core::domain::repository::QueryParameters;

use crate::store::{InMemoryArchiveStore, InMemoryRecordStore, Record};

/// Largest number of distinct container types a hierarchy query may carry
pub const MAX_CONTAINER_TYPES: usize = 4;

/// Whether `data` is bound to one of the first `types` container groups
fn in_containers(parameters: &QueryParameters, types: usize, data: &DataInstance) -> bool {
    (1..=types).any(|index| {
        let type_matches = parameters
            .get(&container_type_parameter(index))
            .and_then(|value| value.as_text())
            == Some(data.container_type.as_str());
        type_matches
            && parameters
                .get(&container_ids_parameter(index))
                .and_then(|value| value.as_ids())
                .map_or(false, |ids| ids.contains(&data.container_id))
    })
}

fn named(parameters: &QueryParameters, data: &DataInstance) -> bool {
    parameters
        .get(DATA_NAMES_PARAMETER)
        .and_then(|value| value.as_texts())
        .map_or(false, |names| names.iter().any(|name| *name == data.name))
}

fn as_of(parameters: &QueryParameters, snapshot: &Archived<DataInstance>) -> bool {
    parameters
        .get(TIME_PARAMETER)
        .and_then(|value| value.as_time())
        .map_or(false, |time| snapshot.archive_date <= time)
}

/// Hierarchy and local lookups of live data
pub fn register_data_instance_queries(store: &InMemoryRecordStore<DataInstance>) {
    for types in 1..=MAX_CONTAINER_TYPES {
        store.register_query(
            format!("{}{}", DATA_INSTANCES_WITH_NAMES_QUERY, types),
            Arc::new(move |parameters: &QueryParameters, data: &DataInstance| {
                in_containers(parameters, types, data) && named(parameters, data)
            }),
        );
        store.register_query(
            format!("{}{}", DATA_INSTANCES_QUERY, types),
            Arc::new(move |parameters: &QueryParameters, data: &DataInstance| {
                in_containers(parameters, types, data)
            }),
        );
    }

    store.register_query(
        LOCAL_DATA_INSTANCES_QUERY,
        Arc::new(|parameters: &QueryParameters, data: &DataInstance| {
            let id = parameters
                .get(CONTAINER_ID_PARAMETER)
                .and_then(|value| value.as_id());
            let container_type = parameters
                .get(CONTAINER_TYPE_PARAMETER)
                .and_then(|value| value.as_text());
            id == Some(data.container_id) && container_type == Some(data.container_type.as_str())
        }),
    );
}

/// Hierarchy lookups of archived data as of a point in time
pub fn register_archived_data_instance_queries(store: &InMemoryArchiveStore<DataInstance>) {
    for types in 1..=MAX_CONTAINER_TYPES {
        store.register_query(
            format!("{}{}", ARCHIVED_DATA_INSTANCES_WITH_NAMES_QUERY, types),
            Arc::new(move |parameters: &QueryParameters, snapshot: &Archived<DataInstance>| {
                as_of(parameters, snapshot)
                    && in_containers(parameters, types, &snapshot.record)
                    && named(parameters, &snapshot.record)
            }),
        );
        store.register_query(
            format!("{}{}", ARCHIVED_DATA_INSTANCES_QUERY, types),
            Arc::new(move |parameters: &QueryParameters, snapshot: &Archived<DataInstance>| {
                as_of(parameters, snapshot) && in_containers(parameters, types, &snapshot.record)
            }),
        );
    }
}

fn same_source<T: Record>(parameters: &QueryParameters, snapshot: &Archived<T>) -> bool {
    parameters
        .get(SOURCE_OBJECT_ID_PARAMETER)
        .and_then(|value| value.as_id())
        == Some(snapshot.source_object_id)
}

/// Latest snapshot of a flow node instance
pub fn register_archived_flow_node_queries(store: &InMemoryArchiveStore<FlowNodeInstance>) {
    store.register_query(
        LAST_ARCHIVED_FLOW_NODE_INSTANCE_QUERY,
        Arc::new(|parameters: &QueryParameters, snapshot: &Archived<FlowNodeInstance>| {
            same_source(parameters, snapshot)
        }),
    );
}

/// Latest snapshot of a process instance
pub fn register_archived_process_instance_queries(store: &InMemoryArchiveStore<ProcessInstance>) {
    store.register_query(
        LAST_ARCHIVED_PROCESS_INSTANCE_QUERY,
        Arc::new(|parameters: &QueryParameters, snapshot: &Archived<ProcessInstance>| {
            same_source(parameters, snapshot)
        }),
    );
}
