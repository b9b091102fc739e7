//! Process data lookup through container hierarchies
//!
//! A data name visible from a container resolves to the instance bound to
//! the nearest container of its hierarchy. Lookups over a whole hierarchy
//! are issued as a single named query whose name encodes how many distinct
//! container types the hierarchy holds, so a store can prepare one
//! statement per shape.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::domain::context::{ContainerType, DataContainer};
use crate::domain::data_instance::{ArchivedDataInstance, DataInstance, ScopedData};
use crate::domain::repository::{
    ParentContainerResolver, QueryOptions, QueryParameter, QueryParameters, ReadArchiveService,
    ReadPersistenceService, SelectListDescriptor,
};
use crate::{EngineError, Result};

/// Live data of several containers, restricted to `dataNames`
pub const DATA_INSTANCES_WITH_NAMES_QUERY: &str = "getDataInstancesWithNamesOfContainers";

/// All live data of several containers
pub const DATA_INSTANCES_QUERY: &str = "getDataInstancesOfContainers";

/// Archived data of several containers, restricted to `dataNames`, as of `time`
pub const ARCHIVED_DATA_INSTANCES_WITH_NAMES_QUERY: &str =
    "getSADataInstancesWithNamesOfContainers";

/// All archived data of several containers as of `time`
pub const ARCHIVED_DATA_INSTANCES_QUERY: &str = "getSADataInstancesOfContainers";

/// Live data bound to one container
pub const LOCAL_DATA_INSTANCES_QUERY: &str = "getDataInstancesOfContainer";

/// Parameter holding the requested data names
pub const DATA_NAMES_PARAMETER: &str = "dataNames";

/// Parameter holding the archive cutoff
pub const TIME_PARAMETER: &str = "time";

/// Parameter holding the container id of a local lookup
pub const CONTAINER_ID_PARAMETER: &str = "containerId";

/// Parameter holding the container type of a local lookup
pub const CONTAINER_TYPE_PARAMETER: &str = "containerType";

/// Name of the parameter holding the `index`-th container type (1-based)
pub fn container_type_parameter(index: usize) -> String {
    format!("containerType{}", index)
}

/// Name of the parameter holding the ids of the `index`-th container type
pub fn container_ids_parameter(index: usize) -> String {
    format!("containerType{}Ids", index)
}

/// Container hierarchy grouped by container type
///
/// Types keep the order in which they first appear in the hierarchy; ids
/// keep hierarchy order within their type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HierarchyPartition {
    levels: HashMap<DataContainer, usize>,
    groups: Vec<(ContainerType, Vec<i64>)>,
}

impl HierarchyPartition {
    /// Partition an ordered hierarchy, nearest container first
    pub fn new(hierarchy: &[DataContainer]) -> Self {
        let mut levels = HashMap::with_capacity(hierarchy.len());
        let mut groups: Vec<(ContainerType, Vec<i64>)> = Vec::new();

        for (level, container) in hierarchy.iter().enumerate() {
            levels.entry(*container).or_insert(level);
            match groups
                .iter_mut()
                .find(|(container_type, _)| *container_type == container.container_type)
            {
                Some((_, ids)) => ids.push(container.id),
                None => groups.push((container.container_type, vec![container.id])),
            }
        }

        Self { levels, groups }
    }

    /// Number of distinct container types
    pub fn distinct_types(&self) -> usize {
        self.groups.len()
    }

    /// Position of a container in the hierarchy, 0 for the starting container
    pub fn level(&self, container: &DataContainer) -> Option<usize> {
        self.levels.get(container).copied()
    }

    /// `containerType{N}` / `containerType{N}Ids` parameters
    pub fn query_parameters(&self) -> QueryParameters {
        let mut parameters = QueryParameters::new();
        for (index, (container_type, ids)) in self.groups.iter().enumerate() {
            parameters.insert(
                container_type_parameter(index + 1),
                QueryParameter::Text(container_type.as_str().to_string()),
            );
            parameters.insert(
                container_ids_parameter(index + 1),
                QueryParameter::Ids(ids.clone()),
            );
        }
        parameters
    }
}

/// Order records nearest container first and keep the first record per name
///
/// Records bound to containers outside the hierarchy are dropped. Among
/// records of the same container, the most recent snapshot comes first,
/// the highest snapshot id when archive dates tie.
pub fn nearest_scope_wins<T: ScopedData>(records: Vec<T>, partition: &HierarchyPartition) -> Vec<T> {
    let mut ranked: Vec<(usize, T)> = records
        .into_iter()
        .filter_map(|record| {
            partition
                .level(&record.container())
                .map(|level| (level, record))
        })
        .collect();

    ranked.sort_by(|(level_a, a), (level_b, b)| {
        level_a
            .cmp(level_b)
            .then_with(|| b.archive_date().cmp(&a.archive_date()))
            .then_with(|| b.snapshot_id().cmp(&a.snapshot_id()))
    });

    let mut seen = HashSet::new();
    ranked
        .into_iter()
        .filter(|(_, record)| seen.insert(record.data_name().to_string()))
        .map(|(_, record)| record)
        .collect()
}

/// Resolves process data visible from a container
pub struct DataInstanceService {
    data_instances: Arc<dyn ReadPersistenceService<DataInstance>>,
    archived_data_instances: Arc<dyn ReadArchiveService<DataInstance>>,
    max_results: Option<usize>,
}

impl DataInstanceService {
    /// Create the service over live and archived data stores
    pub fn new(
        data_instances: Arc<dyn ReadPersistenceService<DataInstance>>,
        archived_data_instances: Arc<dyn ReadArchiveService<DataInstance>>,
    ) -> Self {
        Self {
            data_instances,
            archived_data_instances,
            max_results: None,
        }
    }

    /// Cap the number of results of lookups using [`Self::default_options`]
    pub fn with_max_results(mut self, max_results: Option<usize>) -> Self {
        self.max_results = max_results;
        self
    }

    /// Window used when a caller does not page explicitly
    pub fn default_options(&self) -> QueryOptions {
        QueryOptions::new(0, self.max_results.unwrap_or(usize::MAX))
    }

    /// Live data visible from `container`, nearest scope first
    ///
    /// `names` restricts the lookup; `None` returns every visible name.
    pub fn get_data_instances(
        &self,
        names: Option<&[String]>,
        container: DataContainer,
        resolver: &dyn ParentContainerResolver,
        options: QueryOptions,
    ) -> Result<Vec<DataInstance>> {
        if matches!(names, Some(names) if names.is_empty()) {
            return Ok(Vec::new());
        }

        let hierarchy = resolver.container_hierarchy(container)?;
        if hierarchy.is_empty() {
            return Ok(Vec::new());
        }
        let partition = HierarchyPartition::new(&hierarchy);

        let mut parameters = partition.query_parameters();
        let family = match names {
            Some(names) => {
                parameters.insert(
                    DATA_NAMES_PARAMETER.to_string(),
                    QueryParameter::Texts(names.to_vec()),
                );
                DATA_INSTANCES_WITH_NAMES_QUERY
            }
            None => DATA_INSTANCES_QUERY,
        };
        let query_name = format!("{}{}", family, partition.distinct_types());
        debug!(
            "Looking up data of {} through {} containers with {}",
            container,
            hierarchy.len(),
            query_name
        );

        let descriptor = SelectListDescriptor::new(query_name, parameters, QueryOptions::all_results());
        let records = self.data_instances.select_list(&descriptor)?;

        Ok(options.apply(nearest_scope_wins(records, &partition)))
    }

    /// Live data named `name` visible from `container`
    pub fn get_data_instance(
        &self,
        name: &str,
        container: DataContainer,
        resolver: &dyn ParentContainerResolver,
    ) -> Result<DataInstance> {
        let names = [name.to_string()];
        self.get_data_instances(Some(&names), container, resolver, QueryOptions::new(0, 1))?
            .into_iter()
            .next()
            .ok_or_else(|| not_found(name, container))
    }

    /// Archived data visible from `container` as of `time`, nearest scope first
    pub fn get_archived_data_instances(
        &self,
        names: Option<&[String]>,
        container: DataContainer,
        resolver: &dyn ParentContainerResolver,
        time: DateTime<Utc>,
        options: QueryOptions,
    ) -> Result<Vec<ArchivedDataInstance>> {
        if matches!(names, Some(names) if names.is_empty()) {
            return Ok(Vec::new());
        }

        let hierarchy = resolver.container_hierarchy(container)?;
        if hierarchy.is_empty() {
            return Ok(Vec::new());
        }
        let partition = HierarchyPartition::new(&hierarchy);

        let mut parameters = partition.query_parameters();
        parameters.insert(TIME_PARAMETER.to_string(), QueryParameter::Time(time));
        let family = match names {
            Some(names) => {
                parameters.insert(
                    DATA_NAMES_PARAMETER.to_string(),
                    QueryParameter::Texts(names.to_vec()),
                );
                ARCHIVED_DATA_INSTANCES_WITH_NAMES_QUERY
            }
            None => ARCHIVED_DATA_INSTANCES_QUERY,
        };
        let query_name = format!("{}{}", family, partition.distinct_types());
        debug!(
            "Looking up archived data of {} as of {} with {}",
            container, time, query_name
        );

        let descriptor = SelectListDescriptor::new(query_name, parameters, QueryOptions::all_results());
        let records = self.archived_data_instances.select_list(&descriptor)?;

        Ok(options.apply(nearest_scope_wins(records, &partition)))
    }

    /// Archived data named `name` visible from `container` as of `time`
    pub fn get_archived_data_instance(
        &self,
        name: &str,
        container: DataContainer,
        resolver: &dyn ParentContainerResolver,
        time: DateTime<Utc>,
    ) -> Result<ArchivedDataInstance> {
        let names = [name.to_string()];
        self.get_archived_data_instances(Some(&names), container, resolver, time, QueryOptions::new(0, 1))?
            .into_iter()
            .next()
            .ok_or_else(|| not_found(name, container))
    }

    /// Data bound to `container` itself, without walking the hierarchy
    pub fn get_local_data_instances(
        &self,
        container: DataContainer,
        options: QueryOptions,
    ) -> Result<Vec<DataInstance>> {
        let mut parameters = QueryParameters::new();
        parameters.insert(
            CONTAINER_ID_PARAMETER.to_string(),
            QueryParameter::Id(container.id),
        );
        parameters.insert(
            CONTAINER_TYPE_PARAMETER.to_string(),
            QueryParameter::Text(container.container_type.as_str().to_string()),
        );
        let descriptor = SelectListDescriptor::new(LOCAL_DATA_INSTANCES_QUERY, parameters, options);
        self.data_instances.select_list(&descriptor)
    }
}

fn not_found(name: &str, container: DataContainer) -> EngineError {
    EngineError::NotFound(format!("Data {} visible from {}", name, container))
}
