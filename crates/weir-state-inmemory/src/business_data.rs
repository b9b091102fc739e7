//! Business data entities and bindings

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::RwLock;
use tracing::{debug, trace};

use weir_core::domain::business_data::{
    BusinessDataRepository, BusinessQueryParameters, Entity, QueryResult, QueryResultType,
    RefBusinessDataInstance, RefBusinessDataService,
};
use weir_core::{BusinessDataError, Result};

/// Row predicate of a named business data query
pub type EntityPredicate = Arc<dyn Fn(&BusinessQueryParameters, &Entity) -> bool + Send + Sync>;

#[derive(Clone)]
struct NamedQuery {
    entity_class: String,
    predicate: EntityPredicate,
}

/// Last segment of a dotted class name
fn simple_name(class_name: &str) -> &str {
    class_name.rsplit('.').next().unwrap_or(class_name)
}

/// Business data entities kept in memory
///
/// Named queries are declared per entity class with a predicate over the
/// query parameters. Rows are returned in persistence id order.
pub struct InMemoryBusinessDataRepository {
    entities: DashMap<(String, i64), Entity>,
    queries: RwLock<HashMap<String, NamedQuery>>,
}

impl InMemoryBusinessDataRepository {
    /// Create an empty repository
    pub fn new() -> Self {
        Self {
            entities: DashMap::new(),
            queries: RwLock::new(HashMap::new()),
        }
    }

    /// Put or replace an entity
    pub fn insert(&self, entity: Entity) {
        trace!("Storing {} {}", entity.class_name, entity.persistence_id);
        self.entities
            .insert((entity.class_name.clone(), entity.persistence_id), entity);
    }

    /// Number of entities
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Check if the repository is empty
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Declare a named query over entities of `entity_class`
    pub fn register_query(
        &self,
        name: impl Into<String>,
        entity_class: impl Into<String>,
        predicate: EntityPredicate,
    ) {
        self.queries.write().insert(
            name.into(),
            NamedQuery {
                entity_class: entity_class.into(),
                predicate,
            },
        );
    }

    fn run(
        &self,
        query_name: &str,
        parameters: &BusinessQueryParameters,
    ) -> std::result::Result<(String, Vec<Entity>), BusinessDataError> {
        let query = self
            .queries
            .read()
            .get(query_name)
            .cloned()
            .ok_or_else(|| BusinessDataError::UnknownQuery(query_name.to_string()))?;

        let mut rows: Vec<Entity> = self
            .entities
            .iter()
            .filter(|entry| entry.key().0 == query.entity_class)
            .filter(|entry| (query.predicate)(parameters, entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        rows.sort_by_key(|entity| entity.persistence_id);
        debug!("Business query {} matched {} entities", query_name, rows.len());
        Ok((query.entity_class, rows))
    }
}

impl Default for InMemoryBusinessDataRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl BusinessDataRepository for InMemoryBusinessDataRepository {
    fn find_by_id(
        &self,
        class_name: &str,
        id: i64,
    ) -> std::result::Result<Option<Entity>, BusinessDataError> {
        Ok(self
            .entities
            .get(&(class_name.to_string(), id))
            .map(|entry| entry.value().clone()))
    }

    fn find_by_ids(
        &self,
        class_name: &str,
        ids: &[i64],
    ) -> std::result::Result<Vec<Entity>, BusinessDataError> {
        let mut found = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(entity) = self.find_by_id(class_name, *id)? {
                found.push(entity);
            }
        }
        Ok(found)
    }

    fn find_by_named_query(
        &self,
        query_name: &str,
        result_type: &QueryResultType,
        parameters: &BusinessQueryParameters,
    ) -> std::result::Result<Option<QueryResult>, BusinessDataError> {
        let (_, mut rows) = self.run(query_name, parameters)?;
        match result_type {
            QueryResultType::Scalar => Ok(Some(QueryResult::Scalar(rows.len() as i64))),
            QueryResultType::Entity(_) if rows.len() > 1 => {
                Err(BusinessDataError::NonUniqueResult(query_name.to_string()))
            }
            QueryResultType::Entity(_) => Ok(rows.pop().map(QueryResult::Entity)),
        }
    }

    fn find_list_by_named_query(
        &self,
        query_name: &str,
        result_class: &str,
        parameters: &BusinessQueryParameters,
        start_index: usize,
        max_results: usize,
    ) -> std::result::Result<Vec<Entity>, BusinessDataError> {
        let (entity_class, rows) = self.run(query_name, parameters)?;
        if simple_name(&entity_class) != simple_name(result_class) {
            return Err(BusinessDataError::Store(format!(
                "Query {} returns {}, not {}",
                query_name, entity_class, result_class
            )));
        }
        Ok(rows.into_iter().skip(start_index).take(max_results).collect())
    }
}

/// Business data bindings of process and flow node instances
#[derive(Debug, Default)]
pub struct InMemoryRefBusinessDataService {
    process_bindings: DashMap<(i64, String), RefBusinessDataInstance>,
    flow_node_bindings: DashMap<(i64, String), RefBusinessDataInstance>,
}

impl InMemoryRefBusinessDataService {
    /// Create a service without bindings
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind business data to a process instance
    pub fn bind_process_instance(&self, process_instance_id: i64, reference: RefBusinessDataInstance) {
        self.process_bindings
            .insert((process_instance_id, reference.name().to_string()), reference);
    }

    /// Bind business data locally to a flow node instance
    pub fn bind_flow_node(&self, flow_node_instance_id: i64, reference: RefBusinessDataInstance) {
        self.flow_node_bindings
            .insert((flow_node_instance_id, reference.name().to_string()), reference);
    }
}

impl RefBusinessDataService for InMemoryRefBusinessDataService {
    fn get_ref_business_data_instance(
        &self,
        name: &str,
        process_instance_id: i64,
    ) -> Result<Option<RefBusinessDataInstance>> {
        Ok(self
            .process_bindings
            .get(&(process_instance_id, name.to_string()))
            .map(|entry| entry.value().clone()))
    }

    fn get_flow_node_ref_business_data_instance(
        &self,
        name: &str,
        flow_node_instance_id: i64,
    ) -> Result<Option<RefBusinessDataInstance>> {
        Ok(self
            .flow_node_bindings
            .get(&(flow_node_instance_id, name.to_string()))
            .map(|entry| entry.value().clone()))
    }
}
