//! Business data: domain entities managed outside the engine's record store
//! and referenced from processes through bindings.

use crate::error::BusinessDataError;
use crate::types::RuntimeValue;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A business data entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Fully qualified class of the entity
    pub class_name: String,

    /// Id in the business data store
    pub persistence_id: i64,

    /// Entity fields
    pub attributes: serde_json::Value,
}

impl Entity {
    /// Create an entity
    pub fn new(
        class_name: impl Into<String>,
        persistence_id: i64,
        attributes: serde_json::Value,
    ) -> Self {
        Self {
            class_name: class_name.into(),
            persistence_id,
            attributes,
        }
    }
}

/// Binding between a container and business data
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RefBusinessDataInstance {
    /// Binding to at most one entity
    Simple {
        /// Name of the business variable
        name: String,
        /// Class of the bound entity
        data_class_name: String,
        /// Id of the bound entity, if one is bound yet
        data_id: Option<i64>,
    },

    /// Binding to a list of entities
    Multiple {
        /// Name of the business variable
        name: String,
        /// Class of the bound entities
        data_class_name: String,
        /// Ids of the bound entities, in binding order
        data_ids: Vec<i64>,
    },
}

impl RefBusinessDataInstance {
    /// Name of the business variable
    pub fn name(&self) -> &str {
        match self {
            RefBusinessDataInstance::Simple { name, .. }
            | RefBusinessDataInstance::Multiple { name, .. } => name,
        }
    }

    /// Class of the bound entities
    pub fn data_class_name(&self) -> &str {
        match self {
            RefBusinessDataInstance::Simple {
                data_class_name, ..
            }
            | RefBusinessDataInstance::Multiple {
                data_class_name, ..
            } => data_class_name,
        }
    }
}

/// Parameters of a named business data query, keyed by parameter name
pub type BusinessQueryParameters = BTreeMap<String, RuntimeValue>;

/// Shape expected from a single-result named query
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryResultType {
    /// A single number, e.g. a count
    Scalar,
    /// A single entity of the given class
    Entity(String),
}

/// Row returned by a single-result named query
#[derive(Debug, Clone, PartialEq)]
pub enum QueryResult {
    /// A single number
    Scalar(i64),
    /// A single entity
    Entity(Entity),
}

/// Access to the business data store
pub trait BusinessDataRepository: Send + Sync {
    /// Load one entity
    fn find_by_id(&self, class_name: &str, id: i64)
        -> std::result::Result<Option<Entity>, BusinessDataError>;

    /// Load several entities; unknown ids are skipped
    fn find_by_ids(
        &self,
        class_name: &str,
        ids: &[i64],
    ) -> std::result::Result<Vec<Entity>, BusinessDataError>;

    /// Run a named query expected to return at most one row
    ///
    /// Fails with [`BusinessDataError::NonUniqueResult`] when several rows match.
    fn find_by_named_query(
        &self,
        query_name: &str,
        result_type: &QueryResultType,
        parameters: &BusinessQueryParameters,
    ) -> std::result::Result<Option<QueryResult>, BusinessDataError>;

    /// Run a named query returning a page of entities
    fn find_list_by_named_query(
        &self,
        query_name: &str,
        result_class: &str,
        parameters: &BusinessQueryParameters,
        start_index: usize,
        max_results: usize,
    ) -> std::result::Result<Vec<Entity>, BusinessDataError>;
}

/// Resolves business data bindings of containers
pub trait RefBusinessDataService: Send + Sync {
    /// Binding named `name` of a process instance
    fn get_ref_business_data_instance(
        &self,
        name: &str,
        process_instance_id: i64,
    ) -> Result<Option<RefBusinessDataInstance>>;

    /// Binding named `name` local to a flow node instance
    fn get_flow_node_ref_business_data_instance(
        &self,
        name: &str,
        flow_node_instance_id: i64,
    ) -> Result<Option<RefBusinessDataInstance>>;
}

/// Server-side implementation of a business object interface
pub trait BusinessObjectDao: Send + Sync {
    /// Fully qualified name of the implementation
    fn implementation_name(&self) -> &str;

    /// Load an entity handled by this accessor
    fn find_by_persistence_id(
        &self,
        persistence_id: i64,
    ) -> std::result::Result<Option<Entity>, BusinessDataError>;
}
