//! Collaborator traits for the Weir engine
//!
//! This module defines the read-only services the engine consumes. Storage
//! crates implement these traits to provide different persistence
//! mechanisms; the engine itself never writes through them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::archive::Archived;
use super::context::DataContainer;
use crate::Result;

/// Value bound to a named query parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryParameter {
    /// A single id
    Id(i64),
    /// Several ids
    Ids(Vec<i64>),
    /// A single string
    Text(String),
    /// Several strings
    Texts(Vec<String>),
    /// An instant
    Time(DateTime<Utc>),
}

impl QueryParameter {
    /// View as a single id
    pub fn as_id(&self) -> Option<i64> {
        match self {
            QueryParameter::Id(id) => Some(*id),
            _ => None,
        }
    }

    /// View as a list of ids
    pub fn as_ids(&self) -> Option<&[i64]> {
        match self {
            QueryParameter::Ids(ids) => Some(ids),
            _ => None,
        }
    }

    /// View as a string
    pub fn as_text(&self) -> Option<&str> {
        match self {
            QueryParameter::Text(text) => Some(text),
            _ => None,
        }
    }

    /// View as a list of strings
    pub fn as_texts(&self) -> Option<&[String]> {
        match self {
            QueryParameter::Texts(texts) => Some(texts),
            _ => None,
        }
    }

    /// View as an instant
    pub fn as_time(&self) -> Option<DateTime<Utc>> {
        match self {
            QueryParameter::Time(time) => Some(*time),
            _ => None,
        }
    }
}

/// Parameters of a named query, keyed by parameter name
pub type QueryParameters = BTreeMap<String, QueryParameter>;

/// Pagination window of a list query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryOptions {
    /// Index of the first row
    pub from_index: usize,

    /// Maximum number of rows
    pub number_of_results: usize,
}

impl QueryOptions {
    /// Create a pagination window
    pub fn new(from_index: usize, number_of_results: usize) -> Self {
        Self {
            from_index,
            number_of_results,
        }
    }

    /// Every row
    pub fn all_results() -> Self {
        Self::new(0, usize::MAX)
    }

    /// Apply the window to already ordered rows
    pub fn apply<T>(&self, rows: Vec<T>) -> Vec<T> {
        rows.into_iter()
            .skip(self.from_index)
            .take(self.number_of_results)
            .collect()
    }
}

/// A named list query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectListDescriptor {
    /// Name of the query
    pub query_name: String,

    /// Query parameters
    pub parameters: QueryParameters,

    /// Pagination window
    pub options: QueryOptions,
}

impl SelectListDescriptor {
    /// Create a list query
    pub fn new(query_name: impl Into<String>, parameters: QueryParameters, options: QueryOptions) -> Self {
        Self {
            query_name: query_name.into(),
            parameters,
            options,
        }
    }
}

/// A named single-row query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectOneDescriptor {
    /// Name of the query
    pub query_name: String,

    /// Query parameters
    pub parameters: QueryParameters,
}

impl SelectOneDescriptor {
    /// Create a single-row query
    pub fn new(query_name: impl Into<String>, parameters: QueryParameters) -> Self {
        Self {
            query_name: query_name.into(),
            parameters,
        }
    }
}

/// Read access to live records of type `T`
pub trait ReadPersistenceService<T>: Send + Sync {
    /// Run a named list query
    fn select_list(&self, descriptor: &SelectListDescriptor) -> Result<Vec<T>>;

    /// Run a named single-row query
    fn select_one(&self, descriptor: &SelectOneDescriptor) -> Result<Option<T>>;

    /// Load a record by id
    fn select_by_id(&self, id: i64) -> Result<Option<T>>;
}

/// Read access to archived snapshots of records of type `T`
///
/// Queries that look at a point in time take it as a `time` parameter.
pub trait ReadArchiveService<T>: Send + Sync {
    /// Run a named list query over snapshots
    fn select_list(&self, descriptor: &SelectListDescriptor) -> Result<Vec<Archived<T>>>;

    /// Run a named single-row query over snapshots
    fn select_one(&self, descriptor: &SelectOneDescriptor) -> Result<Option<Archived<T>>>;

    /// Load a snapshot by its own id
    fn select_by_id(&self, id: i64) -> Result<Option<Archived<T>>>;
}

/// Produces the ancestor chain of a container
pub trait ParentContainerResolver: Send + Sync {
    /// Ordered chain from `container` itself (first) to the root (last)
    fn container_hierarchy(&self, container: DataContainer) -> Result<Vec<DataContainer>>;
}

/// A process parameter as stored
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    /// Parameter name
    pub name: String,

    /// Stored value, always as a string
    pub value: Option<String>,
}

impl Parameter {
    /// Create a parameter
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: Some(value.into()),
        }
    }
}

/// Access to process parameters
pub trait ParameterService: Send + Sync {
    /// Parameter `name` of a process definition
    ///
    /// Fails with [`crate::EngineError::NotFound`] when the process definition
    /// is unknown; returns `None` when only the parameter is missing.
    fn get(&self, process_definition_id: i64, name: &str) -> Result<Option<Parameter>>;
}
