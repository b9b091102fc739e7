//! Generic record and snapshot stores answering named queries

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::RwLock;
use tracing::{debug, trace};

use weir_core::domain::archive::Archived;
use weir_core::domain::data_instance::DataInstance;
use weir_core::domain::flow_node_instance::{FlowNodeInstance, ProcessInstance};
use weir_core::domain::repository::{
    QueryParameters, ReadArchiveService, ReadPersistenceService, SelectListDescriptor,
    SelectOneDescriptor,
};
use weir_core::{EngineError, Result};

/// A record kept by id
pub trait Record: Clone + Send + Sync + 'static {
    /// Unique identifier
    fn id(&self) -> i64;
}

impl Record for DataInstance {
    fn id(&self) -> i64 {
        self.id
    }
}

impl Record for FlowNodeInstance {
    fn id(&self) -> i64 {
        self.id
    }
}

impl Record for ProcessInstance {
    fn id(&self) -> i64 {
        self.id
    }
}

/// Row filter implementing a named query
pub type QueryFilter<T> = Arc<dyn Fn(&QueryParameters, &T) -> bool + Send + Sync>;

/// Named queries and how often each one ran
struct QueryRegistry<T> {
    filters: RwLock<HashMap<String, QueryFilter<T>>>,
    counts: DashMap<String, usize>,
}

impl<T> QueryRegistry<T> {
    fn new() -> Self {
        Self {
            filters: RwLock::new(HashMap::new()),
            counts: DashMap::new(),
        }
    }

    fn register(&self, name: String, filter: QueryFilter<T>) {
        self.filters.write().insert(name, filter);
    }

    fn filter(&self, name: &str) -> Result<QueryFilter<T>> {
        *self.counts.entry(name.to_string()).or_insert(0) += 1;
        self.filters
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| EngineError::Persistence(format!("Unknown query {}", name)))
    }

    fn count(&self, name: &str) -> usize {
        self.counts.get(name).map(|count| *count).unwrap_or(0)
    }

    fn total(&self) -> usize {
        self.counts.iter().map(|entry| *entry.value()).sum()
    }
}

/// Live records of one type
pub struct InMemoryRecordStore<T: Record> {
    records: DashMap<i64, T>,
    queries: QueryRegistry<T>,
}

impl<T: Record> InMemoryRecordStore<T> {
    /// Create an empty store without queries
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
            queries: QueryRegistry::new(),
        }
    }

    /// Put or replace a record
    pub fn insert(&self, record: T) {
        trace!("Storing record {}", record.id());
        self.records.insert(record.id(), record);
    }

    /// Remove a record, returning it
    pub fn remove(&self, id: i64) -> Option<T> {
        self.records.remove(&id).map(|(_, record)| record)
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if the store is empty
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Register a named query
    pub fn register_query(&self, name: impl Into<String>, filter: QueryFilter<T>) {
        self.queries.register(name.into(), filter);
    }

    /// How many times the named query ran
    pub fn query_count(&self, name: &str) -> usize {
        self.queries.count(name)
    }

    /// How many named queries ran in total
    pub fn total_query_count(&self) -> usize {
        self.queries.total()
    }

    fn matching(&self, query_name: &str, parameters: &QueryParameters) -> Result<Vec<T>> {
        let filter = self.queries.filter(query_name)?;
        let mut rows: Vec<T> = self
            .records
            .iter()
            .filter(|entry| filter(parameters, entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        rows.sort_by_key(|record| record.id());
        debug!("Query {} matched {} records", query_name, rows.len());
        Ok(rows)
    }
}

impl<T: Record> Default for InMemoryRecordStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Record> ReadPersistenceService<T> for InMemoryRecordStore<T> {
    fn select_list(&self, descriptor: &SelectListDescriptor) -> Result<Vec<T>> {
        let rows = self.matching(&descriptor.query_name, &descriptor.parameters)?;
        Ok(descriptor.options.apply(rows))
    }

    fn select_one(&self, descriptor: &SelectOneDescriptor) -> Result<Option<T>> {
        Ok(self
            .matching(&descriptor.query_name, &descriptor.parameters)?
            .into_iter()
            .next())
    }

    fn select_by_id(&self, id: i64) -> Result<Option<T>> {
        Ok(self.records.get(&id).map(|entry| entry.value().clone()))
    }
}

/// Archived snapshots of records of one type
pub struct InMemoryArchiveStore<T: Record> {
    snapshots: DashMap<i64, Archived<T>>,
    queries: QueryRegistry<Archived<T>>,
    next_id: AtomicI64,
}

impl<T: Record> InMemoryArchiveStore<T> {
    /// Create an empty archive without queries
    pub fn new() -> Self {
        Self {
            snapshots: DashMap::new(),
            queries: QueryRegistry::new(),
            next_id: AtomicI64::new(1),
        }
    }

    /// Take a snapshot of `record` at `archive_date`, returning the snapshot id
    pub fn archive(&self, record: T, archive_date: DateTime<Utc>) -> i64 {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        trace!("Archiving record {} as snapshot {}", record.id(), id);
        let snapshot = Archived::new(id, record.id(), archive_date, record);
        self.snapshots.insert(id, snapshot);
        id
    }

    /// Number of snapshots
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Check if the archive is empty
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Register a named query
    pub fn register_query(&self, name: impl Into<String>, filter: QueryFilter<Archived<T>>) {
        self.queries.register(name.into(), filter);
    }

    /// How many times the named query ran
    pub fn query_count(&self, name: &str) -> usize {
        self.queries.count(name)
    }

    // oldest first, snapshot id breaking ties
    fn matching(&self, query_name: &str, parameters: &QueryParameters) -> Result<Vec<Archived<T>>> {
        let filter = self.queries.filter(query_name)?;
        let mut rows: Vec<Archived<T>> = self
            .snapshots
            .iter()
            .filter(|entry| filter(parameters, entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        rows.sort_by(|a, b| a.archive_date.cmp(&b.archive_date).then(a.id.cmp(&b.id)));
        debug!("Archive query {} matched {} snapshots", query_name, rows.len());
        Ok(rows)
    }
}

impl<T: Record> Default for InMemoryArchiveStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Record> ReadArchiveService<T> for InMemoryArchiveStore<T> {
    fn select_list(&self, descriptor: &SelectListDescriptor) -> Result<Vec<Archived<T>>> {
        let rows = self.matching(&descriptor.query_name, &descriptor.parameters)?;
        Ok(descriptor.options.apply(rows))
    }

    /// The most recent matching snapshot
    fn select_one(&self, descriptor: &SelectOneDescriptor) -> Result<Option<Archived<T>>> {
        Ok(self
            .matching(&descriptor.query_name, &descriptor.parameters)?
            .pop())
    }

    fn select_by_id(&self, id: i64) -> Result<Option<Archived<T>>> {
        Ok(self.snapshots.get(&id).map(|entry| entry.value().clone()))
    }
}
