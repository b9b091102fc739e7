use crate::domain::archive::Archived;
use crate::domain::context::{ContainerType, DataContainer};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A named, typed variable bound to exactly one container
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataInstance {
    /// Unique identifier
    pub id: i64,

    /// Variable name, unique within its container
    pub name: String,

    /// Declared type of the value
    pub class_name: String,

    /// Current value
    pub value: serde_json::Value,

    /// Id of the owning container
    pub container_id: i64,

    /// Type of the owning container
    pub container_type: ContainerType,

    /// Transient data is never archived
    #[serde(default)]
    pub transient: bool,
}

impl DataInstance {
    /// Create a data instance bound to `container`
    pub fn new(
        id: i64,
        name: impl Into<String>,
        class_name: impl Into<String>,
        value: serde_json::Value,
        container: DataContainer,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            class_name: class_name.into(),
            value,
            container_id: container.id,
            container_type: container.container_type,
            transient: false,
        }
    }

    /// Mark as transient
    pub fn transient(mut self) -> Self {
        self.transient = true;
        self
    }

    /// The owning container
    #[inline]
    pub fn container(&self) -> DataContainer {
        DataContainer::new(self.container_id, self.container_type)
    }
}

/// Archived snapshot of a data instance
pub type ArchivedDataInstance = Archived<DataInstance>;

/// A record that is visible to a container and to everything below it
pub trait ScopedData {
    /// Name the record is looked up by
    fn data_name(&self) -> &str;

    /// Container the record is bound to
    fn container(&self) -> DataContainer;

    /// Snapshot instant, for archived records
    fn archive_date(&self) -> Option<DateTime<Utc>> {
        None
    }

    /// Snapshot id, for archived records
    fn snapshot_id(&self) -> Option<i64> {
        None
    }
}

impl ScopedData for DataInstance {
    fn data_name(&self) -> &str {
        &self.name
    }

    fn container(&self) -> DataContainer {
        DataInstance::container(self)
    }
}

impl ScopedData for ArchivedDataInstance {
    fn data_name(&self) -> &str {
        &self.record.name
    }

    fn container(&self) -> DataContainer {
        self.record.container()
    }

    fn archive_date(&self) -> Option<DateTime<Utc>> {
        Some(self.archive_date)
    }

    fn snapshot_id(&self) -> Option<i64> {
        Some(self.id)
    }
}
