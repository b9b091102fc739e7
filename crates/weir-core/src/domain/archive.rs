use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Immutable snapshot of a live record, taken when the record changed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Archived<T> {
    /// Id of the snapshot itself
    pub id: i64,

    /// Id of the live record the snapshot was taken from
    pub source_object_id: i64,

    /// When the snapshot was taken
    pub archive_date: DateTime<Utc>,

    /// Copy of the live record at that instant
    pub record: T,
}

impl<T> Archived<T> {
    /// Create a snapshot
    pub fn new(id: i64, source_object_id: i64, archive_date: DateTime<Utc>, record: T) -> Self {
        Self {
            id,
            source_object_id,
            archive_date,
            record,
        }
    }
}
