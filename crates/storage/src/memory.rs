//! In-process `ProcessStorage` backend.
//!
//! All state lives behind one `tokio::sync::RwLock`. Mutations take the
//! write lock and perform their existence/version checks and their write
//! without awaiting in between, so an append either lands whole or not at
//! all, and concurrent appends on the same version are serialized.

use std::collections::HashMap;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;

use crate::error::StorageError;
use crate::record::{NewProcessRecord, NewStatusEvent, ProcessRecord, StatusEventRecord};
use crate::traits::ProcessStorage;

#[derive(Debug, Default)]
struct Inner {
    /// Records keyed by uuid, history kept in append order.
    processes: HashMap<String, ProcessRecord>,
    /// Uuids in creation order.
    order: Vec<String>,
}

/// Volatile storage backend for tests, demos and single-node serving.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    inner: RwLock<Inner>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored processes across all types.
    pub async fn len(&self) -> usize {
        self.inner.read().await.order.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// Copy a stored record for a caller, history newest first.
fn snapshot(record: &ProcessRecord) -> ProcessRecord {
    let mut out = record.clone();
    out.history
        .sort_by(|a, b| b.order_key().cmp(&a.order_key()));
    out
}

fn not_found(process_type: &str, key: impl Into<String>) -> StorageError {
    StorageError::NotFound {
        process_type: process_type.to_string(),
        key: key.into(),
    }
}

#[async_trait]
impl ProcessStorage for MemoryStorage {
    async fn create(&self, process: NewProcessRecord) -> Result<String, StorageError> {
        let uuid = match process.uuid {
            Some(uuid) if !uuid.is_empty() => uuid,
            _ => uuid::Uuid::new_v4().to_string(),
        };

        let mut inner = self.inner.write().await;
        if inner.processes.contains_key(&uuid) {
            return Err(StorageError::AlreadyExists { uuid });
        }
        let record = ProcessRecord {
            uuid: uuid.clone(),
            process_type: process.process_type,
            payload: process.payload,
            version: 0,
            created_at: OffsetDateTime::now_utc(),
            history: Vec::new(),
        };
        inner.processes.insert(uuid.clone(), record);
        inner.order.push(uuid.clone());
        Ok(uuid)
    }

    async fn get_by_uuid(
        &self,
        process_type: &str,
        uuid: &str,
    ) -> Result<ProcessRecord, StorageError> {
        let inner = self.inner.read().await;
        inner
            .processes
            .get(uuid)
            .filter(|r| r.process_type == process_type)
            .map(snapshot)
            .ok_or_else(|| not_found(process_type, uuid))
    }

    async fn get_by_type(
        &self,
        process_type: &str,
        page: i64,
        page_size: i64,
    ) -> Result<Vec<ProcessRecord>, StorageError> {
        if page < 1 || page_size < 1 {
            return Err(StorageError::InvalidPagination { page, page_size });
        }
        let offset = usize::try_from((page - 1).saturating_mul(page_size)).unwrap_or(usize::MAX);
        let limit = usize::try_from(page_size).unwrap_or(usize::MAX);

        let inner = self.inner.read().await;
        let records: Vec<ProcessRecord> = inner
            .order
            .iter()
            .filter_map(|uuid| inner.processes.get(uuid))
            .filter(|r| r.process_type == process_type)
            .skip(offset)
            .take(limit)
            .map(snapshot)
            .collect();

        if records.is_empty() {
            return Err(not_found(
                process_type,
                format!("page {} (size {})", page, page_size),
            ));
        }
        Ok(records)
    }

    async fn append_status(
        &self,
        process_type: &str,
        uuid: &str,
        expected_version: i64,
        event: NewStatusEvent,
    ) -> Result<i64, StorageError> {
        let mut inner = self.inner.write().await;
        let record = inner
            .processes
            .get_mut(uuid)
            .filter(|r| r.process_type == process_type)
            .ok_or_else(|| not_found(process_type, uuid))?;

        if record.version != expected_version {
            return Err(StorageError::ConcurrentConflict {
                process_type: process_type.to_string(),
                uuid: uuid.to_string(),
                expected_version,
                actual_version: record.version,
            });
        }

        // Never stamp an event earlier than its predecessor.
        let created_at = match record.history.last() {
            Some(last) => OffsetDateTime::now_utc().max(last.created_at),
            None => OffsetDateTime::now_utc(),
        };
        let sequence = record.version + 1;
        record.history.push(StatusEventRecord {
            sequence,
            name: event.name,
            payload: event.payload,
            created_at,
        });
        record.version = sequence;
        Ok(sequence)
    }
}
