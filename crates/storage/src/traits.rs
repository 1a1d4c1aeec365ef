use std::sync::Arc;

use async_trait::async_trait;

use crate::error::StorageError;
use crate::record::{NewProcessRecord, NewStatusEvent, ProcessRecord};

/// The storage trait for procflow backends.
///
/// A `ProcessStorage` implementation persists processes and their
/// append-only status history.
///
/// ## Ordering
///
/// Query methods return each process's history newest first, ordered by
/// `(created_at, sequence)` descending. Consumers that derive the current
/// status must still not rely on this order.
///
/// ## OCC on append
///
/// `append_status` is conditional on the stored version (the number of
/// events) being equal to `expected_version`. The comparison and the write
/// are one indivisible step: two callers holding the same version cannot
/// both append. The loser receives `StorageError::ConcurrentConflict` and
/// nothing is written.
///
/// ## Not found
///
/// Every "no rows" outcome is reported as `StorageError::NotFound`,
/// including a page past the end of a listing.
///
/// ## Thread Safety
///
/// Implementations must be `Send + Sync + 'static` to be shared across
/// async tasks and held in axum application state.
#[async_trait]
pub trait ProcessStorage: Send + Sync + 'static {
    /// Persist a new process with empty history and version 0.
    ///
    /// Generates a uuid when `process.uuid` is `None`. Returns the uuid.
    /// Returns `Err(StorageError::AlreadyExists)` for a duplicate uuid.
    async fn create(&self, process: NewProcessRecord) -> Result<String, StorageError>;

    /// Load one process and its full history.
    ///
    /// Returns `Err(StorageError::NotFound)` when no process of
    /// `process_type` has this uuid.
    async fn get_by_uuid(&self, process_type: &str, uuid: &str)
        -> Result<ProcessRecord, StorageError>;

    /// Load one page of processes of a type, in creation order.
    ///
    /// Pages are 1-indexed: `offset = (page - 1) * page_size`. Returns
    /// `Err(StorageError::NotFound)` rather than an empty page.
    async fn get_by_type(
        &self,
        process_type: &str,
        page: i64,
        page_size: i64,
    ) -> Result<Vec<ProcessRecord>, StorageError>;

    /// Append one status event if the process is still at `expected_version`.
    ///
    /// Returns the new version on success.
    async fn append_status(
        &self,
        process_type: &str,
        uuid: &str,
        expected_version: i64,
        event: NewStatusEvent,
    ) -> Result<i64, StorageError>;
}

#[async_trait]
impl<S: ProcessStorage + ?Sized> ProcessStorage for Arc<S> {
    async fn create(&self, process: NewProcessRecord) -> Result<String, StorageError> {
        (**self).create(process).await
    }

    async fn get_by_uuid(
        &self,
        process_type: &str,
        uuid: &str,
    ) -> Result<ProcessRecord, StorageError> {
        (**self).get_by_uuid(process_type, uuid).await
    }

    async fn get_by_type(
        &self,
        process_type: &str,
        page: i64,
        page_size: i64,
    ) -> Result<Vec<ProcessRecord>, StorageError> {
        (**self).get_by_type(process_type, page, page_size).await
    }

    async fn append_status(
        &self,
        process_type: &str,
        uuid: &str,
        expected_version: i64,
        event: NewStatusEvent,
    ) -> Result<i64, StorageError> {
        (**self)
            .append_status(process_type, uuid, expected_version, event)
            .await
    }
}
