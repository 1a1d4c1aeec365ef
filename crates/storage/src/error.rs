/// All errors that can be returned by a ProcessStorage implementation.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// No stored row matches the lookup. Every "no rows" outcome of a query
    /// collapses into this variant.
    #[error("no process matches {process_type}/{key}")]
    NotFound { process_type: String, key: String },

    /// A process with this uuid already exists.
    #[error("process {uuid} already exists")]
    AlreadyExists { uuid: String },

    /// Optimistic concurrency control conflict: the process history changed
    /// since the caller read it.
    #[error(
        "concurrent conflict on process {process_type}/{uuid}: expected version {expected_version}, found {actual_version}"
    )]
    ConcurrentConflict {
        process_type: String,
        uuid: String,
        expected_version: i64,
        actual_version: i64,
    },

    /// Page numbers start at 1 and page sizes must be positive.
    #[error("invalid pagination: page {page}, page size {page_size}")]
    InvalidPagination { page: i64, page_size: i64 },

    /// A backend-specific storage error (connection, serialization, etc.).
    #[error("storage backend error: {0}")]
    Backend(String),
}

impl StorageError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound { .. })
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, StorageError::ConcurrentConflict { .. })
    }
}
