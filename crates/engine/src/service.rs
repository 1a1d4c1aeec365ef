//! The workflow service: the only entry point callers use.
//!
//! `assign_status` runs read, validate and conditional append as one unit.
//! The append only lands if no other transition was appended since the
//! read; on a conflict the whole unit runs again against fresh state.

use std::sync::Arc;

use procflow_config::{DEFAULT_PAGE, DEFAULT_PAGE_SIZE};
use procflow_storage::{NewStatusEvent, ProcessRecord, ProcessStorage, StorageError};
use tracing::{debug, info, warn};

use crate::error::ProcessError;
use crate::payload::Payload;
use crate::process::{NewProcess, Process};
use crate::validator::StatusValidator;

/// Upper bound on read-validate-append rounds for one `assign_status` call.
pub const MAX_ASSIGN_ATTEMPTS: usize = 5;

/// Replace non-positive pagination values with the defaults.
pub fn page_or_default(page: i64, page_size: i64) -> (i64, i64) {
    let page = if page <= 0 { DEFAULT_PAGE } else { page };
    let page_size = if page_size <= 0 {
        DEFAULT_PAGE_SIZE
    } else {
        page_size
    };
    (page, page_size)
}

pub struct ProcessService<S> {
    storage: S,
    validator: Arc<dyn StatusValidator>,
}

impl<S: ProcessStorage> ProcessService<S> {
    pub fn new(storage: S, validator: Arc<dyn StatusValidator>) -> Self {
        ProcessService { storage, validator }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Persist a new process with empty history. Returns its uuid.
    pub async fn submit(&self, process: NewProcess) -> Result<String, ProcessError> {
        let process_type = process.process_type.clone();
        let record = process.into_record()?;
        match self.storage.create(record).await {
            Ok(uuid) => {
                info!(process_type = %process_type, uuid = %uuid, "process submitted");
                Ok(uuid)
            }
            Err(e) => {
                warn!(process_type = %process_type, error = %e, "process submission failed");
                Err(ProcessError::CannotCreateProcess(e))
            }
        }
    }

    /// Fetch one process by uuid, or one page of processes of a type.
    ///
    /// Page and page size default to 1 and 10 when zero or negative.
    pub async fn get(
        &self,
        process_type: &str,
        uuid: Option<&str>,
        page: i64,
        page_size: i64,
    ) -> Result<Vec<Process>, ProcessError> {
        let records = match uuid {
            Some(uuid) => {
                debug!(process_type, uuid, "get process");
                vec![self
                    .storage
                    .get_by_uuid(process_type, uuid)
                    .await
                    .map_err(|e| not_found_or(e, process_type, uuid))?]
            }
            None => {
                let (page, page_size) = page_or_default(page, page_size);
                debug!(process_type, page, page_size, "list processes");
                self.storage
                    .get_by_type(process_type, page, page_size)
                    .await
                    .map_err(|e| {
                        not_found_or(e, process_type, &format!("page {}", page))
                    })?
            }
        };
        records
            .into_iter()
            .map(to_process)
            .collect::<Result<Vec<_>, _>>()
    }

    /// Validate and append a status transition.
    ///
    /// Errors, in precedence order: `ProcessNotFound`, `UnknownStatus`,
    /// `NotAllowedStatus`, `PayloadValidation`, then storage errors. A
    /// `ConcurrentConflict` is retried up to [`MAX_ASSIGN_ATTEMPTS`] times
    /// and then surfaces as `ProcessError::Storage`.
    pub async fn assign_status(
        &self,
        process_type: &str,
        uuid: &str,
        status: &str,
        payload: Payload,
    ) -> Result<(), ProcessError> {
        let encoded = payload.to_bytes()?;
        let mut attempt = 0;
        loop {
            attempt += 1;
            let record = self
                .storage
                .get_by_uuid(process_type, uuid)
                .await
                .map_err(|e| not_found_or(e, process_type, uuid))?;
            let process = to_process(record)?;

            if let Err(e) = self.validator.validate(&process, status, &payload) {
                warn!(
                    process_type,
                    uuid,
                    from = process.current_status_name().unwrap_or("<none>"),
                    to = status,
                    error = %e,
                    "transition rejected"
                );
                return Err(e.into());
            }

            let event = NewStatusEvent {
                name: status.to_string(),
                payload: encoded.clone(),
            };
            match self
                .storage
                .append_status(process_type, uuid, process.version(), event)
                .await
            {
                Ok(version) => {
                    info!(
                        process_type,
                        uuid,
                        from = process.current_status_name().unwrap_or("<none>"),
                        to = status,
                        version,
                        "status assigned"
                    );
                    return Ok(());
                }
                Err(e) if e.is_conflict() && attempt < MAX_ASSIGN_ATTEMPTS => {
                    debug!(process_type, uuid, attempt, "append conflict, retrying");
                }
                Err(e) => return Err(not_found_or(e, process_type, uuid)),
            }
        }
    }
}

fn to_process(record: ProcessRecord) -> Result<Process, ProcessError> {
    Process::try_from(record).map_err(ProcessError::from)
}

fn not_found_or(e: StorageError, process_type: &str, key: &str) -> ProcessError {
    if e.is_not_found() {
        ProcessError::ProcessNotFound {
            process_type: process_type.to_string(),
            key: key.to_string(),
        }
    } else {
        ProcessError::Storage(e)
    }
}
