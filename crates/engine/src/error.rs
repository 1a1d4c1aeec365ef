use procflow_config::NormalizeError;
use procflow_storage::StorageError;

/// A candidate transition was refused by a [`StatusValidator`](crate::StatusValidator).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// The status is not configured for the process type.
    #[error("unknown status {status:?} for process type {process_type:?}")]
    UnknownStatus {
        process_type: String,
        status: String,
    },

    /// The status graph has no edge into the candidate. `from` is `None`
    /// for a process without history whose candidate is not a start status.
    #[error("status {to:?} is not allowed after {}", .from.as_deref().unwrap_or("<none>"))]
    NotAllowedStatus {
        process_type: String,
        from: Option<String>,
        to: String,
    },

    /// The payload does not satisfy the schema of the target status.
    /// `message` never contains newline characters.
    #[error("payload validation failed for status {status:?}: {message}")]
    PayloadValidation { status: String, message: String },
}

/// A configured payload schema could not be compiled.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    #[error("schema for {process_type}/{status} is neither JSON nor YAML: {message}")]
    Parse {
        process_type: String,
        status: String,
        message: String,
    },

    #[error("schema for {process_type}/{status} is not a valid JSON Schema: {message}")]
    Invalid {
        process_type: String,
        status: String,
        message: String,
    },
}

/// A payload document could not be converted to or from its stored form.
#[derive(Debug, thiserror::Error)]
pub enum PayloadError {
    #[error("cannot encode payload: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("cannot decode stored payload: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("cannot parse YAML payload: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Normalize(#[from] NormalizeError),
}

/// Coarse classification of a [`ProcessError`] for transports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    InvalidRequest,
    Internal,
}

/// Errors returned by [`ProcessService`](crate::ProcessService).
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("process not found: {process_type}/{key}")]
    ProcessNotFound { process_type: String, key: String },

    #[error("cannot create process: {0}")]
    CannotCreateProcess(#[source] StorageError),

    #[error("unknown status {status:?} for process type {process_type:?}")]
    UnknownStatus {
        process_type: String,
        status: String,
    },

    #[error("status {to:?} is not allowed after {}", .from.as_deref().unwrap_or("<none>"))]
    NotAllowedStatus {
        process_type: String,
        from: Option<String>,
        to: String,
    },

    #[error("payload validation failed for status {status:?}: {message}")]
    PayloadValidation { status: String, message: String },

    #[error(transparent)]
    Payload(#[from] PayloadError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl ProcessError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ProcessError::ProcessNotFound { .. } => ErrorKind::NotFound,
            ProcessError::UnknownStatus { .. }
            | ProcessError::NotAllowedStatus { .. }
            | ProcessError::PayloadValidation { .. } => ErrorKind::InvalidRequest,
            ProcessError::CannotCreateProcess(_)
            | ProcessError::Payload(_)
            | ProcessError::Storage(_) => ErrorKind::Internal,
        }
    }
}

impl From<ValidationError> for ProcessError {
    fn from(e: ValidationError) -> Self {
        match e {
            ValidationError::UnknownStatus {
                process_type,
                status,
            } => ProcessError::UnknownStatus {
                process_type,
                status,
            },
            ValidationError::NotAllowedStatus {
                process_type,
                from,
                to,
            } => ProcessError::NotAllowedStatus {
                process_type,
                from,
                to,
            },
            ValidationError::PayloadValidation { status, message } => {
                ProcessError::PayloadValidation { status, message }
            }
        }
    }
}
