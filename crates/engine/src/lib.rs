//! procflow-engine: the process workflow engine.
//!
//! - [`Payload`]: the structured document attached to processes and events
//! - [`Process`]: the aggregate root, converted from stored records
//! - [`StatusValidator`] / [`ConfigValidator`]: the transition gate
//! - [`ProcessService`]: submit, query and assign-status over any
//!   [`ProcessStorage`](procflow_storage::ProcessStorage) backend

pub mod error;
pub mod payload;
pub mod process;
pub mod service;
pub mod validator;

pub use error::{ErrorKind, PayloadError, ProcessError, SchemaError, ValidationError};
pub use payload::Payload;
pub use process::{NewProcess, Process, StatusEvent};
pub use service::{page_or_default, ProcessService, MAX_ASSIGN_ATTEMPTS};
pub use validator::{ConfigValidator, StatusValidator};
