//! Application state.

use std::sync::Arc;

use procflow_engine::ProcessService;
use procflow_storage::ProcessStorage;

/// Application state shared across request handlers.
pub(crate) struct AppState {
    /// Workflow service over whichever storage backend was wired in.
    pub(crate) service: ProcessService<Arc<dyn ProcessStorage>>,
}
