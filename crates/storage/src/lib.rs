pub mod conformance;
mod error;
mod memory;
mod record;
mod traits;

pub use error::StorageError;
pub use memory::MemoryStorage;
pub use record::{NewProcessRecord, NewStatusEvent, ProcessRecord, StatusEventRecord};
pub use traits::ProcessStorage;
