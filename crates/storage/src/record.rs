use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Input to [`ProcessStorage::create`](crate::ProcessStorage::create).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProcessRecord {
    /// Caller-chosen uuid. `None` lets the backend generate one.
    pub uuid: Option<String>,
    pub process_type: String,
    /// Encoded payload document.
    pub payload: Vec<u8>,
}

/// A stored process with its status history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessRecord {
    pub uuid: String,
    pub process_type: String,
    /// Encoded payload document.
    pub payload: Vec<u8>,
    /// Number of status events appended so far.
    pub version: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// Status events, newest first when returned by a query.
    pub history: Vec<StatusEventRecord>,
}

/// Input to [`ProcessStorage::append_status`](crate::ProcessStorage::append_status).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewStatusEvent {
    pub name: String,
    /// Encoded payload document.
    pub payload: Vec<u8>,
}

/// One appended status event. Never modified once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEventRecord {
    /// 1-based position in append order. Equals the process version right
    /// after this event was appended.
    pub sequence: i64,
    pub name: String,
    /// Encoded payload document.
    pub payload: Vec<u8>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl StatusEventRecord {
    /// Sort key: creation time, then append position.
    pub fn order_key(&self) -> (OffsetDateTime, i64) {
        (self.created_at, self.sequence)
    }
}
