//! The process aggregate and its conversion from stored records.

use procflow_storage::{NewProcessRecord, ProcessRecord, StatusEventRecord};
use serde::{Deserialize, Serialize, Serializer};
use time::OffsetDateTime;

use crate::error::PayloadError;
use crate::payload::Payload;

/// One entry of a process history.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusEvent {
    pub name: String,
    pub payload: Payload,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// 1-based append position; breaks ties between equal timestamps.
    pub sequence: i64,
}

impl StatusEvent {
    fn order_key(&self) -> (OffsetDateTime, i64) {
        (self.created_at, self.sequence)
    }
}

impl TryFrom<StatusEventRecord> for StatusEvent {
    type Error = PayloadError;

    fn try_from(record: StatusEventRecord) -> Result<Self, Self::Error> {
        Ok(StatusEvent {
            payload: Payload::from_bytes(&record.payload)?,
            name: record.name,
            created_at: record.created_at,
            sequence: record.sequence,
        })
    }
}

/// A submission: the fields a caller chooses when creating a process.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewProcess {
    #[serde(default)]
    pub uuid: Option<String>,
    #[serde(rename = "type")]
    pub process_type: String,
    #[serde(default)]
    pub payload: Payload,
}

impl NewProcess {
    pub fn new(process_type: impl Into<String>, payload: Payload) -> Self {
        NewProcess {
            uuid: None,
            process_type: process_type.into(),
            payload,
        }
    }

    pub fn with_uuid(mut self, uuid: impl Into<String>) -> Self {
        self.uuid = Some(uuid.into());
        self
    }

    pub fn into_record(self) -> Result<NewProcessRecord, PayloadError> {
        Ok(NewProcessRecord {
            payload: self.payload.to_bytes()?,
            uuid: self.uuid,
            process_type: self.process_type,
        })
    }
}

/// A tracked unit of work with its append-only status history.
///
/// History is held oldest first. The current status is always derived from
/// the event with the greatest `(created_at, sequence)`, whatever order the
/// backend returned the events in.
#[derive(Debug, Clone, PartialEq)]
pub struct Process {
    pub uuid: String,
    pub process_type: String,
    pub payload: Payload,
    pub created_at: OffsetDateTime,
    version: i64,
    history: Vec<StatusEvent>,
}

impl Process {
    /// The newest event, or `None` for a process without history.
    pub fn current_status(&self) -> Option<&StatusEvent> {
        self.history.iter().max_by_key(|e| e.order_key())
    }

    pub fn current_status_name(&self) -> Option<&str> {
        self.current_status().map(|e| e.name.as_str())
    }

    /// Number of history entries, used as the append concurrency token.
    pub fn version(&self) -> i64 {
        self.version
    }

    pub fn changed_at(&self) -> OffsetDateTime {
        self.current_status()
            .map(|e| e.created_at)
            .unwrap_or(self.created_at)
    }

    pub fn history_oldest_first(&self) -> impl DoubleEndedIterator<Item = &StatusEvent> {
        self.history.iter()
    }

    pub fn history_newest_first(&self) -> impl Iterator<Item = &StatusEvent> {
        self.history.iter().rev()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }
}

impl TryFrom<ProcessRecord> for Process {
    type Error = PayloadError;

    fn try_from(record: ProcessRecord) -> Result<Self, Self::Error> {
        let mut history = record
            .history
            .into_iter()
            .map(StatusEvent::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        history.sort_by_key(StatusEvent::order_key);

        Ok(Process {
            payload: Payload::from_bytes(&record.payload)?,
            uuid: record.uuid,
            process_type: record.process_type,
            created_at: record.created_at,
            version: record.version,
            history,
        })
    }
}

/// Wire shape of a process.
#[derive(Serialize)]
struct ProcessView<'a> {
    uuid: &'a str,
    #[serde(rename = "type")]
    process_type: &'a str,
    payload: &'a Payload,
    current_status: Option<&'a str>,
    statuses: Vec<&'a StatusEvent>,
    #[serde(with = "time::serde::rfc3339")]
    created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    changed_at: OffsetDateTime,
}

impl Serialize for Process {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        ProcessView {
            uuid: &self.uuid,
            process_type: &self.process_type,
            payload: &self.payload,
            current_status: self.current_status_name(),
            statuses: self.history_newest_first().collect(),
            created_at: self.created_at,
            changed_at: self.changed_at(),
        }
        .serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use time::macros::datetime;

    fn event(sequence: i64, name: &str, created_at: OffsetDateTime) -> StatusEventRecord {
        StatusEventRecord {
            sequence,
            name: name.to_string(),
            payload: Vec::new(),
            created_at,
        }
    }

    fn record(history: Vec<StatusEventRecord>) -> ProcessRecord {
        ProcessRecord {
            uuid: "p-1".into(),
            process_type: "requests".into(),
            payload: br#"{"title":"printer"}"#.to_vec(),
            version: history.len() as i64,
            created_at: datetime!(2024-03-01 09:00 UTC),
            history,
        }
    }

    #[test]
    fn no_history_means_no_current_status() {
        let process = Process::try_from(record(Vec::new())).unwrap();
        assert!(process.current_status().is_none());
        assert_eq!(process.version(), 0);
        assert_eq!(process.changed_at(), process.created_at);
    }

    #[test]
    fn current_status_ignores_backend_order() {
        let process = Process::try_from(record(vec![
            event(1, "open", datetime!(2024-03-01 10:00 UTC)),
            event(3, "done", datetime!(2024-03-01 12:00 UTC)),
            event(2, "in_progress", datetime!(2024-03-01 11:00 UTC)),
        ]))
        .unwrap();
        assert_eq!(process.current_status_name(), Some("done"));
        assert_eq!(process.changed_at(), datetime!(2024-03-01 12:00 UTC));

        let oldest: Vec<&str> = process
            .history_oldest_first()
            .map(|e| e.name.as_str())
            .collect();
        assert_eq!(oldest, vec!["open", "in_progress", "done"]);
        let newest: Vec<&str> = process
            .history_newest_first()
            .map(|e| e.name.as_str())
            .collect();
        assert_eq!(newest, vec!["done", "in_progress", "open"]);
    }

    #[test]
    fn equal_timestamps_break_ties_by_sequence() {
        let at = datetime!(2024-03-01 10:00 UTC);
        let process = Process::try_from(record(vec![
            event(2, "in_progress", at),
            event(1, "open", at),
        ]))
        .unwrap();
        assert_eq!(process.current_status_name(), Some("in_progress"));
    }

    #[test]
    fn serializes_wire_shape() {
        let process = Process::try_from(record(vec![
            event(1, "open", datetime!(2024-03-01 10:00 UTC)),
            event(2, "in_progress", datetime!(2024-03-01 11:00 UTC)),
        ]))
        .unwrap();
        let value = serde_json::to_value(&process).unwrap();
        assert_eq!(value["uuid"], "p-1");
        assert_eq!(value["type"], "requests");
        assert_eq!(value["payload"], json!({"title": "printer"}));
        assert_eq!(value["current_status"], "in_progress");
        assert_eq!(value["statuses"][0]["name"], "in_progress");
        assert_eq!(value["statuses"][1]["name"], "open");
        assert_eq!(value["statuses"][1]["payload"], json!(null));
        assert_eq!(value["created_at"], "2024-03-01T09:00:00Z");
        assert_eq!(value["changed_at"], "2024-03-01T11:00:00Z");
    }

    #[test]
    fn submission_deserializes_with_defaults() {
        let new: NewProcess = serde_json::from_value(json!({"type": "requests"})).unwrap();
        assert_eq!(new.uuid, None);
        assert!(new.payload.is_null());

        let record = new.with_uuid("p-9").into_record().unwrap();
        assert_eq!(record.uuid.as_deref(), Some("p-9"));
        assert_eq!(record.payload, b"null".to_vec());
    }
}
