//! The structured document attached to a process or a status event.
//!
//! A payload is any JSON value. Storage keeps it as encoded bytes; the
//! round trip through those bytes keeps every value and drops key order.

use procflow_config::yaml_to_json;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::PayloadError;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Payload(Value);

impl Payload {
    pub fn new(value: Value) -> Self {
        Payload(value)
    }

    pub fn null() -> Self {
        Payload(Value::Null)
    }

    pub fn is_null(&self) -> bool {
        self.0.is_null()
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }

    /// Encode into the stored byte form.
    pub fn to_bytes(&self) -> Result<Vec<u8>, PayloadError> {
        serde_json::to_vec(&self.0).map_err(PayloadError::Encode)
    }

    /// Decode the stored byte form. Empty input is `null`.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PayloadError> {
        if bytes.is_empty() {
            return Ok(Payload::null());
        }
        serde_json::from_slice(bytes)
            .map(Payload)
            .map_err(PayloadError::Decode)
    }

    /// Parse a YAML document, rendering scalar mapping keys as strings.
    pub fn from_yaml_str(text: &str) -> Result<Self, PayloadError> {
        let yaml: serde_yaml::Value = serde_yaml::from_str(text)?;
        Ok(Payload(yaml_to_json(yaml)?))
    }
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        Payload(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn nested_document_survives_byte_form() {
        let doc = json!({
            "title": "printer",
            "tags": ["hw", {"floor": 3}],
            "meta": {"owner": {"name": "ops", "ids": [1, 2.5, null, true]}}
        });
        let bytes = Payload::new(doc.clone()).to_bytes().unwrap();
        assert_eq!(Payload::from_bytes(&bytes).unwrap().into_value(), doc);
    }

    #[test]
    fn empty_bytes_decode_to_null() {
        assert!(Payload::from_bytes(b"").unwrap().is_null());
    }

    #[test]
    fn garbage_bytes_fail_to_decode() {
        let err = Payload::from_bytes(b"{not json").unwrap_err();
        assert!(matches!(err, PayloadError::Decode(_)));
    }

    #[test]
    fn yaml_payload_keys_become_strings() {
        let payload = Payload::from_yaml_str("1: one\ntrue: yes-string\nname: x\n").unwrap();
        assert_eq!(
            payload.into_value(),
            json!({"1": "one", "true": "yes-string", "name": "x"})
        );
    }

    #[test]
    fn yaml_payload_with_sequence_key_rejected() {
        let err = Payload::from_yaml_str("? [a, b]\n: v\n").unwrap_err();
        assert!(matches!(err, PayloadError::Normalize(_)));
    }
}
