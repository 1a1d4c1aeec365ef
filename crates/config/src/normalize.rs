//! String-key normalization of YAML documents.
//!
//! YAML mappings may be keyed by any node, JSON objects only by strings.
//! Every YAML document that ends up in front of a JSON Schema validator
//! (config files, schema text, payloads) goes through [`yaml_to_json`] first.
//! Scalar keys are rendered as their string form; a key that is a sequence,
//! a mapping or null has no string form and is rejected.

use serde_json::{Map, Number, Value as Json};
use serde_yaml::Value as Yaml;

/// Errors raised while converting a YAML document into JSON.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum NormalizeError {
    #[error("found non-string key: {0}")]
    NonStringKey(String),

    #[error("number {0} has no JSON representation")]
    NonFiniteNumber(f64),
}

/// Convert a YAML value into a JSON value with string object keys.
pub fn yaml_to_json(value: Yaml) -> Result<Json, NormalizeError> {
    match value {
        Yaml::Null => Ok(Json::Null),
        Yaml::Bool(b) => Ok(Json::Bool(b)),
        Yaml::Number(n) => number_to_json(&n),
        Yaml::String(s) => Ok(Json::String(s)),
        Yaml::Sequence(items) => items
            .into_iter()
            .map(yaml_to_json)
            .collect::<Result<Vec<_>, _>>()
            .map(Json::Array),
        Yaml::Mapping(mapping) => {
            let mut object = Map::with_capacity(mapping.len());
            for (key, value) in mapping {
                object.insert(key_to_string(key)?, yaml_to_json(value)?);
            }
            Ok(Json::Object(object))
        }
        Yaml::Tagged(tagged) => yaml_to_json(tagged.value),
    }
}

fn number_to_json(n: &serde_yaml::Number) -> Result<Json, NormalizeError> {
    if let Some(i) = n.as_i64() {
        return Ok(Json::Number(i.into()));
    }
    if let Some(u) = n.as_u64() {
        return Ok(Json::Number(u.into()));
    }
    let f = n.as_f64().unwrap_or(f64::NAN);
    Number::from_f64(f)
        .map(Json::Number)
        .ok_or(NormalizeError::NonFiniteNumber(f))
}

fn key_to_string(key: Yaml) -> Result<String, NormalizeError> {
    match key {
        Yaml::String(s) => Ok(s),
        Yaml::Bool(b) => Ok(b.to_string()),
        Yaml::Number(n) => Ok(n.to_string()),
        Yaml::Tagged(tagged) => key_to_string(tagged.value),
        other => Err(NormalizeError::NonStringKey(format!("{:?}", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yaml(src: &str) -> Yaml {
        serde_yaml::from_str(src).unwrap()
    }

    #[test]
    fn nested_documents_keep_their_shape() {
        let json = yaml_to_json(yaml(
            "reason: late\nitems:\n  - id: 1\n    tags: [a, b]\n  - id: 2\n    tags: []\nok: true\n",
        ))
        .unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "reason": "late",
                "items": [{"id": 1, "tags": ["a", "b"]}, {"id": 2, "tags": []}],
                "ok": true
            })
        );
    }

    #[test]
    fn scalar_keys_become_strings() {
        let json = yaml_to_json(yaml("1: one\ntrue: t\n2.5: half\n")).unwrap();
        assert_eq!(json["1"], "one");
        assert_eq!(json["true"], "t");
        assert_eq!(json["2.5"], "half");
    }

    #[test]
    fn sequence_key_is_rejected() {
        let err = yaml_to_json(yaml("? [a, b]\n: value\n")).unwrap_err();
        assert!(matches!(err, NormalizeError::NonStringKey(_)));
    }

    #[test]
    fn null_key_is_rejected() {
        let err = yaml_to_json(yaml("~: value\n")).unwrap_err();
        assert!(matches!(err, NormalizeError::NonStringKey(_)));
    }

    #[test]
    fn non_finite_float_is_rejected() {
        let err = yaml_to_json(yaml("x: .inf\n")).unwrap_err();
        assert!(matches!(err, NormalizeError::NonFiniteNumber(_)));
    }

    #[test]
    fn tags_are_dropped() {
        let json = yaml_to_json(yaml("when: !date 2024-01-01\n")).unwrap();
        assert_eq!(json["when"], "2024-01-01");
    }
}
