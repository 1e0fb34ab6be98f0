//! Tri-state field values.
//!
//! JSON bodies distinguish a key that was never sent from a key sent as
//! `null`. The pipeline needs both: an absent filter must not become a
//! predicate, while a `null` on a write means "clear this column".

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// A value that may be undefined, explicitly null, or set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Field<T> {
    /// The key was not supplied at all.
    Undefined,
    /// The key was supplied with an explicit `null`.
    Null,
    /// The key carries a value.
    Value(T),
}

impl<T> Default for Field<T> {
    fn default() -> Self {
        Field::Undefined
    }
}

impl<T> Field<T> {
    pub fn is_undefined(&self) -> bool {
        matches!(self, Field::Undefined)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Field::Null)
    }

    pub fn as_value(&self) -> Option<&T> {
        match self {
            Field::Value(v) => Some(v),
            _ => None,
        }
    }
}

impl From<Value> for Field<Value> {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Field::Null,
            other => Field::Value(other),
        }
    }
}

impl<T: Serialize> Serialize for Field<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Field::Value(v) => v.serialize(serializer),
            _ => serializer.serialize_none(),
        }
    }
}

// Missing keys never reach this impl; pair it with `#[serde(default)]`.
impl<'de, T: Deserialize<'de>> Deserialize<'de> for Field<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Option::<T>::deserialize(deserializer).map(|v| v.map_or(Field::Null, Field::Value))
    }
}

/// Field name to tri-state JSON value, ordered by key.
pub type FieldMap = BTreeMap<String, Field<Value>>;

/// Spreads a JSON object into a `FieldMap`. `null` becomes `Field::Null`.
pub fn from_json_object(object: Map<String, Value>) -> FieldMap {
    object
        .into_iter()
        .map(|(key, value)| (key, Field::from(value)))
        .collect()
}

/// Collapses a `FieldMap` back into JSON, dropping undefined entries.
pub fn into_json_object(fields: FieldMap) -> Map<String, Value> {
    fields
        .into_iter()
        .filter_map(|(key, field)| match field {
            Field::Undefined => None,
            Field::Null => Some((key, Value::Null)),
            Field::Value(v) => Some((key, v)),
        })
        .collect()
}

/// Textual form used when comparing loosely typed values (`5` vs `"5"`).
pub fn as_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Deserialize, Serialize)]
    struct Probe {
        #[serde(default, skip_serializing_if = "Field::is_undefined")]
        name: Field<String>,
    }

    #[test]
    fn test_deserialize_distinguishes_missing_and_null() {
        let missing: Probe = serde_json::from_value(json!({})).unwrap();
        assert!(missing.name.is_undefined());

        let null: Probe = serde_json::from_value(json!({ "name": null })).unwrap();
        assert!(null.name.is_null());

        let set: Probe = serde_json::from_value(json!({ "name": "Ada" })).unwrap();
        assert_eq!(set.name, Field::Value("Ada".to_string()));
    }

    #[test]
    fn test_serialize_skips_undefined_keeps_null() {
        let out = serde_json::to_value(Probe { name: Field::Undefined }).unwrap();
        assert_eq!(out, json!({}));

        let out = serde_json::to_value(Probe { name: Field::Null }).unwrap();
        assert_eq!(out, json!({ "name": null }));
    }

    #[test]
    fn test_json_object_conversion() {
        let object = json!({ "a": 1, "b": null }).as_object().cloned().unwrap();
        let mut fields = from_json_object(object);
        assert_eq!(fields.get("b"), Some(&Field::Null));

        fields.insert("c".into(), Field::Undefined);
        let back = into_json_object(fields);
        assert_eq!(Value::Object(back), json!({ "a": 1, "b": null }));
    }
}
