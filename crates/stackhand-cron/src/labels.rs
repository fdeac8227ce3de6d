//! Compose service labels.
//!
//! Compose accepts labels either as a list of `key=value` strings or as a
//! mapping. Both forms normalize into the same [`LabelMap`].

use std::collections::BTreeMap;

use serde::de::{Deserializer, Error as _};
use serde::Deserialize;
use serde_yml::Value;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct LabelMap(BTreeMap<String, String>);

impl LabelMap {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl<'de> Deserialize<'de> for LabelMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let mut labels = BTreeMap::new();
        match Value::deserialize(deserializer)? {
            Value::Null => {}
            Value::Sequence(items) => {
                for item in &items {
                    let entry = scalar_string(item);
                    // Entries without '=' carry no value and are ignored.
                    if let Some((key, value)) = entry.split_once('=') {
                        labels.insert(key.trim().to_string(), value.trim().to_string());
                    }
                }
            }
            Value::Mapping(map) => {
                for (key, value) in &map {
                    labels.insert(
                        scalar_string(key).trim().to_string(),
                        scalar_string(value).trim().to_string(),
                    );
                }
            }
            other => {
                return Err(D::Error::custom(format!(
                    "unsupported labels format: {}",
                    kind(&other)
                )));
            }
        }
        Ok(LabelMap(labels))
    }
}

/// Text of a scalar node. Null and nested collections read as empty.
fn scalar_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Tagged(tagged) => scalar_string(&tagged.value),
        Value::Null | Value::Sequence(_) | Value::Mapping(_) => String::new(),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Sequence(_) => "sequence",
        Value::Mapping(_) => "mapping",
        Value::Tagged(_) => "tagged value",
    }
}
