//! structured property documents
//!
//! Property files written as JSON, YAML or HCL are parsed into a [Value] tree which is then flattened
//! into plain string properties, because the resolver only knows flat keys and string values:
//!
//! - object keys are joined with `.` (`{ db: { host: x } }` becomes `db.host = x`)
//! - array items get an index suffix (`hosts: [a, b]` becomes `hosts[0] = a`, `hosts[1] = b`)
//! - booleans and numbers are rendered as text, there is no type coercion the other way
//! - `null` values produce no property at all
//!
//! The document root must be an object.
use crate::properties::Properties;
use indexmap::IndexMap;

/// All value types a structured property document can contain
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Boolean(bool),
    Number(String),
    String(String),
    Array(Vec<Value>),
    Object(IndexMap<String, Value>),
}

impl Value {
    /// Flatten into dotted keys
    ///
    /// Returns [None] if the value is not an object.
    pub fn flatten(self) -> Option<Properties> {
        let Value::Object(object) = self else {
            return None;
        };

        let mut entries = vec![];
        for (key, value) in object {
            value.flatten_into(key, &mut entries);
        }

        Some(entries.into_iter().collect())
    }

    fn flatten_into(self, path: String, entries: &mut Vec<(String, String)>) {
        match self {
            Value::Null => {}
            Value::Boolean(b) => entries.push((path, b.to_string())),
            Value::Number(n) | Value::String(n) => entries.push((path, n)),
            Value::Array(items) => {
                for (index, item) in items.into_iter().enumerate() {
                    item.flatten_into(format!("{path}[{index}]"), entries);
                }
            }
            Value::Object(object) => {
                for (key, value) in object {
                    value.flatten_into(format!("{path}.{key}"), entries);
                }
            }
        }
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(value: Vec<T>) -> Self {
        Value::Array(value.into_iter().map(Into::into).collect())
    }
}

impl<K: ToString, V: Into<Value>> From<hcl::value::Map<K, V>> for Value {
    fn from(value: hcl::value::Map<K, V>) -> Self {
        Value::Object(
            value
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.into()))
                .collect(),
        )
    }
}

impl From<hcl::Value> for Value {
    fn from(value: hcl::Value) -> Value {
        match value {
            hcl::Value::Null => Value::Null,
            hcl::Value::Bool(b) => b.into(),
            hcl::Value::Number(n) => Value::Number(n.to_string()),
            hcl::Value::String(s) => s.into(),
            hcl::Value::Array(a) => a.into(),
            hcl::Value::Object(o) => o.into(),
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Value {
        use serde_json::Value as Json;

        match value {
            Json::Null => Value::Null,
            Json::Bool(b) => b.into(),
            Json::Number(n) => Value::Number(n.to_string()),
            Json::String(s) => s.into(),
            Json::Array(a) => a.into(),
            Json::Object(o) => Value::Object(o.into_iter().map(|(k, v)| (k, v.into())).collect()),
        }
    }
}

impl From<serde_yaml::Value> for Value {
    fn from(value: serde_yaml::Value) -> Value {
        use serde_yaml::Value as Yaml;

        match value {
            Yaml::Null => Value::Null,
            Yaml::Bool(b) => b.into(),
            Yaml::Number(n) => Value::Number(n.to_string()),
            Yaml::String(s) => s.into(),
            Yaml::Sequence(s) => s.into(),
            Yaml::Mapping(m) => Value::Object(
                m.into_iter()
                    .filter_map(|(k, v)| yaml_key(k).map(|k| (k, v.into())))
                    .collect(),
            ),
            Yaml::Tagged(tagged) => tagged.value.into(),
        }
    }
}

/// Scalar mapping keys become strings, anything else can't be addressed by a property key
fn yaml_key(key: serde_yaml::Value) -> Option<String> {
    use serde_yaml::Value as Yaml;

    match key {
        Yaml::String(s) => Some(s),
        Yaml::Number(n) => Some(n.to_string()),
        Yaml::Bool(b) => Some(b.to_string()),
        other => {
            tracing::debug!(key=?other, "skipping non-scalar mapping key");
            None
        }
    }
}
