//! Domain-model records.
//!
//! Entities travel through the evaluator as JSON objects tagged with
//! [`MODEL_KEY`]. Before such a record is merged into the [`Context`] it is
//! turned back into a plain key-value map by [`to_map`].
//!
//! [`Context`]: crate::context::Context

use crate::error::Result;
use serde::Serialize;
use serde_json::{Map, Value};

/// Key holding the entity name on a tagged record.
pub const MODEL_KEY: &str = "_model";

/// A serializable domain entity.
pub trait Model: Serialize {
    /// Entity name stored under [`MODEL_KEY`].
    const NAME: &'static str;

    /// Serialize into a tagged record.
    fn to_record(&self) -> Result<Value> {
        let mut value = serde_json::to_value(self)?;
        if let Value::Object(map) = &mut value {
            map.insert(MODEL_KEY.to_string(), Value::String(Self::NAME.to_string()));
        }
        Ok(value)
    }
}

pub fn is_model(value: &Value) -> bool {
    matches!(value, Value::Object(map) if map.get(MODEL_KEY).is_some_and(Value::is_string))
}

/// Name of the entity a tagged record belongs to.
pub fn model_name(value: &Value) -> Option<&str> {
    match value {
        Value::Object(map) => map.get(MODEL_KEY).and_then(Value::as_str),
        _ => None,
    }
}

/// Convert a tagged record into a plain map. Nested records (references and
/// collections of entities) are converted as well.
///
/// Returns `None` when `value` is not an object.
pub fn to_map(value: &Value) -> Option<Map<String, Value>> {
    match value {
        Value::Object(map) => Some(strip(map)),
        _ => None,
    }
}

fn strip(map: &Map<String, Value>) -> Map<String, Value> {
    map.iter()
        .filter(|(key, _)| key.as_str() != MODEL_KEY)
        .map(|(key, value)| (key.clone(), plain(value)))
        .collect()
}

fn plain(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(strip(map)),
        Value::Array(items) => Value::Array(items.iter().map(plain).collect()),
        other => other.clone(),
    }
}
