//! The state document pushed by an appliance.

use serde::Serialize;
use serde_json::Value;

use crate::error::DecodeError;

/// Full state snapshot of one appliance.
///
/// A document is always a JSON object carrying a string `unique_id`. It is
/// never patched in place: sessions swap in a whole new document per update.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Document(Value);

impl Document {
    /// Identity of the appliance that sent this document.
    pub fn unique_id(&self) -> &str {
        self.0
            .get("unique_id")
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    /// Walk nested objects along a `.`-separated path.
    ///
    /// Returns `None` when a segment is missing or when a segment would
    /// index into anything other than an object.
    pub fn get(&self, path: &str) -> Option<&Value> {
        path.split('.')
            .try_fold(&self.0, |node, segment| node.as_object()?.get(segment))
    }

    pub fn get_str(&self, path: &str) -> Option<&str> {
        self.get(path).and_then(Value::as_str)
    }

    pub fn get_i64(&self, path: &str) -> Option<i64> {
        self.get(path).and_then(Value::as_i64)
    }

    pub fn get_f64(&self, path: &str) -> Option<f64> {
        self.get(path).and_then(Value::as_f64)
    }

    pub fn get_bool(&self, path: &str) -> Option<bool> {
        self.get(path).and_then(Value::as_bool)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }
}

impl TryFrom<Value> for Document {
    type Error = DecodeError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        let object = value.as_object().ok_or(DecodeError::InvalidEnvelope)?;
        match object.get("unique_id") {
            Some(Value::String(_)) => Ok(Self(value)),
            _ => Err(DecodeError::MissingUniqueId),
        }
    }
}

/// Loose truthiness for device values: null, false, zero and empty are falsy.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}
