//! JSON-over-UDP wire codec.
//!
//! Every datagram is one JSON object with a single envelope key whose value
//! holds either command fields (outgoing) or a state document (incoming).

use bytes::Bytes;
use serde_json::{Map, Value};

use super::document::Document;
use crate::error::DecodeError;

/// Top-level key wrapping every payload.
pub const ENVELOPE: &str = "HomeVentilationControl";

/// Largest datagram the appliance is known to send.
pub const MAX_DATAGRAM_SIZE: usize = 2048;

/// Command fields sent to an appliance.
pub type Command = Map<String, Value>;

/// Wrap `command` (plus `unique_id` when known) into a datagram.
///
/// A `unique_id` argument takes precedence over one already in `command`.
pub fn encode(command: &Command, unique_id: Option<&str>) -> Bytes {
    let mut payload = command.clone();
    if let Some(id) = unique_id {
        payload.insert("unique_id".to_string(), Value::String(id.to_string()));
    }

    let mut envelope = Map::with_capacity(1);
    envelope.insert(ENVELOPE.to_string(), Value::Object(payload));

    Bytes::from(Value::Object(envelope).to_string())
}

/// Parse a datagram into a document.
///
/// Any error means "not a protocol packet for us"; receive loops drop it.
pub fn decode(data: &[u8]) -> Result<Document, DecodeError> {
    let mut root: Value = serde_json::from_slice(data)?;
    let payload = root
        .as_object_mut()
        .and_then(|object| object.remove(ENVELOPE))
        .ok_or(DecodeError::MissingEnvelope)?;
    Document::try_from(payload)
}
