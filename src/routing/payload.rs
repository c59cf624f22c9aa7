//! Inbound payload decoding.
//!
//! Decoding never fails: anything that does not parse is kept as raw text.

use serde_json::Value;

/// A decoded inbound payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Payload parsed as structured data.
    Structured(Value),
    /// Payload that could not be parsed, kept unchanged.
    Raw(String),
}

impl Payload {
    /// Decode as JSON, falling back to the raw text.
    pub fn decode(bytes: &[u8]) -> Self {
        match serde_json::from_slice::<Value>(bytes) {
            Ok(value) => Payload::Structured(value),
            Err(_) => Payload::Raw(String::from_utf8_lossy(bytes).into_owned()),
        }
    }

    /// Decode as JSON, then YAML, falling back to the raw text.
    pub fn decode_document(bytes: &[u8]) -> Self {
        if let Ok(value) = serde_json::from_slice::<Value>(bytes) {
            return Payload::Structured(value);
        }
        match serde_yaml::from_slice::<Value>(bytes) {
            Ok(value) if !value.is_null() => Payload::Structured(value),
            _ => Payload::Raw(String::from_utf8_lossy(bytes).into_owned()),
        }
    }

    /// Look up a top-level field of a structured object payload.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Payload::Structured(value) => value.get(key),
            Payload::Raw(_) => None,
        }
    }

    pub fn is_structured(&self) -> bool {
        matches!(self, Payload::Structured(_))
    }

    /// Convert into a JSON value; raw payloads become strings.
    pub fn into_value(self) -> Value {
        match self {
            Payload::Structured(value) => value,
            Payload::Raw(text) => Value::String(text),
        }
    }
}

/// A message delivered to an action handler.
#[derive(Debug, Clone)]
pub struct Packet {
    pub topic: String,
    pub payload: Payload,
    raw: Vec<u8>,
}

impl Packet {
    /// Build a packet, decoding `raw` as JSON.
    pub fn new(topic: impl Into<String>, raw: Vec<u8>) -> Self {
        Self {
            topic: topic.into(),
            payload: Payload::decode(&raw),
            raw,
        }
    }

    /// Build a packet from a structured value, as if it had been received.
    pub fn from_value(topic: impl Into<String>, value: Value) -> Self {
        let raw = value.to_string().into_bytes();
        Self {
            topic: topic.into(),
            payload: Payload::Structured(value),
            raw,
        }
    }

    /// The payload bytes exactly as received.
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.payload.get(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_json() {
        assert_eq!(Payload::decode(br#"{"a":1}"#), Payload::Structured(json!({"a": 1})));
    }

    #[test]
    fn test_decode_falls_back_to_raw() {
        assert_eq!(Payload::decode(b"not json"), Payload::Raw("not json".into()));
        assert_eq!(Payload::decode(b""), Payload::Raw(String::new()));
    }

    #[test]
    fn test_document_json_first() {
        assert_eq!(
            Payload::decode_document(br#"{"a":1}"#),
            Payload::Structured(json!({"a": 1}))
        );
    }

    #[test]
    fn test_document_yaml_fallback() {
        assert_eq!(
            Payload::decode_document(b"a: 1\n"),
            Payload::Structured(json!({"a": 1}))
        );
    }

    #[test]
    fn test_document_unparsable_stays_raw() {
        assert_eq!(
            Payload::decode_document(b"not: valid: at: all:"),
            Payload::Raw("not: valid: at: all:".into())
        );
    }

    #[test]
    fn test_packet_field_lookup() {
        let packet = Packet::new("core/msg/gauge/start", br#"{"aliveTimeout":2000}"#.to_vec());
        assert_eq!(packet.get("aliveTimeout"), Some(&json!(2000)));
        assert_eq!(packet.raw(), br#"{"aliveTimeout":2000}"#);

        let raw = Packet::new("core/msg/gauge/start", b"go".to_vec());
        assert_eq!(raw.get("aliveTimeout"), None);
        assert!(!raw.payload.is_structured());
    }
}
