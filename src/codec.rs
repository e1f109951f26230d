//! The `{type, payload}` envelope that travels in every text frame.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{MonitorError, Result};
use crate::events::EventBus;

/// Wire envelope. `payload` is opaque to the channel; its shape is a
/// contract between publisher and subscriber.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub payload: Value,
}

impl Envelope {
    pub fn new(kind: impl Into<String>, payload: Value) -> Self {
        Self {
            kind: kind.into(),
            payload,
        }
    }
}

/// Serialize an outbound message into a single text frame.
pub fn encode(kind: &str, payload: &Value) -> Result<String> {
    #[derive(Serialize)]
    struct Outbound<'a> {
        #[serde(rename = "type")]
        kind: &'a str,
        payload: &'a Value,
    }
    Ok(serde_json::to_string(&Outbound { kind, payload })?)
}

/// Decode an inbound text frame.
pub fn decode(frame: &str) -> Result<Envelope> {
    serde_json::from_str(frame).map_err(|e| MonitorError::Decode(e.to_string()))
}

/// Decode `frame` and publish its payload under its type. Malformed frames
/// are logged and dropped without reaching any subscriber.
pub fn dispatch(bus: &EventBus, frame: &str) -> bool {
    match decode(frame) {
        Ok(envelope) => {
            let delivered = bus.publish(&envelope.kind, &envelope.payload);
            tracing::trace!(kind = %envelope.kind, delivered, "frame dispatched");
            true
        }
        Err(e) => {
            tracing::warn!("dropping frame: {e}");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::callback;
    use serde_json::json;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn encode_produces_type_and_payload() {
        let frame = encode("valve:set", &json!({"id": "valve-vat-1-hot", "open": true})).unwrap();
        let value: Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(value["type"], "valve:set");
        assert_eq!(value["payload"]["open"], true);
    }

    #[test]
    fn decode_reads_envelope() {
        let envelope = decode(r#"{"type":"vat:v1:update","payload":{"id":"v1"}}"#).unwrap();
        assert_eq!(envelope, Envelope::new("vat:v1:update", json!({"id": "v1"})));
    }

    #[test]
    fn decode_defaults_missing_payload_to_null() {
        let envelope = decode(r#"{"type":"ping"}"#).unwrap();
        assert_eq!(envelope.payload, Value::Null);
    }

    #[test]
    fn decode_rejects_non_json() {
        assert!(matches!(decode("hello there"), Err(MonitorError::Decode(_))));
    }

    #[test]
    fn decode_rejects_non_object() {
        assert!(decode("[1,2,3]").is_err());
        assert!(decode("42").is_err());
    }

    #[test]
    fn decode_rejects_missing_or_non_string_type() {
        assert!(decode(r#"{"payload":{}}"#).is_err());
        assert!(decode(r#"{"type":7,"payload":{}}"#).is_err());
    }

    #[test]
    fn dispatch_publishes_by_type() {
        let bus = EventBus::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        bus.subscribe(
            "vat:all:update",
            callback(move |payload| {
                assert!(payload.is_array());
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );

        assert!(dispatch(&bus, r#"{"type":"vat:all:update","payload":[{"id":"vat-1"}]}"#));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn dispatch_drops_malformed_frames_silently() {
        let bus = EventBus::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        bus.subscribe(
            "vat:all:update",
            callback(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );

        assert!(!dispatch(&bus, "{not json"));
        assert!(!dispatch(&bus, ""));
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn dispatch_unknown_type_is_ignored() {
        let bus = EventBus::new();
        assert!(dispatch(&bus, r#"{"type":"firmware:hello","payload":null}"#));
    }
}
