//! Notification payload parsing
//!
//! Webhook bodies arrive either as a single CloudEvents envelope or as an
//! array of envelopes (EventGrid batches). Anything this crate cannot turn
//! into a [`CallEvent`] is dropped here: upstream delivery may retry with
//! formats not yet supported, so a bad payload is never an error.

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::types::{CallEvent, EventKind};

/// The envelope fields this crate reads
#[derive(Debug, Deserialize)]
struct Envelope {
    /// CloudEvents schema
    #[serde(rename = "type", default)]
    cloud_event_type: Option<String>,
    /// EventGrid schema
    #[serde(rename = "eventType", default)]
    event_grid_type: Option<String>,
    #[serde(default)]
    data: Value,
}

impl Envelope {
    fn type_name(&self) -> Option<&str> {
        self.cloud_event_type
            .as_deref()
            .or(self.event_grid_type.as_deref())
    }
}

/// Parse every recognizable event out of a raw webhook body
pub fn parse_events(payload: &str) -> Vec<CallEvent> {
    let root: Value = match serde_json::from_str(payload) {
        Ok(value) => value,
        Err(e) => {
            warn!("⚠️ Dropping unparseable notification payload: {}", e);
            return Vec::new();
        }
    };

    let envelopes = match root {
        Value::Array(items) => items,
        object @ Value::Object(_) => vec![object],
        other => {
            warn!("⚠️ Dropping notification payload of unexpected shape: {}", type_label(&other));
            return Vec::new();
        }
    };

    envelopes.into_iter().filter_map(parse_envelope).collect()
}

fn parse_envelope(raw: Value) -> Option<CallEvent> {
    let envelope: Envelope = match serde_json::from_value(raw) {
        Ok(envelope) => envelope,
        Err(e) => {
            debug!("Skipping malformed envelope: {}", e);
            return None;
        }
    };

    let Some(type_name) = envelope.type_name() else {
        debug!("Skipping envelope without a type");
        return None;
    };

    let Some(kind) = EventKind::from_type_name(type_name) else {
        debug!("Skipping unrecognized event type {}", type_name);
        return None;
    };

    let data = match envelope.data {
        object @ Value::Object(_) => object,
        // EventGrid may deliver the body as an encoded JSON string
        Value::String(encoded) => match serde_json::from_str::<Value>(&encoded) {
            Ok(object @ Value::Object(_)) => object,
            _ => {
                debug!("Skipping {} with undecodable data", kind);
                return None;
            }
        },
        other => {
            debug!("Skipping {} with {} data", kind, type_label(&other));
            return None;
        }
    };

    let event = CallEvent::from_data(kind, data);
    if event.call_leg_id().is_none() {
        warn!("⚠️ Dropping {} without a correlation identifier", kind);
        return None;
    }

    Some(event)
}

fn type_label(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
