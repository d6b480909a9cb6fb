//! Correlation keys
//!
//! Subscribers and the dispatcher must derive the same key for the same
//! logical event, so every key goes through [`build_event_key`].

use std::fmt;
use std::hash::{Hash, Hasher};

/// Composite key `"{eventType}-{callLegId}"` matching an inbound event to a
/// pending subscription.
///
/// Equality and hashing ignore ASCII case; `Display` keeps the original text.
#[derive(Debug, Clone)]
pub struct CorrelationKey(String);

impl CorrelationKey {
    /// The key text as built
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl PartialEq for CorrelationKey {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }
}

impl Eq for CorrelationKey {}

impl Hash for CorrelationKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for byte in self.0.bytes() {
            state.write_u8(byte.to_ascii_lowercase());
        }
        state.write_u8(0xff);
    }
}

impl fmt::Display for CorrelationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Build the correlation key for an event type and call leg
pub fn build_event_key(event_type: &str, call_leg_id: &str) -> CorrelationKey {
    CorrelationKey(format!("{}-{}", event_type, call_leg_id))
}
