//! Webhook event correlation and dispatch
//!
//! - [`key`]: correlation key derivation shared by subscribers and dispatch
//! - [`types`]: the typed event model
//! - [`parser`]: webhook body parsing
//! - [`registry`]: the subscription map
//! - [`dispatcher`]: the entry point used by the webhook transport

pub mod key;
pub mod types;
pub mod parser;
pub mod registry;
pub mod dispatcher;

pub use key::{CorrelationKey, build_event_key};
pub use types::{CallEvent, CorrelationSource, EventKind, ResultInformation};
pub use parser::parse_events;
pub use registry::{NotificationCallback, SubscriptionRegistry};
pub use dispatcher::{DispatcherStats, EventDispatcher};
